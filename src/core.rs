//! Small plain value types shared across the harness: screen geometry and
//! packed colors, with the per-instance increment arithmetic the surface
//! factory applies when deriving one surface from a layer template.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Half-open on the right/bottom edges.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    /// The rect with `times` copies of `delta` applied to the right/bottom
    /// edges. The origin stays put, so sibling surfaces nest.
    pub fn grown(&self, delta: SizeDelta, times: u32) -> Self {
        let n = times as i32;
        Self {
            left: self.left,
            top: self.top,
            right: self.right + delta.dx * n,
            bottom: self.bottom + delta.dy * n,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SizeDelta {
    pub dx: i32,
    pub dy: i32,
}

impl SizeDelta {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

/// Packed 0xAARRGGBB color. Layer templates pick base colors and increments
/// so that every derived color in a run is distinct; the verification pass
/// relies on exact equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Color(pub u32);

impl Color {
    /// The color with `times` copies of `delta` added, wrapping.
    pub fn offset(&self, delta: Color, times: u32) -> Self {
        Self(self.0.wrapping_add(delta.0.wrapping_mul(times)))
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}
