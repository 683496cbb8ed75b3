use crate::{
    catalog::Level,
    core::{Color, Rect},
};

/// Opaque handle minted by the compositor at creation time, unique for the
/// surface's lifetime.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SurfaceId(pub u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VisibilityMode {
    Hidden,
    Shown,
    /// Show and raise to the top of the surface's level.
    ShownAsTop,
}

/// One created on-screen surface, as tracked by the layer registries.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SurfaceRecord {
    pub id: SurfaceId,
    pub color: Color,
    pub visible: bool,
    pub topmost: bool,
    /// The level the worker asked for.
    pub level_expected: Level,
    /// The level the platform actually assigned, read back after creation.
    /// The registries index by this, never by `level_expected`.
    pub level_actual: Level,
    pub rect: Rect,
}

impl SurfaceRecord {
    pub fn mismatched(&self) -> bool {
        self.level_actual != self.level_expected
    }
}
