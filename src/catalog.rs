//! The fixed, ordered set of stacking levels and the per-level template used
//! to derive surfaces. The catalog is immutable configuration; all mutable
//! per-run state (created counts, registry contents) lives in
//! [`crate::registry::RegistrySet`].

use crate::core::{Color, Rect, SizeDelta};

pub const LEVEL_COUNT: usize = 7;

/// Stacking levels, bottom to top. A surface in a higher level renders above
/// any surface in a lower level within the same screen region.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Level {
    Backdrop,
    Desktop,
    Dock,
    Panel,
    Floating,
    App,
    Overlay,
}

impl Level {
    pub const ALL: [Level; LEVEL_COUNT] = [
        Level::Backdrop,
        Level::Desktop,
        Level::Dock,
        Level::Panel,
        Level::Floating,
        Level::App,
        Level::Overlay,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn from_ordinal(ordinal: usize) -> Option<Level> {
        Level::ALL.get(ordinal).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Backdrop => "backdrop",
            Level::Desktop => "desktop",
            Level::Dock => "dock",
            Level::Panel => "panel",
            Level::Floating => "floating",
            Level::App => "app",
            Level::Overlay => "overlay",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug)]
pub struct LayerTemplate {
    pub style: Level,
    pub base_rect: Rect,
    pub size_delta: SizeDelta,
    pub base_color: Color,
    pub color_delta: Color,
    pub capacity: usize,
    pub caption: &'static str,
}

#[derive(Clone, Debug)]
pub struct Catalog {
    templates: [LayerTemplate; LEVEL_COUNT],
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            templates: [
                LayerTemplate {
                    style: Level::Backdrop,
                    base_rect: Rect::new(0, 0, 100, 100),
                    size_delta: SizeDelta::new(13, 13),
                    base_color: Color(0xFFFF_FF00),
                    color_delta: Color(0x0000_0010),
                    capacity: 8,
                    caption: "backdrop surface",
                },
                LayerTemplate {
                    style: Level::Desktop,
                    base_rect: Rect::new(0, 0, 200, 200),
                    size_delta: SizeDelta::new(17, 17),
                    base_color: Color(0xFFFF_00FF),
                    color_delta: Color(0x0000_1000),
                    capacity: 15,
                    caption: "desktop surface",
                },
                LayerTemplate {
                    style: Level::Dock,
                    base_rect: Rect::new(0, 0, 300, 300),
                    size_delta: SizeDelta::new(7, 7),
                    base_color: Color(0xFF00_FFFF),
                    color_delta: Color(0x0010_0000),
                    capacity: 8,
                    caption: "dock surface",
                },
                LayerTemplate {
                    style: Level::Panel,
                    base_rect: Rect::new(0, 0, 400, 400),
                    size_delta: SizeDelta::new(11, 11),
                    base_color: Color(0xFFFF_0000),
                    color_delta: Color(0x0000_1010),
                    capacity: 8,
                    caption: "panel surface",
                },
                LayerTemplate {
                    style: Level::Floating,
                    base_rect: Rect::new(0, 0, 500, 500),
                    size_delta: SizeDelta::new(5, 5),
                    base_color: Color(0xFF00_0000),
                    color_delta: Color(0x0003_0303),
                    capacity: 16,
                    caption: "floating surface",
                },
                LayerTemplate {
                    style: Level::App,
                    base_rect: Rect::new(0, 0, 600, 600),
                    size_delta: SizeDelta::new(3, 3),
                    base_color: Color(0xFF00_0000),
                    color_delta: Color(0x0001_0101),
                    capacity: 128,
                    caption: "app surface",
                },
                LayerTemplate {
                    style: Level::Overlay,
                    base_rect: Rect::new(0, 0, 700, 700),
                    size_delta: SizeDelta::new(19, 19),
                    base_color: Color(0xFF00_FF00),
                    color_delta: Color(0x0010_0010),
                    capacity: 8,
                    caption: "overlay surface",
                },
            ],
        }
    }
}

impl Catalog {
    pub fn template_for(&self, level: Level) -> &LayerTemplate {
        &self.templates[level.ordinal()]
    }

    pub fn total_capacity(&self) -> usize {
        self.templates.iter().map(|t| t.capacity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_dense_and_ordered() {
        for (i, level) in Level::ALL.iter().enumerate() {
            assert_eq!(level.ordinal(), i);
            assert_eq!(Level::from_ordinal(i), Some(*level));
        }
        assert_eq!(Level::from_ordinal(LEVEL_COUNT), None);
        assert!(Level::Overlay > Level::Backdrop);
    }

    #[test]
    fn default_capacities_sum_to_191() {
        let catalog = Catalog::default();
        assert_eq!(catalog.total_capacity(), 191);
        assert_eq!(catalog.template_for(Level::App).capacity, 128);
    }

    #[test]
    fn templates_match_their_level() {
        let catalog = Catalog::default();
        for level in Level::ALL {
            assert_eq!(catalog.template_for(level).style, level);
        }
    }

    #[test]
    fn base_rects_all_cover_the_shared_overlap_point() {
        let catalog = Catalog::default();
        let p = crate::core::Point::new(50, 50);
        for level in Level::ALL {
            assert!(catalog.template_for(level).base_rect.contains(p));
        }
    }
}
