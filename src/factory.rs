//! Derives one surface from a layer template and asks the compositor to
//! create it. The platform is authoritative about the level it assigns; a
//! disagreement with the requested level is logged and surfaced on the
//! record, never trusted silently.

use crossbeam_channel::Sender;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    catalog::{Catalog, Level},
    compositor::{Compositor, SurfaceSpec},
    error::StrataResult,
    messages::SurfaceEvent,
    surface::SurfaceRecord,
};

pub struct SurfaceFactory {
    catalog: Catalog,
    rng: StdRng,
}

impl SurfaceFactory {
    pub fn new(catalog: Catalog, seed: u64) -> Self {
        Self {
            catalog,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create surface number `seq` of `level`. Geometry and color are the
    /// template's base values with `seq` copies of the increments applied;
    /// initial visibility is an unbiased coin flip.
    ///
    /// On rejection the error propagates and no record exists; the caller
    /// counts it as one rejected attempt.
    pub fn create(
        &mut self,
        level: Level,
        seq: usize,
        compositor: &dyn Compositor,
        events: Sender<SurfaceEvent>,
    ) -> StrataResult<SurfaceRecord> {
        let template = self.catalog.template_for(level);
        let rect = template.base_rect.grown(template.size_delta, seq as u32);
        let color = template.base_color.offset(template.color_delta, seq as u32);
        let visible = self.rng.gen_bool(0.5);

        let spec = SurfaceSpec {
            style: template.style,
            rect,
            color,
            caption: format!("{} #{seq}", template.caption),
            visible,
        };
        let created = compositor.create_surface(&spec, events)?;

        let record = SurfaceRecord {
            id: created.id,
            color,
            visible,
            topmost: false,
            level_expected: level,
            level_actual: created.style_actual,
            rect,
        };
        if record.mismatched() {
            tracing::warn!(
                id = %record.id,
                expected = %record.level_expected,
                actual = %record.level_actual,
                "platform assigned a different level than requested"
            );
        }
        Ok(record)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}
