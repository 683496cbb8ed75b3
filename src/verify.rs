//! The end-to-end correctness oracle: at each configured sample point,
//! predict the topmost visible surface from the registries and compare its
//! color with what the compositor actually renders there. Colors are chosen
//! to be mutually distinguishable, so the comparison is exact.

use crate::{
    catalog::Level,
    compositor::Compositor,
    coordinator::Coordinator,
    core::{Color, Point},
    error::StrataResult,
    registry::RegistrySet,
    surface::SurfaceRecord,
};

/// The surface that should be topmost at `point`: scan levels from highest
/// ordinal to lowest and, within a level, from the registry head (most
/// recently created or promoted) backward; the first visible record covering
/// the point wins.
pub fn expected_top(registries: &RegistrySet, point: Point) -> Option<&SurfaceRecord> {
    for level in Level::ALL.into_iter().rev() {
        for record in registries.level(level).iter() {
            if record.visible && record.rect.contains(point) {
                return Some(record);
            }
        }
    }
    None
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SampleOutcome {
    pub point: Point,
    /// Predicted color; `None` means no visible surface covers the point and
    /// the background is expected.
    pub expected: Option<Color>,
    pub sampled: Color,
    pub pass: bool,
}

/// Sample every point and compare against the registry prediction.
pub fn check_points(
    registries: &RegistrySet,
    compositor: &dyn Compositor,
    points: &[Point],
    background: Color,
) -> StrataResult<Vec<SampleOutcome>> {
    let mut outcomes = Vec::with_capacity(points.len());
    for &point in points {
        let expected = expected_top(registries, point).map(|r| r.color);
        let sampled = compositor.sample_color(point)?;
        let pass = sampled == expected.unwrap_or(background);
        if !pass {
            tracing::error!(
                x = point.x,
                y = point.y,
                ?expected,
                %sampled,
                "z-order mismatch at sample point"
            );
        }
        outcomes.push(SampleOutcome {
            point,
            expected,
            sampled,
            pass,
        });
    }
    Ok(outcomes)
}

/// Points inside known cross-level overlap regions. Every base rect contains
/// (50,50); the others land inside progressively fewer levels' rects.
pub fn default_sample_points() -> Vec<Point> {
    vec![
        Point::new(50, 50),
        Point::new(150, 150),
        Point::new(350, 350),
        Point::new(550, 550),
        Point::new(650, 650),
    ]
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct VerifyReport {
    pub samples: Vec<SampleOutcome>,
    /// Every registry holds exactly its level's capacity.
    pub counts_ok: bool,
    /// Exactly one rejected creation attempt per level.
    pub rejections_ok: bool,
    /// No invalid levels, root failures, registry faults, or timeouts.
    pub clean_run: bool,
    pub mismatch_count: usize,
    /// Whether layer mismatches were expected (a coercion policy was
    /// configured) or count as failures.
    pub mismatches_expected: bool,
}

impl VerifyReport {
    pub fn samples_ok(&self) -> bool {
        self.samples.iter().all(|s| s.pass)
    }

    pub fn passed(&self) -> bool {
        self.samples_ok()
            && self.counts_ok
            && self.rejections_ok
            && self.clean_run
            && (self.mismatches_expected || self.mismatch_count == 0)
    }
}

/// Grade a fully populated run: per-level counts, rejection counts, anomaly
/// tallies, and the point samples.
pub fn grade(
    coordinator: &Coordinator,
    compositor: &dyn Compositor,
    catalog: &crate::catalog::Catalog,
    points: &[Point],
    background: Color,
    mismatches_expected: bool,
) -> StrataResult<VerifyReport> {
    let registries = coordinator.registries();
    let counts_ok = Level::ALL.into_iter().all(|level| {
        registries.level(level).created() == catalog.template_for(level).capacity
    });
    let rejections_ok = Level::ALL
        .into_iter()
        .all(|level| coordinator.rejected(level) == 1);
    let clean_run = coordinator.invalid_levels().is_empty()
        && coordinator.root_failures() == 0
        && coordinator.registry_faults() == 0
        && coordinator.timeouts() == 0;
    let samples = check_points(registries, compositor, points, background)?;

    Ok(VerifyReport {
        samples,
        counts_ok,
        rejections_ok,
        clean_run,
        mismatch_count: coordinator.mismatches().len(),
        mismatches_expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::Rect,
        registry::RegistrySet,
        surface::{SurfaceId, SurfaceRecord},
    };

    fn record(id: u64, level: Level, size: i32, color: u32, visible: bool) -> SurfaceRecord {
        SurfaceRecord {
            id: SurfaceId(id),
            color: Color(color),
            visible,
            topmost: false,
            level_expected: level,
            level_actual: level,
            rect: Rect::new(0, 0, size, size),
        }
    }

    #[test]
    fn highest_level_wins() {
        let mut set = RegistrySet::default();
        set.insert(record(1, Level::Backdrop, 100, 0xAA, true)).unwrap();
        set.insert(record(2, Level::Overlay, 700, 0xBB, true)).unwrap();
        let top = expected_top(&set, Point::new(50, 50)).unwrap();
        assert_eq!(top.id, SurfaceId(2));
    }

    #[test]
    fn hidden_surfaces_are_skipped() {
        let mut set = RegistrySet::default();
        set.insert(record(1, Level::Backdrop, 100, 0xAA, true)).unwrap();
        set.insert(record(2, Level::Overlay, 700, 0xBB, false)).unwrap();
        let top = expected_top(&set, Point::new(50, 50)).unwrap();
        assert_eq!(top.id, SurfaceId(1));
    }

    #[test]
    fn head_of_level_beats_older_records() {
        let mut set = RegistrySet::default();
        set.insert(record(1, Level::App, 600, 0xAA, true)).unwrap();
        set.insert(record(2, Level::App, 603, 0xBB, true)).unwrap();
        assert_eq!(
            expected_top(&set, Point::new(10, 10)).unwrap().id,
            SurfaceId(2)
        );
        set.promote_to_top(Level::App, SurfaceId(1), true).unwrap();
        assert_eq!(
            expected_top(&set, Point::new(10, 10)).unwrap().id,
            SurfaceId(1)
        );
    }

    #[test]
    fn uncovered_point_has_no_expectation() {
        let set = RegistrySet::default();
        assert!(expected_top(&set, Point::new(50, 50)).is_none());
    }

    #[test]
    fn records_not_covering_the_point_are_skipped() {
        let mut set = RegistrySet::default();
        set.insert(record(1, Level::App, 600, 0xAA, true)).unwrap();
        set.insert(record(2, Level::Overlay, 700, 0xBB, true)).unwrap();
        // (650,650) is outside the 600x600 app surface.
        let top = expected_top(&set, Point::new(650, 650)).unwrap();
        assert_eq!(top.id, SurfaceId(2));
    }
}
