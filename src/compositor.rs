//! The rendering/windowing collaborator boundary, plus the simulated
//! platform the harness runs against.
//!
//! The platform is authoritative about stacking: [`SimCompositor`] keeps its
//! own per-level stacking order and answers [`Compositor::sample_color`]
//! from it. The harness's registries are a second, independently maintained
//! model of the same state; the verification pass compares the two.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crossbeam_channel::Sender;

use crate::{
    catalog::{Catalog, Level, LEVEL_COUNT},
    core::{Color, Point, Rect},
    error::{StrataError, StrataResult},
    messages::SurfaceEvent,
    surface::{SurfaceId, VisibilityMode},
};

#[derive(Clone, Debug)]
pub struct SurfaceSpec {
    pub style: Level,
    pub rect: Rect,
    pub color: Color,
    pub caption: String,
    pub visible: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct CreatedSurface {
    pub id: SurfaceId,
    /// The effective level the platform assigned. May differ from the
    /// requested style under a coercion policy.
    pub style_actual: Level,
}

/// Everything the harness consumes from the windowing platform. Visibility
/// changes and destruction are acknowledged asynchronously: the platform
/// notifies the owning context's event mailbox.
pub trait Compositor: Send + Sync {
    fn create_surface(
        &self,
        spec: &SurfaceSpec,
        events: Sender<SurfaceEvent>,
    ) -> StrataResult<CreatedSurface>;

    /// An off-screen root surface anchoring one worker's message loop. Not a
    /// catalog surface; never stacked, never sampled.
    fn create_anchor(&self, events: Sender<SurfaceEvent>) -> StrataResult<SurfaceId>;

    fn set_visibility(&self, id: SurfaceId, mode: VisibilityMode) -> StrataResult<()>;

    fn sample_color(&self, point: Point) -> StrataResult<Color>;

    fn destroy_surface(&self, id: SurfaceId) -> StrataResult<()>;
}

#[derive(Debug)]
struct SimSurface {
    id: SurfaceId,
    rect: Rect,
    color: Color,
    visible: bool,
    owner: Sender<SurfaceEvent>,
}

#[derive(Debug, Default)]
struct SimState {
    next_id: u64,
    /// Per level, bottom to top: the last element is the topmost surface.
    stacks: [Vec<SimSurface>; LEVEL_COUNT],
    anchors: HashMap<SurfaceId, Sender<SurfaceEvent>>,
}

/// Simulated windowing platform: capacity enforcement, optional style
/// coercion, authoritative stacking, pixel sampling.
pub struct SimCompositor {
    capacities: [usize; LEVEL_COUNT],
    coercions: HashMap<Level, Level>,
    fail_anchors: bool,
    background: Color,
    state: Mutex<SimState>,
}

impl SimCompositor {
    pub const BACKGROUND: Color = Color(0xFF10_1418);

    pub fn new(catalog: &Catalog) -> Self {
        let mut capacities = [0usize; LEVEL_COUNT];
        for level in Level::ALL {
            capacities[level.ordinal()] = catalog.template_for(level).capacity;
        }
        Self {
            capacities,
            coercions: HashMap::new(),
            fail_anchors: false,
            background: Self::BACKGROUND,
            state: Mutex::new(SimState::default()),
        }
    }

    /// Silently reassign surfaces requested with style `from` to level `to`,
    /// the way a real platform applies layering policy.
    pub fn coerce_style(mut self, from: Level, to: Level) -> Self {
        self.coercions.insert(from, to);
        self
    }

    /// Make every anchor creation fail, to exercise the fatal
    /// root-surface path.
    pub fn fail_anchors(mut self) -> Self {
        self.fail_anchors = true;
        self
    }

    pub fn live_count(&self, level: Level) -> usize {
        self.lock().stacks[level.ordinal()].len()
    }

    pub fn live_total(&self) -> usize {
        let state = self.lock();
        state.stacks.iter().map(|s| s.len()).sum::<usize>() + state.anchors.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Compositor for SimCompositor {
    fn create_surface(
        &self,
        spec: &SurfaceSpec,
        events: Sender<SurfaceEvent>,
    ) -> StrataResult<CreatedSurface> {
        let level = self.coercions.get(&spec.style).copied().unwrap_or(spec.style);
        let mut state = self.lock();
        if state.stacks[level.ordinal()].len() >= self.capacities[level.ordinal()] {
            return Err(StrataError::CreationRejected { level });
        }
        state.next_id += 1;
        let id = SurfaceId(state.next_id);
        state.stacks[level.ordinal()].push(SimSurface {
            id,
            rect: spec.rect,
            color: spec.color,
            visible: spec.visible,
            owner: events,
        });
        tracing::debug!(%id, %level, caption = %spec.caption, "surface created");
        Ok(CreatedSurface {
            id,
            style_actual: level,
        })
    }

    fn create_anchor(&self, events: Sender<SurfaceEvent>) -> StrataResult<SurfaceId> {
        if self.fail_anchors {
            return Err(StrataError::RootSurfaceFailure);
        }
        let mut state = self.lock();
        state.next_id += 1;
        let id = SurfaceId(state.next_id);
        state.anchors.insert(id, events);
        Ok(id)
    }

    fn set_visibility(&self, id: SurfaceId, mode: VisibilityMode) -> StrataResult<()> {
        let owner = {
            let mut state = self.lock();
            let mut owner = None;
            for stack in &mut state.stacks {
                let Some(pos) = stack.iter().position(|s| s.id == id) else {
                    continue;
                };
                match mode {
                    VisibilityMode::Hidden => stack[pos].visible = false,
                    VisibilityMode::Shown => stack[pos].visible = true,
                    VisibilityMode::ShownAsTop => {
                        let mut surface = stack.remove(pos);
                        surface.visible = true;
                        stack.push(surface);
                    }
                }
                let pos = match mode {
                    VisibilityMode::ShownAsTop => stack.len() - 1,
                    _ => pos,
                };
                owner = Some(stack[pos].owner.clone());
                break;
            }
            owner.ok_or_else(|| {
                StrataError::validation(format!("set_visibility on unknown surface {id}"))
            })?
        };
        // The owning context may already be gone at teardown; that is fine.
        let _ = owner.send(SurfaceEvent::Visibility { id, mode });
        Ok(())
    }

    fn sample_color(&self, point: Point) -> StrataResult<Color> {
        let state = self.lock();
        for level in Level::ALL.into_iter().rev() {
            for surface in state.stacks[level.ordinal()].iter().rev() {
                if surface.visible && surface.rect.contains(point) {
                    return Ok(surface.color);
                }
            }
        }
        Ok(self.background)
    }

    fn destroy_surface(&self, id: SurfaceId) -> StrataResult<()> {
        let removed = {
            let mut state = self.lock();
            if state.anchors.remove(&id).is_some() {
                return Ok(());
            }
            let mut removed = None;
            for stack in &mut state.stacks {
                if let Some(pos) = stack.iter().position(|s| s.id == id) {
                    removed = Some(stack.remove(pos));
                    break;
                }
            }
            removed
        };
        match removed {
            Some(surface) => {
                let _ = surface.owner.send(SurfaceEvent::Destroyed { id });
                Ok(())
            }
            None => Err(StrataError::validation(format!(
                "destroy of unknown surface {id}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn spec(style: Level, rect: Rect, color: u32) -> SurfaceSpec {
        SurfaceSpec {
            style,
            rect,
            color: Color(color),
            caption: "test".to_string(),
            visible: true,
        }
    }

    #[test]
    fn capacity_is_enforced() {
        let catalog = Catalog::default();
        let sim = SimCompositor::new(&catalog);
        let (tx, _rx) = unbounded();
        let cap = catalog.template_for(Level::Backdrop).capacity;
        for i in 0..cap {
            sim.create_surface(
                &spec(Level::Backdrop, Rect::new(0, 0, 100, 100), 0xFF00_0000 + i as u32),
                tx.clone(),
            )
            .unwrap();
        }
        let err = sim
            .create_surface(&spec(Level::Backdrop, Rect::new(0, 0, 100, 100), 0xFF), tx)
            .unwrap_err();
        assert!(matches!(
            err,
            StrataError::CreationRejected {
                level: Level::Backdrop
            }
        ));
        assert_eq!(sim.live_count(Level::Backdrop), cap);
    }

    #[test]
    fn higher_level_wins_the_sample() {
        let catalog = Catalog::default();
        let sim = SimCompositor::new(&catalog);
        let (tx, _rx) = unbounded();
        sim.create_surface(
            &spec(Level::Backdrop, Rect::new(0, 0, 100, 100), 0xFFFF_FF00),
            tx.clone(),
        )
        .unwrap();
        sim.create_surface(
            &spec(Level::Overlay, Rect::new(0, 0, 700, 700), 0xFF00_FF00),
            tx,
        )
        .unwrap();
        let c = sim.sample_color(Point::new(50, 50)).unwrap();
        assert_eq!(c, Color(0xFF00_FF00));
    }

    #[test]
    fn hiding_the_top_exposes_the_next_visible() {
        let catalog = Catalog::default();
        let sim = SimCompositor::new(&catalog);
        let (tx, rx) = unbounded();
        let a = sim
            .create_surface(&spec(Level::App, Rect::new(0, 0, 600, 600), 0xFF11_1111), tx.clone())
            .unwrap();
        let b = sim
            .create_surface(&spec(Level::App, Rect::new(0, 0, 603, 603), 0xFF22_2222), tx)
            .unwrap();
        assert_eq!(sim.sample_color(Point::new(10, 10)).unwrap(), Color(0xFF22_2222));

        sim.set_visibility(b.id, VisibilityMode::Hidden).unwrap();
        assert_eq!(sim.sample_color(Point::new(10, 10)).unwrap(), Color(0xFF11_1111));

        sim.set_visibility(a.id, VisibilityMode::Hidden).unwrap();
        assert_eq!(
            sim.sample_color(Point::new(10, 10)).unwrap(),
            SimCompositor::BACKGROUND
        );

        let modes: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            modes,
            vec![
                SurfaceEvent::Visibility {
                    id: b.id,
                    mode: VisibilityMode::Hidden
                },
                SurfaceEvent::Visibility {
                    id: a.id,
                    mode: VisibilityMode::Hidden
                },
            ]
        );
    }

    #[test]
    fn shown_as_top_raises_within_the_level() {
        let catalog = Catalog::default();
        let sim = SimCompositor::new(&catalog);
        let (tx, _rx) = unbounded();
        let a = sim
            .create_surface(&spec(Level::App, Rect::new(0, 0, 600, 600), 0xFF11_1111), tx.clone())
            .unwrap();
        let _b = sim
            .create_surface(&spec(Level::App, Rect::new(0, 0, 603, 603), 0xFF22_2222), tx)
            .unwrap();
        sim.set_visibility(a.id, VisibilityMode::ShownAsTop).unwrap();
        assert_eq!(sim.sample_color(Point::new(10, 10)).unwrap(), Color(0xFF11_1111));
    }

    #[test]
    fn coercion_reassigns_the_effective_level() {
        let catalog = Catalog::default();
        let sim = SimCompositor::new(&catalog).coerce_style(Level::Dock, Level::Panel);
        let (tx, _rx) = unbounded();
        let created = sim
            .create_surface(&spec(Level::Dock, Rect::new(0, 0, 300, 300), 0xFF33_3333), tx)
            .unwrap();
        assert_eq!(created.style_actual, Level::Panel);
        assert_eq!(sim.live_count(Level::Panel), 1);
        assert_eq!(sim.live_count(Level::Dock), 0);
    }

    #[test]
    fn failed_anchor_is_root_surface_failure() {
        let catalog = Catalog::default();
        let sim = SimCompositor::new(&catalog).fail_anchors();
        let (tx, _rx) = unbounded();
        assert!(matches!(
            sim.create_anchor(tx),
            Err(StrataError::RootSurfaceFailure)
        ));
    }

    #[test]
    fn destroy_notifies_the_owner_and_frees_capacity() {
        let catalog = Catalog::default();
        let sim = SimCompositor::new(&catalog);
        let (tx, rx) = unbounded();
        let created = sim
            .create_surface(&spec(Level::Dock, Rect::new(0, 0, 300, 300), 0xFF44_4444), tx)
            .unwrap();
        sim.destroy_surface(created.id).unwrap();
        assert_eq!(sim.live_count(Level::Dock), 0);
        assert_eq!(
            rx.try_recv().unwrap(),
            SurfaceEvent::Destroyed { id: created.id }
        );
    }
}
