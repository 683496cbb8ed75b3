//! Worker contexts: one independent concurrent unit per stacking level.
//!
//! A worker obtains its level (explicit configuration at spawn, either fixed
//! or handed out by a shared assigner), creates its anchor surface, populates
//! the level to one past its capacity so the platform's rejection path is
//! exercised exactly once, then sits in its event loop translating platform
//! notifications into coordinator messages until the quit broadcast.
//!
//! Workers never touch a layer registry; every registry mutation flows
//! through the coordinator's channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::{
    catalog::{Catalog, Level},
    compositor::Compositor,
    error::StrataError,
    factory::SurfaceFactory,
    messages::{StatusNote, SurfaceEvent, WorkerId, WorkerMsg},
    surface::{SurfaceId, VisibilityMode},
};

/// Monotonic level handout shared by all threaded-mode workers. May run past
/// the catalog's range; the worker reports that as an invalid level.
#[derive(Clone, Debug, Default)]
pub struct LevelAssigner(Arc<AtomicUsize>);

impl LevelAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// How a worker learns its level: queried from the shared assigner (threaded
/// mode) or fixed at spawn (process mode, workers started in layer order).
#[derive(Clone, Debug)]
pub enum Assignment {
    Fixed(Level),
    Next(LevelAssigner),
}

impl Assignment {
    fn resolve(&self) -> Result<Level, usize> {
        match self {
            Assignment::Fixed(level) => Ok(*level),
            Assignment::Next(assigner) => {
                let ordinal = assigner.next();
                Level::from_ordinal(ordinal).ok_or(ordinal)
            }
        }
    }
}

pub struct WorkerHandle {
    pub id: WorkerId,
    /// The worker's mailbox sender: the compositor delivers surface events
    /// here, and the coordinator injects the quit broadcast.
    pub events_tx: Sender<SurfaceEvent>,
    pub join: JoinHandle<()>,
}

pub struct WorkerContext {
    id: WorkerId,
    coord_tx: Sender<WorkerMsg>,
    events_tx: Sender<SurfaceEvent>,
    events_rx: Receiver<SurfaceEvent>,
    compositor: Arc<dyn Compositor>,
    factory: SurfaceFactory,
    /// Levels of the surfaces this context created, keyed by handle, so
    /// platform notifications can be translated without a registry lookup.
    owned: HashMap<SurfaceId, Level>,
    anchor: Option<SurfaceId>,
}

impl WorkerContext {
    pub fn new(
        id: WorkerId,
        catalog: Catalog,
        seed: u64,
        coord_tx: Sender<WorkerMsg>,
        compositor: Arc<dyn Compositor>,
    ) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            id,
            coord_tx,
            events_tx,
            events_rx,
            compositor,
            factory: SurfaceFactory::new(catalog, seed),
            owned: HashMap::new(),
            anchor: None,
        }
    }

    pub fn events_tx(&self) -> Sender<SurfaceEvent> {
        self.events_tx.clone()
    }

    fn status(&self, note: StatusNote) {
        let _ = self.coord_tx.send(WorkerMsg::Status {
            worker: self.id,
            note,
        });
    }

    /// The full worker lifecycle, run on the worker's own thread.
    pub fn run(mut self, assignment: Assignment) {
        let level = match assignment.resolve() {
            Ok(level) => level,
            Err(ordinal) => {
                tracing::error!(worker = %self.id, ordinal, "bad level assignment");
                self.status(StatusNote::InvalidLevel { ordinal });
                return;
            }
        };

        match self.compositor.create_anchor(self.events_tx.clone()) {
            Ok(anchor) => self.anchor = Some(anchor),
            Err(err) => {
                tracing::error!(worker = %self.id, %level, %err, "anchor creation failed");
                self.status(StatusNote::RootSurfaceFailure);
                return;
            }
        }

        let (created, rejected) = self.populate(level);
        self.status(StatusNote::PopulationDone {
            level,
            created,
            rejected,
        });

        self.event_loop();

        if let Some(anchor) = self.anchor.take() {
            let _ = self.compositor.destroy_surface(anchor);
        }
        self.status(StatusNote::Quitting);
        tracing::debug!(worker = %self.id, %level, "worker done");
    }

    /// Create `capacity + 1` surfaces; the one-past-capacity attempt must be
    /// rejected by the platform and is reported as a status, not an error.
    pub fn populate(&mut self, level: Level) -> (usize, usize) {
        let capacity = self.factory.catalog().template_for(level).capacity;
        let mut created = 0usize;
        let mut rejected = 0usize;

        for seq in 0..=capacity {
            match self
                .factory
                .create(level, seq, self.compositor.as_ref(), self.events_tx.clone())
            {
                Ok(record) => {
                    self.owned.insert(record.id, record.level_actual);
                    created += 1;
                    let _ = self.coord_tx.send(WorkerMsg::Created {
                        worker: self.id,
                        record,
                    });
                }
                Err(StrataError::CreationRejected { level }) => {
                    rejected += 1;
                    self.status(StatusNote::CreationRejected { level });
                }
                Err(err) => {
                    tracing::error!(worker = %self.id, %level, seq, %err, "creation failed");
                    rejected += 1;
                    self.status(StatusNote::CreationRejected { level });
                }
            }
        }
        (created, rejected)
    }

    fn event_loop(&mut self) {
        while let Ok(event) = self.events_rx.recv() {
            match event {
                SurfaceEvent::Visibility { id, mode } => self.forward_visibility(id, mode),
                SurfaceEvent::Destroyed { id } => {
                    if let Some(level) = self.owned.remove(&id) {
                        let _ = self.coord_tx.send(WorkerMsg::Destroyed { level, id });
                    }
                }
                SurfaceEvent::Quit => break,
            }
        }
    }

    fn forward_visibility(&mut self, id: SurfaceId, mode: VisibilityMode) {
        let Some(&level) = self.owned.get(&id) else {
            tracing::warn!(worker = %self.id, %id, "visibility event for unowned surface");
            return;
        };
        let msg = match mode {
            VisibilityMode::Hidden => WorkerMsg::Hidden { level, id },
            VisibilityMode::Shown => WorkerMsg::Shown { level, id },
            VisibilityMode::ShownAsTop => WorkerMsg::Promoted { level, id },
        };
        let _ = self.coord_tx.send(msg);
    }
}

pub fn spawn_worker(
    id: WorkerId,
    assignment: Assignment,
    catalog: Catalog,
    seed: u64,
    coord_tx: Sender<WorkerMsg>,
    compositor: Arc<dyn Compositor>,
) -> std::io::Result<WorkerHandle> {
    let ctx = WorkerContext::new(id, catalog, seed, coord_tx, compositor);
    let events_tx = ctx.events_tx();
    let join = std::thread::Builder::new()
        .name(format!("strata-worker-{}", id.0))
        .spawn(move || ctx.run(assignment))?;
    Ok(WorkerHandle {
        id,
        events_tx,
        join,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::SimCompositor;

    #[test]
    fn assigner_hands_out_levels_in_order_then_runs_out() {
        let assigner = LevelAssigner::new();
        for level in Level::ALL {
            assert_eq!(
                Assignment::Next(assigner.clone()).resolve(),
                Ok(level)
            );
        }
        assert_eq!(Assignment::Next(assigner).resolve(), Err(7));
    }

    #[test]
    fn worker_reports_invalid_level_and_stops() {
        let catalog = Catalog::default();
        let compositor = Arc::new(SimCompositor::new(&catalog));
        let (tx, rx) = unbounded();
        let assigner = LevelAssigner::new();
        for _ in 0..Level::ALL.len() {
            assigner.next();
        }

        let ctx = WorkerContext::new(WorkerId(0), catalog, 1, tx, compositor);
        ctx.run(Assignment::Next(assigner));

        let msgs: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            msgs,
            vec![WorkerMsg::Status {
                worker: WorkerId(0),
                note: StatusNote::InvalidLevel { ordinal: 7 }
            }]
        );
    }

    #[test]
    fn worker_reports_root_surface_failure() {
        let catalog = Catalog::default();
        let compositor = Arc::new(SimCompositor::new(&catalog).fail_anchors());
        let (tx, rx) = unbounded();

        let ctx = WorkerContext::new(WorkerId(3), catalog, 1, tx, compositor);
        ctx.run(Assignment::Fixed(Level::Dock));

        let msgs: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            msgs,
            vec![WorkerMsg::Status {
                worker: WorkerId(3),
                note: StatusNote::RootSurfaceFailure
            }]
        );
    }

    #[test]
    fn populate_creates_capacity_and_reports_one_rejection() {
        let catalog = Catalog::default();
        let cap = catalog.template_for(Level::Dock).capacity;
        let compositor = Arc::new(SimCompositor::new(&catalog));
        let (tx, rx) = unbounded();

        let mut ctx = WorkerContext::new(WorkerId(1), catalog, 1, tx, compositor);
        let (created, rejected) = ctx.populate(Level::Dock);
        assert_eq!(created, cap);
        assert_eq!(rejected, 1);

        let msgs: Vec<_> = rx.try_iter().collect();
        let created_msgs = msgs
            .iter()
            .filter(|m| matches!(m, WorkerMsg::Created { .. }))
            .count();
        let rejected_msgs = msgs
            .iter()
            .filter(|m| {
                matches!(
                    m,
                    WorkerMsg::Status {
                        note: StatusNote::CreationRejected { level: Level::Dock },
                        ..
                    }
                )
            })
            .count();
        assert_eq!(created_msgs, cap);
        assert_eq!(rejected_msgs, 1);
    }

    #[test]
    fn full_run_ends_with_population_done_then_quitting() {
        let catalog = Catalog::default();
        let cap = catalog.template_for(Level::Backdrop).capacity;
        let compositor = Arc::new(SimCompositor::new(&catalog));
        let (tx, rx) = unbounded();

        let handle = spawn_worker(
            WorkerId(0),
            Assignment::Fixed(Level::Backdrop),
            catalog,
            9,
            tx,
            compositor.clone(),
        )
        .unwrap();

        // Wait for population, then quit.
        let mut saw_population_done = false;
        while let Ok(msg) = rx.recv() {
            if let WorkerMsg::Status {
                note: StatusNote::PopulationDone { created, rejected, .. },
                ..
            } = msg
            {
                assert_eq!(created, cap);
                assert_eq!(rejected, 1);
                saw_population_done = true;
                break;
            }
        }
        assert!(saw_population_done);

        handle.events_tx.send(SurfaceEvent::Quit).unwrap();
        handle.join.join().unwrap();

        let tail: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            tail.last(),
            Some(&WorkerMsg::Status {
                worker: WorkerId(0),
                note: StatusNote::Quitting
            })
        );
        // The anchor was released; only the level's surfaces remain.
        assert_eq!(compositor.live_total(), cap);
    }
}
