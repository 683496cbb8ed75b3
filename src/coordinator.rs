//! The single consumer of all worker messages and the only writer of the
//! layer registries. Registry-level failures (duplicate handle, handle not
//! found) indicate one bad event, not systemic failure: they are logged with
//! the identifying handle and level, the operation is skipped, and the loop
//! continues.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::{
    catalog::{Level, LEVEL_COUNT},
    compositor::Compositor,
    error::{StrataError, StrataResult},
    messages::{StatusNote, WorkerId, WorkerMsg},
    registry::RegistrySet,
    surface::SurfaceId,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Mismatch {
    pub id: SurfaceId,
    pub expected: Level,
    pub actual: Level,
}

#[derive(Debug, Default)]
pub struct Coordinator {
    registries: RegistrySet,
    rejected: [usize; LEVEL_COUNT],
    mismatches: Vec<Mismatch>,
    invalid_levels: Vec<usize>,
    root_failures: usize,
    registry_faults: usize,
    timeouts: usize,
    populated: BTreeSet<WorkerId>,
    failed: BTreeSet<WorkerId>,
    quit: BTreeSet<WorkerId>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registries(&self) -> &RegistrySet {
        &self.registries
    }

    pub fn rejected(&self, level: Level) -> usize {
        self.rejected[level.ordinal()]
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }

    pub fn invalid_levels(&self) -> &[usize] {
        &self.invalid_levels
    }

    pub fn root_failures(&self) -> usize {
        self.root_failures
    }

    /// Duplicate-insert and missing-handle events observed and skipped.
    pub fn registry_faults(&self) -> usize {
        self.registry_faults
    }

    pub fn timeouts(&self) -> usize {
        self.timeouts
    }

    /// Apply one message to the registries and tallies.
    pub fn handle(&mut self, msg: WorkerMsg) {
        match msg {
            WorkerMsg::Created { worker, record } => {
                if let Some(level) = self.registries.level_of(record.id) {
                    tracing::error!(
                        %worker, id = %record.id, %level,
                        "handle already tracked in another registry"
                    );
                    self.registry_faults += 1;
                    return;
                }
                if record.mismatched() {
                    self.mismatches.push(Mismatch {
                        id: record.id,
                        expected: record.level_expected,
                        actual: record.level_actual,
                    });
                }
                if let Err(err) = self.registries.insert(record) {
                    tracing::error!(%worker, %err, "insert skipped");
                    self.registry_faults += 1;
                }
            }
            WorkerMsg::Shown { level, id } => {
                if let Err(err) = self.registries.set_visibility(level, id, true) {
                    tracing::error!(%err, "show skipped");
                    self.registry_faults += 1;
                }
            }
            WorkerMsg::Hidden { level, id } => {
                if let Err(err) = self.registries.set_visibility(level, id, false) {
                    tracing::error!(%err, "hide skipped");
                    self.registry_faults += 1;
                }
            }
            WorkerMsg::Promoted { level, id } => {
                if let Err(err) = self.registries.promote_to_top(level, id, true) {
                    tracing::error!(%err, "promote skipped");
                    self.registry_faults += 1;
                }
            }
            WorkerMsg::Destroyed { level, id } => {
                if let Err(err) = self.registries.remove(level, id) {
                    tracing::error!(%err, "remove skipped");
                    self.registry_faults += 1;
                }
            }
            WorkerMsg::Status { worker, note } => self.handle_status(worker, note),
        }
    }

    fn handle_status(&mut self, worker: WorkerId, note: StatusNote) {
        match note {
            StatusNote::InvalidLevel { ordinal } => {
                tracing::error!(%worker, ordinal, "worker got an invalid level");
                self.invalid_levels.push(ordinal);
                self.failed.insert(worker);
            }
            StatusNote::RootSurfaceFailure => {
                tracing::error!(%worker, "worker lost its root surface");
                self.root_failures += 1;
                self.failed.insert(worker);
            }
            StatusNote::CreationRejected { level } => {
                tracing::info!(%worker, %level, "creation rejected");
                self.rejected[level.ordinal()] += 1;
            }
            StatusNote::PopulationDone {
                level,
                created,
                rejected,
            } => {
                tracing::info!(%worker, %level, created, rejected, "population done");
                self.populated.insert(worker);
            }
            StatusNote::Quitting => {
                tracing::debug!(%worker, "worker quitting");
                self.quit.insert(worker);
            }
        }
    }

    fn finished_populating(&self) -> usize {
        self.populated.union(&self.failed).count()
    }

    /// Pump messages until every one of `workers` contexts has either
    /// finished populating or failed terminally, or the grace period runs
    /// out.
    pub fn wait_population(
        &mut self,
        rx: &Receiver<WorkerMsg>,
        workers: usize,
        grace: Duration,
    ) -> StrataResult<()> {
        self.pump_until(rx, grace, workers, |c| c.finished_populating())
    }

    /// Pump messages until every live worker has acknowledged the quit
    /// broadcast, or the grace period runs out.
    pub fn wait_quit(
        &mut self,
        rx: &Receiver<WorkerMsg>,
        workers: usize,
        grace: Duration,
    ) -> StrataResult<()> {
        self.pump_until(rx, grace, workers, |c| c.quit.union(&c.failed).count())
    }

    fn pump_until(
        &mut self,
        rx: &Receiver<WorkerMsg>,
        grace: Duration,
        workers: usize,
        finished: impl Fn(&Self) -> usize,
    ) -> StrataResult<()> {
        let deadline = Instant::now() + grace;
        while finished(self) < workers {
            match rx.recv_deadline(deadline) {
                Ok(msg) => self.handle(msg),
                Err(_) => {
                    let pending = workers - finished(self);
                    self.timeouts += 1;
                    tracing::warn!(pending, "grace period elapsed with workers still pending");
                    return Err(StrataError::WorkerTimeout { pending });
                }
            }
        }
        Ok(())
    }

    /// Drain every registry unconditionally and release the tracked
    /// surfaces. Returns the number of records released.
    pub fn shutdown(&mut self, compositor: &dyn Compositor) -> usize {
        let drained = self.registries.drain_all();
        let released = drained.len();
        for record in drained {
            if let Err(err) = compositor.destroy_surface(record.id) {
                tracing::warn!(id = %record.id, %err, "destroy at shutdown failed");
            }
        }
        tracing::info!(released, "registries drained");
        released
    }
}
