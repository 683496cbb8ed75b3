//! The iteration driver: builds fresh registries, spawns the worker
//! contexts, pumps the coordinator until population completes, runs the
//! verification pass, then broadcasts quit and tears everything down.
//! Iterations are independent; all per-run state lives here, not in the
//! catalog.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::unbounded;

use crate::{
    catalog::{Catalog, Level, LEVEL_COUNT},
    compositor::{Compositor, SimCompositor},
    coordinator::Coordinator,
    core::{Color, Point},
    error::{StrataError, StrataResult},
    messages::{StatusNote, SurfaceEvent, WorkerId, WorkerMsg},
    verify::{self, VerifyReport},
    wire::WireBridge,
    worker::{spawn_worker, Assignment, LevelAssigner, WorkerContext},
};

pub const DEFAULT_ITERATIONS: u32 = 10;
/// Used when the requested iteration count is negative.
pub const FALLBACK_ITERATIONS: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SpawnMode {
    /// One worker thread per level, dynamic level handout.
    Threaded,
    /// Process-style coordination: fixed level per worker, spawned in layer
    /// order, coordinator-bound messages carried as JSON lines over an
    /// anonymous pipe per worker.
    Process,
}

#[derive(Clone, Debug)]
pub struct HarnessConfig {
    pub mode: SpawnMode,
    pub iterations: u32,
    pub seed: u64,
    /// Bound on how long the coordinator waits for stragglers in each
    /// receive loop.
    pub grace: Duration,
    pub sample_points: Vec<Point>,
    pub background: Color,
    /// Set when the platform is expected to coerce styles, so layer
    /// mismatches are tolerated instead of graded as failures.
    pub mismatches_expected: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            mode: SpawnMode::Threaded,
            iterations: DEFAULT_ITERATIONS,
            seed: 0,
            grace: Duration::from_secs(5),
            sample_points: verify::default_sample_points(),
            background: SimCompositor::BACKGROUND,
            mismatches_expected: false,
        }
    }
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct IterationReport {
    pub created: [usize; LEVEL_COUNT],
    pub rejected: [usize; LEVEL_COUNT],
    pub total_created: usize,
    pub released: usize,
    pub verify: VerifyReport,
}

impl IterationReport {
    pub fn passed(&self) -> bool {
        self.verify.passed()
    }
}

fn worker_seed(seed: u64, iteration: u32, worker: u32) -> u64 {
    seed.wrapping_add(u64::from(iteration).wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(u64::from(worker).wrapping_mul(0xBF58_476D_1CE4_E5B9))
}

/// One full population/verification/teardown cycle.
///
/// The coordinator is itself the worker context for the first level: it
/// populates inline through the same message channel before entering its
/// receive loop, then spawns one worker per remaining level.
#[tracing::instrument(skip(config, catalog, compositor))]
pub fn run_iteration(
    config: &HarnessConfig,
    catalog: &Catalog,
    compositor: &Arc<dyn Compositor>,
    iteration: u32,
) -> StrataResult<IterationReport> {
    let (coord_tx, coord_rx) = unbounded();
    let mut coordinator = Coordinator::new();

    let mut inline = WorkerContext::new(
        WorkerId(0),
        catalog.clone(),
        worker_seed(config.seed, iteration, 0),
        coord_tx.clone(),
        compositor.clone(),
    );

    // The coordinator's own root surface. Losing it is fatal for the whole
    // iteration.
    let anchor = compositor.create_anchor(inline.events_tx())?;

    let assigner = LevelAssigner::new();
    let first_level = match config.mode {
        SpawnMode::Threaded => {
            let ordinal = assigner.next();
            Level::from_ordinal(ordinal).ok_or(StrataError::InvalidLevel { ordinal })?
        }
        SpawnMode::Process => Level::ALL[0],
    };
    let (created, rejected) = inline.populate(first_level);
    let _ = coord_tx.send(WorkerMsg::Status {
        worker: WorkerId(0),
        note: StatusNote::PopulationDone {
            level: first_level,
            created,
            rejected,
        },
    });

    let mut handles = Vec::new();
    let mut bridges = Vec::new();
    for (ordinal, level) in Level::ALL.into_iter().enumerate().skip(1) {
        let assignment = match config.mode {
            SpawnMode::Threaded => Assignment::Next(assigner.clone()),
            SpawnMode::Process => Assignment::Fixed(level),
        };
        // In process mode each worker speaks the wire protocol; its messages
        // reach the coordinator only by surviving the encode/decode trip.
        let worker_tx = match config.mode {
            SpawnMode::Threaded => coord_tx.clone(),
            SpawnMode::Process => {
                let (tx, bridge) = WireBridge::new(coord_tx.clone())?;
                bridges.push(bridge);
                tx
            }
        };
        let worker = WorkerId(ordinal as u32);
        let handle = spawn_worker(
            worker,
            assignment,
            catalog.clone(),
            worker_seed(config.seed, iteration, worker.0),
            worker_tx,
            compositor.clone(),
        )
        .map_err(|e| StrataError::Other(anyhow::Error::from(e)))?;
        handles.push(handle);
    }

    let contexts = 1 + handles.len();
    if let Err(err) = coordinator.wait_population(&coord_rx, contexts, config.grace) {
        tracing::warn!(%err, "population incomplete, grading what arrived");
    }

    let report = verify::grade(
        &coordinator,
        compositor.as_ref(),
        catalog,
        &config.sample_points,
        config.background,
        config.mismatches_expected,
    )?;

    for handle in &handles {
        let _ = handle.events_tx.send(SurfaceEvent::Quit);
    }
    if let Err(err) = coordinator.wait_quit(&coord_rx, handles.len(), config.grace) {
        tracing::warn!(%err, "quit acknowledgements incomplete");
    }
    for handle in handles {
        if handle.join.join().is_err() {
            tracing::error!(worker = %handle.id, "worker thread panicked");
        }
    }
    // Workers are gone, so the encode side has hit EOF.
    for bridge in bridges {
        bridge.join();
    }

    let created = Level::ALL.map(|l| coordinator.registries().level(l).created());
    let rejected = Level::ALL.map(|l| coordinator.rejected(l));
    let total_created: usize = created.iter().sum();

    let released = coordinator.shutdown(compositor.as_ref());
    let _ = compositor.destroy_surface(anchor);

    tracing::info!(
        iteration,
        total_created,
        released,
        passed = report.passed(),
        "iteration finished"
    );

    Ok(IterationReport {
        created,
        rejected,
        total_created,
        released,
        verify: report,
    })
}

/// Run `config.iterations` independent cycles. A fatal setup failure (the
/// coordinator's own root surface) aborts the run.
pub fn run(
    config: &HarnessConfig,
    catalog: &Catalog,
    compositor: Arc<dyn Compositor>,
) -> StrataResult<Vec<IterationReport>> {
    let mut reports = Vec::with_capacity(config.iterations as usize);
    for iteration in 0..config.iterations {
        tracing::info!(iteration, "starting iteration");
        let report = run_iteration(config, catalog, &compositor, iteration)?;
        if !report.passed() {
            tracing::warn!(iteration, "iteration failed verification");
        }
        reports.push(report);
    }
    Ok(reports)
}
