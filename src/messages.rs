//! The message protocol between worker contexts, the compositor's
//! notification path, and the coordinator. Everything a worker tells the
//! coordinator, lifecycle events and error/status conditions alike, rides
//! [`WorkerMsg`], so the coordinator has a single ingestion point.
//!
//! All coordinator-bound messages are serde-serializable; the process-mode
//! transport encodes them as JSON lines (see [`crate::wire`]).

use crate::{
    catalog::Level,
    surface::{SurfaceId, SurfaceRecord, VisibilityMode},
};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct WorkerId(pub u32);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Worker context -> coordinator. FIFO per sender; no ordering across
/// senders.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WorkerMsg {
    Created {
        worker: WorkerId,
        record: SurfaceRecord,
    },
    Shown {
        level: Level,
        id: SurfaceId,
    },
    Hidden {
        level: Level,
        id: SurfaceId,
    },
    Promoted {
        level: Level,
        id: SurfaceId,
    },
    Destroyed {
        level: Level,
        id: SurfaceId,
    },
    Status {
        worker: WorkerId,
        note: StatusNote,
    },
}

/// Error/status conditions, delivered on the same channel as lifecycle
/// events.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StatusNote {
    /// The worker obtained an out-of-range level ordinal and terminated
    /// without populating.
    InvalidLevel { ordinal: usize },
    /// The worker failed to create its root/anchor surface.
    RootSurfaceFailure,
    /// The platform rejected a creation attempt (capacity reached). Expected
    /// exactly once per level: the deliberate overflow probe.
    CreationRejected { level: Level },
    /// Population finished; the verification pass may run once every worker
    /// has reported this.
    PopulationDone {
        level: Level,
        created: usize,
        rejected: usize,
    },
    /// The worker honored the quit broadcast and is exiting.
    Quitting,
}

/// Compositor/coordinator -> owning worker context mailbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Asynchronous notification that a surface's visibility changed.
    Visibility { id: SurfaceId, mode: VisibilityMode },
    /// The surface was destroyed.
    Destroyed { id: SurfaceId },
    /// Quit broadcast from the coordinator.
    Quit,
}
