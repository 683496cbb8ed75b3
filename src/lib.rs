#![forbid(unsafe_code)]

pub mod catalog;
pub mod compositor;
pub mod coordinator;
pub mod core;
pub mod error;
pub mod factory;
pub mod harness;
pub mod messages;
pub mod registry;
pub mod surface;
pub mod verify;
pub mod wire;
pub mod worker;

pub use catalog::{Catalog, LayerTemplate, Level, LEVEL_COUNT};
pub use compositor::{Compositor, CreatedSurface, SimCompositor, SurfaceSpec};
pub use coordinator::Coordinator;
pub use core::{Color, Point, Rect, SizeDelta};
pub use error::{StrataError, StrataResult};
pub use factory::SurfaceFactory;
pub use harness::{HarnessConfig, IterationReport, SpawnMode};
pub use messages::{StatusNote, SurfaceEvent, WorkerId, WorkerMsg};
pub use registry::{LayerRegistry, RegistrySet};
pub use surface::{SurfaceId, SurfaceRecord, VisibilityMode};
pub use worker::{Assignment, LevelAssigner, WorkerContext};
