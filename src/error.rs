use crate::catalog::Level;
use crate::surface::SurfaceId;

pub type StrataResult<T> = Result<T, StrataError>;

#[derive(thiserror::Error, Debug)]
pub enum StrataError {
    #[error("duplicate handle {id} in level {level}")]
    DuplicateHandle { id: SurfaceId, level: Level },

    #[error("handle {id} not found in level {level}")]
    HandleNotFound { id: SurfaceId, level: Level },

    #[error("invalid level ordinal {ordinal}")]
    InvalidLevel { ordinal: usize },

    #[error("surface creation rejected in level {level} (capacity reached)")]
    CreationRejected { level: Level },

    #[error("failed to create root/anchor surface")]
    RootSurfaceFailure,

    #[error("timed out waiting for {pending} worker(s)")]
    WorkerTimeout { pending: usize },

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrataError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
