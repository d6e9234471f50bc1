use std::path::PathBuf;

use crate::FrameShape;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InterpError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("model not found: {}", path.display())]
    ModelNotFound { path: PathBuf },

    #[error("failed to load model from {}: {source:#}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("frame shape mismatch: {first} vs {second}")]
    ShapeMismatch {
        first: FrameShape,
        second: FrameShape,
    },

    #[error("interpolation kernel failed: {0:#}")]
    Compute(#[source] anyhow::Error),

    #[error("fast-path cache is stale: {0}")]
    StaleCache(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("timestep {0} is outside [0, 1]")]
    InvalidTimestep(f32),
}

impl InterpError {
    /// True for errors raised before an engine exists.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_) | Self::ModelNotFound { .. } | Self::ModelLoad { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, InterpError>;
