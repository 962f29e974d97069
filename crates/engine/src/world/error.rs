use super::position::ChunkPos;

/// Boxed error returned by storage and generation collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by world operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to load chunk {pos}")]
    ChunkLoad {
        pos: ChunkPos,
        #[source]
        source: BoxError,
    },
    #[error("failed to generate chunk {pos}")]
    Generation {
        pos: ChunkPos,
        #[source]
        source: BoxError,
    },
    #[error("failed to save {chunks} chunks")]
    Save {
        chunks: usize,
        #[source]
        source: BoxError,
    },
}

impl WorldError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
