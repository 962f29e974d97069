use trident_engine::world::error::WorldError;

/// Errors surfaced by the server layer.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("command name or alias already registered: {0}")]
    DuplicateCommand(String),
    #[error("world already exists: {0}")]
    WorldExists(String),
    #[error("no such world: {0}")]
    UnknownWorld(String),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("level data: {0:#}")]
    Level(anyhow::Error),
}

impl ServerError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
