use std::fmt::Display;

use futures::task::SpawnError;

/// Errors raised while building, mounting or reconciling components.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A component factory refused to build a child.
    #[error("component factory failed: {0}")]
    Factory(String),

    /// A child component failed to render into its host node.
    #[error("component render failed: {0}")]
    Render(String),

    #[error("index {index} is out of range for {len} live children")]
    IndexOutOfRange { index: usize, len: usize },

    /// A factory produced a deferred component but nothing can poll it.
    #[error("a deferred component was built but no spawner is configured")]
    NoSpawner,

    #[error("failed to spawn deferred component build: {0}")]
    Spawn(#[from] SpawnError),

    #[error("view is not rendered")]
    NotRendered,
}

impl Error {
    pub fn factory(msg: impl Display) -> Self {
        Error::Factory(msg.to_string())
    }

    pub fn render(msg: impl Display) -> Self {
        Error::Render(msg.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
