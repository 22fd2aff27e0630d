use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to open embedding index: {0}")]
    Index(#[source] anyhow::Error),

    #[error("Failed to open conversation memory store: {0}")]
    Memory(#[source] anyhow::Error),
}
