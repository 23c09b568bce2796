use thiserror::Error;

/// Shared error type used across all coinbridge crates.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// No balance record exists for the network; a block notification seeds it.
    #[error("No hot wallet balance recorded for network {0}")]
    BalanceNotSeeded(String),

    #[error(transparent)]
    Other(#[from] eyre::Error),
}
