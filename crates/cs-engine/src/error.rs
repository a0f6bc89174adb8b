//! Error types for the CharaSpin engine

use thiserror::Error;

/// Core error type
///
/// Only session startup can fail. Spin-time resource denials are ordinary
/// values (`SpinGate::Denied`), and relocation/swap fallbacks degrade to
/// flagged no-ops rather than errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("symbol pool too small: {got} symbols after blacklist, need at least {min}")]
    PoolTooSmall { got: usize, min: usize },

    #[error("roster unavailable: {0}")]
    RosterUnavailable(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias
pub type EngineResult<T> = Result<T, EngineError>;
