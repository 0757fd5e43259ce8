use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the draw core.
///
/// None of these are retried automatically by the engine itself; only the
/// persisted ledger retries version conflicts before surfacing `Concurrency`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed configuration input, rejected before anything is applied.
    #[error("{0}")]
    Validation(String),

    /// A product that looks playable has nothing to draw.
    #[error("product {product_id} cannot be drawn: {reason}")]
    Configuration { product_id: i64, reason: String },

    /// Ledger update kept losing the version race.
    #[error("ledger update conflicted {attempts} times")]
    Concurrency { attempts: u32 },
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }
}
