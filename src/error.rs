// 🚨 Error taxonomy for the toll pipeline
// Business outcomes (charged / insufficient / not found) are NOT errors;
// see engine::TransactionOutcome.

use thiserror::Error;

/// Result type alias for pipeline and ledger operations
pub type Result<T> = std::result::Result<T, TollError>;

#[derive(Error, Debug)]
pub enum TollError {
    /// Transport payload could not be turned into pixel data
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The recognizer capability could not be invoked or failed internally
    #[error("recognition unavailable: {0}")]
    RecognitionUnavailable(String),

    /// The ledger could not be reached or a transaction could not commit
    #[error("ledger store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    /// Toll or deduction amount that can never be charged
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Provisioning record rejected before it reached the ledger
    #[error("invalid vehicle record: {0}")]
    InvalidRecord(String),
}

impl TollError {
    /// Stable snake_case tag used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            TollError::MalformedInput(_) => "malformed_input",
            TollError::RecognitionUnavailable(_) => "recognition_unavailable",
            TollError::StoreUnavailable(_) => "store_unavailable",
            TollError::InvalidAmount(_) => "invalid_amount",
            TollError::InvalidRecord(_) => "invalid_record",
        }
    }
}
