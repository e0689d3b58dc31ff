use thiserror::Error;

/// Every way an interaction can be rejected.
///
/// A rejected interaction leaves the snapshot untouched, so these errors never
/// describe partial progress.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Insufficient funds: {address} needs {needed} but holds {available}")]
    InsufficientFunds {
        address: String,
        needed: f64,
        available: f64,
    },
    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),
    #[error("State conflict: {0}")]
    StateConflict(String),
    #[error("Jury formation error: only {available} impartial jurors, at least {required} needed")]
    JuryFormation { available: usize, required: usize },
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub fn insufficient(address: &str, needed: f64, available: f64) -> Self {
        LedgerError::InsufficientFunds {
            address: address.to_string(),
            needed,
            available,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
