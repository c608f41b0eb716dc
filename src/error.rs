//! Error kinds produced by the scheduling and statistics core

use thiserror::Error;

/// Core error type
///
/// Dropped or unresolvable history entries are not errors: they are
/// counted by the migration pass and logged as warnings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Program is missing or malformed; no sensible day can be shown
    #[error("program configuration error: {0}")]
    Configuration(String),

    /// Rejected user input (weights, names, dates)
    #[error("invalid input: {0}")]
    InputValidation(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
