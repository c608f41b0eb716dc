//! muscutrack - Personal strength-training tracker
//!
//! Cyclic program scheduling with skips, per-set load logging and
//! progression statistics.

pub mod db;
pub mod error;
pub mod migrate;
pub mod program;
pub mod schedule;
pub mod state;
pub mod stats;

pub use db::Database;
pub use error::{CoreError, CoreResult};
pub use program::ProgramDefinition;
pub use state::AppState;
