//! Statistics engine - progression, volume and body-weight trajectory
//!
//! Features:
//! - Previous/record load per exercise (strictly before a date)
//! - Per-date max/avg/volume series and progression percentage
//! - Volume by training category
//! - Body-weight trend vs. goal using linear regression (linfa)

pub mod exercise;
pub mod trajectory;
pub mod volume;

pub use exercise::{ExerciseStats, ExerciseSummary, SeriesPoint, exercise_series, exercise_stats, progression};
pub use trajectory::{GoalStatus, PaceState, WeightPoint, WeightTrajectory, weight_trajectory};
pub use volume::{CategoryVolume, category_volume, format_volume_report};
