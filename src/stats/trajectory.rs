//! Body-weight trajectory vs. a dated goal
//!
//! Trend is an ordinary least-squares fit (linfa) of weight against days
//! since the first reading. The ideal line runs straight from the first
//! reading to the goal.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use tracing::debug;

use crate::state::WeightGoal;

/// Readings required before a trend is fitted
const MIN_TREND_POINTS: usize = 2;

/// Deviations below this are treated as exactly on the ideal line
const ON_TRACK_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceState {
    Ahead,
    Behind,
    OnTrack,
}

impl PaceState {
    pub fn label(&self) -> &'static str {
        match self {
            PaceState::Ahead => "ahead",
            PaceState::Behind => "behind",
            PaceState::OnTrack => "on track",
        }
    }
}

/// Where today's weight sits relative to the ideal line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalStatus {
    pub state: PaceState,
    pub ideal_weight: f64,
    /// Absolute distance from the ideal weight (kg)
    pub deviation: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTrajectory {
    pub current_weight: Option<f64>,
    /// Fitted values at each recorded date
    pub trend_points: Vec<WeightPoint>,
    /// Fitted slope in kg per week
    pub weekly_trend: Option<f64>,
    /// Start and goal endpoints
    pub ideal_points: Vec<WeightPoint>,
    /// kg per week still needed to reach the goal on time
    pub pacing: Option<f64>,
    pub status: Option<GoalStatus>,
}

/// Fit weight = slope * days + intercept
fn fit_trend(days: &[f64], weights: &[f64]) -> Option<(f64, f64)> {
    if days.len() < MIN_TREND_POINTS {
        return None;
    }

    let records = Array2::from_shape_vec((days.len(), 1), days.to_vec()).ok()?;
    let targets = Array1::from_vec(weights.to_vec());
    let dataset = Dataset::new(records, targets);

    let model = LinearRegression::default().fit(&dataset).ok()?;
    let slope = model.params()[0];
    let intercept = model.intercept();

    Some((slope, intercept))
}

/// Trend, ideal line, pacing and ahead/behind status as of `today`
pub fn weight_trajectory(
    history: &BTreeMap<NaiveDate, f64>,
    goal: &WeightGoal,
    today: NaiveDate,
) -> WeightTrajectory {
    let (Some((&first_date, &start_weight)), Some((_, &current_weight))) =
        (history.first_key_value(), history.last_key_value())
    else {
        return WeightTrajectory::default();
    };

    let days: Vec<f64> = history
        .keys()
        .map(|d| (*d - first_date).num_days() as f64)
        .collect();
    let weights: Vec<f64> = history.values().copied().collect();

    let mut trajectory = WeightTrajectory {
        current_weight: Some(current_weight),
        ..Default::default()
    };

    if let Some((slope, intercept)) = fit_trend(&days, &weights) {
        debug!(slope, intercept, points = days.len(), "body weight trend fitted");
        trajectory.weekly_trend = Some(slope * 7.0);
        trajectory.trend_points = history
            .keys()
            .zip(&days)
            .map(|(date, x)| WeightPoint {
                date: *date,
                weight: slope * x + intercept,
            })
            .collect();
    }

    let (Some(target_weight), Some(target_date)) = (goal.target_weight, goal.target_date) else {
        return trajectory;
    };

    if target_date > today {
        let weeks_remaining = (target_date - today).num_days() as f64 / 7.0;
        trajectory.pacing = Some((target_weight - current_weight) / weeks_remaining);
    }

    let total_days = (target_date - first_date).num_days();
    if total_days <= 0 {
        return trajectory;
    }

    trajectory.ideal_points = vec![
        WeightPoint { date: first_date, weight: start_weight },
        WeightPoint { date: target_date, weight: target_weight },
    ];

    let days_passed = (today - first_date).num_days();
    let fraction = (days_passed as f64 / total_days as f64).clamp(0.0, 1.0);
    let ideal_weight = start_weight + (target_weight - start_weight) * fraction;
    let diff = current_weight - ideal_weight;

    let state = if diff.abs() < ON_TRACK_EPSILON {
        PaceState::OnTrack
    } else if target_weight < start_weight {
        if diff < 0.0 { PaceState::Ahead } else { PaceState::Behind }
    } else if target_weight > start_weight {
        if diff > 0.0 { PaceState::Ahead } else { PaceState::Behind }
    } else {
        // Maintenance goal: any drift is behind
        PaceState::Behind
    };

    trajectory.status = Some(GoalStatus {
        state,
        ideal_weight,
        deviation: diff.abs(),
    });

    trajectory
}

impl WeightTrajectory {
    pub fn format(&self) -> String {
        let Some(current) = self.current_weight else {
            return "No body weight recorded".to_string();
        };

        let mut lines = vec![format!("Current weight: {:.1} kg", current)];

        if let Some(trend) = self.weekly_trend {
            lines.push(format!("Trend: {:+.2} kg/week", trend));
        }
        if let Some(pacing) = self.pacing {
            lines.push(format!("Required pace: {:+.2} kg/week", pacing));
        }
        if let Some(status) = &self.status {
            lines.push(format!(
                "Status: {} ({:.1} kg from ideal {:.1} kg)",
                status.state.label(),
                status.deviation,
                status.ideal_weight
            ));
        }

        lines.join("\n")
    }
}
