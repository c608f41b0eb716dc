//! Per-exercise progression: previous/record loads and the charting series

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::CoreResult;
use crate::program::ProgramDefinition;
use crate::schedule::cycle_day;
use crate::state::Session;

/// Loads seen before a given date
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExerciseStats {
    /// Max weight of the latest qualifying session
    pub last_max: Option<f64>,
    pub all_time_max: Option<f64>,
}

impl ExerciseStats {
    /// Last session matched the all-time best
    pub fn is_record(&self) -> bool {
        matches!((self.last_max, self.all_time_max), (Some(last), Some(best)) if last >= best)
    }

    pub fn format(&self) -> String {
        match (self.last_max, self.all_time_max) {
            (Some(last), Some(best)) => {
                let marker = if self.is_record() { " (record)" } else { "" };
                format!("Last: {:.1} kg | Best: {:.1} kg{}", last, best, marker)
            }
            _ => "No previous data".to_string(),
        }
    }
}

/// One charted date for an exercise
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub max_weight: f64,
    pub avg_weight: f64,
    /// sum of weights × number of sets (reps are free text)
    pub total_volume: f64,
}

/// Positive weights for `exercise` in a session whose program day lists it
fn session_weights(
    exercise: &str,
    session: &Session,
    program: &ProgramDefinition,
) -> CoreResult<Option<Vec<f64>>> {
    let cycle = cycle_day(session.absolute_day, program.length())?;
    if program.find_row(cycle, exercise)?.is_none() {
        return Ok(None);
    }
    let weights = session.weights_for(exercise);
    Ok((!weights.is_empty()).then_some(weights))
}

fn max_of(weights: &[f64]) -> f64 {
    weights.iter().copied().fold(f64::MIN, f64::max)
}

/// Previous and all-time max load, using only sessions strictly before `as_of`
pub fn exercise_stats(
    exercise: &str,
    history: &BTreeMap<NaiveDate, Session>,
    program: &ProgramDefinition,
    as_of: NaiveDate,
) -> CoreResult<ExerciseStats> {
    let mut stats = ExerciseStats::default();

    for session in history.range(..as_of).map(|(_, s)| s) {
        let Some(weights) = session_weights(exercise, session, program)? else {
            continue;
        };
        let session_max = max_of(&weights);
        stats.last_max = Some(session_max);
        stats.all_time_max = Some(stats.all_time_max.map_or(session_max, |m| m.max(session_max)));
    }

    Ok(stats)
}

/// Date-ordered max/avg/volume for every session that logged `exercise`
pub fn exercise_series(
    exercise: &str,
    history: &BTreeMap<NaiveDate, Session>,
    program: &ProgramDefinition,
) -> CoreResult<Vec<SeriesPoint>> {
    let mut series = Vec::new();

    for (date, session) in history {
        let Some(weights) = session_weights(exercise, session, program)? else {
            continue;
        };
        let sum: f64 = weights.iter().sum();
        let count = weights.len() as f64;
        series.push(SeriesPoint {
            date: *date,
            max_weight: max_of(&weights),
            avg_weight: sum / count,
            total_volume: sum * count,
        });
    }

    Ok(series)
}

/// Percent change from the first to the last max weight
pub fn progression(series: &[SeriesPoint]) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }
    let first = series.first()?.max_weight;
    let last = series.last()?.max_weight;
    if first == 0.0 {
        return None;
    }
    Some((last - first) / first * 100.0)
}

/// Recap of an exercise series
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSummary {
    pub personal_record: f64,
    /// Mean of the per-session averages
    pub average_weight: f64,
    pub progression: Option<f64>,
    pub sessions: usize,
}

impl ExerciseSummary {
    pub fn from_series(series: &[SeriesPoint]) -> Option<Self> {
        if series.is_empty() {
            return None;
        }
        let personal_record = series.iter().map(|p| p.max_weight).fold(f64::MIN, f64::max);
        let average_weight = series.iter().map(|p| p.avg_weight).sum::<f64>() / series.len() as f64;

        Some(Self {
            personal_record,
            average_weight,
            progression: progression(series),
            sessions: series.len(),
        })
    }

    pub fn format(&self) -> String {
        let progression = self
            .progression
            .map(|p| format!("{:+.1}%", p))
            .unwrap_or_else(|| "N/A".to_string());
        format!(
            "Personal record: {:.1} kg\nAverage load: {:.1} kg\nProgression: {}\nSessions: {}",
            self.personal_record, self.average_weight, progression, self.sessions
        )
    }
}
