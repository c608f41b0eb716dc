//! App state - the whole persisted blob and the actions that mutate it

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::migrate::{self, reconcile_exercise_keys};
use crate::program::ProgramDefinition;
use crate::schedule::{ScheduleState, cycle_day};

/// Upper bound accepted for any weight input (kg)
pub const MAX_WEIGHT_KG: f64 = 500.0;

/// Exercise identifier inside a weight or skip key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseRef {
    Name(String),
    /// Legacy: position within the day's program rows
    Index(usize),
}

impl ExerciseRef {
    pub fn name(&self) -> Option<&str> {
        match self {
            ExerciseRef::Name(name) => Some(name),
            ExerciseRef::Index(_) => None,
        }
    }
}

/// One logged set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetWeight {
    pub exercise: ExerciseRef,
    pub set_index: u32,
    pub weight: f64,
}

impl SetWeight {
    pub fn new(exercise: &str, set_index: u32, weight: f64) -> Self {
        Self {
            exercise: ExerciseRef::Name(exercise.to_string()),
            set_index,
            weight,
        }
    }
}

/// Committed log for one calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(alias = "workout_type")]
    pub workout_label: String,
    /// Frozen at commit time; later schedule edits do not rewrite it
    #[serde(alias = "day_number")]
    pub absolute_day: u32,
    #[serde(alias = "weights", default, deserialize_with = "migrate::deserialize_set_weights")]
    pub sets: Vec<SetWeight>,
    pub timestamp: NaiveDateTime,
}

impl Session {
    /// Positive weights logged for an exercise
    pub fn weights_for(&self, exercise: &str) -> Vec<f64> {
        self.sets
            .iter()
            .filter(|s| s.exercise.name() == Some(exercise) && s.weight > 0.0)
            .map(|s| s.weight)
            .collect()
    }

    /// Positive sets grouped by exercise, ordered by set index
    pub fn exercise_sets(&self) -> BTreeMap<&str, Vec<(u32, f64)>> {
        let mut grouped: BTreeMap<&str, Vec<(u32, f64)>> = BTreeMap::new();
        for set in &self.sets {
            if set.weight <= 0.0 {
                continue;
            }
            if let Some(name) = set.exercise.name() {
                grouped.entry(name).or_default().push((set.set_index, set.weight));
            }
        }
        for sets in grouped.values_mut() {
            sets.sort_by_key(|(idx, _)| *idx);
        }
        grouped
    }

    /// Sum over exercises of (sum of weights × number of sets)
    pub fn total_volume(&self) -> f64 {
        self.exercise_sets()
            .values()
            .map(|sets| {
                let sum: f64 = sets.iter().map(|(_, w)| w).sum();
                sum * sets.len() as f64
            })
            .sum()
    }
}

/// Per-date, per-exercise skip marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipFlag {
    pub date: NaiveDate,
    pub exercise: ExerciseRef,
    pub skipped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightGoal {
    pub target_weight: Option<f64>,
    pub target_date: Option<NaiveDate>,
}

/// Outcome of the load-time migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MigrationReport {
    pub migrated: bool,
    pub dropped: usize,
}

/// Whole persisted state for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PersistedState")]
pub struct AppState {
    #[serde(flatten)]
    pub schedule: ScheduleState,
    pub skip_flags: Vec<SkipFlag>,
    pub history: BTreeMap<NaiveDate, Session>,
    pub body_weight: BTreeMap<NaiveDate, f64>,
    pub weight_goal: WeightGoal,
}

/// Blob shape accepted on load, including field names of older versions
#[derive(Deserialize)]
struct PersistedState {
    start_date: NaiveDate,
    #[serde(default, alias = "skipped_days")]
    skipped_dates: BTreeSet<NaiveDate>,
    #[serde(
        default,
        alias = "skipped_exercises",
        deserialize_with = "migrate::deserialize_skip_flags"
    )]
    skip_flags: Vec<SkipFlag>,
    #[serde(default)]
    history: BTreeMap<NaiveDate, Session>,
    #[serde(default, alias = "body_weight_history")]
    body_weight: BTreeMap<NaiveDate, f64>,
    #[serde(default)]
    weight_goal: WeightGoal,
}

impl From<PersistedState> for AppState {
    fn from(stored: PersistedState) -> Self {
        Self {
            schedule: ScheduleState {
                start_date: stored.start_date,
                skipped_dates: stored.skipped_dates,
            },
            skip_flags: stored.skip_flags,
            history: stored.history,
            body_weight: stored.body_weight,
            weight_goal: stored.weight_goal,
        }
    }
}

impl AppState {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            schedule: ScheduleState::new(start_date),
            skip_flags: Vec::new(),
            history: BTreeMap::new(),
            body_weight: BTreeMap::new(),
            weight_goal: WeightGoal::default(),
        }
    }

    /// Rewrite legacy exercise keys against the current program
    pub fn migrate(&mut self, program: &ProgramDefinition) -> CoreResult<MigrationReport> {
        let result = reconcile_exercise_keys(
            std::mem::take(&mut self.history),
            std::mem::take(&mut self.skip_flags),
            program,
            &self.schedule,
        )?;
        self.history = result.history;
        self.skip_flags = result.skip_flags;
        Ok(MigrationReport {
            migrated: result.migrated,
            dropped: result.dropped,
        })
    }

    pub fn is_exercise_skipped(&self, date: NaiveDate, exercise: &str) -> bool {
        self.skip_flags
            .iter()
            .any(|f| f.date == date && f.skipped && f.exercise.name() == Some(exercise))
    }

    pub fn set_exercise_skipped(&mut self, date: NaiveDate, exercise: &str, skipped: bool) -> CoreResult<()> {
        let exercise = validate_exercise_name(exercise)?;
        match self
            .skip_flags
            .iter_mut()
            .find(|f| f.date == date && f.exercise.name() == Some(exercise))
        {
            Some(flag) => flag.skipped = skipped,
            None => self.skip_flags.push(SkipFlag {
                date,
                exercise: ExerciseRef::Name(exercise.to_string()),
                skipped,
            }),
        }
        Ok(())
    }

    /// Commit (or overwrite) the log for `date`
    ///
    /// The absolute day is taken from the current schedule and frozen in the
    /// session. Skipped exercises and non-positive weights are left out.
    pub fn commit_session(
        &mut self,
        date: NaiveDate,
        program: &ProgramDefinition,
        entered: &[SetWeight],
        now: NaiveDateTime,
    ) -> CoreResult<&Session> {
        let absolute_day = self.schedule.day_for(date);
        let cycle = cycle_day(absolute_day, program.length())?;
        if program.is_rest_day(cycle)? {
            return Err(CoreError::InputValidation(format!("{} is a rest day", date)));
        }
        let workout_label = program.workout_label(cycle)?.to_string();

        let mut sets = Vec::with_capacity(entered.len());
        for set in entered {
            let name = set.exercise.name().ok_or_else(|| {
                CoreError::InputValidation("weights must reference exercises by name".into())
            })?;
            let name = validate_exercise_name(name)?;
            let row = program.find_row(cycle, name)?.ok_or_else(|| {
                CoreError::InputValidation(format!("'{}' is not part of day {}", name, cycle))
            })?;
            if set.set_index >= row.set_count {
                return Err(CoreError::InputValidation(format!(
                    "'{}' has {} sets, got set {}",
                    name,
                    row.set_count,
                    set.set_index + 1
                )));
            }
            let weight = validate_weight(set.weight)?;

            if weight > 0.0 && !self.is_exercise_skipped(date, name) {
                sets.push(SetWeight::new(name, set.set_index, weight));
            }
        }

        debug!(%date, absolute_day, sets = sets.len(), "committing session");
        self.history.insert(
            date,
            Session {
                workout_label,
                absolute_day,
                sets,
                timestamp: now,
            },
        );
        Ok(&self.history[&date])
    }

    /// Replace one exercise's sets for `date` and commit the day
    ///
    /// Other exercises already logged that date are kept as long as the
    /// date still maps onto the same program day.
    pub fn log_exercise(
        &mut self,
        date: NaiveDate,
        program: &ProgramDefinition,
        exercise: &str,
        weights: &[f64],
        now: NaiveDateTime,
    ) -> CoreResult<&Session> {
        let exercise = validate_exercise_name(exercise)?;
        let absolute_day = self.schedule.day_for(date);

        let mut entered: Vec<SetWeight> = self
            .history
            .get(&date)
            .filter(|s| s.absolute_day == absolute_day)
            .map(|s| {
                s.sets
                    .iter()
                    .filter(|set| set.exercise.name() != Some(exercise))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        entered.extend(
            weights
                .iter()
                .enumerate()
                .map(|(idx, w)| SetWeight::new(exercise, idx as u32, *w)),
        );

        self.commit_session(date, program, &entered, now)
    }

    pub fn delete_session(&mut self, date: NaiveDate) -> bool {
        self.history.remove(&date).is_some()
    }

    pub fn record_body_weight(&mut self, date: NaiveDate, kg: f64) -> CoreResult<()> {
        let kg = validate_body_weight(kg)?;
        self.body_weight.insert(date, kg);
        Ok(())
    }

    pub fn remove_body_weight(&mut self, date: NaiveDate) -> bool {
        self.body_weight.remove(&date).is_some()
    }

    pub fn set_goal(&mut self, target_weight: Option<f64>, target_date: Option<NaiveDate>) -> CoreResult<()> {
        let target_weight = target_weight.map(validate_body_weight).transpose()?;
        self.weight_goal = WeightGoal {
            target_weight,
            target_date,
        };
        Ok(())
    }

    /// Wipe everything and restart the program today
    pub fn reset(&mut self, today: NaiveDate) {
        info!(%today, "resetting all training data");
        *self = Self::new(today);
    }
}

/// Set weight: finite, 0..=500 kg (0 means not performed)
pub fn validate_weight(kg: f64) -> CoreResult<f64> {
    if !kg.is_finite() || !(0.0..=MAX_WEIGHT_KG).contains(&kg) {
        return Err(CoreError::InputValidation(format!(
            "weight {} kg is outside 0-{} kg",
            kg, MAX_WEIGHT_KG
        )));
    }
    Ok(kg)
}

/// Body weight: finite, strictly positive, at most 500 kg
pub fn validate_body_weight(kg: f64) -> CoreResult<f64> {
    if !kg.is_finite() || kg <= 0.0 || kg > MAX_WEIGHT_KG {
        return Err(CoreError::InputValidation(format!(
            "body weight {} kg is outside 0-{} kg",
            kg, MAX_WEIGHT_KG
        )));
    }
    Ok(kg)
}

pub fn validate_exercise_name(name: &str) -> CoreResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::InputValidation("exercise name is empty".into()));
    }
    Ok(name)
}
