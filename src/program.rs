//! Program definition - the cyclic day → exercise → sets table

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Workout label used for rest days
pub const REST_LABEL: &str = "Repos";

/// One prescribed exercise on one cycle day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRow {
    #[serde(rename = "Jour", alias = "day")]
    pub cycle_day: u32,
    #[serde(rename = "Type", alias = "label")]
    pub workout_label: String,
    #[serde(rename = "Exercice", alias = "exercise")]
    pub exercise_name: String,
    #[serde(rename = "Séries", alias = "sets")]
    pub set_count: u32,
    #[serde(rename = "Répétitions (RPE)", alias = "reps")]
    pub rep_spec: String,
    #[serde(rename = "Notes", alias = "notes", default)]
    pub notes: Option<String>,
}

/// Training category derived from a workout label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Push,
    Pull,
    Legs,
    Other,
}

impl Category {
    /// Case-sensitive token match: "PUSH #1" → Push, "LEG day" → Legs
    pub fn classify(label: &str) -> Self {
        if label.contains("PUSH") {
            Category::Push
        } else if label.contains("PULL") {
            Category::Pull
        } else if label.contains("LEG") {
            // also covers "LEGS"
            Category::Legs
        } else {
            Category::Other
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::Push => "PUSH",
            Category::Pull => "PULL",
            Category::Legs => "LEGS",
            Category::Other => "Other",
        }
    }
}

/// Validated program: rows grouped by cycle day, every day 1..=length present
#[derive(Debug, Clone)]
pub struct ProgramDefinition {
    /// All rows in file order; legacy positional keys index into this
    rows: Vec<ProgramRow>,
    days: BTreeMap<u32, Vec<ProgramRow>>,
    length: u32,
}

impl ProgramDefinition {
    pub fn new(rows: Vec<ProgramRow>) -> CoreResult<Self> {
        if rows.is_empty() {
            return Err(CoreError::Configuration("program has no rows".into()));
        }

        for row in &rows {
            if row.cycle_day == 0 {
                return Err(CoreError::Configuration(format!(
                    "exercise '{}' has cycle day 0 (days start at 1)",
                    row.exercise_name
                )));
            }
            if row.set_count == 0 {
                return Err(CoreError::Configuration(format!(
                    "exercise '{}' on day {} has no sets",
                    row.exercise_name, row.cycle_day
                )));
            }
        }

        let program = Self::assemble(rows);
        if let Some(missing) = (1..=program.length).find(|d| !program.days.contains_key(d)) {
            return Err(CoreError::Configuration(format!(
                "no program rows for day {} (program has {} days)",
                missing, program.length
            )));
        }

        Ok(program)
    }

    /// Load program from CSV (`Jour,Type,Exercice,Séries,Répétitions (RPE),Notes`)
    pub fn from_csv_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let rows = rdr
            .deserialize::<ProgramRow>()
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(rows)?)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("cannot open program {}", path.display()))?;
        Self::from_csv_reader(file).with_context(|| format!("invalid program {}", path.display()))
    }

    /// Built-in push/pull/legs week
    pub fn builtin() -> Self {
        let rows = DEFAULT_PROGRAM
            .iter()
            .map(|d| ProgramRow {
                cycle_day: d.day,
                workout_label: d.label.to_string(),
                exercise_name: d.exercise.to_string(),
                set_count: d.sets,
                rep_spec: d.reps.to_string(),
                notes: d.notes.map(str::to_string),
            })
            .collect();

        Self::assemble(rows)
    }

    /// Group rows by day; length is the highest day present
    fn assemble(rows: Vec<ProgramRow>) -> Self {
        let mut days: BTreeMap<u32, Vec<ProgramRow>> = BTreeMap::new();
        for row in &rows {
            days.entry(row.cycle_day).or_default().push(row.clone());
        }
        let length = days.keys().next_back().copied().unwrap_or(0);
        Self { rows, days, length }
    }

    /// Number of days in one cycle (max cycle day)
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Row by its position in the whole program table
    pub fn row_at(&self, index: usize) -> Option<&ProgramRow> {
        self.rows.get(index)
    }

    /// Rows for a cycle day, in file order
    pub fn rows_for_day(&self, cycle_day: u32) -> CoreResult<&[ProgramRow]> {
        self.days
            .get(&cycle_day)
            .map(Vec::as_slice)
            .ok_or_else(|| CoreError::Configuration(format!("no program rows for day {}", cycle_day)))
    }

    pub fn workout_label(&self, cycle_day: u32) -> CoreResult<&str> {
        let rows = self.rows_for_day(cycle_day)?;
        Ok(rows.first().map(|r| r.workout_label.as_str()).unwrap_or(REST_LABEL))
    }

    pub fn is_rest_day(&self, cycle_day: u32) -> CoreResult<bool> {
        Ok(is_rest_label(self.workout_label(cycle_day)?))
    }

    /// Find a row by exercise name within a cycle day
    pub fn find_row(&self, cycle_day: u32, exercise_name: &str) -> CoreResult<Option<&ProgramRow>> {
        Ok(self
            .rows_for_day(cycle_day)?
            .iter()
            .find(|r| r.exercise_name == exercise_name))
    }

    /// Unique trained exercise names, in order of first appearance
    pub fn exercise_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            if is_rest_label(&row.workout_label) {
                continue;
            }
            if !names.contains(&row.exercise_name.as_str()) {
                names.push(&row.exercise_name);
            }
        }
        names
    }
}

pub fn is_rest_label(label: &str) -> bool {
    label.eq_ignore_ascii_case(REST_LABEL) || label.eq_ignore_ascii_case("rest")
}

struct RowDef {
    day: u32,
    label: &'static str,
    exercise: &'static str,
    sets: u32,
    reps: &'static str,
    notes: Option<&'static str>,
}

/// Default 7-day program (rest on day 4)
const DEFAULT_PROGRAM: &[RowDef] = &[
    // Day 1
    RowDef { day: 1, label: "PUSH #1", exercise: "Développé couché", sets: 4, reps: "6-8 (RPE 8)", notes: None },
    RowDef { day: 1, label: "PUSH #1", exercise: "Développé militaire", sets: 3, reps: "8-10 (RPE 8)", notes: None },
    RowDef { day: 1, label: "PUSH #1", exercise: "Dips", sets: 3, reps: "10-12 (RPE 9)", notes: Some("Lest si > 12 reps") },
    // Day 2
    RowDef { day: 2, label: "PULL #1", exercise: "Tractions", sets: 4, reps: "6-8 (RPE 8)", notes: None },
    RowDef { day: 2, label: "PULL #1", exercise: "Rowing barre", sets: 3, reps: "8-10 (RPE 8)", notes: None },
    RowDef { day: 2, label: "PULL #1", exercise: "Curl biceps", sets: 3, reps: "10-12 (RPE 9)", notes: None },
    // Day 3
    RowDef { day: 3, label: "LEGS #1", exercise: "Squat", sets: 4, reps: "6-8 (RPE 8)", notes: None },
    RowDef { day: 3, label: "LEGS #1", exercise: "Soulevé de terre roumain", sets: 3, reps: "8-10 (RPE 8)", notes: None },
    RowDef { day: 3, label: "LEGS #1", exercise: "Mollets debout", sets: 3, reps: "12-15 (RPE 9)", notes: None },
    // Day 4
    RowDef { day: 4, label: REST_LABEL, exercise: REST_LABEL, sets: 1, reps: "-", notes: Some("Récupération active") },
    // Day 5
    RowDef { day: 5, label: "PUSH #2", exercise: "Développé incliné haltères", sets: 4, reps: "8-10 (RPE 8)", notes: None },
    RowDef { day: 5, label: "PUSH #2", exercise: "Élévations latérales", sets: 3, reps: "12-15 (RPE 9)", notes: None },
    RowDef { day: 5, label: "PUSH #2", exercise: "Extensions triceps", sets: 3, reps: "10-12 (RPE 9)", notes: None },
    // Day 6
    RowDef { day: 6, label: "PULL #2", exercise: "Tirage vertical", sets: 4, reps: "8-10 (RPE 8)", notes: None },
    RowDef { day: 6, label: "PULL #2", exercise: "Rowing haltère", sets: 3, reps: "10-12 (RPE 8)", notes: None },
    RowDef { day: 6, label: "PULL #2", exercise: "Curl marteau", sets: 3, reps: "10-12 (RPE 9)", notes: None },
    // Day 7
    RowDef { day: 7, label: "LEGS #2", exercise: "Presse à cuisses", sets: 4, reps: "10-12 (RPE 8)", notes: None },
    RowDef { day: 7, label: "LEGS #2", exercise: "Fentes bulgares", sets: 3, reps: "8-10 (RPE 8)", notes: Some("Par jambe") },
    RowDef { day: 7, label: "LEGS #2", exercise: "Leg curl", sets: 3, reps: "12-15 (RPE 9)", notes: None },
];
