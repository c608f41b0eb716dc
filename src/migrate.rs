//! Key migration - legacy string keys and positional exercise identifiers
//!
//! Older blobs stored set weights as `"<date>_<exercise>_<set>"` strings,
//! where `<exercise>` was first a row index into the whole program table
//! and later the exercise name (which may itself contain `_`). Those keys are
//! parsed into structured [`SetWeight`]s while deserializing; positional
//! references are then rewritten to names by [`reconcile_exercise_keys`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};

use crate::error::CoreResult;
use crate::program::ProgramDefinition;
use crate::schedule::{ScheduleState, cycle_day};
use crate::state::{ExerciseRef, Session, SetWeight, SkipFlag};

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub history: BTreeMap<NaiveDate, Session>,
    pub skip_flags: Vec<SkipFlag>,
    /// True when anything was rewritten or dropped
    pub migrated: bool,
    /// Entries that no longer resolve against the program
    pub dropped: usize,
}

/// Rewrite every positional exercise reference to its name
///
/// A positional reference is a row index into the whole program table and
/// only resolves when that row belongs to the entry's cycle day. Weights
/// use the cycle day frozen in their session. Skip flags use the session of
/// the same date when there is one, otherwise the day the current schedule
/// gives that date. Unresolvable or duplicate entries are dropped and
/// counted, never fatal.
pub fn reconcile_exercise_keys(
    history: BTreeMap<NaiveDate, Session>,
    skip_flags: Vec<SkipFlag>,
    program: &ProgramDefinition,
    schedule: &ScheduleState,
) -> CoreResult<Reconciliation> {
    let mut migrated = false;
    let mut dropped = 0;

    let mut new_history = BTreeMap::new();
    for (date, mut session) in history {
        let cycle = cycle_day(session.absolute_day, program.length())?;

        let mut seen: BTreeSet<(String, u32)> = BTreeSet::new();
        let mut sets = Vec::with_capacity(session.sets.len());

        for set in session.sets {
            let Some(name) = resolve(&set.exercise, program, cycle) else {
                warn!(%date, exercise = ?set.exercise, set = set.set_index, "dropping weight that no longer resolves");
                dropped += 1;
                migrated = true;
                continue;
            };
            if !seen.insert((name.clone(), set.set_index)) {
                warn!(%date, exercise = %name, set = set.set_index, "dropping duplicate weight entry");
                dropped += 1;
                migrated = true;
                continue;
            }
            if !matches!(set.exercise, ExerciseRef::Name(_)) {
                migrated = true;
            }
            sets.push(SetWeight {
                exercise: ExerciseRef::Name(name),
                ..set
            });
        }

        session.sets = sets;
        new_history.insert(date, session);
    }

    let mut seen: BTreeSet<(NaiveDate, String)> = BTreeSet::new();
    let mut new_flags = Vec::with_capacity(skip_flags.len());
    for flag in skip_flags {
        let absolute_day = new_history
            .get(&flag.date)
            .map(|s| s.absolute_day)
            .unwrap_or_else(|| schedule.day_for(flag.date));
        let cycle = cycle_day(absolute_day, program.length())?;

        let Some(name) = resolve(&flag.exercise, program, cycle) else {
            warn!(date = %flag.date, exercise = ?flag.exercise, "dropping skip flag that no longer resolves");
            dropped += 1;
            migrated = true;
            continue;
        };
        if !seen.insert((flag.date, name.clone())) {
            warn!(date = %flag.date, exercise = %name, "dropping duplicate skip flag");
            dropped += 1;
            migrated = true;
            continue;
        }
        if !matches!(flag.exercise, ExerciseRef::Name(_)) {
            migrated = true;
        }
        new_flags.push(SkipFlag {
            exercise: ExerciseRef::Name(name),
            ..flag
        });
    }

    if migrated {
        info!(dropped, "exercise keys reconciled");
    } else {
        debug!("exercise keys already nominal");
    }

    Ok(Reconciliation {
        history: new_history,
        skip_flags: new_flags,
        migrated,
        dropped,
    })
}

fn resolve(exercise: &ExerciseRef, program: &ProgramDefinition, cycle: u32) -> Option<String> {
    match exercise {
        ExerciseRef::Name(name) => Some(name.clone()),
        ExerciseRef::Index(idx) => program
            .row_at(*idx)
            .filter(|row| row.cycle_day == cycle)
            .map(|row| row.exercise_name.clone()),
    }
}

/// Exercise identifier from a legacy key: all digits means a row index
fn legacy_ref(identifier: &str) -> ExerciseRef {
    if identifier.bytes().all(|b| b.is_ascii_digit())
        && let Ok(idx) = identifier.parse::<usize>()
    {
        return ExerciseRef::Index(idx);
    }
    ExerciseRef::Name(identifier.to_string())
}

/// Parse `"<date>_<exercise>_<set>"`; the exercise part may contain `_`
pub fn parse_legacy_weight_key(key: &str) -> Option<(ExerciseRef, u32)> {
    let parts: Vec<&str> = key.split('_').collect();
    if parts.len() < 3 {
        return None;
    }
    let set_index = parts.last()?.parse::<u32>().ok()?;
    let identifier = parts[1..parts.len() - 1].join("_");
    if identifier.is_empty() {
        return None;
    }
    Some((legacy_ref(&identifier), set_index))
}

/// Parse `"<date>_<exercise>"`
pub fn parse_legacy_skip_key(key: &str) -> Option<(NaiveDate, ExerciseRef)> {
    let (date, identifier) = key.split_once('_')?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    if identifier.is_empty() {
        return None;
    }
    Some((date, legacy_ref(identifier)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SetWeightsRepr {
    Structured(Vec<SetWeight>),
    Legacy(BTreeMap<String, f64>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SkipFlagsRepr {
    Structured(Vec<SkipFlag>),
    Legacy(BTreeMap<String, bool>),
}

pub(crate) fn deserialize_set_weights<'de, D>(deserializer: D) -> Result<Vec<SetWeight>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match SetWeightsRepr::deserialize(deserializer)? {
        SetWeightsRepr::Structured(sets) => sets,
        SetWeightsRepr::Legacy(map) => map
            .into_iter()
            .filter_map(|(key, weight)| match parse_legacy_weight_key(&key) {
                Some((exercise, set_index)) => Some(SetWeight {
                    exercise,
                    set_index,
                    weight,
                }),
                None => {
                    warn!(%key, "dropping unparseable legacy weight key");
                    None
                }
            })
            .collect(),
    })
}

pub(crate) fn deserialize_skip_flags<'de, D>(deserializer: D) -> Result<Vec<SkipFlag>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match SkipFlagsRepr::deserialize(deserializer)? {
        SkipFlagsRepr::Structured(flags) => flags,
        SkipFlagsRepr::Legacy(map) => map
            .into_iter()
            .filter_map(|(key, skipped)| match parse_legacy_skip_key(&key) {
                Some((date, exercise)) => Some(SkipFlag {
                    date,
                    exercise,
                    skipped,
                }),
                None => {
                    warn!(%key, "dropping unparseable legacy skip key");
                    None
                }
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::tests::row;
    use chrono::NaiveDateTime;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn program() -> ProgramDefinition {
        ProgramDefinition::new(vec![
            row(1, "PUSH", "Bench", 3),
            row(1, "PUSH", "Dips_Weighted", 3),
            row(2, "PULL", "Row", 3),
        ])
        .unwrap()
    }

    fn session(day: u32, sets: Vec<SetWeight>) -> Session {
        Session {
            workout_label: "PUSH".into(),
            absolute_day: day,
            sets,
            timestamp: NaiveDateTime::default(),
        }
    }

    fn set(exercise: ExerciseRef, set_index: u32, weight: f64) -> SetWeight {
        SetWeight { exercise, set_index, weight }
    }

    #[test]
    fn test_parse_positional_key() {
        assert_eq!(
            parse_legacy_weight_key("2024-01-01_0_2"),
            Some((ExerciseRef::Index(0), 2))
        );
    }

    #[test]
    fn test_parse_nominal_key_with_separators() {
        assert_eq!(
            parse_legacy_weight_key("2024-01-01_Dips_Weighted_1"),
            Some((ExerciseRef::Name("Dips_Weighted".into()), 1))
        );
    }

    #[test]
    fn test_parse_bad_keys() {
        assert_eq!(parse_legacy_weight_key("2024-01-01_0"), None);
        assert_eq!(parse_legacy_weight_key("2024-01-01_Bench_x"), None);
        assert_eq!(parse_legacy_skip_key("garbage"), None);
        assert_eq!(
            parse_legacy_skip_key("2024-01-03_Dips_Weighted"),
            Some((date("2024-01-03"), ExerciseRef::Name("Dips_Weighted".into())))
        );
    }

    #[test]
    fn test_positional_keys_resolve_to_names() {
        let mut history = BTreeMap::new();
        history.insert(
            date("2024-01-01"),
            session(1, vec![set(ExerciseRef::Index(1), 0, 20.0)]),
        );
        // Day 9 of a 2-day program → cycle day 1
        history.insert(
            date("2024-01-09"),
            session(9, vec![set(ExerciseRef::Index(0), 0, 60.0)]),
        );

        let result = reconcile_exercise_keys(
            history,
            vec![],
            &program(),
            &ScheduleState::new(date("2024-01-01")),
        )
        .unwrap();

        assert!(result.migrated);
        assert_eq!(result.dropped, 0);
        assert_eq!(
            result.history[&date("2024-01-01")].sets[0].exercise,
            ExerciseRef::Name("Dips_Weighted".into())
        );
        assert_eq!(
            result.history[&date("2024-01-09")].sets[0].exercise,
            ExerciseRef::Name("Bench".into())
        );
    }

    #[test]
    fn test_index_counts_rows_of_earlier_days() {
        let mut history = BTreeMap::new();
        // Row is the third row of the table, the first of day 2
        history.insert(
            date("2024-01-02"),
            session(2, vec![set(ExerciseRef::Index(2), 1, 45.0)]),
        );
        let flags = vec![SkipFlag {
            date: date("2024-01-04"),
            exercise: ExerciseRef::Index(2),
            skipped: true,
        }];

        let result = reconcile_exercise_keys(
            history,
            flags,
            &program(),
            &ScheduleState::new(date("2024-01-01")),
        )
        .unwrap();

        assert_eq!(result.dropped, 0);
        assert_eq!(
            result.history[&date("2024-01-02")].sets,
            vec![set(ExerciseRef::Name("Row".into()), 1, 45.0)]
        );
        // 2024-01-04 is day 4, cycle day 2
        assert_eq!(result.skip_flags[0].exercise, ExerciseRef::Name("Row".into()));
    }

    #[test]
    fn test_unresolvable_index_is_dropped() {
        let mut history = BTreeMap::new();
        history.insert(
            date("2024-01-02"),
            session(
                2,
                vec![
                    set(ExerciseRef::Index(0), 0, 50.0),
                    set(ExerciseRef::Index(2), 0, 50.0),
                    set(ExerciseRef::Index(5), 0, 50.0),
                ],
            ),
        );

        let result = reconcile_exercise_keys(
            history,
            vec![],
            &program(),
            &ScheduleState::new(date("2024-01-01")),
        )
        .unwrap();

        // Index 0 is a day-1 row, index 5 is past the table
        assert_eq!(result.dropped, 2);
        let sets = &result.history[&date("2024-01-02")].sets;
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].exercise, ExerciseRef::Name("Row".into()));
    }

    #[test]
    fn test_skip_flags_use_schedule_without_session() {
        let mut schedule = ScheduleState::new(date("2024-01-01"));
        schedule.skip(date("2024-01-01"));
        let flags = vec![SkipFlag {
            date: date("2024-01-02"),
            exercise: ExerciseRef::Index(0),
            skipped: true,
        }];

        let result = reconcile_exercise_keys(BTreeMap::new(), flags, &program(), &schedule).unwrap();
        // 2024-01-02 slides back to day 1 because 2024-01-01 was skipped
        assert_eq!(result.skip_flags[0].exercise, ExerciseRef::Name("Bench".into()));
    }

    #[test]
    fn test_duplicate_skip_flag_dropped() {
        let flags = vec![
            SkipFlag {
                date: date("2024-01-01"),
                exercise: ExerciseRef::Index(1),
                skipped: true,
            },
            SkipFlag {
                date: date("2024-01-01"),
                exercise: ExerciseRef::Name("Dips_Weighted".into()),
                skipped: false,
            },
        ];

        let result = reconcile_exercise_keys(
            BTreeMap::new(),
            flags,
            &program(),
            &ScheduleState::new(date("2024-01-01")),
        )
        .unwrap();

        assert_eq!(result.dropped, 1);
        assert_eq!(result.skip_flags.len(), 1);
        assert!(result.skip_flags[0].skipped);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut history = BTreeMap::new();
        history.insert(
            date("2024-01-01"),
            session(
                1,
                vec![
                    set(ExerciseRef::Index(0), 0, 50.0),
                    set(ExerciseRef::Name("Bench".into()), 0, 52.5),
                    set(ExerciseRef::Index(7), 1, 10.0),
                ],
            ),
        );
        let flags = vec![SkipFlag {
            date: date("2024-01-01"),
            exercise: ExerciseRef::Index(1),
            skipped: true,
        }];
        let schedule = ScheduleState::new(date("2024-01-01"));

        let once = reconcile_exercise_keys(history, flags, &program(), &schedule).unwrap();
        assert!(once.migrated);

        let twice = reconcile_exercise_keys(
            once.history.clone(),
            once.skip_flags.clone(),
            &program(),
            &schedule,
        )
        .unwrap();
        assert!(!twice.migrated);
        assert_eq!(twice.dropped, 0);
        assert_eq!(twice.history, once.history);
        assert_eq!(twice.skip_flags, once.skip_flags);
    }

    #[test]
    fn test_legacy_session_blob_deserializes() {
        let json = r#"{
            "workout_type": "PUSH #1",
            "day_number": 1,
            "weights": {
                "2024-01-01_0_0": 50.0,
                "2024-01-01_Dips_Weighted_1": 20,
                "broken": 5.0
            },
            "timestamp": "2024-01-01T18:30:12.123456"
        }"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.workout_label, "PUSH #1");
        assert_eq!(session.absolute_day, 1);
        assert_eq!(session.sets.len(), 2);
        assert!(session.sets.contains(&set(ExerciseRef::Index(0), 0, 50.0)));
        assert!(session.sets.contains(&set(ExerciseRef::Name("Dips_Weighted".into()), 1, 20.0)));
    }

    #[test]
    fn test_legacy_skip_flags_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "deserialize_skip_flags")]
            flags: Vec<SkipFlag>,
        }
        let json = r#"{"flags": {"2024-01-01_1": true, "2024-01-02_Row": false}}"#;
        let wrapper: Wrapper = serde_json::from_str(json).unwrap();
        assert_eq!(wrapper.flags.len(), 2);
        assert_eq!(wrapper.flags[0].exercise, ExerciseRef::Index(1));
        assert!(!wrapper.flags[1].skipped);
    }
}
