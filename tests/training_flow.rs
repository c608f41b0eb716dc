use chrono::{Duration, NaiveDate, NaiveDateTime};

use muscutrack::program::{Category, ProgramDefinition};
use muscutrack::schedule::{absolute_program_day, cycle_day};
use muscutrack::state::AppState;
use muscutrack::stats::{category_volume, exercise_series, exercise_stats, progression};
use muscutrack::{CoreError, Database};

const PROGRAM_CSV: &str = "\
Jour,Type,Exercice,Séries,Répétitions (RPE),Notes
1,PUSH #1,Bench,3,6-8 (RPE 8),
1,PUSH #1,Dips,3,10-12,
2,PULL #1,Row,3,8-10,
3,LEGS #1,Squat,3,6-8,
4,Repos,Repos,1,-,
5,PUSH #2,Bench,3,8-10,
6,PULL #2,Row,3,8-10,
7,LEGS #2,Squat,3,8-10,
";

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn at(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_opt(19, 0, 0).unwrap()
}

fn program() -> ProgramDefinition {
    ProgramDefinition::from_csv_reader(PROGRAM_CSV.as_bytes()).unwrap()
}

#[test]
fn test_week_of_training_with_a_skip() {
    let program = program();
    let mut state = AppState::new(date("2024-01-01"));

    state.log_exercise(date("2024-01-01"), &program, "Bench", &[45.0, 50.0], at(date("2024-01-01"))).unwrap();
    state.schedule.skip(date("2024-01-03"));

    // 2024-01-08 is day 7 after the skip, not day 8
    assert_eq!(state.schedule.day_for(date("2024-01-08")), 7);
    assert_eq!(cycle_day(state.schedule.day_for(date("2024-01-09")), program.length()).unwrap(), 1);

    state.log_exercise(date("2024-01-09"), &program, "Bench", &[55.0, 52.5], at(date("2024-01-09"))).unwrap();

    let stats = exercise_stats("Bench", &state.history, &program, date("2024-01-10")).unwrap();
    assert_eq!((stats.last_max, stats.all_time_max), (Some(55.0), Some(55.0)));

    let earlier = exercise_stats("Bench", &state.history, &program, date("2024-01-05")).unwrap();
    assert_eq!((earlier.last_max, earlier.all_time_max), (Some(50.0), Some(50.0)));

    let series = exercise_series("Bench", &state.history, &program).unwrap();
    assert!((progression(&series).unwrap() - 10.0).abs() < 1e-9);

    let volumes = category_volume(&state.history);
    assert_eq!(volumes[&Category::Push].count, 2);
}

#[test]
fn test_start_date_change_keeps_history_frozen() {
    let program = program();
    let mut state = AppState::new(date("2024-01-01"));
    state.log_exercise(date("2024-01-02"), &program, "Row", &[40.0], at(date("2024-01-02"))).unwrap();

    state.schedule.set_start_date(date("2024-01-02"));
    assert_eq!(state.schedule.day_for(date("2024-01-02")), 1);
    assert_eq!(state.history[&date("2024-01-02")].absolute_day, 2);

    // Stats still read the session against its frozen PULL day
    let stats = exercise_stats("Row", &state.history, &program, date("2024-02-01")).unwrap();
    assert_eq!(stats.last_max, Some(40.0));
}

#[test]
fn test_skip_shifts_every_later_date_by_one() {
    let start = date("2024-01-01");
    let none = Default::default();
    let mut skipped = std::collections::BTreeSet::new();
    skipped.insert(date("2024-01-15"));

    for offset in 0..60 {
        let d = start + Duration::days(offset);
        let base = absolute_program_day(d, start, &none);
        let shifted = absolute_program_day(d, start, &skipped);
        let expected = if d > date("2024-01-15") { base - 1 } else { base };
        assert_eq!(shifted, expected);
    }
}

#[test]
fn test_legacy_state_round_trip_through_storage() {
    let program = program();
    let db = Database::open(":memory:").unwrap();
    let legacy = r#"{
        "start_date": "2024-01-01",
        "skipped_days": ["2024-01-03"],
        "skipped_exercises": {"2024-01-01_1": true},
        "history": {
            "2024-01-01": {
                "workout_type": "PUSH #1",
                "day_number": 1,
                "weights": {"2024-01-01_0_0": 50.0, "2024-01-01_0_1": 0.0, "2024-01-01_4_0": 99.0},
                "timestamp": "2024-01-01T19:00:00.000001"
            },
            "2024-01-02": {
                "workout_type": "PULL #1",
                "day_number": 2,
                "weights": {"2024-01-02_2_0": 40.0, "2024-01-02_2_1": 42.5},
                "timestamp": "2024-01-02T19:00:00"
            },
            "2024-01-09": {
                "workout_type": "PUSH #1",
                "day_number": 8,
                "weights": {"2024-01-09_Bench_0": 55.0},
                "timestamp": "2024-01-09T19:00:00"
            }
        }
    }"#;
    db.import_raw("legacy", legacy).unwrap();

    let state = db.load_or_init("legacy", &program, date("2024-01-10")).unwrap();
    assert!(state.is_exercise_skipped(date("2024-01-01"), "Dips"));
    assert_eq!(state.history[&date("2024-01-01")].weights_for("Bench"), vec![50.0]);
    // Row 4 of the table is the rest day, so the day-1 entry pointing at it is gone
    assert_eq!(state.history[&date("2024-01-01")].sets.len(), 2);
    assert_eq!(state.history[&date("2024-01-02")].weights_for("Row"), vec![40.0, 42.5]);

    let stats = exercise_stats("Bench", &state.history, &program, date("2024-01-10")).unwrap();
    assert_eq!(stats.all_time_max, Some(55.0));

    // Second load finds nothing left to migrate
    let mut again = db.load_state("legacy").unwrap().unwrap();
    assert!(!again.migrate(&program).unwrap().migrated);
    assert_eq!(again, state);
}

#[test]
fn test_broken_program_is_a_configuration_error() {
    let csv = "Jour,Type,Exercice,Séries,Répétitions (RPE),Notes\n1,PUSH,Bench,3,8,\n3,LEGS,Squat,3,8,\n";
    let err = ProgramDefinition::from_csv_reader(csv.as_bytes()).unwrap_err();
    assert!(matches!(err.downcast_ref::<CoreError>(), Some(CoreError::Configuration(_))));
}
