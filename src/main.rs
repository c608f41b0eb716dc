//! muscutrack - Personal strength-training tracker

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use muscutrack::db::Database;
use muscutrack::program::ProgramDefinition;
use muscutrack::schedule::{cycle_day, next_scheduled_day, upcoming_days};
use muscutrack::state::AppState;
use muscutrack::stats::{
    ExerciseSummary, category_volume, exercise_series, exercise_stats, format_volume_report,
    weight_trajectory,
};

const DEFAULT_DB_PATH: &str = "muscutrack.db";

#[derive(Parser)]
#[command(name = "muscutrack")]
#[command(author, version, about = "Strength program tracker with skips and progression stats")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "MUSCU_DB", default_value = DEFAULT_DB_PATH, global = true)]
    db: String,

    /// User whose state is loaded
    #[arg(short, long, env = "MUSCU_USER", default_value = "default", global = true)]
    user: String,

    /// Program CSV (Jour,Type,Exercice,Séries,Répétitions (RPE),Notes); built-in program if omitted
    #[arg(short, long, env = "MUSCU_PROGRAM", global = true)]
    program: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the workout for a date (default: today)
    Today {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Upcoming program days
    Calendar {
        #[arg(short = 'n', long, default_value = "7")]
        days: u32,
    },

    /// Change the program start date (day 1)
    Start { date: NaiveDate },

    /// Skip a whole day; the schedule slides back by one
    Skip {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Re-activate a skipped day
    Unskip {
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Skip one exercise on a date (its weights are not logged)
    SkipExercise {
        exercise: String,
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Clear the skip instead
        #[arg(long)]
        undo: bool,
    },

    /// Log set weights (kg) for an exercise and commit the day
    Log {
        exercise: String,
        #[arg(required = true, num_args = 1..)]
        weights: Vec<f64>,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// List committed sessions
    History {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Delete the session of a date
    Delete { date: NaiveDate },

    /// Progression statistics for an exercise (lists exercises if omitted)
    Stats {
        exercise: Option<String>,
        /// Previous/record loads are taken strictly before this date
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Volume per training category
    Volume,

    /// Record body weight (kg)
    Weight {
        kg: f64,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Set the body-weight goal
    Goal {
        #[arg(short, long)]
        target: Option<f64>,
        #[arg(short, long)]
        by: Option<NaiveDate>,
    },

    /// Body-weight trend vs. goal
    Trajectory,

    /// Import a state JSON exported by an earlier version
    Import { file: PathBuf },

    /// Delete all training data and restart the program today
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

fn load_program(path: Option<&Path>) -> Result<ProgramDefinition> {
    match path {
        Some(path) => ProgramDefinition::from_csv_path(path),
        None => Ok(ProgramDefinition::builtin()),
    }
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let program = match load_program(cli.program.as_deref()) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Program unavailable: {:#}", e);
            std::process::exit(2);
        }
    };

    let db = Database::open(&cli.db)?;
    let today = Local::now().date_naive();
    let now = Local::now().naive_local();

    if let Some(Commands::Import { file }) = &cli.command {
        let json = std::fs::read_to_string(file)?;
        db.import_raw(&cli.user, &json)?;
        let state = db.load_or_init(&cli.user, &program, today)?;
        println!("Imported {} sessions for {}", state.history.len(), cli.user);
        return Ok(());
    }

    let mut state = db.load_or_init(&cli.user, &program, today)?;

    match cli.command.unwrap_or(Commands::Today { date: None }) {
        Commands::Today { date } => {
            show_day(&state, &program, date.unwrap_or(today), today)?;
        }

        Commands::Calendar { days } => {
            println!("Program calendar");
            println!("{:-<40}", "");
            for day in upcoming_days(&state.schedule, &program, today, days)? {
                println!("{}", day.format());
            }
        }

        Commands::Start { date } => {
            state.schedule.set_start_date(date);
            db.save_state(&cli.user, &state)?;
            println!("Start date set to {}", date);
            println!("Today is program day {}", state.schedule.day_for(today));
        }

        Commands::Skip { date } => {
            let date = date.unwrap_or(today);
            if state.schedule.skip(date) {
                db.save_state(&cli.user, &state)?;
                println!("{} skipped, the program slides back one day", date);
            } else {
                println!("{} was already skipped", date);
            }
        }

        Commands::Unskip { date } => {
            let date = date.unwrap_or(today);
            if state.schedule.unskip(date) {
                db.save_state(&cli.user, &state)?;
                println!("{} re-activated", date);
            } else {
                println!("{} was not skipped", date);
            }
        }

        Commands::SkipExercise { exercise, date, undo } => {
            let date = date.unwrap_or(today);
            state.set_exercise_skipped(date, &exercise, !undo)?;
            db.save_state(&cli.user, &state)?;
            if undo {
                println!("{} restored for {}", exercise, date);
            } else {
                println!("{} skipped for {}", exercise, date);
            }
        }

        Commands::Log { exercise, weights, date } => {
            let date = date.unwrap_or(today);
            let session = state.log_exercise(date, &program, &exercise, &weights, now)?;
            println!(
                "Logged: {} - {} sets ({} day {})",
                exercise,
                session.weights_for(&exercise).len(),
                session.workout_label,
                session.absolute_day
            );
            if state.is_exercise_skipped(date, &exercise) {
                println!("Note: {} is skipped for {}, weights were not kept", exercise, date);
            }
            db.save_state(&cli.user, &state)?;
        }

        Commands::History { limit } => {
            if state.history.is_empty() {
                println!("No sessions recorded yet.");
            }
            for (date, session) in state.history.iter().rev().take(limit) {
                println!("{} - {} (day {})", date, session.workout_label, session.absolute_day);
                for (exercise, sets) in session.exercise_sets() {
                    let sets: Vec<String> = sets
                        .iter()
                        .map(|(idx, w)| format!("S{}: {}kg", idx + 1, w))
                        .collect();
                    println!("  {:28} {}", exercise, sets.join(" | "));
                }
            }
        }

        Commands::Delete { date } => {
            if state.delete_session(date) {
                db.save_state(&cli.user, &state)?;
                println!("Session of {} deleted", date);
            } else {
                println!("No session on {}", date);
            }
        }

        Commands::Stats { exercise: None, .. } => {
            println!("Exercises in the program:");
            for name in program.exercise_names() {
                println!("  {}", name);
            }
        }

        Commands::Stats { exercise: Some(exercise), as_of } => {
            let stats = exercise_stats(&exercise, &state.history, &program, as_of.unwrap_or(today))?;
            let series = exercise_series(&exercise, &state.history, &program)?;

            println!("Exercise: {}", exercise);
            println!("{:-<40}", "");
            println!("{}", stats.format());
            match ExerciseSummary::from_series(&series) {
                Some(summary) => {
                    println!("{}", summary.format());
                    println!();
                    println!("{:12} {:>8} {:>8} {:>10}", "Date", "Max", "Avg", "Volume");
                    for point in &series {
                        println!(
                            "{:12} {:>8.1} {:>8.1} {:>10.1}",
                            point.date.to_string(),
                            point.max_weight,
                            point.avg_weight,
                            point.total_volume
                        );
                    }
                }
                None => println!("No data recorded for {}", exercise),
            }
        }

        Commands::Volume => {
            println!("Volume by category");
            println!("{:-<40}", "");
            println!("{}", format_volume_report(&category_volume(&state.history)));
        }

        Commands::Weight { kg, date } => {
            let date = date.unwrap_or(today);
            state.record_body_weight(date, kg)?;
            db.save_state(&cli.user, &state)?;
            println!("Body weight {:.1} kg recorded for {}", kg, date);
        }

        Commands::Goal { target, by } => {
            state.set_goal(target, by)?;
            db.save_state(&cli.user, &state)?;
            println!(
                "Goal: {} by {}",
                target.map(|t| format!("{:.1} kg", t)).unwrap_or_else(|| "-".into()),
                by.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
            );
        }

        Commands::Trajectory => {
            let trajectory = weight_trajectory(&state.body_weight, &state.weight_goal, today);
            println!("{}", trajectory.format());
        }

        Commands::Reset { yes } => {
            if !yes {
                println!("This deletes every session, skip and weight. Re-run with --yes to confirm.");
            } else {
                state.reset(today);
                db.save_state(&cli.user, &state)?;
                println!("All data reset, program restarts today");
            }
        }

        Commands::Import { .. } => {}
    }

    Ok(())
}

/// Print the prescribed workout for `date` with previous loads
fn show_day(state: &AppState, program: &ProgramDefinition, date: NaiveDate, today: NaiveDate) -> Result<()> {
    let absolute_day = state.schedule.day_for(date);
    let cycle = cycle_day(absolute_day, program.length())?;
    let label = program.workout_label(cycle)?;

    println!("{} | Program day {} (cycle day {}) | {}", date, absolute_day, cycle, label);
    println!("{:-<60}", "");

    if state.schedule.is_skipped(date) {
        println!("Day skipped");
    } else if program.is_rest_day(cycle)? {
        println!("Rest day - recover well!");
    } else {
        let session = state.history.get(&date);
        if session.is_some() {
            println!("Session already recorded for this date");
        }

        for row in program.rows_for_day(cycle)? {
            let skip_marker = if state.is_exercise_skipped(date, &row.exercise_name) {
                " [skipped]"
            } else {
                ""
            };
            println!("{}{}", row.exercise_name, skip_marker);
            println!("  {} x {}", row.set_count, row.rep_spec);
            if let Some(notes) = &row.notes {
                println!("  Note: {}", notes);
            }

            let stats = exercise_stats(&row.exercise_name, &state.history, program, date)?;
            println!("  {}", stats.format());

            if let Some(session) = session {
                let logged = session.weights_for(&row.exercise_name);
                if !logged.is_empty() {
                    let logged: Vec<String> = logged.iter().map(|w| format!("{}kg", w)).collect();
                    println!("  Logged: {}", logged.join(" | "));
                }
            }
        }
    }

    let (tomorrow, next_day) = next_scheduled_day(&state.schedule, today);
    let next_cycle = cycle_day(next_day, program.length())?;
    println!();
    println!(
        "Tomorrow ({}): day {} - {}",
        tomorrow.format("%d/%m/%Y"),
        next_day,
        program.workout_label(next_cycle)?
    );

    Ok(())
}
