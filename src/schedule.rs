//! Scheduler - maps calendar dates onto the cyclic program
//!
//! The absolute day is an ever-increasing counter since the start date.
//! Every skipped date strictly before the target removes one day from the
//! count, sliding the rest of the schedule back.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::program::ProgramDefinition;

/// Program start date plus the set of skipped dates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleState {
    pub start_date: NaiveDate,
    #[serde(default, alias = "skipped_days")]
    pub skipped_dates: BTreeSet<NaiveDate>,
}

impl ScheduleState {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            skipped_dates: BTreeSet::new(),
        }
    }

    /// Absolute program day for a date under this schedule
    pub fn day_for(&self, date: NaiveDate) -> u32 {
        absolute_program_day(date, self.start_date, &self.skipped_dates)
    }

    pub fn is_skipped(&self, date: NaiveDate) -> bool {
        self.skipped_dates.contains(&date)
    }

    /// Mark a date skipped. Returns false if it already was.
    pub fn skip(&mut self, date: NaiveDate) -> bool {
        self.skipped_dates.insert(date)
    }

    /// Remove a skip. Returns false if the date was not skipped.
    pub fn unskip(&mut self, date: NaiveDate) -> bool {
        self.skipped_dates.remove(&date)
    }

    pub fn set_start_date(&mut self, start_date: NaiveDate) {
        self.start_date = start_date;
    }
}

/// Absolute program day (1-based) for `target`
///
/// Dates before the start are clamped to day 1. A skip on `target`
/// itself does not count.
pub fn absolute_program_day(
    target: NaiveDate,
    start: NaiveDate,
    skipped: &BTreeSet<NaiveDate>,
) -> u32 {
    if target < start {
        return 1;
    }

    let days_elapsed = (target - start).num_days();
    let skipped_before = skipped.range(..target).count() as i64;
    let effective_days = days_elapsed - skipped_before;

    // Skips before the start can push the count below zero
    (effective_days.max(0) + 1) as u32
}

/// Position of an absolute day inside a program of `program_length` days
pub fn cycle_day(absolute_day: u32, program_length: u32) -> CoreResult<u32> {
    if program_length == 0 {
        return Err(CoreError::Configuration("program length must be at least 1".into()));
    }
    let absolute_day = absolute_day.max(1);
    Ok((absolute_day - 1) % program_length + 1)
}

/// Tomorrow's date and its absolute program day
pub fn next_scheduled_day(schedule: &ScheduleState, today: NaiveDate) -> (NaiveDate, u32) {
    let tomorrow = today + Duration::days(1);
    (tomorrow, schedule.day_for(tomorrow))
}

/// One entry of the upcoming-days calendar
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub absolute_day: u32,
    pub cycle_day: u32,
    pub workout_label: String,
    pub is_today: bool,
    pub is_skipped: bool,
}

impl CalendarDay {
    pub fn format(&self) -> String {
        let prefix = if self.is_today { "-> " } else { "   " };
        let skip_marker = if self.is_skipped { " (skipped)" } else { "" };
        format!(
            "{}{}: D{} - {}{}",
            prefix,
            self.date.format("%d/%m"),
            self.cycle_day,
            self.workout_label,
            skip_marker
        )
    }
}

/// Calendar for `count` days starting today
pub fn upcoming_days(
    schedule: &ScheduleState,
    program: &ProgramDefinition,
    today: NaiveDate,
    count: u32,
) -> CoreResult<Vec<CalendarDay>> {
    (0..count)
        .map(|offset| {
            let date = today + Duration::days(offset as i64);
            let absolute_day = schedule.day_for(date);
            let cycle = cycle_day(absolute_day, program.length())?;
            Ok(CalendarDay {
                date,
                absolute_day,
                cycle_day: cycle,
                workout_label: program.workout_label(cycle)?.to_string(),
                is_today: date == today,
                is_skipped: schedule.is_skipped(date),
            })
        })
        .collect()
}
