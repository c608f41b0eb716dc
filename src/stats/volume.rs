//! Volume by training category (PUSH / PULL / LEGS / Other)

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::program::Category;
use crate::state::Session;

/// Aggregated volume for one category
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CategoryVolume {
    pub total: f64,
    /// Sessions with positive volume
    pub count: usize,
}

impl CategoryVolume {
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Volume per category; sessions without any positive weight are left out
pub fn category_volume(history: &BTreeMap<NaiveDate, Session>) -> BTreeMap<Category, CategoryVolume> {
    let mut volumes: BTreeMap<Category, CategoryVolume> = BTreeMap::new();

    for session in history.values() {
        let volume = session.total_volume();
        if volume <= 0.0 {
            continue;
        }
        let entry = volumes.entry(Category::classify(&session.workout_label)).or_default();
        entry.total += volume;
        entry.count += 1;
    }

    volumes
}

/// Text report, one line per category plus the overall total
pub fn format_volume_report(volumes: &BTreeMap<Category, CategoryVolume>) -> String {
    if volumes.is_empty() {
        return "No logged volume yet".to_string();
    }

    let mut lines: Vec<String> = volumes
        .iter()
        .map(|(category, v)| {
            format!(
                "{:6} {:>10.1} kg over {} sessions (avg {:.1})",
                category.name(),
                v.total,
                v.count,
                v.average()
            )
        })
        .collect();

    let total: f64 = volumes.values().map(|v| v.total).sum();
    let sessions: usize = volumes.values().map(|v| v.count).sum();
    lines.push(format!("Total  {:>10.1} kg over {} sessions", total, sessions));
    lines.join("\n")
}
