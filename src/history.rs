use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Day keys kept per learner.
pub const RETENTION_DAYS: usize = 14;

/// learner -> "YYYY-MM-DD" -> ids drawn that day.
///
/// Zero-padded ISO dates sort chronologically, so the `BTreeMap` order is
/// also the calendar order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog(BTreeMap<String, BTreeMap<String, Vec<String>>>);

pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl HistoryLog {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_draw(&mut self, learner: &str, date: NaiveDate, ids: &[String]) {
        let days = self.0.entry(learner.to_string()).or_default();
        days.entry(day_key(date))
            .or_default()
            .extend(ids.iter().cloned());

        while days.len() > RETENTION_DAYS {
            days.pop_first();
        }
    }

    /// Ids drawn on the learner's most recent `window_days` recorded days.
    pub fn recent_ids(&self, learner: &str, window_days: usize) -> HashSet<String> {
        let Some(days) = self.0.get(learner) else {
            return HashSet::new();
        };

        days.values()
            .rev()
            .take(window_days)
            .flatten()
            .cloned()
            .collect()
    }

    /// Retained days for a learner, most recent first.
    pub fn days(&self, learner: &str) -> Vec<(&str, &[String])> {
        self.0
            .get(learner)
            .map(|days| {
                days.iter()
                    .rev()
                    .map(|(d, ids)| (d.as_str(), ids.as_slice()))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn ids_on(&self, learner: &str, date: NaiveDate) -> Option<&[String]> {
        self.0
            .get(learner)
            .and_then(|days| days.get(&day_key(date)))
            .map(|ids| ids.as_slice())
    }
}
