use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrongbookEntry {
    pub count: u32,
    /// RFC 3339 time of the latest miss.
    pub last: String,
    /// Miss tags in the order they first occurred.
    pub types: Vec<String>,
}

/// learner -> idiom id -> entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wrongbook(BTreeMap<String, BTreeMap<String, WrongbookEntry>>);

impl Wrongbook {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_miss(&mut self, learner: &str, idiom_id: &str, tag: &str, now: DateTime<Utc>) {
        let entry = self
            .0
            .entry(learner.to_string())
            .or_default()
            .entry(idiom_id.to_string())
            .or_insert_with(|| WrongbookEntry {
                count: 0,
                last: String::new(),
                types: Vec::new(),
            });

        entry.count += 1;
        entry.last = now.to_rfc3339();
        if !entry.types.iter().any(|t| t == tag) {
            entry.types.push(tag.to_string());
        }
    }

    /// Returns whether an entry was removed.
    pub fn clear(&mut self, learner: &str, idiom_id: &str) -> bool {
        self.0
            .get_mut(learner)
            .map(|entries| entries.remove(idiom_id).is_some())
            .unwrap_or(false)
    }

    #[cfg(test)]
    pub fn get(&self, learner: &str, idiom_id: &str) -> Option<&WrongbookEntry> {
        self.0.get(learner).and_then(|entries| entries.get(idiom_id))
    }

    #[cfg(test)]
    pub fn contains(&self, learner: &str, idiom_id: &str) -> bool {
        self.get(learner, idiom_id).is_some()
    }

    pub fn ids(&self, learner: &str) -> Vec<&str> {
        self.0
            .get(learner)
            .map(|entries| entries.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }

    /// Entries for display, most-missed first.
    pub fn entries(&self, learner: &str) -> Vec<(&str, &WrongbookEntry)> {
        let mut rows: Vec<(&str, &WrongbookEntry)> = self
            .0
            .get(learner)
            .map(|entries| entries.iter().map(|(id, e)| (id.as_str(), e)).collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| b.1.count.cmp(&a.1.count));
        rows
    }
}
