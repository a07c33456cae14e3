//! Named JSON bins and the typed records kept in them.

use std::cell::RefCell;
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::catalog::MediaOverrides;
use crate::error::{QuizError, Result};
use crate::history::HistoryLog;
use crate::models::LearnerSettings;
use crate::wrongbook::Wrongbook;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bin {
    Settings,
    Wrongbook,
    History,
    MediaOverrides,
}

impl Bin {
    pub const ALL: [Bin; 4] = [Bin::Settings, Bin::Wrongbook, Bin::History, Bin::MediaOverrides];

    pub fn key(&self) -> &'static str {
        match self {
            Bin::Settings => "idiom_settings_v1",
            Bin::Wrongbook => "idiom_wrongbook_v1",
            Bin::History => "idiom_history_v1",
            Bin::MediaOverrides => "idiom_ytoverrides_v1",
        }
    }
}

/// Raw text storage, one value per bin.
pub trait KeyValueStore {
    fn get(&self, bin: Bin) -> Result<Option<String>>;
    fn set(&self, bin: Bin, value: &str) -> Result<()>;
    fn remove(&self, bin: Bin) -> Result<()>;
}

/// Reads a bin, falling back when it is absent or does not parse.
pub fn load_or<T, S>(store: &S, bin: Bin, fallback: T) -> Result<T>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(bin)? else {
        return Ok(fallback);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(bin = bin.key(), error = %e, "ignoring unreadable stored value");
            Ok(fallback)
        }
    }
}

pub fn save<T, S>(store: &S, bin: Bin, value: &T) -> Result<()>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| QuizError::Encode {
        bin: bin.key(),
        source,
    })?;
    store.set(bin, &raw)
}

pub fn load_settings<S: KeyValueStore + ?Sized>(store: &S) -> Result<LearnerSettings> {
    load_or(store, Bin::Settings, LearnerSettings::default())
}

/// Validates and persists settings, returning what was stored.
pub fn save_settings<S: KeyValueStore + ?Sized>(
    store: &S,
    settings: LearnerSettings,
) -> Result<LearnerSettings> {
    let settings = settings.normalized()?;
    save(store, Bin::Settings, &settings)?;
    Ok(settings)
}

pub fn load_history<S: KeyValueStore + ?Sized>(store: &S) -> Result<HistoryLog> {
    load_or(store, Bin::History, HistoryLog::default())
}

pub fn save_history<S: KeyValueStore + ?Sized>(store: &S, history: &HistoryLog) -> Result<()> {
    save(store, Bin::History, history)
}

pub fn load_wrongbook<S: KeyValueStore + ?Sized>(store: &S) -> Result<Wrongbook> {
    load_or(store, Bin::Wrongbook, Wrongbook::default())
}

pub fn save_wrongbook<S: KeyValueStore + ?Sized>(store: &S, wrongbook: &Wrongbook) -> Result<()> {
    save(store, Bin::Wrongbook, wrongbook)
}

pub fn load_overrides<S: KeyValueStore + ?Sized>(store: &S) -> Result<MediaOverrides> {
    load_or(store, Bin::MediaOverrides, MediaOverrides::default())
}

pub fn save_overrides<S: KeyValueStore + ?Sized>(
    store: &S,
    overrides: &MediaOverrides,
) -> Result<()> {
    save(store, Bin::MediaOverrides, overrides)
}

/// Drops every bin, returning the store to first-run state.
pub fn reset<S: KeyValueStore + ?Sized>(store: &S) -> Result<()> {
    for bin in Bin::ALL {
        store.remove(bin)?;
    }
    Ok(())
}

/// Process-local store, used when nothing needs to outlive the run.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bins: RefCell<HashMap<Bin, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, bin: Bin) -> Result<Option<String>> {
        Ok(self.bins.borrow().get(&bin).cloned())
    }

    fn set(&self, bin: Bin, value: &str) -> Result<()> {
        self.bins.borrow_mut().insert(bin, value.to_string());
        Ok(())
    }

    fn remove(&self, bin: Bin) -> Result<()> {
        self.bins.borrow_mut().remove(&bin);
        Ok(())
    }
}
