use async_trait::async_trait;
use chrono::NaiveDate;
use reflect_core::model::{DayState, DayStateError, Preferences};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a day's counter state.
///
/// Mirrors the domain `DayState` so adapters can serialize without leaking
/// storage concerns into the domain layer; rehydration re-validates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStateRecord {
    pub date: NaiveDate,
    pub skip_count: u32,
    pub not_understood_count: u32,
    pub active_sphere_index: u32,
}

impl DayStateRecord {
    #[must_use]
    pub fn from_state(state: &DayState) -> Self {
        Self {
            date: state.date(),
            skip_count: state.skip_count(),
            not_understood_count: state.not_understood_count(),
            active_sphere_index: u32::try_from(state.active_sphere_index()).unwrap_or(u32::MAX),
        }
    }

    /// Convert the record back into a domain `DayState`.
    ///
    /// # Errors
    ///
    /// Returns `DayStateError` if the persisted sphere index is out of range.
    pub fn into_state(self) -> Result<DayState, DayStateError> {
        let index = usize::try_from(self.active_sphere_index)
            .map_err(|_| DayStateError::InvalidSphereIndex(usize::MAX))?;
        DayState::from_persisted(
            self.date,
            self.skip_count,
            self.not_understood_count,
            index,
        )
    }
}

/// Repository contract for per-day flow state.
#[async_trait]
pub trait DayStateRepository: Send + Sync {
    /// Fetch the record for a calendar day, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures; a missing day is `Ok(None)`.
    async fn get_day_state(&self, date: NaiveDate) -> Result<Option<DayStateRecord>, StorageError>;

    /// Persist or update a day's record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn put_day_state(&self, record: &DayStateRecord) -> Result<(), StorageError>;

    /// Delete records older than the given day. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn prune_before(&self, date: NaiveDate) -> Result<u64, StorageError>;
}

/// Repository contract for local UI preferences.
#[async_trait]
pub trait PreferencesRepository: Send + Sync {
    /// Fetch persisted preferences, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_preferences(&self) -> Result<Option<Preferences>, StorageError>;

    /// Persist preferences.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the preferences cannot be stored.
    async fn save_preferences(&self, prefs: &Preferences) -> Result<(), StorageError>;
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    day_states: Arc<Mutex<HashMap<NaiveDate, DayStateRecord>>>,
    preferences: Arc<Mutex<Option<Preferences>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DayStateRepository for InMemoryStore {
    async fn get_day_state(&self, date: NaiveDate) -> Result<Option<DayStateRecord>, StorageError> {
        let guard = self
            .day_states
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&date).cloned())
    }

    async fn put_day_state(&self, record: &DayStateRecord) -> Result<(), StorageError> {
        let mut guard = self
            .day_states
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(record.date, record.clone());
        Ok(())
    }

    async fn prune_before(&self, date: NaiveDate) -> Result<u64, StorageError> {
        let mut guard = self
            .day_states
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let before = guard.len();
        guard.retain(|day, _| *day >= date);
        Ok((before - guard.len()) as u64)
    }
}

#[async_trait]
impl PreferencesRepository for InMemoryStore {
    async fn get_preferences(&self) -> Result<Option<Preferences>, StorageError> {
        let guard = self
            .preferences
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_preferences(&self, prefs: &Preferences) -> Result<(), StorageError> {
        let mut guard = self
            .preferences
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(prefs.clone());
        Ok(())
    }
}

/// Aggregates the local repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub day_states: Arc<dyn DayStateRepository>,
    pub preferences: Arc<dyn PreferencesRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        let day_states: Arc<dyn DayStateRepository> = Arc::new(store.clone());
        let preferences: Arc<dyn PreferencesRepository> = Arc::new(store);
        Self {
            day_states,
            preferences,
        }
    }
}
