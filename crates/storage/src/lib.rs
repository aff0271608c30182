#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    DayStateRecord, DayStateRepository, InMemoryStore, PreferencesRepository, Storage,
    StorageError,
};
pub use sqlite::{SqliteInitError, SqliteStore};
