use async_trait::async_trait;
use sqlx::Row;

use reflect_core::model::{Preferences, UserId};

use crate::repository::{PreferencesRepository, StorageError};

use super::SqliteStore;

#[async_trait]
impl PreferencesRepository for SqliteStore {
    async fn get_preferences(&self) -> Result<Option<Preferences>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT dark_mode, guest_user_id
            FROM preferences
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let dark_mode: i64 = row
            .try_get("dark_mode")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let guest_user_id: Option<i64> = row
            .try_get("guest_user_id")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        Ok(Some(Preferences {
            dark_mode: dark_mode != 0,
            guest_user_id: guest_user_id.map(UserId::new),
        }))
    }

    async fn save_preferences(&self, prefs: &Preferences) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO preferences (id, dark_mode, guest_user_id)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                dark_mode = excluded.dark_mode,
                guest_user_id = excluded.guest_user_id
            ",
        )
        .bind(i64::from(prefs.dark_mode))
        .bind(prefs.guest_user_id.map(|id| id.value()))
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
