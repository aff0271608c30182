use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;

use crate::repository::{DayStateRecord, DayStateRepository, StorageError};

use super::SqliteStore;

fn date_from_text(raw: &str) -> Result<NaiveDate, StorageError> {
    raw.parse::<NaiveDate>()
        .map_err(|e| StorageError::Serialization(format!("bad date {raw}: {e}")))
}

fn count_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range")))
}

#[async_trait]
impl DayStateRepository for SqliteStore {
    async fn get_day_state(&self, date: NaiveDate) -> Result<Option<DayStateRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT date, skip_count, not_understood_count, active_sphere_index
            FROM day_states
            WHERE date = ?1
            ",
        )
        .bind(date.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw_date: String = row
            .try_get("date")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let skip_count: i64 = row
            .try_get("skip_count")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let not_understood_count: i64 = row
            .try_get("not_understood_count")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let active_sphere_index: i64 = row
            .try_get("active_sphere_index")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;

        Ok(Some(DayStateRecord {
            date: date_from_text(&raw_date)?,
            skip_count: count_from_i64("skip_count", skip_count)?,
            not_understood_count: count_from_i64("not_understood_count", not_understood_count)?,
            active_sphere_index: count_from_i64("active_sphere_index", active_sphere_index)?,
        }))
    }

    async fn put_day_state(&self, record: &DayStateRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO day_states (date, skip_count, not_understood_count, active_sphere_index)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(date) DO UPDATE SET
                skip_count = excluded.skip_count,
                not_understood_count = excluded.not_understood_count,
                active_sphere_index = excluded.active_sphere_index
            ",
        )
        .bind(record.date.to_string())
        .bind(i64::from(record.skip_count))
        .bind(i64::from(record.not_understood_count))
        .bind(i64::from(record.active_sphere_index))
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn prune_before(&self, date: NaiveDate) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM day_states WHERE date < ?1")
            .bind(date.to_string())
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(result.rows_affected())
    }
}
