//! Device repository.

use async_trait::async_trait;

use crate::database::models::{DeviceKey, DeviceRecord};
use crate::database::retry::retry_on_sqlite_busy;
use crate::database::{DbPool, begin_immediate};
use crate::{Error, Result};

/// Mutation applied to a freshly read record inside a transaction.
pub type DeviceUpdate<'a> = &'a (dyn Fn(&mut DeviceRecord) + Send + Sync);

/// Device repository trait.
///
/// Every mutation touches a single record. `update_in_transaction` is the
/// only serialization point for concurrent deliveries to the same token.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn get(&self, key: &DeviceKey) -> Result<Option<DeviceRecord>>;
    async fn put(&self, record: &DeviceRecord) -> Result<()>;
    /// Delete a record. Returns `false` if there was nothing to delete.
    async fn delete(&self, key: &DeviceKey) -> Result<bool>;
    /// Read the record, apply `update`, write it back, all in one transaction.
    ///
    /// Fails with [`Error::NotFound`] when the record does not exist.
    async fn update_in_transaction(
        &self,
        key: &DeviceKey,
        update: DeviceUpdate<'_>,
    ) -> Result<DeviceRecord>;
}

/// SQLx implementation of DeviceRepository.
pub struct SqlxDeviceRepository {
    pool: DbPool,
}

impl SqlxDeviceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const UPSERT_DEVICE: &str = r#"
    INSERT INTO devices (
        account_id, token, api_version, app, created_at, device_id, device_info,
        environment, failures, last_success, platform, total_failures,
        total_successes, updated_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(account_id, token) DO UPDATE SET
        api_version = excluded.api_version,
        app = excluded.app,
        created_at = excluded.created_at,
        device_id = excluded.device_id,
        device_info = excluded.device_info,
        environment = excluded.environment,
        failures = excluded.failures,
        last_success = excluded.last_success,
        platform = excluded.platform,
        total_failures = excluded.total_failures,
        total_successes = excluded.total_successes,
        updated_at = excluded.updated_at
"#;

fn bind_record<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    record: &'q DeviceRecord,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(record.account_id)
        .bind(&record.token)
        .bind(record.api_version)
        .bind(&record.app)
        .bind(record.created_at)
        .bind(&record.device_id)
        .bind(&record.device_info)
        .bind(&record.environment)
        .bind(record.failures)
        .bind(record.last_success)
        .bind(&record.platform)
        .bind(record.total_failures)
        .bind(record.total_successes)
        .bind(record.updated_at)
}

#[async_trait]
impl DeviceRepository for SqlxDeviceRepository {
    async fn get(&self, key: &DeviceKey) -> Result<Option<DeviceRecord>> {
        let record = sqlx::query_as::<_, DeviceRecord>(
            "SELECT * FROM devices WHERE account_id = ? AND token = ?",
        )
        .bind(key.account_id)
        .bind(&key.token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn put(&self, record: &DeviceRecord) -> Result<()> {
        bind_record(sqlx::query(UPSERT_DEVICE), record)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &DeviceKey) -> Result<bool> {
        let result = sqlx::query("DELETE FROM devices WHERE account_id = ? AND token = ?")
            .bind(key.account_id)
            .bind(&key.token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_in_transaction(
        &self,
        key: &DeviceKey,
        update: DeviceUpdate<'_>,
    ) -> Result<DeviceRecord> {
        let pool = &self.pool;
        retry_on_sqlite_busy("update_device", move || async move {
            let mut tx = begin_immediate(pool).await?;

            let current = sqlx::query_as::<_, DeviceRecord>(
                "SELECT * FROM devices WHERE account_id = ? AND token = ?",
            )
            .bind(key.account_id)
            .bind(&key.token)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(mut record) = current else {
                tx.rollback().await?;
                return Err(Error::not_found("device", key.to_string()));
            };

            update(&mut record);
            // The key is not part of the mutable state.
            record.account_id = key.account_id;
            record.token = key.token.clone();

            bind_record(sqlx::query(UPSERT_DEVICE), &record)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            Ok(record)
        })
        .await
    }
}
