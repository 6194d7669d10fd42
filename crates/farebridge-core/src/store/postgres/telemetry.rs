//! Health samples, system snapshots and the rotation log.

use chrono::{DateTime, Utc};
use farebridge_types::models::{HealthSample, RotationLogEntry, SystemHealthSnapshot};
use sqlx::postgres::PgPool;
use sqlx::Row;

use super::helpers::{map_sqlx_err, row_to_health_sample, row_to_rotation_entry};
use crate::store::{StoreError, StoreResult};

/// Append-only tables subject to retention.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RetainedTable {
    HealthSamples,
    Snapshots,
    RotationLog,
}

impl RetainedTable {
    fn purge_sql(self) -> &'static str {
        match self {
            Self::HealthSamples => "DELETE FROM health_samples WHERE checked_at < $1",
            Self::Snapshots => "DELETE FROM system_health_snapshots WHERE taken_at < $1",
            Self::RotationLog => "DELETE FROM rotation_log WHERE created_at < $1",
        }
    }
}

pub(crate) async fn append_health_sample_impl(
    pool: &PgPool,
    sample: &HealthSample,
) -> StoreResult<()> {
    sqlx::query(
        r#"INSERT INTO health_samples (id, provider_id, status, response_time_ms, error_message, checked_at)
           VALUES ($1, $2, $3, $4, $5, $6)"#,
    )
    .bind(sample.id)
    .bind(&sample.provider_id)
    .bind(sample.status.as_str())
    .bind(sample.response_time_ms)
    .bind(&sample.error_message)
    .bind(sample.checked_at)
    .execute(pool)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

pub(crate) async fn latest_health_samples_impl(pool: &PgPool) -> StoreResult<Vec<HealthSample>> {
    let rows = sqlx::query(
        r#"SELECT DISTINCT ON (provider_id)
               id, provider_id, status, response_time_ms, error_message, checked_at
           FROM health_samples
           ORDER BY provider_id, checked_at DESC"#,
    )
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_err)?;
    rows.iter().map(row_to_health_sample).collect()
}

pub(crate) async fn health_samples_since_impl(
    pool: &PgPool,
    provider_id: &str,
    since: DateTime<Utc>,
) -> StoreResult<Vec<HealthSample>> {
    let rows = sqlx::query(
        r#"SELECT id, provider_id, status, response_time_ms, error_message, checked_at
           FROM health_samples
           WHERE provider_id = $1 AND checked_at >= $2
           ORDER BY checked_at"#,
    )
    .bind(provider_id)
    .bind(since)
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_err)?;
    rows.iter().map(row_to_health_sample).collect()
}

pub(crate) async fn save_snapshot_impl(
    pool: &PgPool,
    snapshot: &SystemHealthSnapshot,
) -> StoreResult<()> {
    let payload = serde_json::to_value(snapshot)
        .map_err(|err| StoreError::Serialization(err.to_string()))?;
    sqlx::query("INSERT INTO system_health_snapshots (id, taken_at, payload) VALUES ($1, $2, $3)")
        .bind(snapshot.id)
        .bind(snapshot.taken_at)
        .bind(payload)
        .execute(pool)
        .await
        .map_err(map_sqlx_err)?;
    Ok(())
}

pub(crate) async fn latest_snapshot_impl(
    pool: &PgPool,
) -> StoreResult<Option<SystemHealthSnapshot>> {
    let row =
        sqlx::query("SELECT payload FROM system_health_snapshots ORDER BY taken_at DESC LIMIT 1")
            .fetch_optional(pool)
            .await
            .map_err(map_sqlx_err)?;

    row.map(|row| {
        let payload: serde_json::Value = row.get("payload");
        serde_json::from_value(payload).map_err(|err| StoreError::Serialization(err.to_string()))
    })
    .transpose()
}

pub(crate) async fn append_rotation_entry_impl(
    pool: &PgPool,
    entry: &RotationLogEntry,
) -> StoreResult<()> {
    sqlx::query(
        r#"INSERT INTO rotation_log
               (id, correlation_id, provider_id, service_type, attempt_order, success,
                response_time_ms, result_count, error_message, circuit_state_after,
                quota_status_after, is_actual_quota_limit, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
    )
    .bind(entry.id)
    .bind(&entry.correlation_id)
    .bind(&entry.provider_id)
    .bind(entry.service_type.as_str())
    .bind(entry.attempt_order)
    .bind(entry.success)
    .bind(entry.response_time_ms)
    .bind(entry.result_count)
    .bind(&entry.error_message)
    .bind(entry.circuit_state_after.as_str())
    .bind(entry.quota_status_after.as_str())
    .bind(entry.is_actual_quota_limit)
    .bind(entry.created_at)
    .execute(pool)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}

const ROTATION_COLUMNS: &str = "id, correlation_id, provider_id, service_type, attempt_order, \
     success, response_time_ms, result_count, error_message, circuit_state_after, \
     quota_status_after, is_actual_quota_limit, created_at";

pub(crate) async fn rotation_entries_impl(
    pool: &PgPool,
    correlation_id: &str,
) -> StoreResult<Vec<RotationLogEntry>> {
    let rows = sqlx::query(&format!(
        "SELECT {ROTATION_COLUMNS} FROM rotation_log \
         WHERE correlation_id = $1 ORDER BY attempt_order, created_at"
    ))
    .bind(correlation_id)
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_err)?;
    rows.iter().map(row_to_rotation_entry).collect()
}

pub(crate) async fn rotation_entries_since_impl(
    pool: &PgPool,
    provider_id: &str,
    since: DateTime<Utc>,
) -> StoreResult<Vec<RotationLogEntry>> {
    let rows = sqlx::query(&format!(
        "SELECT {ROTATION_COLUMNS} FROM rotation_log \
         WHERE provider_id = $1 AND created_at >= $2 ORDER BY created_at"
    ))
    .bind(provider_id)
    .bind(since)
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_err)?;
    rows.iter().map(row_to_rotation_entry).collect()
}

pub(crate) async fn purge_before_impl(
    pool: &PgPool,
    table: RetainedTable,
    cutoff: DateTime<Utc>,
) -> StoreResult<u64> {
    let result = sqlx::query(table.purge_sql())
        .bind(cutoff)
        .execute(pool)
        .await
        .map_err(map_sqlx_err)?;
    Ok(result.rows_affected())
}
