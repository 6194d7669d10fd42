//! Circuit-breaker and quota state with optimistic concurrency.
//!
//! Every swap is `UPDATE ... WHERE version = $expected`; zero affected rows
//! means another writer got there first.

use farebridge_types::models::{CircuitBreakerState, QuotaRecord};
use sqlx::postgres::PgPool;

use super::helpers::{counter_to_i32, map_sqlx_err, row_to_circuit, row_to_quota};
use crate::store::{StoreError, StoreResult};

const CIRCUIT_COLUMNS: &str = "provider_id, state, failure_count, last_failure_at, reopen_after, \
     trial_started_at, consecutive_trips, version, updated_at";

const QUOTA_COLUMNS: &str = "provider_id, service_type, quota_limit, quota_used, reset_at, \
     window_seconds, is_actual_quota_limit, version, updated_at";

pub(crate) async fn list_circuits_impl(pool: &PgPool) -> StoreResult<Vec<CircuitBreakerState>> {
    let rows = sqlx::query(&format!(
        "SELECT {CIRCUIT_COLUMNS} FROM circuit_breaker_state ORDER BY provider_id"
    ))
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_err)?;
    rows.iter().map(row_to_circuit).collect()
}

pub(crate) async fn get_circuit_impl(
    pool: &PgPool,
    provider_id: &str,
) -> StoreResult<Option<CircuitBreakerState>> {
    let row = sqlx::query(&format!(
        "SELECT {CIRCUIT_COLUMNS} FROM circuit_breaker_state WHERE provider_id = $1"
    ))
    .bind(provider_id)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_err)?;
    row.as_ref().map(row_to_circuit).transpose()
}

pub(crate) async fn init_circuit_impl(
    pool: &PgPool,
    state: &CircuitBreakerState,
) -> StoreResult<CircuitBreakerState> {
    sqlx::query(
        r#"INSERT INTO circuit_breaker_state
               (provider_id, state, failure_count, last_failure_at, reopen_after,
                trial_started_at, consecutive_trips, version, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
           ON CONFLICT (provider_id) DO NOTHING"#,
    )
    .bind(&state.provider_id)
    .bind(state.state.as_str())
    .bind(counter_to_i32(state.failure_count))
    .bind(state.last_failure_at)
    .bind(state.reopen_after)
    .bind(state.trial_started_at)
    .bind(counter_to_i32(state.consecutive_trips))
    .bind(state.version)
    .bind(state.updated_at)
    .execute(pool)
    .await
    .map_err(map_sqlx_err)?;

    get_circuit_impl(pool, &state.provider_id)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("circuit {}", state.provider_id)))
}

pub(crate) async fn swap_circuit_impl(
    pool: &PgPool,
    next: &CircuitBreakerState,
    expected_version: i64,
) -> StoreResult<()> {
    let result = sqlx::query(
        r#"UPDATE circuit_breaker_state SET
               state = $2,
               failure_count = $3,
               last_failure_at = $4,
               reopen_after = $5,
               trial_started_at = $6,
               consecutive_trips = $7,
               version = $8,
               updated_at = $9
           WHERE provider_id = $1 AND version = $10"#,
    )
    .bind(&next.provider_id)
    .bind(next.state.as_str())
    .bind(counter_to_i32(next.failure_count))
    .bind(next.last_failure_at)
    .bind(next.reopen_after)
    .bind(next.trial_started_at)
    .bind(counter_to_i32(next.consecutive_trips))
    .bind(next.version)
    .bind(next.updated_at)
    .bind(expected_version)
    .execute(pool)
    .await
    .map_err(map_sqlx_err)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::circuit_conflict(&next.provider_id, expected_version));
    }
    Ok(())
}

pub(crate) async fn list_quotas_impl(pool: &PgPool) -> StoreResult<Vec<QuotaRecord>> {
    let rows = sqlx::query(&format!("SELECT {QUOTA_COLUMNS} FROM quota_records ORDER BY provider_id"))
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_err)?;
    rows.iter().map(row_to_quota).collect()
}

pub(crate) async fn get_quota_impl(
    pool: &PgPool,
    provider_id: &str,
) -> StoreResult<Option<QuotaRecord>> {
    let row =
        sqlx::query(&format!("SELECT {QUOTA_COLUMNS} FROM quota_records WHERE provider_id = $1"))
            .bind(provider_id)
            .fetch_optional(pool)
            .await
            .map_err(map_sqlx_err)?;
    row.as_ref().map(row_to_quota).transpose()
}

pub(crate) async fn init_quota_impl(pool: &PgPool, record: &QuotaRecord) -> StoreResult<QuotaRecord> {
    sqlx::query(
        r#"INSERT INTO quota_records
               (provider_id, service_type, quota_limit, quota_used, reset_at,
                window_seconds, is_actual_quota_limit, version, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
           ON CONFLICT (provider_id) DO NOTHING"#,
    )
    .bind(&record.provider_id)
    .bind(record.service_type.as_str())
    .bind(record.quota_limit)
    .bind(record.quota_used)
    .bind(record.reset_at)
    .bind(record.window_seconds)
    .bind(record.is_actual_quota_limit)
    .bind(record.version)
    .bind(record.updated_at)
    .execute(pool)
    .await
    .map_err(map_sqlx_err)?;

    get_quota_impl(pool, &record.provider_id)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("quota {}", record.provider_id)))
}

pub(crate) async fn swap_quota_impl(
    pool: &PgPool,
    next: &QuotaRecord,
    expected_version: i64,
) -> StoreResult<()> {
    let result = sqlx::query(
        r#"UPDATE quota_records SET
               quota_limit = $2,
               quota_used = $3,
               reset_at = $4,
               window_seconds = $5,
               is_actual_quota_limit = $6,
               version = $7,
               updated_at = $8
           WHERE provider_id = $1 AND version = $9"#,
    )
    .bind(&next.provider_id)
    .bind(next.quota_limit)
    .bind(next.quota_used)
    .bind(next.reset_at)
    .bind(next.window_seconds)
    .bind(next.is_actual_quota_limit)
    .bind(next.version)
    .bind(next.updated_at)
    .bind(expected_version)
    .execute(pool)
    .await
    .map_err(map_sqlx_err)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::quota_conflict(&next.provider_id, expected_version));
    }
    Ok(())
}
