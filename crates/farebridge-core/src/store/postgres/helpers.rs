//! Row mapping for PostgreSQL store operations.

use farebridge_types::models::{
    CircuitBreakerState, HealthSample, Provider, QuotaRecord, RotationLogEntry,
};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::str::FromStr;

use crate::store::{StoreError, StoreResult};

/// Map sqlx error to store error.
pub(crate) fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

fn parse_column<T>(row: &PgRow, column: &str) -> StoreResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column).map_err(map_sqlx_err)?;
    raw.parse::<T>()
        .map_err(|err| StoreError::Serialization(format!("{column}={raw}: {err}")))
}

fn non_negative_u32(row: &PgRow, column: &str) -> StoreResult<u32> {
    let raw: i32 = row.try_get(column).map_err(map_sqlx_err)?;
    u32::try_from(raw).map_err(|_| StoreError::Serialization(format!("{column}={raw} is negative")))
}

pub(crate) fn row_to_provider(row: &PgRow) -> StoreResult<Provider> {
    Ok(Provider {
        id: row.get("id"),
        service_type: parse_column(row, "service_type")?,
        enabled: row.get("enabled"),
        priority: row.get("priority"),
        base_url: row.get("base_url"),
        health_path: row.get("health_path"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

pub(crate) fn row_to_circuit(row: &PgRow) -> StoreResult<CircuitBreakerState> {
    Ok(CircuitBreakerState {
        provider_id: row.get("provider_id"),
        state: parse_column(row, "state")?,
        failure_count: non_negative_u32(row, "failure_count")?,
        last_failure_at: row.get("last_failure_at"),
        reopen_after: row.get("reopen_after"),
        trial_started_at: row.get("trial_started_at"),
        consecutive_trips: non_negative_u32(row, "consecutive_trips")?,
        version: row.get("version"),
        updated_at: row.get("updated_at"),
    })
}

pub(crate) fn row_to_quota(row: &PgRow) -> StoreResult<QuotaRecord> {
    Ok(QuotaRecord {
        provider_id: row.get("provider_id"),
        service_type: parse_column(row, "service_type")?,
        quota_limit: row.get("quota_limit"),
        quota_used: row.get("quota_used"),
        reset_at: row.get("reset_at"),
        window_seconds: row.get("window_seconds"),
        is_actual_quota_limit: row.get("is_actual_quota_limit"),
        version: row.get("version"),
        updated_at: row.get("updated_at"),
    })
}

pub(crate) fn row_to_health_sample(row: &PgRow) -> StoreResult<HealthSample> {
    Ok(HealthSample {
        id: row.get("id"),
        provider_id: row.get("provider_id"),
        status: parse_column(row, "status")?,
        response_time_ms: row.get("response_time_ms"),
        error_message: row.get("error_message"),
        checked_at: row.get("checked_at"),
    })
}

pub(crate) fn row_to_rotation_entry(row: &PgRow) -> StoreResult<RotationLogEntry> {
    Ok(RotationLogEntry {
        id: row.get("id"),
        correlation_id: row.get("correlation_id"),
        provider_id: row.get("provider_id"),
        service_type: parse_column(row, "service_type")?,
        attempt_order: row.get("attempt_order"),
        success: row.get("success"),
        response_time_ms: row.get("response_time_ms"),
        result_count: row.get("result_count"),
        error_message: row.get("error_message"),
        circuit_state_after: parse_column(row, "circuit_state_after")?,
        quota_status_after: parse_column(row, "quota_status_after")?,
        is_actual_quota_limit: row.get("is_actual_quota_limit"),
        created_at: row.get("created_at"),
    })
}

/// Counters are stored as INTEGER.
pub(crate) fn counter_to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
