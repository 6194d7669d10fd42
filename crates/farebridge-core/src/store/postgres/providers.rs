//! Provider registry queries.

use farebridge_types::models::Provider;
use sqlx::postgres::PgPool;

use super::helpers::{map_sqlx_err, row_to_provider};
use crate::store::{StoreError, StoreResult};

pub(crate) async fn list_providers_impl(pool: &PgPool) -> StoreResult<Vec<Provider>> {
    let rows = sqlx::query(
        r#"SELECT id, service_type, enabled, priority, base_url, health_path, created_at, updated_at
           FROM providers
           ORDER BY id"#,
    )
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_err)?;

    rows.iter().map(row_to_provider).collect()
}

pub(crate) async fn get_provider_impl(pool: &PgPool, id: &str) -> StoreResult<Provider> {
    let row = sqlx::query(
        r#"SELECT id, service_type, enabled, priority, base_url, health_path, created_at, updated_at
           FROM providers
           WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(map_sqlx_err)?
    .ok_or_else(|| StoreError::NotFound(format!("provider {id}")))?;

    row_to_provider(&row)
}

/// Insert or update a provider. `created_at` of an existing row is kept.
pub(crate) async fn upsert_provider_impl(pool: &PgPool, provider: &Provider) -> StoreResult<()> {
    sqlx::query(
        r#"INSERT INTO providers (id, service_type, enabled, priority, base_url, health_path, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
           ON CONFLICT (id) DO UPDATE SET
               service_type = EXCLUDED.service_type,
               enabled = EXCLUDED.enabled,
               priority = EXCLUDED.priority,
               base_url = EXCLUDED.base_url,
               health_path = EXCLUDED.health_path,
               updated_at = EXCLUDED.updated_at"#,
    )
    .bind(&provider.id)
    .bind(provider.service_type.as_str())
    .bind(provider.enabled)
    .bind(provider.priority)
    .bind(&provider.base_url)
    .bind(&provider.health_path)
    .bind(provider.created_at)
    .bind(provider.updated_at)
    .execute(pool)
    .await
    .map_err(map_sqlx_err)?;
    Ok(())
}
