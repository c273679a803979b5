use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPool, types::Json};

use crate::cache::{TransientError, TransientStore};

/// Persistent explore tier on the `explore_transients` table.
#[derive(Clone)]
pub struct PgTransientStore {
    pool: PgPool,
}

impl PgTransientStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete rows past their expiry; returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, TransientError> {
        let result = sqlx::query("DELETE FROM explore_transients WHERE expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(TransientError::backend)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TransientStore for PgTransientStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, TransientError> {
        sqlx::query_scalar(
            "SELECT value FROM explore_transients WHERE key = $1 AND expires_at > now()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(TransientError::backend)
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), TransientError> {
        sqlx::query(
            r#"
            INSERT INTO explore_transients (key, value, expires_at)
            VALUES ($1, $2, now() + make_interval(secs => $3))
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(Json(value))
        .bind(ttl.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(TransientError::backend)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), TransientError> {
        sqlx::query("DELETE FROM explore_transients WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(TransientError::backend)?;
        Ok(())
    }
}
