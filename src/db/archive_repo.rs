use async_trait::async_trait;
use sqlx::SqlitePool;

use super::DbError;

/// Append-only store for raw forecast documents
#[async_trait]
pub trait ForecastArchive: Send + Sync {
    /// Insert one document, returning the number of rows the store confirmed
    async fn insert(&self, document: &serde_json::Value) -> Result<u64, DbError>;
}

/// SQLite implementation of ForecastArchive
pub struct SqliteForecastArchive {
    pool: SqlitePool,
}

impl SqliteForecastArchive {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ForecastArchive for SqliteForecastArchive {
    async fn insert(&self, document: &serde_json::Value) -> Result<u64, DbError> {
        let request = document.get("_request");
        let lat = request.and_then(|r| r.get("lat")).and_then(|v| v.as_f64());
        let lon = request.and_then(|r| r.get("lon")).and_then(|v| v.as_f64());

        let result = sqlx::query(
            "INSERT INTO forecast_archive (fetched_at, lat, lon, document)
             VALUES (?, ?, ?, ?)",
        )
        .bind(chrono::Utc::now().timestamp())
        .bind(lat)
        .bind(lon)
        .bind(serde_json::to_string(document)?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
