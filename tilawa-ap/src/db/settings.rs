//! Settings database access
//!
//! Key-value settings persisted across restarts. Not transactional;
//! the engine is the only writer, so last write wins.

use crate::error::Result;
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};

/// Key holding the selected reciter identifier
pub const SELECTED_RECITER_KEY: &str = "selected_reciter_id";

/// Durable string key-value store
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// `SettingsStore` backed by the SQLite `settings` table
#[derive(Clone)]
pub struct SqliteSettings {
    pool: Pool<Sqlite>,
}

impl SqliteSettings {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for SqliteSettings {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Load the persisted reciter identifier
pub async fn load_selected_reciter(store: &dyn SettingsStore) -> Result<Option<String>> {
    Ok(store
        .get(SELECTED_RECITER_KEY)
        .await?
        .filter(|id| !id.trim().is_empty()))
}

/// Persist the reciter identifier, or clear it with `None`
pub async fn save_selected_reciter(store: &dyn SettingsStore, reciter_id: Option<&str>) -> Result<()> {
    match reciter_id {
        Some(id) => store.set(SELECTED_RECITER_KEY, id).await,
        None => store.remove(SELECTED_RECITER_KEY).await,
    }
}
