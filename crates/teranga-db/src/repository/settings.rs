//! # Settings Repository
//!
//! Key/value settings: the chart of accounts (`accounts.*`) and company
//! details (`company.*`).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::info;

use crate::error::{DbError, DbResult};
use teranga_core::ChartOfAccounts;

/// Prefix of the account code keys.
pub const ACCOUNTS_PREFIX: &str = "accounts.";

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Loads the chart of accounts on the caller's transaction.
    ///
    /// A missing or malformed code is a configuration error: the posting
    /// is refused and the transition rolls back.
    pub async fn load_chart(conn: &mut SqliteConnection) -> DbResult<ChartOfAccounts> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings WHERE key LIKE 'accounts.%'")
                .fetch_all(&mut *conn)
                .await?;

        let values: HashMap<String, String> = rows
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ACCOUNTS_PREFIX)
                    .map(|name| (name.to_string(), value))
            })
            .collect();

        Ok(ChartOfAccounts::from_settings(|key| values.get(key).cloned())?)
    }

    pub async fn chart_of_accounts(&self) -> DbResult<ChartOfAccounts> {
        let mut conn = self.pool.acquire().await?;
        Self::load_chart(&mut conn).await
    }

    /// Stores every account code of `chart`.
    pub async fn sync_accounts(&self, chart: &ChartOfAccounts) -> DbResult<()> {
        chart.validate().map_err(teranga_core::CoreError::from)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        for (key, code) in chart.codes() {
            Self::upsert(&mut tx, &format!("{}{}", ACCOUNTS_PREFIX, key), code).await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!("Chart of accounts synced");
        Ok(())
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert(&mut conn, key, value).await
    }

    async fn upsert(conn: &mut SqliteConnection, key: &str, value: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use teranga_core::CoreError;

    #[tokio::test]
    async fn test_seeded_chart_is_syscohada_default() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let chart = db.settings().chart_of_accounts().await.unwrap();
        assert_eq!(chart, ChartOfAccounts::default());
    }

    #[tokio::test]
    async fn test_sync_accounts_overrides_codes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let chart = ChartOfAccounts {
            bank: "5211".to_string(),
            ..ChartOfAccounts::default()
        };
        db.settings().sync_accounts(&chart).await.unwrap();

        let loaded = db.settings().chart_of_accounts().await.unwrap();
        assert_eq!(loaded.bank, "5211");
        assert_eq!(loaded.cash, "571");
    }

    #[tokio::test]
    async fn test_missing_account_is_configuration_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query("DELETE FROM settings WHERE key = 'accounts.output_tax'")
            .execute(db.pool())
            .await
            .unwrap();

        let result = db.settings().chart_of_accounts().await;
        assert!(matches!(result, Err(DbError::Domain(CoreError::Configuration(_)))));
    }

    #[tokio::test]
    async fn test_get_and_set() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = db.settings();

        assert_eq!(settings.get("company.name").await.unwrap(), None);
        settings.set("company.name", "Teranga Distribution SARL").await.unwrap();
        assert_eq!(
            settings.get("company.name").await.unwrap().as_deref(),
            Some("Teranga Distribution SARL")
        );
    }
}
