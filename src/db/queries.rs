/// SQL query functions for database operations
///
/// Scoped state entries and user preferences.

use crate::db::models::*;
use crate::db::Database;
use crate::error::Result;
use chrono::Utc;

impl Database {
    /// Read one scoped state value
    pub async fn get_state(&self, scope: &str, key: &str) -> Result<Option<String>> {
        let entry = sqlx::query_as::<_, StateEntry>(
            "SELECT * FROM state_entries WHERE scope = ? AND key = ?",
        )
        .bind(scope)
        .bind(key)
        .fetch_optional(self.pool())
        .await?;

        Ok(entry.map(|e| e.value))
    }

    /// Write several values of one scope in a single transaction
    ///
    /// # Arguments
    /// * `scope` - State scope, e.g. `palette`
    /// * `values` - `(key, value)` pairs to upsert
    pub async fn set_states(&self, scope: &str, values: &[(&str, String)]) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool().begin().await?;

        for (key, value) in values {
            sqlx::query(
                r#"
                INSERT INTO state_entries (scope, key, value, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(scope, key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(scope)
            .bind(*key)
            .bind(value)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Write one scoped state value
    pub async fn set_state(&self, scope: &str, key: &str, value: String) -> Result<()> {
        self.set_states(scope, &[(key, value)]).await
    }

    /// Remove one scoped state value
    pub async fn delete_state(&self, scope: &str, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM state_entries WHERE scope = ? AND key = ?")
            .bind(scope)
            .bind(key)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// All entries of a scope, for diagnostics
    pub async fn list_state(&self, scope: &str) -> Result<Vec<StateEntry>> {
        let entries = sqlx::query_as::<_, StateEntry>(
            "SELECT * FROM state_entries WHERE scope = ? ORDER BY key",
        )
        .bind(scope)
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }

    /// Get a preference
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        let pref = sqlx::query_as::<_, Preference>("SELECT * FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        Ok(pref.map(|p| p.value))
    }

    /// Set a preference
    pub async fn set_preference(&self, key: String, value: String) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO preferences (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(self.pool())
            .await?;

        Ok(())
    }
}
