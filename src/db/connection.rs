/// SQLite storage for palette state and preferences
///
/// Files on disk get a small pool; the in-memory database used by tests
/// lives on exactly one connection that is never recycled.

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Pool size for on-disk databases
const MAX_CONNECTIONS: u32 = 5;

const MEMORY_PATH: &str = ":memory:";

/// Shared handle to the palette database
#[derive(Clone)]
pub struct Database {
    pool: Arc<SqlitePool>,
    db_path: PathBuf,
}

impl Database {
    /// Open (or create) the state database at `db_path`
    ///
    /// Missing parent directories are created and the schema is applied.
    ///
    /// ```no_run
    /// use palette_recall_lib::db::Database;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let db = Database::new("/tmp/palette-recall/state.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS);

        Self::open(options, pool, db_path).await
    }

    /// Fresh in-memory database for tests
    ///
    /// An in-memory database dies with its connection, so the pool holds a
    /// single connection with no idle timeout and no max lifetime.
    pub async fn new_test() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);

        Self::open(options, pool, PathBuf::from(MEMORY_PATH)).await
    }

    async fn open(
        options: SqliteConnectOptions,
        pool: SqlitePoolOptions,
        db_path: PathBuf,
    ) -> Result<Self> {
        let pool = pool
            .connect_with(options.disable_statement_logging())
            .await?;

        let db = Self {
            pool: Arc::new(pool),
            db_path,
        };
        db.initialize_schema().await?;

        Ok(db)
    }

    // One statement per `;` chunk; sqlx runs a single statement per query
    async fn initialize_schema(&self) -> Result<()> {
        let schema = include_str!("../../database/schema.sql");

        for statement in schema.split(';') {
            let statement = strip_comments(statement);
            if !statement.is_empty() {
                sqlx::query(&statement).execute(self.pool.as_ref()).await?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// File backing the database, `:memory:` for test databases
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Close the pool; pending writes finish first
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Row counts and pool usage, for `status`
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let state_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM state_entries")
            .fetch_one(self.pool.as_ref())
            .await?;

        let preference_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM preferences")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(DatabaseStats {
            total_state_entries: state_count.0,
            total_preferences: preference_count.0,
            pool_size: self.pool.size(),
            idle_connections: self.pool.num_idle(),
        })
    }
}

// Drops `--` comment lines so a chunk holding only comments is skipped.
fn strip_comments(statement: &str) -> String {
    statement
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub total_state_entries: i64,
    pub total_preferences: i64,
    pub pool_size: u32,
    pub idle_connections: usize,
}
