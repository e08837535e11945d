//! SQLite persistence bootstrap: pool factory and migration runner.
//!
//! The [`Database`] handle is constructed once at startup and passed into
//! every module that touches the store. It is cheap to clone.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use shelf_kernel::settings::DatabaseSettings;
use shelf_kernel::Migration;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use time::OffsetDateTime;

const MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    module     TEXT    NOT NULL,
    id         TEXT    NOT NULL,
    applied_at INTEGER NOT NULL,
    PRIMARY KEY (module, id)
)";

/// Open a transaction holding the write lock from its first statement.
///
/// SQLite applies the busy timeout to `BEGIN IMMEDIATE` but fails a deferred
/// transaction at once when its read lock cannot be upgraded.
pub async fn begin_write(pool: &SqlitePool) -> sqlx::Result<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// Pooled handle to the catalog store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database named by `settings.url`.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let acquire_timeout = Duration::from_millis(settings.acquire_timeout_ms);
        let options = SqliteConnectOptions::from_str(&settings.url)
            .with_context(|| format!("invalid database url '{}'", settings.url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(acquire_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to database '{}'", settings.url))?;

        tracing::info!(
            target: "shelf-db",
            url = %settings.url,
            max_connections = settings.max_connections,
            "database pool ready"
        );

        Ok(Self { pool })
    }

    /// Private in-memory store.
    ///
    /// The pool holds exactly one connection that is never recycled, since
    /// every new SQLite memory connection would start from an empty database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory database url")?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("failed to open in-memory database")?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin_write(&self) -> sqlx::Result<Transaction<'static, Sqlite>> {
        begin_write(&self.pool).await
    }

    /// Apply every migration not yet recorded in `schema_migrations`.
    ///
    /// Each migration runs in its own transaction together with its
    /// bookkeeping row. Returns how many were applied.
    pub async fn apply_migrations(&self, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
        sqlx::query(MIGRATIONS_TABLE)
            .execute(&self.pool)
            .await
            .context("failed to create migrations table")?;

        let mut applied = 0;
        for (module, migration) in migrations {
            let mut tx = begin_write(&self.pool).await?;

            let already: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM schema_migrations WHERE module = ? AND id = ?")
                    .bind(module.as_str())
                    .bind(migration.id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if already.is_some() {
                tracing::debug!(target: "shelf-db", module = %module, id = migration.id, "migration already applied");
                continue;
            }

            sqlx::raw_sql(migration.up)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("migration {}/{} failed", module, migration.id))?;

            sqlx::query("INSERT INTO schema_migrations (module, id, applied_at) VALUES (?, ?, ?)")
                .bind(module.as_str())
                .bind(migration.id)
                .bind(OffsetDateTime::now_utc().unix_timestamp())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            tracing::info!(target: "shelf-db", module = %module, id = migration.id, "migration applied");
            applied += 1;
        }

        Ok(applied)
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<(String, Migration)> {
        vec![
            (
                "notes".to_string(),
                Migration {
                    id: "001_init",
                    up: "CREATE TABLE note (id TEXT PRIMARY KEY);
                         CREATE TABLE tag (note_id TEXT NOT NULL REFERENCES note(id) ON DELETE CASCADE);",
                },
            ),
            (
                "notes".to_string(),
                Migration {
                    id: "002_body",
                    up: "ALTER TABLE note ADD COLUMN body TEXT;",
                },
            ),
        ]
    }

    #[tokio::test]
    async fn migrations_apply_once() {
        let db = Database::in_memory().await.unwrap();

        assert_eq!(db.apply_migrations(&sample()).await.unwrap(), 2);
        assert_eq!(db.apply_migrations(&sample()).await.unwrap(), 0);

        let recorded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(recorded, 2);
    }

    #[tokio::test]
    async fn failed_migration_is_not_recorded() {
        let db = Database::in_memory().await.unwrap();
        let broken = vec![(
            "broken".to_string(),
            Migration {
                id: "001_init",
                up: "CREATE TABLE ok (id TEXT); CREATE TABLE ok (id TEXT);",
            },
        )];

        assert!(db.apply_migrations(&broken).await.is_err());

        let recorded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(recorded, 0);
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let db = Database::in_memory().await.unwrap();
        db.apply_migrations(&sample()).await.unwrap();

        let orphan = sqlx::query("INSERT INTO tag (note_id) VALUES ('missing')")
            .execute(db.pool())
            .await;
        assert!(orphan.is_err());
    }
}
