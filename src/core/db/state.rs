use std::{
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use sqlx::{
    Sqlite,
    pool::PoolConnection,
    sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
    },
};
use tokio::sync::{RwLock, RwLockReadGuard};

const IN_MEMORY_URL: &str = "sqlite::memory:";

pub(super) struct StoreState {
    db_file: Option<PathBuf>,
    pool: RwLock<SqlitePool>,
}

impl std::fmt::Debug for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreState")
            .field("db_file", &self.db_file)
            .finish()
    }
}

impl StoreState {
    /// Acquire a pooled connection and hold the pool read lock for the entire lifetime
    /// of the returned guard.
    pub(super) async fn conn(&self) -> anyhow::Result<DbConnGuard<'_>> {
        let pool_guard = self.pool.read().await;

        // Acquire while the read lock is held so `checkpoint` cannot run underneath.
        let conn = pool_guard.acquire().await?;

        Ok(DbConnGuard {
            _pool_guard: pool_guard,
            conn,
        })
    }

    /// Exclusive WAL checkpoint:
    /// - waits for all in-flight queries (because it takes a WRITE lock)
    /// - flushes the WAL into the main database file and truncates it
    pub(super) async fn checkpoint(&self) -> anyhow::Result<()> {
        let pool_guard = self.pool.write().await;
        if self.db_file.is_none() {
            return Ok(());
        }
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
            .execute(&*pool_guard)
            .await
            .context("Failed to checkpoint document store")?;
        Ok(())
    }

    pub(super) async fn close(&self) {
        self.pool.write().await.close().await;
    }

    pub(super) async fn open<P: AsRef<Path>>(db_file: P) -> anyhow::Result<Self> {
        let db_file = db_file.as_ref().to_path_buf();
        if !db_file.parent().map(|p| p.as_os_str().is_empty() || p.is_dir()).unwrap_or(true) {
            anyhow::bail!("Document store parent does not exist: {:?}", db_file);
        }

        let connect_opts = SqliteConnectOptions::new()
            .filename(&db_file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("Failed to open document store {:?}", db_file))?;
        Self::migrate(&pool).await?;
        Ok(Self {
            db_file: Some(db_file),
            pool: RwLock::new(pool),
        })
    }

    pub(super) async fn open_in_memory() -> anyhow::Result<Self> {
        // Every in-memory connection is its own database, so pin the pool to one
        // connection that never expires.
        let connect_opts = SqliteConnectOptions::from_str(IN_MEMORY_URL)?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_opts)
            .await
            .context("Failed to open in-memory document store")?;
        Self::migrate(&pool).await?;
        Ok(Self {
            db_file: None,
            pool: RwLock::new(pool),
        })
    }

    async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .context("Failed to migrate document store")?;
        Ok(())
    }
}

pub struct DbConnGuard<'a> {
    _pool_guard: RwLockReadGuard<'a, SqlitePool>,
    conn: PoolConnection<Sqlite>,
}

impl<'a> Deref for DbConnGuard<'a> {
    type Target = PoolConnection<Sqlite>;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<'a> DerefMut for DbConnGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
