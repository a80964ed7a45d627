//! Sqlite store of declared class definitions and the contracts deployed
//! from them.
//!
//! Open the database once with [StorageBuilder::migrate], then hand out
//! [Storage] pools created from the returned [StorageManager]. All queries go
//! through a [Transaction] obtained from [Storage::connection].

// Crate internal helpers, not part of the API.
mod prelude;

mod connection;
mod params;
mod schema;

use std::num::NonZeroU32;
use std::path::PathBuf;

use anyhow::Context;
pub use connection::*;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;

/// The schema revision lives in sqlite's `user_version` pragma.
const VERSION_KEY: &str = "user_version";

/// The [journal mode](https://sqlite.org/pragma.html#pragma_journal_mode)
/// of the database.
#[derive(Clone, Copy, Debug)]
pub enum JournalMode {
    Rollback,
    WAL,
}

impl JournalMode {
    fn apply(self, connection: &rusqlite::Connection) -> rusqlite::Result<()> {
        match self {
            JournalMode::Rollback => connection.pragma_update(None, "journal_mode", "DELETE"),
            JournalMode::WAL => {
                connection.pragma_update(None, "journal_mode", "WAL")?;
                // 1 GiB
                connection.pragma_update(None, "journal_size_limit", 1i64 << 30)
            }
        }
    }

    fn synchronous(self) -> &'static str {
        match self {
            JournalMode::Rollback => "full",
            JournalMode::WAL => "normal",
        }
    }
}

/// A cheaply cloneable pool of connections to the database.
#[derive(Clone)]
pub struct Storage(Pool<SqliteConnectionManager>);

impl Storage {
    pub fn connection(&self) -> anyhow::Result<Connection> {
        let connection = self.0.get().context("Getting pooled database connection")?;
        Ok(Connection::from_inner(connection))
    }
}

/// A migrated database from which connection pools are created.
#[derive(Debug)]
pub struct StorageManager {
    database_path: PathBuf,
    journal_mode: JournalMode,
}

impl StorageManager {
    pub fn create_pool(&self, capacity: NonZeroU32) -> anyhow::Result<Storage> {
        self.pool(capacity, OpenFlags::default())
    }

    /// A pool for query-only consumers such as the RPC server.
    pub fn create_read_only_pool(&self, capacity: NonZeroU32) -> anyhow::Result<Storage> {
        self.pool(
            capacity,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )
    }

    fn pool(&self, capacity: NonZeroU32, flags: OpenFlags) -> anyhow::Result<Storage> {
        let journal_mode = self.journal_mode;
        let manager = SqliteConnectionManager::file(&self.database_path)
            .with_flags(flags)
            .with_init(move |connection| configure(connection, journal_mode));

        let pool = Pool::builder()
            .max_size(capacity.get())
            .build(manager)
            .with_context(|| {
                format!(
                    "Creating connection pool for {}",
                    self.database_path.display()
                )
            })?;

        Ok(Storage(pool))
    }
}

pub struct StorageBuilder {
    database_path: PathBuf,
    journal_mode: JournalMode,
}

impl StorageBuilder {
    pub fn file(database_path: PathBuf) -> Self {
        Self {
            database_path,
            journal_mode: JournalMode::WAL,
        }
    }

    pub fn journal_mode(self, journal_mode: JournalMode) -> Self {
        Self {
            journal_mode,
            ..self
        }
    }

    /// A fresh, migrated in-memory database with a single connection.
    pub fn in_memory() -> anyhow::Result<Storage> {
        Self::in_memory_with_pool_size(NonZeroU32::MIN)
    }

    /// Every call yields a distinct database, shared only by the connections
    /// of the returned pool.
    ///
    /// Concurrent writers on a shared-cache in-memory database fail with
    /// locking errors instead of waiting, so tests should keep the pool size
    /// at one unless they only read.
    pub fn in_memory_with_pool_size(pool_size: NonZeroU32) -> anyhow::Result<Storage> {
        use std::sync::atomic::{AtomicU64, Ordering};

        static NEXT_DATABASE: AtomicU64 = AtomicU64::new(0);
        let id = NEXT_DATABASE.fetch_add(1, Ordering::Relaxed);
        let database_path =
            PathBuf::from(format!("file:lantern-memdb-{id}?mode=memory&cache=shared"));

        // The database disappears with its last connection, so keep this one
        // open until the pool holds its own.
        let _keep_alive = rusqlite::Connection::open(&database_path)
            .context("Opening in-memory database")?;

        Self::file(database_path)
            .journal_mode(JournalMode::Rollback)
            .migrate()?
            .create_pool(pool_size)
    }

    /// Brings the database schema up to date.
    ///
    /// Call this once at start-up and share the resulting [StorageManager].
    pub fn migrate(self) -> anyhow::Result<StorageManager> {
        let mut connection = rusqlite::Connection::open(&self.database_path)
            .with_context(|| format!("Opening {}", self.database_path.display()))?;

        JournalMode::Rollback
            .apply(&connection)
            .context("Switching to rollback journal for migration")?;
        configure(&mut connection, JournalMode::Rollback).context("Configuring connection")?;

        migrate_database(&mut connection).context("Migrating database")?;

        self.journal_mode
            .apply(&connection)
            .context("Setting journal mode")?;

        connection
            .close()
            .map_err(|(_, error)| error)
            .context("Closing database after migration")?;

        Ok(StorageManager {
            database_path: self.database_path,
            journal_mode: self.journal_mode,
        })
    }
}

/// Per-connection settings.
fn configure(
    connection: &mut rusqlite::Connection,
    journal_mode: JournalMode,
) -> rusqlite::Result<()> {
    // Deployments reference their class through a foreign key.
    connection.set_db_config(
        rusqlite::config::DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY,
        true,
    )?;
    connection.set_prepared_statement_cache_capacity(1000);
    connection.pragma_update(None, "synchronous", journal_mode.synchronous())
}

fn migrate_database(connection: &mut rusqlite::Connection) -> anyhow::Result<()> {
    let mut revision = schema_version(connection)?;
    let migrations = schema::migrations();
    let latest = schema::BASE_SCHEMA_REVISION + migrations.len();

    if revision > latest {
        tracing::error!(%revision, %latest, "Database is newer than this application");
        anyhow::bail!("Database revision {revision} is newer than the supported {latest}");
    }

    if revision == 0 {
        let tx = connection.transaction().context("Creating transaction")?;
        schema::base_schema(&tx).context("Applying base schema")?;
        tx.pragma_update(None, VERSION_KEY, schema::BASE_SCHEMA_REVISION)
            .context("Updating schema revision")?;
        tx.commit().context("Committing base schema")?;

        revision = schema::BASE_SCHEMA_REVISION;
    }

    if revision == latest {
        tracing::debug!(%revision, "Database schema is up to date");
        return Ok(());
    }

    tracing::info!(from=%revision, to=%latest, "Migrating database schema");

    // migrations[i] takes the schema from BASE + i to BASE + i + 1.
    for migration in &migrations[revision - schema::BASE_SCHEMA_REVISION..] {
        revision += 1;
        let _span = tracing::info_span!("db_migration", revision).entered();

        let tx = connection.transaction().context("Creating transaction")?;
        migration(&tx).with_context(|| format!("Migrating to revision {revision}"))?;
        tx.pragma_update(None, VERSION_KEY, revision)
            .context("Updating schema revision")?;
        tx.commit()
            .with_context(|| format!("Committing revision {revision}"))?;
    }

    Ok(())
}

/// Zero for a database which has never been migrated.
fn schema_version(connection: &rusqlite::Connection) -> anyhow::Result<usize> {
    connection
        .pragma_query_value(None, VERSION_KEY, |row| row.get::<_, usize>(0))
        .context("Reading schema revision")
}
