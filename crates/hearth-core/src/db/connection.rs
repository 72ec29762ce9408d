//! Database connection management

use crate::error::{Error, Result};
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Where the hosted listings database lives
#[derive(Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Local `SQLite` file (development, tests)
    Local(std::path::PathBuf),
    /// Remote libSQL/Turso database
    Remote {
        /// Database URL (e.g., `libsql://your-db.turso.io`)
        url: String,
        /// Authentication token for the remote database
        auth_token: String,
    },
}

impl std::fmt::Debug for StoreLocation {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => formatter.debug_tuple("Local").field(path).finish(),
            Self::Remote { url, .. } => formatter
                .debug_struct("Remote")
                .field("url", url)
                .field("auth_token", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Database wrapper for libSQL connections
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
    remote: bool,
}

impl Database {
    /// Open the database at the given location
    pub async fn open_location(location: &StoreLocation) -> Result<Self> {
        match location {
            StoreLocation::Local(path) => Self::open(path).await,
            StoreLocation::Remote { url, auth_token } => {
                Self::open_remote(url.clone(), auth_token.clone()).await
            }
        }
    }

    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        Self::finish(db, false).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::finish(db, false).await
    }

    /// Open a remote database; every statement goes over the network.
    pub async fn open_remote(url: String, auth_token: String) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(Error::InvalidInput("Database URL is required".into()));
        }
        if auth_token.trim().is_empty() {
            return Err(Error::InvalidInput("Auth token is required".into()));
        }

        tracing::info!("Connecting to remote listings database: {url}");
        let db = Builder::new_remote(url, auth_token).build().await?;
        Self::finish(db, true).await
    }

    async fn finish(db: LibSqlDatabase, remote: bool) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self {
            _db: db,
            conn,
            remote,
        };
        database.configure().await?;
        migrations::run(&database.conn).await?;
        Ok(database)
    }

    /// Configure `SQLite` pragmas (local databases only)
    async fn configure(&self) -> Result<()> {
        if self.remote {
            return Ok(());
        }
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        Ok(())
    }

    /// Whether statements are executed against a remote server
    pub const fn is_remote(&self) -> bool {
        self.remote
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
