use rusqlite::{params, Connection};
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::models::UnderstandingRecord;

const SQL_CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS understanding_data (
    ip_address TEXT,
    referrer TEXT,
    user_agent TEXT,
    dark_mode BOOLEAN,
    url TEXT,
    timestamp DATETIME,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
)";
const SQL_INSERT_RECORD: &str = "INSERT INTO understanding_data \
(ip_address, referrer, user_agent, dark_mode, url, timestamp) \
VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Sql(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}

/// Shared handle to the understanding database.
///
/// Cloning is cheap; all clones share one connection and inserts are
/// serialized through its mutex. The connection closes when the last clone
/// is dropped.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (or creates) the database file and makes sure the table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SQL_CREATE_TABLE)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn insert(&self, record: &UnderstandingRecord) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            SQL_INSERT_RECORD,
            params![
                record.ip_address,
                record.referrer,
                record.user_agent,
                record.dark_mode,
                record.url,
                record.timestamp,
            ],
        )?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-insert leaves nothing half-written on our side.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
