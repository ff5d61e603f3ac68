//! SQLite-backed document store.
//!
//! Database layout (single file, `liftlog.db`):
//! - `documents` table: seq, collection, id, data (JSON object)
//! - `credentials` table: uid, email, display_name, salt, password_hash, created_at
//! - `session` table: at most one row holding the signed-in uid

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::store::{Document, DocumentStore, FieldFilter, SnapshotCallback, StoreError, Subscription};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    data       TEXT NOT NULL,
    UNIQUE (collection, id)
);
CREATE TABLE IF NOT EXISTS credentials (
    uid           TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL,
    salt          TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS session (
    slot         INTEGER PRIMARY KEY CHECK (slot = 1),
    uid          TEXT NOT NULL,
    signed_in_at TEXT NOT NULL
);
";

/// Helper to read a column that might be stored as TEXT or BLOB.
/// Other writers may store the JSON body as bytes rather than text.
fn get_string_or_blob(row: &Row, idx: usize) -> rusqlite::Result<String> {
    match row.get::<_, String>(idx) {
        Ok(s) => Ok(s),
        Err(_) => {
            let blob: Vec<u8> = row.get(idx)?;
            String::from_utf8(blob).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Blob,
                    Box::new(e),
                )
            })
        }
    }
}

/// Decode an `(id, data)` row into a document
fn row_to_document(row: &Row) -> rusqlite::Result<(String, String)> {
    Ok((row.get(0)?, get_string_or_blob(row, 1)?))
}

fn parse_body(json: &str) -> Result<Map<String, Value>, StoreError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

/// Shared SQLite connection with the schema applied
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database file, creating parent directories as needed
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(2))?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        Self::initialize(conn)
    }

    /// Open a private in-memory database
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

struct Listener {
    id: u64,
    collection: String,
    filter: FieldFilter,
    callback: SnapshotCallback,
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// Document store over a [`Database`]
pub struct SqliteStore {
    db: Database,
    listeners: Arc<Mutex<ListenerRegistry>>,
    /// Last observed `PRAGMA data_version`, used to spot commits from other connections
    data_version: Mutex<i64>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Result<Self, StoreError> {
        let version = read_data_version(&*db.lock()?)?;
        Ok(SqliteStore {
            db,
            listeners: Arc::new(Mutex::new(ListenerRegistry::default())),
            data_version: Mutex::new(version),
        })
    }

    /// The registry stays usable after a listener panicked while it was held
    fn lock_listeners(&self) -> MutexGuard<'_, ListenerRegistry> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-deliver snapshots to listeners on `collection` (or all listeners).
    ///
    /// Runs after the write is committed, so a failing listener never turns a
    /// saved write into an error.
    fn notify(&self, collection: Option<&str>) {
        let mut registry = self.lock_listeners();
        for listener in registry
            .listeners
            .iter_mut()
            .filter(|l| collection.map_or(true, |c| l.collection == c))
        {
            match self.query(&listener.collection, &listener.filter) {
                Ok(snapshot) => {
                    tracing::debug!(
                        listener = listener.id,
                        collection = %listener.collection,
                        documents = snapshot.len(),
                        "delivering snapshot"
                    );
                    (listener.callback)(snapshot);
                }
                Err(e) => {
                    tracing::warn!(listener = listener.id, "snapshot query failed: {e}");
                }
            }
        }
    }

    fn fetch(
        conn: &Connection,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row = conn
            .query_row(
                "SELECT id, data FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                row_to_document,
            )
            .optional()?;

        row.map(|(id, json)| {
            Ok(Document {
                id,
                data: parse_body(&json)?,
            })
        })
        .transpose()
    }
}

fn read_data_version(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("PRAGMA data_version", [], |row| row.get(0))?)
}

impl DocumentStore for SqliteStore {
    fn add(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        if !data.is_object() {
            return Err(StoreError::NotAnObject);
        }
        let id = Uuid::new_v4().simple().to_string();
        {
            let conn = self.db.lock()?;
            conn.execute(
                "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)",
                params![collection, id, serde_json::to_string(&data)?],
            )?;
        }
        tracing::debug!(collection, id = %id, "document added");
        self.notify(Some(collection));
        Ok(id)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.db.lock()?;
        Self::fetch(&conn, collection, id)
    }

    fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError> {
        let Value::Object(fields) = partial else {
            return Err(StoreError::NotAnObject);
        };
        {
            let conn = self.db.lock()?;
            let mut doc = Self::fetch(&conn, collection, id)?.ok_or_else(|| {
                StoreError::MissingDocument {
                    collection: collection.to_string(),
                    id: id.to_string(),
                }
            })?;
            doc.data.extend(fields);
            conn.execute(
                "UPDATE documents SET data = ?3 WHERE collection = ?1 AND id = ?2",
                params![collection, id, serde_json::to_string(&doc.data)?],
            )?;
        }
        tracing::debug!(collection, id, "document updated");
        self.notify(Some(collection));
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let removed = {
            let conn = self.db.lock()?;
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )?
        };
        if removed == 0 {
            return Ok(());
        }
        tracing::debug!(collection, id, "document deleted");
        self.notify(Some(collection));
        Ok(())
    }

    fn query(&self, collection: &str, filter: &FieldFilter) -> Result<Vec<Document>, StoreError> {
        let conn = self.db.lock()?;
        let path = format!("$.{}", filter.field);
        let mut stmt = conn.prepare(
            "SELECT id, data FROM documents
             WHERE collection = ?1
               AND json_type(data, ?2) = 'text'
               AND json_extract(data, ?2) = ?3
             ORDER BY seq",
        )?;

        let rows = stmt.query_map(params![collection, path, filter.value], row_to_document)?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, json) = row?;
            match parse_body(&json) {
                Ok(data) => documents.push(Document { id, data }),
                Err(e) => tracing::warn!(collection, id = %id, "skipping unreadable document: {e}"),
            }
        }
        Ok(documents)
    }

    fn subscribe(
        &self,
        collection: &str,
        filter: FieldFilter,
        mut callback: SnapshotCallback,
    ) -> Result<Subscription, StoreError> {
        let snapshot = self.query(collection, &filter)?;

        let mut registry = self.lock_listeners();
        let id = registry.next_id;
        registry.next_id += 1;
        callback(snapshot);
        registry.listeners.push(Listener {
            id,
            collection: collection.to_string(),
            filter,
            callback,
        });
        tracing::debug!(listener = id, collection, "listener registered");

        let registry = Arc::downgrade(&self.listeners);
        Ok(Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
                registry.listeners.retain(|l| l.id != id);
                tracing::debug!(listener = id, "listener released");
            }
        }))
    }

    fn poll_remote_changes(&self) -> Result<bool, StoreError> {
        let current = read_data_version(&*self.db.lock()?)?;
        {
            let mut seen = self.data_version.lock().map_err(|_| StoreError::Poisoned)?;
            if *seen == current {
                return Ok(false);
            }
            *seen = current;
        }
        tracing::debug!(data_version = current, "external change detected");
        self.notify(None);
        Ok(true)
    }
}

#[cfg(test)]
impl SqliteStore {
    pub(crate) fn listener_count(&self) -> usize {
        self.lock_listeners().listeners.len()
    }
}
