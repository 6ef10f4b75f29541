// 💾 Persistence Gateways - durable key/value storage for the quote list
//
// The store writes its entire list after every mutation and reads it back
// once at startup. Missing or corrupt data loads as "nothing persisted".
//
// Three gateways:
// - MemoryGateway: shared in-process slot (tests, ephemeral runs)
// - JsonFileGateway: one pretty-printed JSON file
// - SqliteGateway: key/value table in a WAL-mode SQLite database

use chrono::Utc;
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::errors::PersistenceError;
use crate::quote::Quote;

/// Storage key for the quote list
pub const QUOTES_KEY: &str = "quotes";

/// Storage key for the last quote shown to the user
pub const LAST_VIEWED_KEY: &str = "last_quote";

// ============================================================================
// GATEWAY CONTRACT
// ============================================================================

pub trait PersistenceGateway: Send {
    /// Previously saved quotes, or `None` when absent or unreadable.
    fn load(&self) -> Option<Vec<Quote>>;

    /// Replace the saved list with `quotes`.
    fn save(&mut self, quotes: &[Quote]) -> Result<(), PersistenceError>;

    fn load_last_viewed(&self) -> Option<Quote> {
        None
    }

    fn save_last_viewed(&mut self, _quote: &Quote) -> Result<(), PersistenceError> {
        Ok(())
    }
}

// ============================================================================
// MEMORY GATEWAY
// ============================================================================

#[derive(Debug, Default)]
struct MemorySlots {
    quotes: Option<String>,
    last_viewed: Option<String>,
    save_count: usize,
    fail_saves: bool,
}

/// In-process gateway. Clones share the same slots, so a test can keep one
/// handle while the store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    slots: Arc<Mutex<MemorySlots>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway pre-loaded with a raw payload, as if written by an earlier run.
    pub fn with_raw(payload: impl Into<String>) -> Self {
        let gateway = Self::new();
        gateway.slots().quotes = Some(payload.into());
        gateway
    }

    pub fn with_quotes(quotes: &[Quote]) -> Self {
        let payload = serde_json::to_string(quotes).unwrap_or_default();
        Self::with_raw(payload)
    }

    /// Make every subsequent save fail with an I/O error.
    pub fn fail_saves(&self, fail: bool) {
        self.slots().fail_saves = fail;
    }

    pub fn save_count(&self) -> usize {
        self.slots().save_count
    }

    pub fn raw(&self) -> Option<String> {
        self.slots().quotes.clone()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, MemorySlots> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PersistenceGateway for MemoryGateway {
    fn load(&self) -> Option<Vec<Quote>> {
        decode_quotes(self.slots().quotes.as_deref()?)
    }

    fn save(&mut self, quotes: &[Quote]) -> Result<(), PersistenceError> {
        let mut slots = self.slots();
        if slots.fail_saves {
            return Err(PersistenceError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "memory gateway configured to fail",
            )));
        }
        slots.quotes = Some(serde_json::to_string(quotes)?);
        slots.save_count += 1;
        Ok(())
    }

    fn load_last_viewed(&self) -> Option<Quote> {
        let raw = self.slots().last_viewed.clone()?;
        serde_json::from_str(&raw).ok()
    }

    fn save_last_viewed(&mut self, quote: &Quote) -> Result<(), PersistenceError> {
        self.slots().last_viewed = Some(serde_json::to_string(quote)?);
        Ok(())
    }
}

// ============================================================================
// JSON FILE GATEWAY
// ============================================================================

/// Stores the list in one JSON file; the last viewed quote sits next to it
/// in `last_quote.json`.
#[derive(Debug, Clone)]
pub struct JsonFileGateway {
    path: PathBuf,
}

impl JsonFileGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn last_viewed_path(&self) -> PathBuf {
        self.path.with_file_name(format!("{}.json", LAST_VIEWED_KEY))
    }

    fn write(path: &Path, contents: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }
}

impl PersistenceGateway for JsonFileGateway {
    fn load(&self) -> Option<Vec<Quote>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => decode_quotes(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save(&mut self, quotes: &[Quote]) -> Result<(), PersistenceError> {
        let payload = serde_json::to_string_pretty(quotes)?;
        Self::write(&self.path, &payload)
    }

    fn load_last_viewed(&self) -> Option<Quote> {
        let raw = fs::read_to_string(self.last_viewed_path()).ok()?;
        serde_json::from_str(&raw).ok()
    }

    fn save_last_viewed(&mut self, quote: &Quote) -> Result<(), PersistenceError> {
        let payload = serde_json::to_string(quote)?;
        Self::write(&self.last_viewed_path(), &payload)
    }
}

// ============================================================================
// SQLITE GATEWAY
// ============================================================================

pub struct SqliteGateway {
    conn: Connection,
}

impl SqliteGateway {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, PersistenceError> {
        setup_database(&conn)?;
        Ok(Self { conn })
    }

    /// Raw value stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn put(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

pub fn setup_database(conn: &Connection) -> Result<(), PersistenceError> {
    // WAL for crash recovery; in-memory databases report "memory" instead
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!("SQLite journal mode: {}", mode);

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

impl PersistenceGateway for SqliteGateway {
    fn load(&self) -> Option<Vec<Quote>> {
        match self.get(QUOTES_KEY) {
            Ok(raw) => decode_quotes(&raw?),
            Err(e) => {
                warn!("Failed to read persisted quotes: {}", e);
                None
            }
        }
    }

    fn save(&mut self, quotes: &[Quote]) -> Result<(), PersistenceError> {
        let payload = serde_json::to_string(quotes)?;
        self.put(QUOTES_KEY, &payload)
    }

    fn load_last_viewed(&self) -> Option<Quote> {
        let raw = self.get(LAST_VIEWED_KEY).ok()??;
        serde_json::from_str(&raw).ok()
    }

    fn save_last_viewed(&mut self, quote: &Quote) -> Result<(), PersistenceError> {
        let payload = serde_json::to_string(quote)?;
        self.put(LAST_VIEWED_KEY, &payload)
    }
}

fn decode_quotes(raw: &str) -> Option<Vec<Quote>> {
    match serde_json::from_str::<Vec<Quote>>(raw) {
        Ok(quotes) => Some(quotes),
        Err(e) => {
            warn!("Ignoring corrupt persisted quotes: {}", e);
            None
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
