// Quote Sync - Core Library
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod categories;
pub mod config;
pub mod errors;
pub mod logging;
pub mod persistence;
pub mod quote;
pub mod reconciliation;
pub mod remote;
pub mod store;
pub mod sync;
pub mod transfer;

// Re-export commonly used types
pub use categories::{CategoryIndex, ALL_CATEGORIES};
pub use config::Config;
pub use logging::LogFormat;
pub use errors::{PersistenceError, RemoteError, ValidationError};
pub use persistence::{JsonFileGateway, MemoryGateway, PersistenceGateway, SqliteGateway};
pub use quote::{seed_quotes, NewQuote, Quote};
pub use reconciliation::{ReconciliationEngine, ReconciliationReport};
pub use remote::{HttpRemoteSource, RemoteSource};
pub use store::QuoteStore;
pub use sync::{lock_store, shared, SharedStore, SyncScheduler, TickOutcome};
pub use transfer::{
    export_json, export_to_dir, import_file, import_json, parse_import, EXPORT_FILE_NAME,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Open the configured store: a JSON file when `db_path` ends in `.json`,
/// SQLite otherwise. Falls back to memory if the database cannot be opened.
pub fn open_store(config: &Config) -> QuoteStore {
    if config.uses_json_file() {
        log::debug!("Using JSON file store {}", config.db_path);
        return QuoteStore::initialize(Box::new(JsonFileGateway::new(&config.db_path)));
    }

    match SqliteGateway::open(&config.db_path) {
        Ok(gateway) => QuoteStore::initialize(Box::new(gateway)),
        Err(e) => {
            log::warn!(
                "Cannot open {}, quotes will not be persisted: {}",
                config.db_path,
                e
            );
            QuoteStore::in_memory()
        }
    }
}
