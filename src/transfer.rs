// 📦 Import / Export - JSON files of quotes
//
// Export writes the full list, pretty-printed, as `quotes.json`.
// Import accepts a JSON array of objects with `text` and `category`.
// Ids in the payload are ignored: imported quotes are renumbered above the
// current maximum so reconciliation can keep matching on id. A payload with
// any invalid element is rejected as a whole.

use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ValidationError;
use crate::quote::{NewQuote, Quote};
use crate::store::QuoteStore;

pub const EXPORT_FILE_NAME: &str = "quotes.json";

/// Parse and validate an import payload without touching any store.
pub fn parse_import(payload: &str) -> Result<Vec<NewQuote>, ValidationError> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| ValidationError::invalid_import(format!("Error parsing JSON file: {}", e)))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        other => {
            return Err(ValidationError::invalid_import(format!(
                "expected a JSON array, found {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| -> Result<NewQuote, ValidationError> {
            let input: NewQuote = serde_json::from_value(item).map_err(|e| {
                ValidationError::invalid_import(format!("entry {}: {}", index, e))
            })?;
            input
                .validated()
                .map_err(|e| ValidationError::invalid_import(format!("entry {}: {}", index, e)))
        })
        .collect()
}

/// Import a payload into `store`. All-or-nothing; persists once.
pub fn import_json(store: &mut QuoteStore, payload: &str) -> Result<Vec<Quote>, ValidationError> {
    let inputs = parse_import(payload)?;
    let added = store.append_all(inputs)?;
    info!("Imported {} quotes", added.len());
    Ok(added)
}

pub fn import_file(store: &mut QuoteStore, path: &Path) -> Result<Vec<Quote>> {
    let payload = fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file {}", path.display()))?;
    let added = import_json(store, &payload)?;
    Ok(added)
}

pub fn export_json(store: &QuoteStore) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(store.list())
}

/// Write `quotes.json` into `dir` and return its path.
pub fn export_to_dir(store: &QuoteStore, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let path = dir.join(EXPORT_FILE_NAME);
    let payload = export_json(store).context("Failed to serialize quotes")?;
    fs::write(&path, payload)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Exported {} quotes to {}", store.len(), path.display());
    Ok(path)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// ============================================================================
// TESTS
// ============================================================================
