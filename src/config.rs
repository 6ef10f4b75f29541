use log::warn;
use std::{net::SocketAddr, time::Duration};

use crate::logging::LogFormat;

pub const DEFAULT_REMOTE_URL: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub remote_url: String,
    pub remote_limit: usize,
    pub remote_category: String,
    pub sync_interval: Duration,
    pub request_timeout: Duration,
    pub listen_addr: SocketAddr,
    pub log_format: LogFormat,
    /// Filter directives used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "quotes.db".into(),
            remote_url: DEFAULT_REMOTE_URL.into(),
            remote_limit: 10,
            remote_category: "Server".into(),
            sync_interval: Duration::from_secs(10),
            request_timeout: Duration::from_millis(30000),
            listen_addr: default_listen_addr(),
            log_format: LogFormat::Text,
            log_level: "info".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup("QUOTES_DB_PATH").unwrap_or(defaults.db_path);
        let remote_url = lookup("QUOTES_REMOTE_URL").unwrap_or(defaults.remote_url);
        let remote_limit = lookup("QUOTES_REMOTE_LIMIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.remote_limit);
        let remote_category = lookup("QUOTES_REMOTE_CATEGORY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.remote_category);
        let sync_secs: u64 = lookup("QUOTES_SYNC_INTERVAL_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(defaults.sync_interval.as_secs());
        let timeout_ms: u64 = lookup("QUOTES_REQUEST_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(30000);
        let listen_addr = match lookup("QUOTES_LISTEN_ADDR") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("Invalid QUOTES_LISTEN_ADDR {:?}, using {}", raw, DEFAULT_LISTEN_ADDR);
                defaults.listen_addr
            }),
            None => defaults.listen_addr,
        };
        let log_format = match lookup("QUOTES_LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).unwrap_or_else(|| {
                warn!("Unknown QUOTES_LOG_FORMAT {:?}, using text", raw);
                defaults.log_format
            }),
            None => defaults.log_format,
        };
        let log_level = lookup("QUOTES_LOG_LEVEL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.log_level);

        Self {
            db_path,
            remote_url,
            remote_limit,
            remote_category,
            sync_interval: Duration::from_secs(sync_secs),
            request_timeout: Duration::from_millis(timeout_ms),
            listen_addr,
            log_format,
            log_level,
        }
    }

    /// True when the store should be a plain JSON file instead of SQLite.
    pub fn uses_json_file(&self) -> bool {
        std::path::Path::new(&self.db_path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}
