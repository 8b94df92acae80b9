//! Server configuration from environment variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `TIMELINE_DATA_DIR` | `data` |
//! | `TIMELINE_HOST` | `0.0.0.0` |
//! | `TIMELINE_PORT` | `3040` |
//! | `TIMELINE_SNAPSHOT_THRESHOLD` | `1000` |
//! | `TIMELINE_JWT_SECRET` | loaded from / generated into `.jwt_secret` |
//! | `TIMELINE_LOG` | `info` |

use std::path::PathBuf;

use crate::event_store::EventStoreConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub snapshot_threshold: usize,
    pub jwt_secret: Option<String>,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3040,
            data_dir: PathBuf::from("data"),
            snapshot_threshold: 1000,
            jwt_secret: None,
            log_filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable numbers keep their default
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("TIMELINE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup("TIMELINE_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("TIMELINE_PORT") {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(_) => tracing::warn!(%port, "ignoring invalid TIMELINE_PORT"),
            }
        }
        if let Some(threshold) = lookup("TIMELINE_SNAPSHOT_THRESHOLD") {
            match threshold.parse::<usize>() {
                Ok(n) if n > 0 => config.snapshot_threshold = n,
                _ => tracing::warn!(%threshold, "ignoring invalid TIMELINE_SNAPSHOT_THRESHOLD"),
            }
        }
        config.jwt_secret = lookup("TIMELINE_JWT_SECRET");
        if let Some(filter) = lookup("TIMELINE_LOG") {
            config.log_filter = filter;
        }

        config
    }

    /// Socket address string, e.g. `0.0.0.0:3040`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn store_config(&self) -> EventStoreConfig {
        EventStoreConfig::new(&self.data_dir).with_snapshot_threshold(self.snapshot_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.bind_addr(), "0.0.0.0:3040");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.snapshot_threshold, 1000);
        assert!(config.jwt_secret.is_none());
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("TIMELINE_DATA_DIR", "/var/lib/timeline"),
            ("TIMELINE_HOST", "127.0.0.1"),
            ("TIMELINE_PORT", "8080"),
            ("TIMELINE_SNAPSHOT_THRESHOLD", "50"),
            ("TIMELINE_LOG", "debug"),
        ]));

        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        let store = config.store_config();
        assert_eq!(store.events_path(), PathBuf::from("/var/lib/timeline/events.jsonl"));
        assert_eq!(store.snapshot_threshold, 50);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_invalid_numbers_keep_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("TIMELINE_PORT", "http"),
            ("TIMELINE_SNAPSHOT_THRESHOLD", "0"),
        ]));
        assert_eq!(config.port, 3040);
        assert_eq!(config.snapshot_threshold, 1000);
    }
}
