//! Configuration loading and representation.
//!
//! Everything comes from `GUESTBOOK_*` environment variables with defaults
//! suitable for local development.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use guestbook_core::LedgerId;

use crate::event_store::{
    EventStore, EventStoreError, FileEventStore, FileStoreConfig, InMemoryEventStore,
};

pub const ENV_STORE: &str = "GUESTBOOK_STORE";
pub const ENV_DATA_DIR: &str = "GUESTBOOK_DATA_DIR";
pub const ENV_SYNC_WRITES: &str = "GUESTBOOK_SYNC_WRITES";
pub const ENV_LIST_WINDOW: &str = "GUESTBOOK_LIST_WINDOW";
pub const ENV_LEDGER_ID: &str = "GUESTBOOK_LEDGER_ID";
pub const ENV_BIND_ADDR: &str = "GUESTBOOK_BIND_ADDR";

/// Number of messages `list` returns when the host does not say otherwise.
pub const DEFAULT_LIST_WINDOW: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestbookConfig {
    pub store: StoreBackend,
    pub data_dir: PathBuf,
    pub sync_writes: bool,
    pub list_window: usize,
    /// Stream the host serves; stable across restarts so file stores reopen
    /// the same guestbook. Defaults to the nil UUID.
    pub ledger_id: LedgerId,
    pub bind_addr: String,
}

impl Default for GuestbookConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::Memory,
            data_dir: PathBuf::from("./data/ledger"),
            sync_writes: true,
            list_window: DEFAULT_LIST_WINDOW,
            ledger_id: LedgerId::from_uuid(uuid::Uuid::nil()),
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl GuestbookConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (tests pass a map instead of the process env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_STORE) {
            config.store = match value.to_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "file" => StoreBackend::File,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: ENV_STORE,
                        value,
                        reason: "expected `memory` or `file`",
                    });
                }
            };
        }

        if let Some(value) = lookup(ENV_DATA_DIR) {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key: ENV_DATA_DIR,
                    value,
                    reason: "must not be empty",
                });
            }
            config.data_dir = PathBuf::from(value);
        }

        if let Some(value) = lookup(ENV_SYNC_WRITES) {
            config.sync_writes = match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: ENV_SYNC_WRITES,
                        value,
                        reason: "expected a boolean",
                    });
                }
            };
        }

        if let Some(value) = lookup(ENV_LIST_WINDOW) {
            config.list_window = match value.trim().parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: ENV_LIST_WINDOW,
                        value,
                        reason: "expected a positive integer",
                    });
                }
            };
        }

        if let Some(value) = lookup(ENV_LEDGER_ID) {
            config.ledger_id = match value.trim().parse::<LedgerId>() {
                Ok(id) => id,
                Err(_) => {
                    return Err(ConfigError::Invalid {
                        key: ENV_LEDGER_ID,
                        value,
                        reason: "expected a UUID",
                    });
                }
            };
        }

        if let Some(value) = lookup(ENV_BIND_ADDR) {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key: ENV_BIND_ADDR,
                    value,
                    reason: "must not be empty",
                });
            }
            config.bind_addr = value;
        }

        Ok(config)
    }

    /// Build the configured event store.
    pub fn open_store(&self) -> Result<Arc<dyn EventStore>, EventStoreError> {
        let store: Arc<dyn EventStore> = match self.store {
            StoreBackend::Memory => {
                tracing::warn!("using in-memory event store; messages will not survive restart");
                Arc::new(InMemoryEventStore::new())
            }
            StoreBackend::File => Arc::new(FileEventStore::open(FileStoreConfig {
                base_dir: self.data_dir.clone(),
                sync_on_write: self.sync_writes,
            })?),
        };
        Ok(store)
    }
}
