use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::market::types::{SearchOrigin, SearchResult, StockInstrument};
use crate::state::stock::RECENT_SEARCH_LIMIT;

/// Fixed key under which the recent-search list is persisted.
pub const RECENT_SEARCHES_KEY: &str = "app_recent_searches_v1";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Seam to the on-device key-value collaborator. Implementations must
/// tolerate a missing key (first run) and malformed content.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .expect("kv lock poisoned")
            .get(key)
            .cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .expect("kv lock poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Key-value store backed by a single JSON object file.
pub struct FileKvStore {
    path: PathBuf,
}

impl FileKvStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn read_entries(&self) -> Result<serde_json::Map<String, Value>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(serde_json::Map::new());
            }
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "kv file is not a JSON object, starting empty");
                Ok(serde_json::Map::new())
            }
        }
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.read_entries().await?;
        Ok(entries
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries().await?;
        entries.insert(key.to_string(), Value::String(value.to_string()));
        let serialized = serde_json::to_string(&Value::Object(entries))?;
        tokio::fs::write(&self.path, serialized).await?;
        Ok(())
    }
}

/// Durable copy of the recent-search list. Load failures degrade to an
/// empty list and malformed entries are dropped one by one; persistence
/// failures are logged and never surfaced to the store.
pub struct RecentSearchStore {
    kv: Arc<dyn KvStore>,
}

impl RecentSearchStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn load(&self) -> Vec<SearchResult> {
        let raw = match self.kv.get(RECENT_SEARCHES_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to read recent searches");
                return Vec::new();
            }
        };
        let values: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(values) => values,
            Err(err) => {
                warn!(error = %err, "recent searches corrupt, starting empty");
                return Vec::new();
            }
        };
        values
            .into_iter()
            .filter_map(|value| {
                let stock: StockInstrument = match serde_json::from_value(value) {
                    Ok(stock) => stock,
                    Err(err) => {
                        debug!(error = %err, "dropping malformed recent search entry");
                        return None;
                    }
                };
                if stock.symbol.is_empty() || stock.name.is_empty() {
                    debug!(symbol = %stock.symbol, "dropping incomplete recent search entry");
                    return None;
                }
                Some(SearchResult {
                    stock,
                    origin: SearchOrigin::Recent,
                })
            })
            .take(RECENT_SEARCH_LIMIT)
            .collect()
    }

    pub async fn save(&self, recents: &[SearchResult]) {
        let stocks: Vec<&StockInstrument> = recents.iter().map(|entry| &entry.stock).collect();
        let serialized = match serde_json::to_string(&stocks) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(error = %err, "failed to encode recent searches");
                return;
            }
        };
        if let Err(err) = self.kv.set(RECENT_SEARCHES_KEY, &serialized).await {
            warn!(error = %err, "failed to persist recent searches");
        }
    }
}
