use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

const DATA_EXTENSION: &str = "data";
const VERSION_KEY: &str = "version";

/// Key-value persistence consumed by the repositories.
pub trait Storage: Send + Sync {
    fn load(&self, key: &str) -> anyhow::Result<Option<Value>>;

    fn save(&self, key: &str, value: &Value) -> anyhow::Result<()>;

    /// Full snapshot of everything stored, or `None` when it cannot be read.
    fn export_data(&self) -> Option<Value>;
}

pub fn load_collection<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> anyhow::Result<Vec<T>> {
    match storage.load(key)? {
        Some(value) => serde_json::from_value(value)
            .with_context(|| format!("failed parsing stored collection {key}")),
        None => Ok(vec![]),
    }
}

pub fn save_collection<T: Serialize>(
    storage: &dyn Storage,
    key: &str,
    items: &[T],
) -> anyhow::Result<()> {
    let value = serde_json::to_value(items)
        .with_context(|| format!("failed serializing collection {key}"))?;
    storage.save(key, &value)
}

fn snapshot(namespace: &str, version: &str, data: BTreeMap<String, Value>) -> Value {
    json!({
        "app": namespace,
        "version": version,
        "exportedAt": Utc::now().to_rfc3339(),
        "data": data,
    })
}

fn validate_key(key: &str) -> anyhow::Result<()> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(anyhow!("invalid storage key: {key:?}"))
    }
}

/// One `<key>.data` JSON file per key under `<data_dir>/<namespace>`.
#[derive(Debug)]
pub struct FileStorage {
    pub root: PathBuf,
    pub namespace: String,
    pub version: String,
}

impl FileStorage {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path, namespace: &str, version: &str) -> anyhow::Result<Self> {
        validate_key(namespace).context("invalid storage namespace")?;
        let root = data_dir.join(namespace);
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create {}", root.display()))?;

        let storage = Self {
            root,
            namespace: namespace.to_string(),
            version: version.to_string(),
        };

        // Writing the version marker proves the directory is usable.
        storage
            .save(VERSION_KEY, &Value::String(version.to_string()))
            .with_context(|| format!("storage at {} is not writable", storage.root.display()))?;

        info!(
            root = %storage.root.display(),
            namespace,
            version,
            "opened storage"
        );
        Ok(storage)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.{DATA_EXTENSION}"))
    }

    fn read_all(&self) -> anyhow::Result<BTreeMap<String, Value>> {
        let mut out = BTreeMap::new();
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("failed listing {}", self.root.display()))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DATA_EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if key == VERSION_KEY {
                continue;
            }
            if let Some(value) = self.load(key)? {
                out.insert(key.to_string(), value);
            }
        }

        Ok(out)
    }
}

impl Storage for FileStorage {
    #[tracing::instrument(skip(self))]
    fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        validate_key(key)?;
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let value = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", path.display()))?;
        debug!(file = %path.display(), "loaded key");
        Ok(Some(value))
    }

    #[tracing::instrument(skip(self, value))]
    fn save(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        debug!(file = %path.display(), "saving key atomically");

        let mut temp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer(&mut temp, value)?;
        writeln!(temp)?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn export_data(&self) -> Option<Value> {
        match self.read_all() {
            Ok(data) => {
                info!(keys = data.len(), "exporting storage snapshot");
                Some(snapshot(&self.namespace, &self.version, data))
            }
            Err(err) => {
                error!(error = %format!("{err:#}"), "failed to build storage snapshot");
                None
            }
        }
    }
}

/// Process-local storage; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    namespace: String,
    version: String,
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new(namespace: &str, version: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            version: version.to_string(),
            entries: Mutex::new(BTreeMap::new()),
        }
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        validate_key(key)?;
        Ok(self.entries.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        validate_key(key)?;
        self.entries.lock().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn export_data(&self) -> Option<Value> {
        let data = self.entries.lock().clone();
        Some(snapshot(&self.namespace, &self.version, data))
    }
}
