use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ChatError, Result};

/// Persisted mapping from a local store id to the remote files it groups.
///
/// The JSON shape `{ "id", "name", "files" }` is read back by every loader,
/// so fields must not be renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub files: Vec<String>,
}

impl StoreRecord {
    pub fn new(name: impl Into<String>, files: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            files,
        }
    }
}

/// Directory holding one `<id>.json` document per store.
#[derive(Debug, Clone)]
pub struct StoreDirectory {
    root: PathBuf,
}

impl StoreDirectory {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &str) -> Result<PathBuf> {
        let parsed = Uuid::parse_str(id.trim())
            .map_err(|_| ChatError::InvalidStoreId(id.to_string()))?;
        Ok(self.root.join(format!("{}.json", parsed.hyphenated())))
    }

    pub fn save(&self, record: &StoreRecord) -> Result<PathBuf> {
        let path = self.path_for(&record.id)?;
        fs::create_dir_all(&self.root)?;
        let bytes = serde_json::to_vec(record)?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    pub fn load(&self, id: &str) -> Result<StoreRecord> {
        let path = self.path_for(id)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ChatError::StoreNotFound(path))
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Every readable store document in the directory, sorted by name then id.
    /// Files that are not store documents are skipped.
    pub fn list(&self) -> Result<Vec<StoreRecord>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let Some(stem) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|_| path.extension().and_then(|e| e.to_str()) == Some("json"))
            else {
                continue;
            };
            if Uuid::parse_str(stem).is_err() {
                continue;
            }
            match fs::read(&path)
                .map_err(ChatError::from)
                .and_then(|raw| serde_json::from_slice::<StoreRecord>(&raw).map_err(Into::into))
            {
                Ok(record) => records.push(record),
                Err(err) => tracing::warn!("skipping unreadable store {}: {err}", path.display()),
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }
}
