use tracing::{info, warn};

use crate::error::{ChatError, FileResolutionFailure, Result};
use crate::record::{StoreDirectory, StoreRecord};
use crate::remote::{RemoteFile, RemoteFiles};

/// Result of re-resolving a persisted store against the remote service.
#[derive(Debug, Clone)]
pub struct LoadedStore {
    pub record: StoreRecord,
    pub files: Vec<RemoteFile>,
    pub failures: Vec<FileResolutionFailure>,
}

pub struct StoreLoader<'a, R: RemoteFiles + ?Sized> {
    remote: &'a R,
    directory: &'a StoreDirectory,
}

impl<'a, R: RemoteFiles + ?Sized> StoreLoader<'a, R> {
    pub fn new(remote: &'a R, directory: &'a StoreDirectory) -> Self {
        Self { remote, directory }
    }

    pub fn load(&self, id: &str) -> Result<LoadedStore> {
        let record = self.directory.load(id)?;
        let mut files = Vec::with_capacity(record.files.len());
        let mut failures = Vec::new();
        for name in &record.files {
            match self.remote.get_file(name) {
                Ok(file) => files.push(file),
                Err(err) => {
                    let reason = format!("{err:#}");
                    warn!("could not load file {name}: {reason}");
                    failures.push(FileResolutionFailure {
                        name: name.clone(),
                        reason,
                    });
                }
            }
        }
        if files.is_empty() {
            return Err(ChatError::NoFilesAvailable(record.id));
        }
        info!(
            "loaded store {} ({}): {}/{} files",
            record.id,
            record.name,
            files.len(),
            record.files.len()
        );
        Ok(LoadedStore {
            record,
            files,
            failures,
        })
    }
}
