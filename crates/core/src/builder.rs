use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{ChatError, Result, UploadFailure};
use crate::record::{StoreDirectory, StoreRecord};
use crate::remote::RemoteFiles;

pub const DEFAULT_UPLOAD_DELAY: Duration = Duration::from_secs(1);

/// Progress notifications emitted while a store is being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Started {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    Uploaded {
        path: PathBuf,
        remote_name: String,
    },
    Failed {
        path: PathBuf,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub record: StoreRecord,
    pub path: PathBuf,
    pub attempted: usize,
    pub failures: Vec<UploadFailure>,
}

impl BuildReport {
    pub fn uploaded(&self) -> usize {
        self.record.files.len()
    }
}

pub struct StoreBuilder<'a, R: RemoteFiles + ?Sized> {
    remote: &'a R,
    directory: &'a StoreDirectory,
    delay: Duration,
}

impl<'a, R: RemoteFiles + ?Sized> StoreBuilder<'a, R> {
    pub fn new(remote: &'a R, directory: &'a StoreDirectory) -> Self {
        Self {
            remote,
            directory,
            delay: DEFAULT_UPLOAD_DELAY,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Uploads `files` one after another and persists a record for the ones
    /// that made it. A failed upload is reported and skipped; the build only
    /// fails when nothing was uploaded.
    pub fn build<F>(&self, name: &str, files: &[PathBuf], mut on_event: F) -> Result<BuildReport>
    where
        F: FnMut(&UploadEvent),
    {
        let total = files.len();
        let mut uploaded = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (index, path) in files.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                sleep(self.delay);
            }
            on_event(&UploadEvent::Started {
                index,
                total,
                path: path.clone(),
            });
            info!("uploading {} ({}/{})", path.display(), index + 1, total);
            match self.remote.upload_file(path) {
                Ok(file) => {
                    info!("uploaded {} as {}", path.display(), file.name);
                    on_event(&UploadEvent::Uploaded {
                        path: path.clone(),
                        remote_name: file.name.clone(),
                    });
                    uploaded.push(file.name);
                }
                Err(err) => {
                    let reason = format!("{err:#}");
                    warn!("failed to upload {}: {reason}", path.display());
                    on_event(&UploadEvent::Failed {
                        path: path.clone(),
                        reason: reason.clone(),
                    });
                    failures.push(UploadFailure {
                        path: path.clone(),
                        reason,
                    });
                }
            }
        }
        if uploaded.is_empty() {
            return Err(ChatError::NoFilesUploaded { attempted: total });
        }
        let record = StoreRecord::new(name, uploaded);
        let path = self.directory.save(&record)?;
        info!(
            "store {} saved to {} ({}/{} files)",
            record.id,
            path.display(),
            record.files.len(),
            total
        );
        Ok(BuildReport {
            record,
            path,
            attempted: total,
            failures,
        })
    }
}

/// PDFs directly inside `folder`, sorted by path.
pub fn discover_pdfs(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(ChatError::FolderNotFound(folder.to_path_buf()));
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| ChatError::Io(err.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf {
            found.push(entry.into_path());
        }
    }
    if found.is_empty() {
        return Err(ChatError::NoPdfFiles(folder.to_path_buf()));
    }
    found.sort();
    Ok(found)
}
