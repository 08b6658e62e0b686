use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("folder {0:?} does not exist")]
    FolderNotFound(PathBuf),
    #[error("no PDF files found in {0:?}")]
    NoPdfFiles(PathBuf),
    #[error("no files uploaded successfully ({attempted} attempted)")]
    NoFilesUploaded { attempted: usize },
    #[error("invalid store id: {0}")]
    InvalidStoreId(String),
    #[error("store file {0:?} not found")]
    StoreNotFound(PathBuf),
    #[error("no files available in store {0}")]
    NoFilesAvailable(String),
    #[error("no suitable model found (tried: {})", tried.join(", "))]
    ModelUnavailable { tried: Vec<String> },
    #[error("generation failed: {0}")]
    GenerationFailure(String),
    #[error("no conversation turn at index {0}")]
    UnknownTurn(usize),
}

pub type Result<T> = std::result::Result<T, ChatError>;

/// A single local file that could not be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// A single remote identifier that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResolutionFailure {
    pub name: String,
    pub reason: String,
}
