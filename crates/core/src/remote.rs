use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A file already uploaded to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Service-assigned identifier, e.g. `files/abc123`.
    pub name: String,
    pub uri: String,
    pub mime_type: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// File operations the store builder and loader need from the remote service.
pub trait RemoteFiles {
    fn upload_file(&self, path: &Path) -> Result<RemoteFile>;
    fn get_file(&self, name: &str) -> Result<RemoteFile>;
}

/// One prompt plus the files it should be answered against.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub prompt: String,
    pub files: &'a [RemoteFile],
}

impl<'a> ChatRequest<'a> {
    pub fn new(prompt: String, files: &'a [RemoteFile]) -> Self {
        Self { prompt, files }
    }
}

pub trait GenerativeModel {
    fn model_name(&self) -> &str;
    fn generate(&self, request: &ChatRequest<'_>) -> Result<ModelResponse>;
}

/// Provider-neutral view of a generation result. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub grounding_attributions: Vec<GroundingAttribution>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingAttribution {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

impl GroundingAttribution {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            uri: None,
        }
    }

    pub fn linked(uri: impl Into<String>) -> Self {
        Self {
            title: None,
            uri: Some(uri.into()),
        }
    }
}
