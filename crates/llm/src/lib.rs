use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_LENGTH;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use paperchat_core::{
    select_first_available, Candidate, ChatRequest, GenerativeModel, GroundingAttribution,
    ModelInfo, ModelResponse, RemoteFile, RemoteFiles,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
const API_VERSION: &str = "v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 300;
const MODEL_PAGE_SIZE: u32 = 1000;

/// Blocking client for the Gemini REST API: file upload and lookup, model
/// discovery and `generateContent` against uploaded files.
pub struct GeminiClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: SecretString) -> Result<Self> {
        validate_api_key(api_key.expose_secret())?;
        let timeout = env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            api_key,
            base_url: env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: paperchat_core::DEFAULT_MODEL_CANDIDATES[0].to_string(),
        })
    }

    /// Client configured from `GEMINI_API_KEY` (and `GEMINI_BASE_URL` when set).
    pub fn from_env() -> Result<Self> {
        Self::new(read_api_key()?)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            API_VERSION,
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("x-goog-api-key", self.api_key.expose_secret())
    }

    /// Cheap liveness check: fetches the model's metadata without generating.
    pub fn probe_model(&self, name: &str) -> Result<ModelInfo> {
        let url = self.api_url(&format!("models/{}", strip_models_prefix(name)));
        debug!("probing {url}");
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .with_context(|| format!("gemini model lookup for {name} failed"))?;
        let model: WireModel = check_status(response, "gemini model lookup")?
            .json()
            .context("failed to decode gemini model")?;
        Ok(model.into())
    }

    /// First of `candidates` that answers a probe.
    pub fn select_model(&self, candidates: &[String]) -> paperchat_core::Result<String> {
        select_first_available(candidates, |name| self.probe_model(name).map(|_| ()))
    }

    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.api_url("models");
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .authorized(self.http.get(&url))
                .query(&[("pageSize", MODEL_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let response = request.send().context("gemini list models failed")?;
            let page: WireModelList = check_status(response, "gemini list models")?
                .json()
                .context("failed to decode gemini model list")?;
            models.extend(page.models.into_iter().map(ModelInfo::from));
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(models)
    }

    fn generate_content(&self, request: &ChatRequest<'_>) -> Result<ModelResponse> {
        let mut parts = vec![json!({ "text": request.prompt })];
        for file in request.files {
            parts.push(json!({
                "fileData": {
                    "mimeType": file.mime_type,
                    "fileUri": file.uri,
                }
            }));
        }
        let payload = json!({
            "contents": [ { "role": "user", "parts": parts } ]
        });
        let url = self.api_url(&format!(
            "models/{}:generateContent",
            strip_models_prefix(&self.model)
        ));
        debug!("generating with {} ({} files)", self.model, request.files.len());
        let response = self
            .authorized(self.http.post(&url))
            .json(&payload)
            .send()
            .context("gemini request failed")?;
        let value: Value = check_status(response, "gemini generateContent")?
            .json()
            .context("failed to decode gemini response")?;
        to_model_response(value)
    }
}

impl RemoteFiles for GeminiClient {
    fn upload_file(&self, path: &Path) -> Result<RemoteFile> {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = mime_for(path);
        let start_url = format!(
            "{}/upload/{}/files",
            self.base_url.trim_end_matches('/'),
            API_VERSION
        );
        let start = self
            .authorized(self.http.post(&start_url))
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .with_context(|| format!("gemini upload start failed for {display_name}"))?;
        let start = check_status(start, "gemini upload start")?;
        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("gemini upload start returned no upload url"))?;
        let length = bytes.len();
        let finished = self
            .http
            .post(upload_url)
            .header(CONTENT_LENGTH, length.to_string())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .with_context(|| format!("gemini upload failed for {display_name}"))?;
        let uploaded: WireUploadResponse = check_status(finished, "gemini upload")?
            .json()
            .context("failed to decode gemini upload response")?;
        Ok(uploaded.file.into())
    }

    fn get_file(&self, name: &str) -> Result<RemoteFile> {
        let resource = if name.starts_with("files/") {
            name.to_string()
        } else {
            format!("files/{name}")
        };
        let response = self
            .authorized(self.http.get(self.api_url(&resource)))
            .send()
            .with_context(|| format!("gemini file lookup for {name} failed"))?;
        let file: WireFile = check_status(response, "gemini file lookup")?
            .json()
            .context("failed to decode gemini file")?;
        Ok(file.into())
    }
}

impl GenerativeModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn generate(&self, request: &ChatRequest<'_>) -> Result<ModelResponse> {
        self.generate_content(request)
    }
}

pub fn read_api_key() -> Result<SecretString> {
    let value = env::var(API_KEY_VAR).map_err(|_| anyhow!("{API_KEY_VAR} is not set"))?;
    validate_api_key(&value)?;
    Ok(SecretString::new(value))
}

pub fn validate_api_key(value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("the Gemini API key is empty"));
    }
    if !trimmed.starts_with("AI") {
        return Err(anyhow!(
            "the Gemini API key must be a valid key (starts with 'AI...', see https://aistudio.google.com/)"
        ));
    }
    Ok(())
}

fn strip_models_prefix(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("md") => "text/markdown",
        _ => "application/octet-stream",
    }
}

fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .ok()
        .map(|wrapper| match (wrapper.error.status, wrapper.error.message) {
            (Some(status), Some(message)) => format!("{status}: {message}"),
            (None, Some(message)) => message,
            (Some(status), None) => status,
            (None, None) => body.clone(),
        })
        .unwrap_or(body);
    Err(anyhow!("{what} returned error (status {status}): {message}"))
}

/// Maps a raw `generateContent` body onto the provider-neutral response.
/// Grounding metadata is best effort: anything unrecognised is dropped.
fn to_model_response(value: Value) -> Result<ModelResponse> {
    let wire: WireGenerateResponse =
        serde_json::from_value(value).context("unexpected gemini response shape")?;
    let candidates: Vec<WireCandidate> = wire.candidates.unwrap_or_default();
    let text = candidates.first().and_then(|candidate| {
        let parts = candidate.content.as_ref()?.parts.as_ref()?;
        let joined: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    });
    if text.is_none() {
        if let Some(reason) = wire.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(anyhow!("prompt blocked by gemini: {reason}"));
        }
    }
    Ok(ModelResponse {
        text,
        candidates: candidates.into_iter().map(candidate_attributions).collect(),
    })
}

fn candidate_attributions(candidate: WireCandidate) -> Candidate {
    let mut grounding_attributions = Vec::new();
    if let Some(raw) = candidate.grounding_attributions {
        let entries: Vec<WireAttribution> = serde_json::from_value(raw).unwrap_or_default();
        for entry in entries {
            let uri = entry.uri.or_else(|| {
                entry
                    .source_id
                    .and_then(|source| source.semantic_retriever_chunk)
                    .and_then(|chunk| chunk.source)
            });
            grounding_attributions.push(GroundingAttribution {
                title: entry.title,
                uri,
            });
        }
    }
    if let Some(raw) = candidate.grounding_metadata {
        let metadata: WireGroundingMetadata = serde_json::from_value(raw).unwrap_or_default();
        for chunk in metadata.grounding_chunks {
            if let Some(source) = chunk.retrieved_context.or(chunk.web) {
                grounding_attributions.push(GroundingAttribution {
                    title: source.title,
                    uri: source.uri,
                });
            }
        }
    }
    Candidate {
        grounding_attributions,
    }
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

impl From<WireFile> for RemoteFile {
    fn from(file: WireFile) -> Self {
        RemoteFile {
            name: file.name,
            uri: file.uri.unwrap_or_default(),
            mime_type: file
                .mime_type
                .unwrap_or_else(|| "application/pdf".to_string()),
            display_name: file.display_name,
            state: file.state,
        }
    }
}

#[derive(Deserialize)]
struct WireUploadResponse {
    file: WireFile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireModel {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl From<WireModel> for ModelInfo {
    fn from(model: WireModel) -> Self {
        ModelInfo {
            name: model.name,
            display_name: model.display_name,
            description: model.description,
            supported_generation_methods: model.supported_generation_methods,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireModelList {
    #[serde(default)]
    models: Vec<WireModel>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerateResponse {
    #[serde(default)]
    candidates: Option<Vec<WireCandidate>>,
    #[serde(default)]
    prompt_feedback: Option<WirePromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    grounding_attributions: Option<Value>,
    #[serde(default)]
    grounding_metadata: Option<Value>,
}

#[derive(Deserialize)]
struct WireContent {
    #[serde(default)]
    parts: Option<Vec<WirePart>>,
}

#[derive(Deserialize)]
struct WirePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAttribution {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    source_id: Option<WireSourceId>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSourceId {
    #[serde(default)]
    semantic_retriever_chunk: Option<WireRetrieverChunk>,
}

#[derive(Default, Deserialize)]
struct WireRetrieverChunk {
    #[serde(default)]
    source: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireGroundingChunk>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGroundingChunk {
    #[serde(default)]
    web: Option<WireGroundingSource>,
    #[serde(default)]
    retrieved_context: Option<WireGroundingSource>,
}

#[derive(Default, Deserialize)]
struct WireGroundingSource {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperchat_core::{extract_citations, SourcesStyle};

    #[test]
    fn text_parts_are_joined_and_attributions_mapped() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [ { "text": "Transformers " }, { "text": "use attention." } ] },
                "groundingAttributions": [
                    { "title": "Paper A" },
                    { "uri": "https://x/y/Paper A.pdf" },
                    { "sourceId": { "semanticRetrieverChunk": { "source": "corpora/c/documents/survey", "chunk": "c1" } } },
                    { "title": "Paper A" }
                ]
            }]
        });
        let response = to_model_response(body).unwrap();
        assert_eq!(response.text.as_deref(), Some("Transformers use attention."));
        assert_eq!(
            extract_citations(&response, SourcesStyle::Line),
            "\n📚 Sources: Paper A, survey"
        );
    }

    #[test]
    fn grounding_metadata_chunks_are_understood() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [ { "text": "ok" } ] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://example.org/a", "title": "Example" } },
                        { "retrievedContext": { "uri": "gs://bucket/papers/bert.pdf" } }
                    ]
                }
            }]
        });
        let response = to_model_response(body).unwrap();
        let labels = paperchat_core::citation_labels(&response);
        assert_eq!(labels, vec!["Example".to_string(), "bert".to_string()]);
    }

    #[test]
    fn malformed_grounding_degrades_to_no_citations() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [ { "text": "still answered" } ] },
                "groundingAttributions": "not-a-list",
                "groundingMetadata": { "groundingChunks": 7 }
            }]
        });
        let response = to_model_response(body).unwrap();
        assert_eq!(response.text.as_deref(), Some("still answered"));
        assert_eq!(extract_citations(&response, SourcesStyle::Block), "");
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = to_model_response(body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn empty_body_has_no_text() {
        let response = to_model_response(json!({})).unwrap();
        assert_eq!(response, ModelResponse::default());
    }

    #[test]
    fn wire_file_maps_to_remote_file() {
        let file: WireFile = serde_json::from_value(json!({
            "name": "files/abc123",
            "displayName": "paper.pdf",
            "mimeType": "application/pdf",
            "sizeBytes": "1024",
            "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc123",
            "state": "ACTIVE"
        }))
        .unwrap();
        let remote: RemoteFile = file.into();
        assert_eq!(remote.name, "files/abc123");
        assert_eq!(remote.display_name.as_deref(), Some("paper.pdf"));
        assert_eq!(remote.state.as_deref(), Some("ACTIVE"));
    }

    #[test]
    fn model_list_page_decodes() {
        let page: WireModelList = serde_json::from_value(json!({
            "models": [{
                "name": "models/gemini-2.5-flash",
                "displayName": "Gemini 2.5 Flash",
                "supportedGenerationMethods": ["generateContent", "countTokens"]
            }],
            "nextPageToken": ""
        }))
        .unwrap();
        let info: ModelInfo = page.models.into_iter().next().unwrap().into();
        assert!(info.supports_generation());
        assert_eq!(info.short_name(), "gemini-2.5-flash");
    }

    #[test]
    fn api_keys_are_validated() {
        assert!(validate_api_key("").is_err());
        assert!(validate_api_key("sk-123").is_err());
        assert!(validate_api_key("AIzaSyExample").is_ok());
    }

    #[test]
    fn urls_are_built_against_the_configured_base() {
        let client = GeminiClient::new(SecretString::new("AIzaTest".to_string()))
            .unwrap()
            .with_base_url("http://localhost:8080/")
            .with_model("models/gemini-2.0-flash");
        assert_eq!(
            client.api_url("files/abc"),
            "http://localhost:8080/v1beta/files/abc"
        );
        assert_eq!(strip_models_prefix(client.model()), "gemini-2.0-flash");
        assert_eq!(mime_for(Path::new("paper.PDF")), "application/pdf");
    }
}
