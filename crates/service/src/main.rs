mod sessions;

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use thiserror::Error;
use tokio::task;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use paperchat_core::{
    AppConfig, ChatError, ChatSession, ConversationTurn, StoreBuilder, StoreDirectory,
    StoreLoader, DEFAULT_CONFIG,
};
use paperchat_llm::{validate_api_key, GeminiClient};

use crate::sessions::{SessionContext, SessionRegistry, SharedSession};

const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

struct AppState {
    config: AppConfig,
    service: ServiceConfig,
    stores: StoreDirectory,
    sessions: SessionRegistry,
    gemini_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ServiceConfig {
    bind: String,
    upload_dir: PathBuf,
    store_name: String,
    /// Body limit for the multipart store upload route.
    max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            upload_dir: PathBuf::from("papers"),
            store_name: "Research Papers Collection".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceFile {
    service: ServiceConfig,
}

fn load_service_config(path: &Path) -> anyhow::Result<ServiceConfig> {
    if !path.exists() {
        return Ok(ServiceConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let file: ServiceFile =
        toml::from_str(&contents).map_err(|e| anyhow::anyhow!("invalid config: {e}"))?;
    Ok(file.service)
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = env::var("PAPERCHAT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config_path = PathBuf::from(config_path);
    let config = AppConfig::load(&config_path)?;
    let mut service = load_service_config(&config_path)?;
    if let Ok(bind) = env::var("BIND_ADDR") {
        service.bind = bind;
    }
    let store_dir = env::var_os("PAPERCHAT_STORE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.store.dir.clone());
    fs::create_dir_all(&service.upload_dir)
        .with_context(|| format!("failed to create {}", service.upload_dir.display()))?;

    let addr: SocketAddr = service.bind.parse()?;
    let state = Arc::new(AppState {
        config,
        service,
        stores: StoreDirectory::new(store_dir),
        sessions: SessionRegistry::default(),
        gemini_base_url: env::var("GEMINI_BASE_URL").ok(),
    });
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening" = %addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.service.max_upload_bytes;
    Router::new()
        .route("/sessions", post(handle_create_session))
        .route("/sessions/:id", delete(handle_destroy_session))
        .route(
            "/sessions/:id/stores",
            post(handle_create_store).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/sessions/:id/stores/:store_id", post(handle_load_store))
        .route("/sessions/:id/chat", post(handle_chat))
        .route("/sessions/:id/history", get(handle_history))
        .route("/sessions/:id/data", delete(handle_clear_session))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    api_key: String,
    model: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateSessionResponse {
    session_id: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct StoreResponse {
    store_id: String,
    name: String,
    files: usize,
    failures: Vec<FailureResponse>,
}

#[derive(Debug, Serialize)]
struct FailureResponse {
    file: String,
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequestBody {
    question: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    answer: String,
    sources: Vec<String>,
    failed: bool,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    model: String,
    store_id: Option<String>,
    turns: Vec<ConversationTurn>,
}

async fn handle_create_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    validate_api_key(&body.api_key).map_err(|e| AppError::bad_request(format!("{e:#}")))?;
    let candidates = match body.model.filter(|model| !model.trim().is_empty()) {
        Some(model) => vec![model.trim().to_string()],
        None => state.config.chat.models.clone(),
    };
    let api_key = SecretString::new(body.api_key.trim().to_string());
    let blocking_state = state.clone();
    let (api_key, model) = task::spawn_blocking(move || -> Result<_, AppError> {
        let first = candidates.first().map(String::as_str).unwrap_or_default();
        let client = gemini_client(&blocking_state, &api_key, first)?;
        let model = client.select_model(&candidates)?;
        Ok((api_key, model))
    })
    .await
    .map_err(AppError::internal)??;

    let chat = ChatSession::new(
        state.config.chat.system_instruction.clone(),
        state.config.chat.window,
    );
    let session_id = state
        .sessions
        .insert(SessionContext::new(api_key, model.clone(), chat));
    info!(session = %session_id, model = %model, live = state.sessions.len(), "session created");
    Ok(Json(CreateSessionResponse { session_id, model }))
}

async fn handle_create_store(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    mut multipart: Multipart,
) -> Result<Json<StoreResponse>, AppError> {
    let session = lookup(&state, &id)?;
    let uploads = read_uploads(&mut multipart).await?;
    if uploads.is_empty() {
        return Err(AppError::bad_request("no PDF files in upload"));
    }
    let response = task::spawn_blocking(move || -> Result<StoreResponse, AppError> {
        let staged = stage_uploads(&state.service.upload_dir, &uploads)?;
        let mut ctx = session.lock();
        let client = gemini_client(&state, &ctx.api_key, &ctx.model)?;
        let report = StoreBuilder::new(&client, &state.stores)
            .delay(state.config.upload.delay())
            .build(&state.service.store_name, &staged.paths, |_| {})?;
        ctx.store_id = Some(report.record.id.clone());
        Ok(StoreResponse {
            store_id: report.record.id.clone(),
            name: report.record.name.clone(),
            files: report.uploaded(),
            failures: report
                .failures
                .iter()
                .map(|failure| FailureResponse {
                    file: failure
                        .path
                        .file_name()
                        .map(|name| name.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    reason: failure.reason.clone(),
                })
                .collect(),
        })
    })
    .await
    .map_err(AppError::internal)??;
    info!(session = %id, store = %response.store_id, "store created");
    Ok(Json(response))
}

async fn handle_load_store(
    State(state): State<Arc<AppState>>,
    AxumPath((id, store_id)): AxumPath<(String, String)>,
) -> Result<Json<StoreResponse>, AppError> {
    let session = lookup(&state, &id)?;
    let response = task::spawn_blocking(move || -> Result<StoreResponse, AppError> {
        let mut ctx = session.lock();
        let client = gemini_client(&state, &ctx.api_key, &ctx.model)?;
        let loaded = StoreLoader::new(&client, &state.stores).load(&store_id)?;
        ctx.store_id = Some(loaded.record.id.clone());
        Ok(StoreResponse {
            store_id: loaded.record.id.clone(),
            name: loaded.record.name.clone(),
            files: loaded.files.len(),
            failures: loaded
                .failures
                .iter()
                .map(|failure| FailureResponse {
                    file: failure.name.clone(),
                    reason: failure.reason.clone(),
                })
                .collect(),
        })
    })
    .await
    .map_err(AppError::internal)??;
    Ok(Json(response))
}

async fn handle_chat(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<ChatResponse>, AppError> {
    let question = body.question.trim().to_string();
    if question.is_empty() {
        return Err(AppError::bad_request("question must not be empty"));
    }
    let session = lookup(&state, &id)?;
    let reply = task::spawn_blocking(move || -> Result<ChatResponse, AppError> {
        let mut ctx = session.lock();
        let store_id = ctx
            .store_id
            .clone()
            .ok_or_else(|| AppError::bad_request("no document store attached to this session"))?;
        let client = gemini_client(&state, &ctx.api_key, &ctx.model)?;
        let loaded = StoreLoader::new(&client, &state.stores).load(&store_id)?;
        let reply = ctx.chat.ask(&client, &loaded.files, &question);
        Ok(ChatResponse {
            answer: reply.answer,
            sources: reply.sources,
            failed: reply.failed,
        })
    })
    .await
    .map_err(AppError::internal)??;
    Ok(Json(reply))
}

async fn handle_history(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let session = lookup(&state, &id)?;
    let history = task::spawn_blocking(move || {
        let ctx = session.lock();
        HistoryResponse {
            model: ctx.model.clone(),
            store_id: ctx.store_id.clone(),
            turns: ctx.chat.conversation().turns().to_vec(),
        }
    })
    .await
    .map_err(AppError::internal)?;
    Ok(Json(history))
}

async fn handle_clear_session(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Result<StatusCode, AppError> {
    let session = lookup(&state, &id)?;
    task::spawn_blocking(move || session.lock().clear())
        .await
        .map_err(AppError::internal)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_destroy_session(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(&id) {
        info!(session = %id, "session destroyed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("unknown session {id}")))
    }
}

fn lookup(state: &AppState, id: &str) -> Result<SharedSession, AppError> {
    state
        .sessions
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("unknown session {id}")))
}

fn gemini_client(
    state: &AppState,
    api_key: &SecretString,
    model: &str,
) -> Result<GeminiClient, AppError> {
    let key = SecretString::new(api_key.expose_secret().to_string());
    let mut client = GeminiClient::new(key)
        .map_err(|e| AppError::bad_request(format!("{e:#}")))?
        .with_model(model);
    if let Some(base_url) = &state.gemini_base_url {
        client = client.with_base_url(base_url.clone());
    }
    Ok(client)
}

struct Upload {
    file_name: String,
    data: Bytes,
}

/// Reads the PDF parts of a multipart body into memory.
async fn read_uploads(multipart: &mut Multipart) -> Result<Vec<Upload>, AppError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(AppError::bad_request)?
    {
        let Some(file_name) = field.file_name().and_then(upload_file_name) else {
            continue;
        };
        let data = field.bytes().await.map_err(AppError::bad_request)?;
        uploads.push(Upload { file_name, data });
    }
    Ok(uploads)
}

/// One request's PDFs on disk. The directory is private to the request and
/// removed when this is dropped.
struct StagedUploads {
    _dir: TempDir,
    paths: Vec<PathBuf>,
}

fn stage_uploads(root: &Path, uploads: &[Upload]) -> Result<StagedUploads, AppError> {
    let dir = tempfile::Builder::new()
        .prefix("upload-")
        .tempdir_in(root)
        .with_context(|| format!("failed to create staging dir in {}", root.display()))?;
    let mut paths = Vec::with_capacity(uploads.len());
    for (index, upload) in uploads.iter().enumerate() {
        let mut path = dir.path().join(&upload.file_name);
        if path.exists() {
            path = dir.path().join(format!("{index}-{}", upload.file_name));
        }
        fs::write(&path, &upload.data)
            .with_context(|| format!("failed to stage {}", upload.file_name))?;
        paths.push(path);
    }
    Ok(StagedUploads { _dir: dir, paths })
}

/// Base name of an uploaded file if it is a PDF; client-side directories are dropped.
fn upload_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name.starts_with('.') {
        return None;
    }
    let is_pdf = Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        warn!("skipping non-PDF upload {name}");
        return None;
    }
    Some(name.to_string())
}

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unavailable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn bad_request<E: ToString>(msg: E) -> Self {
        Self::BadRequest(msg.to_string())
    }

    fn internal<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Internal(err.into())
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::InvalidStoreId(_)
            | ChatError::InvalidConfig(_)
            | ChatError::FolderNotFound(_)
            | ChatError::NoPdfFiles(_) => Self::BadRequest(err.to_string()),
            ChatError::StoreNotFound(_) | ChatError::UnknownTurn(_) => {
                Self::NotFound(err.to_string())
            }
            ChatError::NoFilesUploaded { .. }
            | ChatError::NoFilesAvailable(_)
            | ChatError::ModelUnavailable { .. }
            | ChatError::GenerationFailure(_) => Self::Unavailable(err.to_string()),
            ChatError::Io(_) | ChatError::SerdeJson(_) => Self::Internal(err.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::Unavailable(msg) => {
                warn!("upstream_unavailable" = %msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg).into_response()
            }
            AppError::Internal(err) => {
                error!("internal_error" = %err);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_table_is_read_from_shared_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paperchat.toml");
        fs::write(
            &path,
            "[chat]\nwindow = 5\n\n[service]\nbind = \"127.0.0.1:9000\"\n",
        )
        .unwrap();
        let service = load_service_config(&path).unwrap();
        assert_eq!(service.bind, "127.0.0.1:9000");
        assert_eq!(service.upload_dir, PathBuf::from("papers"));
        assert_eq!(service.store_name, "Research Papers Collection");
        assert_eq!(AppConfig::load(&path).unwrap().chat.window, 5);
    }

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = load_service_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(service.bind, DEFAULT_BIND);
        assert_eq!(service.max_upload_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn chat_errors_map_to_status_codes() {
        let status = |err: ChatError| AppError::from(err).into_response().status();
        assert_eq!(
            status(ChatError::InvalidStoreId("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(ChatError::StoreNotFound(PathBuf::from("x.json"))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(ChatError::ModelUnavailable { tried: vec![] }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(ChatError::NoFilesAvailable("id".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(ChatError::Io(std::io::Error::other("disk"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upload_names_are_flattened_and_filtered() {
        assert_eq!(upload_file_name("paper.pdf").as_deref(), Some("paper.pdf"));
        assert_eq!(
            upload_file_name("../../etc/Survey.PDF").as_deref(),
            Some("Survey.PDF")
        );
        assert_eq!(
            upload_file_name("C:\\docs\\bert.pdf").as_deref(),
            Some("bert.pdf")
        );
        assert_eq!(upload_file_name("notes.txt"), None);
        assert_eq!(upload_file_name(".pdf"), None);
        assert_eq!(upload_file_name("dir/"), None);
    }

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use paperchat_core::{ChatRequest, GenerativeModel, ModelResponse};
    use tower::ServiceExt;

    const BOUNDARY: &str = "paperchat-boundary";

    struct Fixture {
        state: Arc<AppState>,
        upload_dir: TempDir,
        _store_dir: TempDir,
    }

    fn fixture_with(service: ServiceConfig) -> Fixture {
        let upload_dir = tempfile::tempdir().unwrap();
        let store_dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState {
            config: AppConfig::default(),
            service: ServiceConfig {
                upload_dir: upload_dir.path().to_path_buf(),
                ..service
            },
            stores: StoreDirectory::new(store_dir.path()),
            sessions: SessionRegistry::default(),
            gemini_base_url: Some("http://127.0.0.1:9".to_string()),
        });
        Fixture {
            state,
            upload_dir,
            _store_dir: store_dir,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(ServiceConfig::default())
    }

    fn open_session(state: &AppState) -> String {
        state.sessions.insert(SessionContext::new(
            SecretString::new("AIzaTest".to_string()),
            "gemini-2.5-flash".to_string(),
            ChatSession::default(),
        ))
    }

    fn pdf_upload(uri: &str, file_name: &str, size: usize) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.4\n"
        )
        .into_bytes();
        body.resize(body.len() + size, b'0');
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, String) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).to_string())
    }

    struct CannedModel;

    impl GenerativeModel for CannedModel {
        fn model_name(&self) -> &str {
            "canned"
        }

        fn generate(&self, _request: &ChatRequest<'_>) -> anyhow::Result<ModelResponse> {
            Ok(ModelResponse {
                text: Some("canned answer".to_string()),
                candidates: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn large_pdf_upload_reaches_the_store_builder() {
        let fx = fixture();
        let id = open_session(&fx.state);
        let request = pdf_upload(&format!("/sessions/{id}/stores"), "paper.pdf", 3 * 1024 * 1024);
        let (status, body) = send(&fx.state, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("no files uploaded successfully (1 attempted)"), "{body}");
        assert_eq!(fs::read_dir(fx.upload_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn upload_above_the_configured_limit_never_reaches_the_builder() {
        let fx = fixture_with(ServiceConfig {
            max_upload_bytes: 1024,
            ..ServiceConfig::default()
        });
        let id = open_session(&fx.state);
        let request = pdf_upload(&format!("/sessions/{id}/stores"), "paper.pdf", 8 * 1024);
        let (status, body) = send(&fx.state, request).await;
        assert!(status.is_client_error(), "{status}");
        assert!(!body.contains("no files uploaded"));
    }

    #[tokio::test]
    async fn chat_without_a_store_is_a_bad_request() {
        let fx = fixture();
        let id = open_session(&fx.state);
        let request = Request::post(format!("/sessions/{id}/chat"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"question":"What is X?"}"#))
            .unwrap();
        let (status, body) = send(&fx.state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("no document store attached"));
    }

    #[tokio::test]
    async fn clearing_session_data_empties_history() {
        let fx = fixture();
        let id = open_session(&fx.state);
        {
            let session = fx.state.sessions.get(&id).unwrap();
            let mut ctx = session.lock();
            ctx.store_id = Some("f9abee98-c29b-4cc2-bf22-aa008d32271d".to_string());
            ctx.chat.ask(&CannedModel, &[], "What is X?");
        }
        let history = || {
            Request::get(format!("/sessions/{id}/history"))
                .body(Body::empty())
                .unwrap()
        };
        let (status, body) = send(&fx.state, history()).await;
        assert_eq!(status, StatusCode::OK);
        let before: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(before["turns"].as_array().unwrap().len(), 1);
        assert_eq!(before["turns"][0]["answer"], "canned answer");

        let clear = Request::delete(format!("/sessions/{id}/data"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&fx.state, clear).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&fx.state, history()).await;
        let after: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(after["turns"].as_array().unwrap().is_empty());
        assert!(after["store_id"].is_null());
        assert_eq!(after["model"], "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn unknown_sessions_are_not_found() {
        let fx = fixture();
        let request = Request::get("/sessions/nope/history")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&fx.state, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn concurrent_uploads_with_the_same_name_stay_apart() {
        let root = tempfile::tempdir().unwrap();
        let upload = |content: &'static [u8]| Upload {
            file_name: "paper.pdf".to_string(),
            data: Bytes::from_static(content),
        };
        let first = stage_uploads(root.path(), &[upload(b"first")]).unwrap();
        let second = stage_uploads(root.path(), &[upload(b"second")]).unwrap();
        assert_ne!(first.paths[0], second.paths[0]);
        assert_eq!(fs::read(&first.paths[0]).unwrap(), b"first");
        assert_eq!(fs::read(&second.paths[0]).unwrap(), b"second");

        let duplicate = stage_uploads(root.path(), &[upload(b"a"), upload(b"b")]).unwrap();
        assert_ne!(duplicate.paths[0], duplicate.paths[1]);

        drop((first, second, duplicate));
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
