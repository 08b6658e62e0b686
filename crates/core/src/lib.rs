mod builder;
mod citation;
mod config;
mod conversation;
mod error;
mod loader;
mod models;
mod prompt;
mod record;
mod remote;
mod session;

pub use builder::{discover_pdfs, BuildReport, StoreBuilder, UploadEvent, DEFAULT_UPLOAD_DELAY};
pub use citation::{citation_labels, extract_citations, format_sources, SourcesStyle};
pub use config::{
    AppConfig, ChatConfig, StoreConfig, UploadConfig, DEFAULT_CONFIG, DEFAULT_STORE_NAME,
};
pub use conversation::{Conversation, ConversationTurn, TurnStatus, DEFAULT_HISTORY_WINDOW};
pub use error::{ChatError, FileResolutionFailure, Result, UploadFailure};
pub use loader::{LoadedStore, StoreLoader};
pub use models::{
    default_model_candidates, select_first_available, ModelCatalog, ModelInfo, ModelTier,
    DEFAULT_MODEL_CANDIDATES, GENERATE_CONTENT,
};
pub use prompt::{assemble, DEFAULT_SYSTEM_INSTRUCTION};
pub use record::{StoreDirectory, StoreRecord};
pub use remote::{
    Candidate, ChatRequest, GenerativeModel, GroundingAttribution, ModelResponse, RemoteFile,
    RemoteFiles,
};
pub use session::{ChatSession, TurnReply};
