use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::conversation::DEFAULT_HISTORY_WINDOW;
use crate::error::{ChatError, Result};
use crate::models::default_model_candidates;
use crate::prompt::DEFAULT_SYSTEM_INSTRUCTION;

pub const DEFAULT_CONFIG: &str = "paperchat.toml";
pub const DEFAULT_STORE_NAME: &str = "My Research Papers";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub upload: UploadConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: PathBuf,
    pub name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            name: DEFAULT_STORE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub folder: PathBuf,
    pub delay_ms: u64,
}

impl UploadConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("./papers"),
            delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub window: usize,
    pub models: Vec<String>,
    pub system_instruction: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_HISTORY_WINDOW,
            models: default_model_candidates(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `path` if it exists; a missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ChatError::InvalidConfig(e.to_string()))?;
        if config.chat.models.is_empty() {
            return Err(ChatError::InvalidConfig(
                "chat.models must list at least one model".to_string(),
            ));
        }
        Ok(config)
    }
}
