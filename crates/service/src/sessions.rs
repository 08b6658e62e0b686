use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use secrecy::SecretString;
use uuid::Uuid;

use paperchat_core::ChatSession;

/// Everything one caller accumulates between requests.
pub struct SessionContext {
    pub api_key: SecretString,
    pub model: String,
    pub store_id: Option<String>,
    pub chat: ChatSession,
}

impl SessionContext {
    pub fn new(api_key: SecretString, model: String, chat: ChatSession) -> Self {
        Self {
            api_key,
            model,
            store_id: None,
            chat,
        }
    }

    /// Drops the attached store and the conversation; credential and model stay.
    pub fn clear(&mut self) {
        self.store_id = None;
        self.chat.clear();
    }
}

pub type SharedSession = Arc<Mutex<SessionContext>>;

/// Live sessions by id. Each session has its own lock, held for a whole
/// exchange, so turns on one session never interleave.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    pub fn insert(&self, context: SessionContext) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .insert(id.clone(), Arc::new(Mutex::new(context)));
        id
    }

    pub fn get(&self, id: &str) -> Option<SharedSession> {
        self.sessions.read().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SessionContext {
        SessionContext::new(
            SecretString::new("AIzaTest".to_string()),
            "gemini-2.5-flash".to_string(),
            ChatSession::default(),
        )
    }

    #[test]
    fn sessions_are_isolated_and_removable() {
        let registry = SessionRegistry::default();
        let first = registry.insert(context());
        let second = registry.insert(context());
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);

        registry.get(&first).unwrap().lock().store_id = Some("store".to_string());
        assert!(registry.get(&second).unwrap().lock().store_id.is_none());

        assert!(registry.remove(&first));
        assert!(!registry.remove(&first));
        assert!(registry.get(&first).is_none());
    }

    #[test]
    fn clear_keeps_credential_and_model() {
        let mut ctx = context();
        ctx.store_id = Some("store".to_string());
        ctx.clear();
        assert!(ctx.store_id.is_none());
        assert!(ctx.chat.conversation().is_empty());
        assert_eq!(ctx.model, "gemini-2.5-flash");
    }
}
