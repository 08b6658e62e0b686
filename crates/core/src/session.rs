use serde::Serialize;
use tracing::warn;

use crate::citation::{citation_labels, format_sources, SourcesStyle};
use crate::conversation::{Conversation, TurnStatus, DEFAULT_HISTORY_WINDOW};
use crate::error::ChatError;
use crate::prompt::{assemble, DEFAULT_SYSTEM_INSTRUCTION};
use crate::remote::{ChatRequest, GenerativeModel, RemoteFile};

/// Outcome of one question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReply {
    pub index: usize,
    /// Answer text, or the rendered error when generation failed.
    pub answer: String,
    pub sources: Vec<String>,
    pub failed: bool,
}

impl TurnReply {
    /// Answer followed by its sources line in the given style.
    pub fn render(&self, style: SourcesStyle) -> String {
        format!("{}{}", self.answer, format_sources(&self.sources, style))
    }
}

/// Conversation state plus the prompt settings used to extend it.
#[derive(Debug, Clone)]
pub struct ChatSession {
    system_instruction: String,
    window: usize,
    conversation: Conversation,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_INSTRUCTION, DEFAULT_HISTORY_WINDOW)
    }
}

impl ChatSession {
    pub fn new(system_instruction: impl Into<String>, window: usize) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            window,
            conversation: Conversation::new(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn clear(&mut self) {
        self.conversation.clear();
    }

    /// Prompt that would be sent for `question` given the current history.
    pub fn prompt_for(&self, question: &str) -> String {
        let window = self.conversation.recent_window(self.window);
        assemble(&self.system_instruction, &window, question)
    }

    /// Runs one exchange against `model`. Generation errors never escape:
    /// they become the turn's answer and the session stays usable.
    pub fn ask<M>(&mut self, model: &M, files: &[RemoteFile], question: &str) -> TurnReply
    where
        M: GenerativeModel + ?Sized,
    {
        let prompt = self.prompt_for(question);
        let request = ChatRequest::new(prompt, files);
        let outcome = model
            .generate(&request)
            .map_err(|err| ChatError::GenerationFailure(format!("{err:#}")))
            .and_then(|response| {
                let text = response
                    .text
                    .as_deref()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ChatError::GenerationFailure("the model returned no text".to_string())
                    })?;
                Ok((text, citation_labels(&response)))
            });
        let (answer, sources, failed) = match outcome {
            Ok((text, sources)) => (text, sources, false),
            Err(err) => {
                warn!("{} failed to answer: {err}", model.model_name());
                (format!("Error: {err}"), Vec::new(), true)
            }
        };
        let status = if failed {
            TurnStatus::Failed
        } else {
            TurnStatus::Answered
        };
        let index = self.conversation.record(question, answer.clone(), status);
        TurnReply {
            index,
            answer,
            sources,
            failed,
        }
    }
}
