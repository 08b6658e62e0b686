use serde::Serialize;

use crate::error::{ChatError, Result};

/// Number of completed turns fed back into each new prompt.
pub const DEFAULT_HISTORY_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Pending,
    Answered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub status: TurnStatus,
}

impl ConversationTurn {
    pub fn is_answered(&self) -> bool {
        self.status == TurnStatus::Answered
    }
}

/// Append-only, chronological log of question/answer turns.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_question(&mut self, question: impl Into<String>) -> usize {
        self.turns.push(ConversationTurn {
            question: question.into(),
            answer: String::new(),
            status: TurnStatus::Pending,
        });
        self.turns.len() - 1
    }

    /// Appends an already-resolved turn and returns its index.
    pub(crate) fn record(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
        status: TurnStatus,
    ) -> usize {
        self.turns.push(ConversationTurn {
            question: question.into(),
            answer: answer.into(),
            status,
        });
        self.turns.len() - 1
    }

    pub fn set_answer(&mut self, index: usize, answer: impl Into<String>) -> Result<()> {
        self.complete(index, answer.into(), TurnStatus::Answered)
    }

    /// Completes a turn with an error message. Failed turns stay in the log
    /// but never enter a prompt window.
    pub fn set_failure(&mut self, index: usize, message: impl Into<String>) -> Result<()> {
        self.complete(index, message.into(), TurnStatus::Failed)
    }

    fn complete(&mut self, index: usize, text: String, status: TurnStatus) -> Result<()> {
        let turn = self
            .turns
            .get_mut(index)
            .ok_or(ChatError::UnknownTurn(index))?;
        turn.answer = text;
        turn.status = status;
        Ok(())
    }

    /// The last `n` answered turns, oldest first.
    pub fn recent_window(&self, n: usize) -> Vec<&ConversationTurn> {
        let mut window: Vec<&ConversationTurn> = self
            .turns
            .iter()
            .rev()
            .filter(|turn| turn.is_answered())
            .take(n)
            .collect();
        window.reverse();
        window
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
