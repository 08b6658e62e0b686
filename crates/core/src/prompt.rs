use crate::conversation::ConversationTurn;

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful Q&A assistant for research papers. Answer questions based on the provided documents. Include citations to specific sources when possible.";

/// Builds the prompt text for one turn.
///
/// With no history the question follows the instruction directly; otherwise
/// the window is rendered as `User:`/`Assistant:` line pairs, oldest first,
/// ahead of the current question. Turn text is never truncated.
pub fn assemble(system_instruction: &str, window: &[&ConversationTurn], question: &str) -> String {
    if window.is_empty() {
        return format!("{system_instruction}\n\nQuestion: {question}");
    }
    let history = window
        .iter()
        .map(|turn| format!("User: {}\nAssistant: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{system_instruction}\n\nPrevious conversation:\n{history}\n\nCurrent question: {question}"
    )
}
