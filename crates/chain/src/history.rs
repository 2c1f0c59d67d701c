//! Conversation history adapter.
//!
//! Turns caller-supplied history into alternating user / assistant
//! messages. History arrives fresh with every request; nothing here
//! stores it.

use docchat_core::error::HistoryFormatError;
use docchat_core::message::{ConversationTurn, Message};

/// One history entry as a caller may supply it.
pub trait HistoryEntry {
    /// The `(question, answer)` pair, or why this entry is not one.
    fn pair(&self, index: usize) -> Result<(&str, &str), HistoryFormatError>;
}

/// Untyped `[question, answer]` entries, the JSON shape UI clients send.
impl HistoryEntry for Vec<String> {
    fn pair(&self, index: usize) -> Result<(&str, &str), HistoryFormatError> {
        match self.as_slice() {
            [user, assistant] => Ok((user.as_str(), assistant.as_str())),
            other => Err(HistoryFormatError::WrongArity {
                index,
                len: other.len(),
            }),
        }
    }
}

impl HistoryEntry for ConversationTurn {
    fn pair(&self, _index: usize) -> Result<(&str, &str), HistoryFormatError> {
        Ok((self.user.as_str(), self.assistant.as_str()))
    }
}

impl HistoryEntry for (String, String) {
    fn pair(&self, _index: usize) -> Result<(&str, &str), HistoryFormatError> {
        Ok((self.0.as_str(), self.1.as_str()))
    }
}

impl HistoryEntry for (&str, &str) {
    fn pair(&self, _index: usize) -> Result<(&str, &str), HistoryFormatError> {
        Ok((self.0, self.1))
    }
}

/// Expand `history` into `2n` messages, user then assistant per turn.
///
/// Every entry is validated first; one malformed entry fails the whole
/// call and nothing is dropped or repaired.
pub fn expand<E: HistoryEntry>(history: &[E]) -> Result<Vec<Message>, HistoryFormatError> {
    let pairs = history
        .iter()
        .enumerate()
        .map(|(i, entry)| entry.pair(i))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(pairs
        .into_iter()
        .flat_map(|(user, assistant)| [Message::user(user), Message::assistant(assistant)])
        .collect())
}

/// Infallible expansion of already-typed turns.
pub fn expand_turns(turns: &[ConversationTurn]) -> Vec<Message> {
    turns
        .iter()
        .flat_map(|t| [Message::user(&t.user), Message::assistant(&t.assistant)])
        .collect()
}
