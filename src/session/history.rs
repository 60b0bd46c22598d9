use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::services::ollama::models::Message;

use super::error::{Error, Result};
use super::turn::Turn;

/// Which turns [`History::clear`] removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryClear {
    All,
    First,
    Last,
    /// 1-based positions, strictly increasing.
    Indices(Vec<usize>),
}

/// The completed turns of a chat, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Removes the selected turns. On error nothing is removed.
    pub fn clear(&mut self, which: HistoryClear) -> Result<()> {
        match which {
            HistoryClear::All => self.turns.clear(),
            HistoryClear::First | HistoryClear::Last if self.turns.is_empty() => {
                return Err(Error::validation("the chat history is already empty"));
            }
            HistoryClear::First => {
                self.turns.remove(0);
            }
            HistoryClear::Last => {
                self.turns.pop();
            }
            HistoryClear::Indices(indices) => {
                self.check_indices(&indices)?;
                // Highest first so earlier positions stay valid.
                for index in indices.into_iter().rev() {
                    self.turns.remove(index - 1);
                }
            }
        }
        Ok(())
    }

    fn check_indices(&self, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Err(Error::validation("no history indices given"));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i == 0 || i > self.turns.len()) {
            return Err(Error::validation(format!(
                "history index {bad} is out of range; the history has {} turns",
                self.turns.len()
            )));
        }
        if indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::validation("history indices must be strictly increasing"));
        }
        Ok(())
    }

    /// The transcript sent to `/api/chat`: an optional system message, every
    /// completed turn, then `pending` if given.
    pub async fn to_messages(&self, system: &str, pending: Option<&Turn>) -> Result<Vec<Message>> {
        let mut messages = Vec::with_capacity(self.turns.len() * 2 + 2);
        if !system.is_empty() {
            messages.push(Message::system(system));
        }
        for turn in self.turns.iter().chain(pending) {
            turn.append_messages(&mut messages).await?;
        }
        Ok(messages)
    }

    /// Writes the history to `path` as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Reads a history previously written by [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json_string = fs::read_to_string(path)?;
        let history: History = serde_json::from_str(&json_string)?;
        if history.turns.iter().any(|t| t.reply.is_none()) {
            return Err(Error::validation("a saved history may only contain answered turns"));
        }
        Ok(history)
    }
}

impl From<Vec<Turn>> for History {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ollama::models::Role;
    use crate::session::turn::AssistantReply;

    fn answered(text: &str) -> Turn {
        Turn::user(text, vec![]).unwrap().complete(AssistantReply {
            content: format!("re: {text}"),
            ..Default::default()
        })
    }

    fn history(n: usize) -> History {
        (1..=n).map(|i| answered(&format!("q{i}"))).collect::<Vec<_>>().into()
    }

    fn texts(h: &History) -> Vec<&str> {
        h.turns().iter().map(Turn::user_text).collect()
    }

    #[test]
    fn clear_first_and_last() {
        let mut h = history(3);
        h.clear(HistoryClear::First).unwrap();
        assert_eq!(texts(&h), vec!["q2", "q3"]);
        h.clear(HistoryClear::Last).unwrap();
        assert_eq!(texts(&h), vec!["q2"]);
        h.clear(HistoryClear::All).unwrap();
        assert!(h.is_empty());
        assert!(matches!(h.clear(HistoryClear::First), Err(Error::Validation(_))));
        assert!(matches!(h.clear(HistoryClear::Last), Err(Error::Validation(_))));
        assert!(h.clear(HistoryClear::All).is_ok());
    }

    #[test]
    fn clear_indices_removes_one_based_positions() {
        let mut h = history(5);
        h.clear(HistoryClear::Indices(vec![1, 3, 5])).unwrap();
        assert_eq!(texts(&h), vec!["q2", "q4"]);
    }

    #[test]
    fn bad_indices_leave_history_untouched() {
        let mut h = history(3);
        for bad in [vec![], vec![0], vec![4], vec![2, 2], vec![3, 1]] {
            assert!(matches!(h.clear(HistoryClear::Indices(bad)), Err(Error::Validation(_))));
            assert_eq!(h.len(), 3);
        }
    }

    #[tokio::test]
    async fn transcript_starts_with_system_message() {
        let h = history(2);
        let pending = Turn::user("q3", vec![]).unwrap();

        let messages = h.to_messages("be brief", Some(&pending)).await.unwrap();
        let roles: Vec<Role> = messages.iter().map(|m| m.role.clone()).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[5].content, "q3");

        let without_system = h.to_messages("", None).await.unwrap();
        assert_eq!(without_system.len(), 4);
        assert_eq!(without_system[0].role, Role::User);
    }

    #[test]
    fn save_and_load_keep_turns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let h = history(2);
        h.save(&path).unwrap();
        assert_eq!(History::load(&path).unwrap(), h);

        std::fs::write(&path, "{").unwrap();
        assert!(matches!(History::load(&path), Err(Error::Serialization(_))));
        assert!(matches!(History::load(dir.path().join("missing.json")), Err(Error::Io(_))));
    }
}
