//! Persisted conversation memory.
//!
//! One JSON file per user key holds the most recent messages. The same
//! `max_turns` bound applies in memory and on disk: loading, appending and
//! saving all trim to it, so what a session sees is exactly what the next
//! session will reload.

use crate::store::{remove_if_exists, write_atomic};
use compass_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(AppError::Other(format!(
                "Unknown role '{}' (expected user or assistant)",
                other
            ))),
        }
    }
}

/// One stored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    #[serde(rename = "time", alias = "timestamp")]
    pub timestamp: String,
}

impl ConversationMessage {
    /// Create a message stamped with the current local time.
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Bounded conversation log for one user key.
#[derive(Debug)]
pub struct ConversationMemory {
    path: PathBuf,
    max_turns: usize,
    history: Vec<ConversationMessage>,
}

impl ConversationMemory {
    /// Load the history at `path`, or start empty if the file does not exist.
    ///
    /// # Errors
    /// * `AppError::Persistence` - The file exists but cannot be read or parsed
    pub fn open(path: impl Into<PathBuf>, max_turns: usize) -> AppResult<Self> {
        let path = path.into();
        let max_turns = max_turns.max(1);

        let mut history: Vec<ConversationMessage> = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                AppError::Persistence(format!("Failed to read history {:?}: {}", path, e))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                AppError::Persistence(format!("Corrupt history file {:?}: {}", path, e))
            })?
        } else {
            Vec::new()
        };

        trim_to(&mut history, max_turns);
        tracing::debug!("Loaded {} messages from {:?}", history.len(), path);

        Ok(Self {
            path,
            max_turns,
            history,
        })
    }

    /// Append a message and rewrite the history file.
    ///
    /// The message stays in memory even when the write fails.
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) -> AppResult<()> {
        self.history.push(ConversationMessage::now(role, content));
        trim_to(&mut self.history, self.max_turns);
        self.save()
    }

    /// The last `n` messages as (role, content), oldest first.
    pub fn get_recent(&self, n: usize) -> Vec<(Role, String)> {
        let start = self.history.len().saturating_sub(n);
        self.history[start..]
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect()
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Forget every message and delete the history file.
    ///
    /// Clearing an empty memory is a no-op.
    pub fn clear(&mut self) -> AppResult<()> {
        self.history.clear();
        remove_if_exists(&self.path)?;
        tracing::debug!("Cleared history {:?}", self.path);
        Ok(())
    }

    fn save(&self) -> AppResult<()> {
        let json = serde_json::to_string_pretty(&self.history)
            .map_err(|e| AppError::Persistence(format!("Failed to encode history: {}", e)))?;
        write_atomic(&self.path, json.as_bytes())
    }
}

fn trim_to(history: &mut Vec<ConversationMessage>, max_turns: usize) {
    if history.len() > max_turns {
        let excess = history.len() - max_turns;
        history.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_file(path: &Path) -> Vec<ConversationMessage> {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_open_missing_file() {
        let temp = TempDir::new().unwrap();
        let memory = ConversationMemory::open(temp.path().join("h.json"), 20).unwrap();
        assert!(memory.is_empty());
    }

    #[test]
    fn test_add_message_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("history").join("chat_history.json");
        let mut memory = ConversationMemory::open(&path, 20).unwrap();

        memory.add_message(Role::User, "hello").unwrap();
        memory.add_message(Role::Assistant, "hi there").unwrap();

        let stored = read_file(&path);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, Role::User);
        assert_eq!(stored[1].content, "hi there");
        assert_eq!(stored[0].timestamp.len(), "2024-01-01 00:00:00".len());

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"time\""));
    }

    #[test]
    fn test_retention_memory_and_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("h.json");
        let mut memory = ConversationMemory::open(&path, 4).unwrap();

        for i in 0..9 {
            memory.add_message(Role::User, format!("m{}", i)).unwrap();
        }

        let expected: Vec<String> = (5..9).map(|i| format!("m{}", i)).collect();
        let on_disk: Vec<String> = read_file(&path).into_iter().map(|m| m.content).collect();
        let in_memory: Vec<String> = memory.messages().iter().map(|m| m.content.clone()).collect();

        assert_eq!(on_disk, expected);
        assert_eq!(in_memory, expected);
    }

    #[test]
    fn test_get_recent() {
        let temp = TempDir::new().unwrap();
        let mut memory = ConversationMemory::open(temp.path().join("h.json"), 20).unwrap();
        memory.add_message(Role::User, "q1").unwrap();
        memory.add_message(Role::Assistant, "a1").unwrap();
        memory.add_message(Role::User, "q2").unwrap();

        assert_eq!(
            memory.get_recent(2),
            vec![
                (Role::Assistant, "a1".to_string()),
                (Role::User, "q2".to_string())
            ]
        );
        assert_eq!(memory.get_recent(10).len(), 3);
        assert!(memory.get_recent(0).is_empty());
    }

    #[test]
    fn test_reload_trims_to_bound() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("h.json");
        {
            let mut memory = ConversationMemory::open(&path, 10).unwrap();
            for i in 0..6 {
                memory.add_message(Role::User, format!("m{}", i)).unwrap();
            }
        }

        let memory = ConversationMemory::open(&path, 3).unwrap();
        assert_eq!(memory.len(), 3);
        assert_eq!(memory.messages()[0].content, "m3");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("h.json");
        let mut memory = ConversationMemory::open(&path, 5).unwrap();

        memory.clear().unwrap();
        memory.add_message(Role::User, "hello").unwrap();
        assert!(path.exists());

        memory.clear().unwrap();
        assert!(memory.is_empty());
        assert!(!path.exists());
        memory.clear().unwrap();
    }

    #[test]
    fn test_corrupt_history() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("h.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            ConversationMemory::open(&path, 5),
            Err(AppError::Persistence(_))
        ));
    }

    #[test]
    fn test_legacy_timestamp_field() {
        let json = r#"[{"role":"user","content":"hi","timestamp":"2024-05-01 10:00:00"}]"#;
        let messages: Vec<ConversationMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(messages[0].timestamp, "2024-05-01 10:00:00");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert!("bot".parse::<Role>().is_err());
    }
}
