//! SQLite-backed chat history, keyed by session.

use chrono::{DateTime, Utc};
use rights_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Render messages as `role: content` lines for a prompt.
pub fn render_history(messages: &[ChatMessage]) -> Option<String> {
    if messages.is_empty() {
        return None;
    }
    Some(
        messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

pub struct ChatHistory {
    conn: Mutex<Connection>,
}

impl ChatHistory {
    /// Open (or create) the history database at `path`.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::History(format!("Failed to create history directory: {}", e))
                })?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| AppError::History(format!("Failed to open history database: {}", e)))?;
        Self::init(conn)
    }

    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::History(format!("Failed to open history database: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chat_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chat_history_session ON chat_history(session_id);
            "#,
        )
        .map_err(|e| AppError::History(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::History("History connection lock poisoned".to_string()))
    }

    pub fn save_message(&self, role: Role, content: &str, session_id: &str) -> AppResult<()> {
        self.lock()?
            .execute(
                "INSERT INTO chat_history (session_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![session_id, role.as_str(), content, Utc::now().to_rfc3339()],
            )
            .map_err(|e| AppError::History(format!("Failed to save message: {}", e)))?;
        Ok(())
    }

    /// Messages of one session, oldest first.
    pub fn load_messages(&self, session_id: &str) -> AppResult<Vec<ChatMessage>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT role, content, created_at FROM chat_history WHERE session_id = ?1 ORDER BY id ASC",
            )
            .map_err(|e| AppError::History(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![session_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| AppError::History(format!("Failed to load messages: {}", e)))?;

        let mut messages = Vec::new();
        for row in rows {
            let (role, content, created_at) =
                row.map_err(|e| AppError::History(format!("Failed to read message: {}", e)))?;
            let role = Role::parse(&role)
                .ok_or_else(|| AppError::History(format!("Unknown message role '{}'", role)))?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| AppError::History(format!("Invalid message timestamp: {}", e)))?;
            messages.push(ChatMessage {
                role,
                content,
                created_at,
            });
        }
        Ok(messages)
    }

    /// Delete a session's messages; returns how many were removed.
    pub fn clear(&self, session_id: &str) -> AppResult<usize> {
        self.lock()?
            .execute(
                "DELETE FROM chat_history WHERE session_id = ?1",
                params![session_id],
            )
            .map_err(|e| AppError::History(format!("Failed to clear history: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_messages_are_chronological_per_session() {
        let history = ChatHistory::in_memory().unwrap();
        history.save_message(Role::User, "report on Syria", "s1").unwrap();
        history.save_message(Role::User, "other session", "s2").unwrap();
        history.save_message(Role::Ai, "## Overview", "s1").unwrap();

        let messages = history.load_messages("s1").unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "report on Syria");
        assert_eq!(messages[1].role, Role::Ai);
        assert!(history.load_messages("missing").unwrap().is_empty());
    }

    #[test]
    fn test_clear_only_touches_one_session() {
        let history = ChatHistory::in_memory().unwrap();
        history.save_message(Role::User, "a", "s1").unwrap();
        history.save_message(Role::User, "b", "s2").unwrap();

        assert_eq!(history.clear("s1").unwrap(), 1);
        assert!(history.load_messages("s1").unwrap().is_empty());
        assert_eq!(history.load_messages("s2").unwrap().len(), 1);
    }

    #[test]
    fn test_history_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".rights").join("history.sqlite");
        ChatHistory::open(&path)
            .unwrap()
            .save_message(Role::User, "hello", "s")
            .unwrap();

        let reopened = ChatHistory::open(&path).unwrap();
        assert_eq!(reopened.load_messages("s").unwrap()[0].content, "hello");
    }

    #[test]
    fn test_render_history() {
        let history = ChatHistory::in_memory().unwrap();
        assert_eq!(render_history(&history.load_messages("s").unwrap()), None);

        history.save_message(Role::User, "question", "s").unwrap();
        history.save_message(Role::Ai, "answer", "s").unwrap();
        assert_eq!(
            render_history(&history.load_messages("s").unwrap()).as_deref(),
            Some("user: question\nai: answer")
        );
    }
}
