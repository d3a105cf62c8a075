use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::core::identity::IdentityProvider;
use crate::core::store::{namespaced_key, read_json, write_json, KeyValueStore};

pub const SESSIONS_KEY_PREFIX: &str = "calmly_chat_sessions";
pub const MESSAGES_KEY_PREFIX: &str = "calmly_chat_messages";
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// Web reference the model used to ground an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    pub base64: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

impl Message {
    /// Create a user message with an optional image
    pub fn user(text: impl Into<String>, image: Option<ImageAttachment>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender: Sender::User,
            image,
            sources: None,
        }
    }

    /// Create an AI message; empty sources are stored as none
    pub fn ai(text: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender: Sender::Ai,
            image: None,
            sources: if sources.is_empty() { None } else { Some(sources) },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatSession {
    /// Create a session titled "New Chat" stamped now
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            timestamp: Utc::now(),
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Session list and per-session message blobs for the current user.
///
/// The session list and each message blob are separate keys, written
/// independently with no transaction spanning them.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl SessionStore {
    /// Create a store scoped to the current user of `identity`
    pub fn new(store: Arc<dyn KeyValueStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    fn email(&self) -> Option<String> {
        self.identity.current_user().map(|u| u.email)
    }

    fn sessions_key(&self) -> Option<String> {
        Some(namespaced_key(SESSIONS_KEY_PREFIX, &self.email()?, None))
    }

    fn messages_key(&self, session_id: &str) -> Option<String> {
        Some(namespaced_key(MESSAGES_KEY_PREFIX, &self.email()?, Some(session_id)))
    }

    /// List all sessions, newest first.
    pub fn list(&self) -> Vec<ChatSession> {
        let Some(key) = self.sessions_key() else {
            return Vec::new();
        };

        match read_json::<Vec<ChatSession>>(self.store.as_ref(), &key) {
            Ok(Some(mut sessions)) => {
                sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                sessions
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("Failed to read chat sessions: {}", e);
                Vec::new()
            }
        }
    }

    /// Get a session by ID
    pub fn get(&self, session_id: &str) -> Option<ChatSession> {
        self.list().into_iter().find(|s| s.id == session_id)
    }

    fn save_sessions(&self, sessions: &[ChatSession]) {
        let Some(key) = self.sessions_key() else {
            return;
        };
        if let Err(e) = write_json(self.store.as_ref(), &key, sessions) {
            error!("Failed to save chat sessions: {}", e);
        }
    }

    /// Create a new session at the head of the list
    pub fn create(&self) -> ChatSession {
        let session = ChatSession::new();

        let mut sessions = vec![session.clone()];
        sessions.extend(self.list());
        self.save_sessions(&sessions);

        debug!("Created chat session {}", session.id);
        session
    }

    /// Rename a session. Unknown ids are ignored.
    pub fn rename(&self, session_id: &str, title: &str) {
        let mut sessions = self.list();
        if let Some(session) = sessions.iter_mut().find(|s| s.id == session_id) {
            session.title = title.to_string();
            self.save_sessions(&sessions);
        } else {
            debug!("Rename ignored for unknown session {}", session_id);
        }
    }

    /// Delete a session by ID.
    ///
    /// Removes the message blob first, then the session record.
    pub fn delete(&self, session_id: &str) {
        let Some(key) = self.messages_key(session_id) else {
            return;
        };
        if let Err(e) = self.store.remove(&key) {
            warn!("Failed to delete messages for session {}: {}", session_id, e);
        }

        let sessions: Vec<ChatSession> = self
            .list()
            .into_iter()
            .filter(|s| s.id != session_id)
            .collect();
        self.save_sessions(&sessions);
    }

    /// Messages of a session in send order
    pub fn messages(&self, session_id: &str) -> Vec<Message> {
        let Some(key) = self.messages_key(session_id) else {
            return Vec::new();
        };

        match read_json::<Vec<Message>>(self.store.as_ref(), &key) {
            Ok(messages) => messages.unwrap_or_default(),
            Err(e) => {
                error!("Failed to read messages for session {}: {}", session_id, e);
                Vec::new()
            }
        }
    }

    /// Overwrites the whole message blob.
    pub fn save_messages(&self, session_id: &str, messages: &[Message]) {
        let Some(key) = self.messages_key(session_id) else {
            return;
        };
        if let Err(e) = write_json(self.store.as_ref(), &key, messages) {
            error!("Failed to save messages for session {}: {}", session_id, e);
        }
    }

    /// Case-insensitive text filter. A blank query matches everything.
    pub fn search_messages(&self, session_id: &str, query: &str) -> Vec<Message> {
        let messages = self.messages(session_id);
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return messages;
        }
        messages
            .into_iter()
            .filter(|m| m.text.to_lowercase().contains(&query))
            .collect()
    }
}
