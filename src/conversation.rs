use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::ai_provider::{Content, GenerativeBackend, Reply};
use crate::chat::{ImageAttachment, Message, Sender, DEFAULT_SESSION_TITLE};
use crate::persona::{clean_title, title_prompt, APOLOGY_MESSAGE};

/// Client-side handle for one remote conversation: the turns replayed to the
/// service on every request.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    history: Vec<Content>,
}

impl Conversation {
    /// Seeds the handle from persisted messages. Only text survives the trip.
    pub fn from_messages(messages: &[Message]) -> Self {
        let history = messages
            .iter()
            .filter(|m| !m.text.is_empty())
            .map(|m| match m.sender {
                Sender::User => Content::user_turn(&m.text, None),
                Sender::Ai => Content::model_turn(&m.text),
            })
            .collect();
        Conversation { history }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Mediates every call to the generative service.
///
/// Keeps one [`Conversation`] per session id in an LRU cache. Errors never
/// escape: failed sends become the apology reply and failed title requests
/// become the default title.
pub struct ChatAdapter {
    backend: Arc<dyn GenerativeBackend>,
    conversations: Mutex<LruCache<String, Conversation>>,
}

impl ChatAdapter {
    /// Create an adapter caching at most `capacity` conversations (minimum 1)
    pub fn new(backend: Arc<dyn GenerativeBackend>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        ChatAdapter {
            backend,
            conversations: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// `history` seeds the conversation the first time a session is seen.
    pub async fn send_message(
        &self,
        session_id: &str,
        text: &str,
        history: &[Message],
        image: Option<&ImageAttachment>,
    ) -> Reply {
        let prior = {
            let mut conversations = self.conversations.lock().await;
            if !conversations.contains(session_id) {
                debug!("Starting conversation for session {}", session_id);
                conversations.put(session_id.to_string(), Conversation::from_messages(history));
            }
            conversations
                .get(session_id)
                .map(|c| c.history.clone())
                .unwrap_or_default()
        };

        let turn = Content::user_turn(text, image);

        match self.backend.send(&prior, &turn).await {
            Ok(reply) => {
                let mut conversations = self.conversations.lock().await;
                let mut conversation = conversations
                    .pop(session_id)
                    .unwrap_or_else(|| Conversation { history: prior });
                conversation.history.push(turn);
                conversation.history.push(Content::model_turn(&reply.text));
                conversations.put(session_id.to_string(), conversation);
                reply
            }
            Err(e) => {
                error!("Error sending message for session {}: {}", session_id, e);
                Reply {
                    text: APOLOGY_MESSAGE.to_string(),
                    sources: Vec::new(),
                }
            }
        }
    }

    /// One-shot title for a new session, or "New Chat" on failure
    pub async fn generate_title(&self, first_user_message: &str, first_ai_message: &str) -> String {
        let prompt = title_prompt(first_user_message, first_ai_message);
        match self.backend.generate(&prompt).await {
            Ok(raw) => clean_title(&raw),
            Err(e) => {
                error!("Error generating title: {}", e);
                DEFAULT_SESSION_TITLE.to_string()
            }
        }
    }

    pub async fn is_cached(&self, session_id: &str) -> bool {
        self.conversations.lock().await.contains(session_id)
    }

    pub async fn cached_len(&self) -> usize {
        self.conversations.lock().await.len()
    }

    /// Turns currently held for `session_id`, if cached.
    pub async fn conversation_len(&self, session_id: &str) -> Option<usize> {
        self.conversations.lock().await.peek(session_id).map(|c| c.len())
    }
}
