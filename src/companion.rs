use std::sync::Arc;
use tracing::{debug, info};

use crate::ai_provider::GenerativeBackend;
use crate::chat::{ChatSession, ImageAttachment, Message, Sender, SessionStore, DEFAULT_SESSION_TITLE};
use crate::contact::ContactBook;
use crate::conversation::ChatAdapter;
use crate::core::identity::IdentityProvider;
use crate::core::store::KeyValueStore;
use crate::gratitude::GratitudeJournal;
use crate::mood::MoodTracker;

/// Every service wired to one store and one identity.
pub struct Companion {
    pub sessions: SessionStore,
    pub moods: MoodTracker,
    pub contacts: ContactBook,
    pub gratitude: GratitudeJournal,
    pub adapter: ChatAdapter,
}

impl Companion {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        identity: Arc<dyn IdentityProvider>,
        backend: Arc<dyn GenerativeBackend>,
        cache_capacity: usize,
    ) -> Self {
        Companion {
            sessions: SessionStore::new(store.clone(), identity.clone()),
            moods: MoodTracker::new(store.clone(), identity.clone()),
            contacts: ContactBook::new(store.clone(), identity.clone()),
            gratitude: GratitudeJournal::new(store, identity),
            adapter: ChatAdapter::new(backend, cache_capacity),
        }
    }

    pub fn start(&self) -> ChatSession {
        self.sessions.create()
    }

    /// Runs one exchange in `session_id` and returns the AI message.
    ///
    /// The user message is persisted before the service is called, so it
    /// survives even if the process dies while waiting. After the first
    /// exchange a still-default title is replaced by a generated one.
    pub async fn send(
        &self,
        session_id: &str,
        text: &str,
        image: Option<ImageAttachment>,
    ) -> Message {
        let prior = self.sessions.messages(session_id);

        let user_message = Message::user(text, image);
        let mut messages = prior.clone();
        messages.push(user_message.clone());
        self.sessions.save_messages(session_id, &messages);

        let reply = self
            .adapter
            .send_message(session_id, text, &prior, user_message.image.as_ref())
            .await;

        let ai_message = Message::ai(reply.text, reply.sources);
        messages.push(ai_message.clone());
        self.sessions.save_messages(session_id, &messages);

        if is_first_exchange(&messages) {
            self.retitle(session_id, text, &ai_message.text).await;
        }

        ai_message
    }

    async fn retitle(&self, session_id: &str, first_user: &str, first_ai: &str) {
        let still_default = self
            .sessions
            .get(session_id)
            .map_or(false, |s| s.title == DEFAULT_SESSION_TITLE);
        if !still_default {
            debug!("Session {} already titled", session_id);
            return;
        }

        let title = self.adapter.generate_title(first_user, first_ai).await;
        if !title.is_empty() {
            info!("Titled session {} as {:?}", session_id, title);
            self.sessions.rename(session_id, &title);
        }
    }
}

fn is_first_exchange(messages: &[Message]) -> bool {
    messages.len() == 2 && messages[0].sender == Sender::User && messages[1].sender == Sender::Ai
}
