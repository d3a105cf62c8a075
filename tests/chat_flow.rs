use async_trait::async_trait;
use calmly::core::error::AiError;
use calmly::core::{AnonymousIdentity, FileStore, KeyValueStore, MemoryStore};
use calmly::persona::APOLOGY_MESSAGE;
use calmly::{Companion, Content, GenerativeBackend, Message, Reply, Sender, Source};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays canned replies in order; `None` simulates a network failure.
struct Scripted {
    replies: Mutex<VecDeque<Option<Reply>>>,
    titles: Mutex<VecDeque<Option<String>>>,
    turns_seen: Mutex<Vec<Content>>,
}

impl Scripted {
    fn new(replies: Vec<Option<Reply>>, titles: Vec<Option<String>>) -> Arc<Self> {
        Arc::new(Scripted {
            replies: Mutex::new(replies.into()),
            titles: Mutex::new(titles.into()),
            turns_seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl GenerativeBackend for Scripted {
    async fn send(&self, _history: &[Content], turn: &Content) -> Result<Reply, AiError> {
        self.turns_seen.lock().unwrap().push(turn.clone());
        match self.replies.lock().unwrap().pop_front().flatten() {
            Some(reply) => Ok(reply),
            None => Err(AiError::Api {
                status: 503,
                body: "unavailable".to_string(),
            }),
        }
    }

    async fn generate(&self, _prompt: &str) -> Result<String, AiError> {
        self.titles
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or(AiError::EmptyResponse)
    }
}

fn reply(text: &str) -> Option<Reply> {
    Some(Reply {
        text: text.to_string(),
        sources: Vec::new(),
    })
}

fn companion(store: Arc<dyn KeyValueStore>, backend: Arc<Scripted>) -> Companion {
    Companion::new(store, Arc::new(AnonymousIdentity), backend, 16)
}

#[tokio::test]
async fn first_exchange_persists_messages_and_titles_session() {
    let backend = Scripted::new(
        vec![reply("Thank you for sharing that 🌱"), reply("Of course.")],
        vec![Some("'Restless Night'".to_string()), Some("Never used".to_string())],
    );
    let companion = companion(Arc::new(MemoryStore::new()), backend.clone());
    let session = companion.start();

    let answer = companion.send(&session.id, "I couldn't sleep", None).await;
    assert_eq!(answer.sender, Sender::Ai);
    assert_eq!(answer.text, "Thank you for sharing that 🌱");

    let messages = companion.sessions.messages(&session.id);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[0].text, "I couldn't sleep");
    assert_eq!(companion.sessions.list()[0].title, "Restless Night");

    // Later exchanges never retitle.
    companion.send(&session.id, "thanks", None).await;
    assert_eq!(companion.sessions.messages(&session.id).len(), 4);
    assert_eq!(companion.sessions.list()[0].title, "Restless Night");
}

#[tokio::test]
async fn network_failure_yields_apology_with_no_sources() {
    let backend = Scripted::new(vec![None], vec![None]);
    let companion = companion(Arc::new(MemoryStore::new()), backend);
    let session = companion.start();

    let answer = companion.send(&session.id, "hello?", None).await;
    assert_eq!(answer.text, APOLOGY_MESSAGE);
    assert!(answer.sources.is_none());

    // Title generation failed too, so the default stays.
    assert_eq!(companion.sessions.list()[0].title, "New Chat");
    assert_eq!(companion.sessions.messages(&session.id).len(), 2);
}

#[tokio::test]
async fn sources_and_images_are_kept() {
    let backend = Scripted::new(
        vec![Some(Reply {
            text: "Water it weekly.".to_string(),
            sources: vec![Source {
                uri: "https://rhs.org.uk/monstera".to_string(),
                title: "RHS".to_string(),
            }],
        })],
        vec![Some("Plant care".to_string())],
    );
    let companion = companion(Arc::new(MemoryStore::new()), backend.clone());
    let session = companion.start();

    let image = calmly::ImageAttachment {
        base64: "AAAA".to_string(),
        mime_type: "image/jpeg".to_string(),
    };
    let answer = companion.send(&session.id, "How do I care for this?", Some(image.clone())).await;
    assert_eq!(answer.sources.as_ref().unwrap()[0].title, "RHS");

    let stored = companion.sessions.messages(&session.id);
    assert_eq!(stored[0].image.as_ref(), Some(&image));
    assert_eq!(stored[1].sources, answer.sources);

    let turns = backend.turns_seen.lock().unwrap();
    assert_eq!(turns[0].parts.len(), 2);
}

#[test]
fn sessions_list_newest_first_and_keep_messages() {
    let backend = Scripted::new(Vec::new(), Vec::new());
    let companion = companion(Arc::new(MemoryStore::new()), backend);

    let s1 = companion.start();
    let m1 = Message::user("first thought", None);
    companion.sessions.save_messages(&s1.id, &[m1.clone()]);
    std::thread::sleep(std::time::Duration::from_millis(5));
    let s2 = companion.start();

    let ids: Vec<String> = companion.sessions.list().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![s2.id.clone(), s1.id.clone()]);
    assert_eq!(companion.sessions.messages(&s1.id), vec![m1]);
    assert!(companion.sessions.messages(&s2.id).is_empty());
}

#[test]
fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let session_id = {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&path).unwrap());
        let companion = companion(store, Scripted::new(Vec::new(), Vec::new()));
        let session = companion.start();
        companion.sessions.rename(&session.id, "Kept");
        companion
            .sessions
            .save_messages(&session.id, &[Message::user("still here", None)]);
        session.id
    };

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&path).unwrap());
    let companion = companion(store.clone(), Scripted::new(Vec::new(), Vec::new()));
    assert_eq!(companion.sessions.list()[0].title, "Kept");
    assert_eq!(companion.sessions.messages(&session_id)[0].text, "still here");

    let raw = store
        .get(&format!(
            "calmly_chat_messages_anonymous_user@calmly.app_{}",
            session_id
        ))
        .unwrap();
    assert!(raw.is_some());

    companion.sessions.delete(&session_id);
    assert!(companion.sessions.messages(&session_id).is_empty());
    assert!(companion.sessions.list().is_empty());
}
