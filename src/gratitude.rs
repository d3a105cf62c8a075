use std::sync::Arc;
use tracing::warn;

use crate::core::identity::IdentityProvider;
use crate::core::store::{namespaced_key, KeyValueStore};

pub const GRATITUDE_JOURNAL_KEY: &str = "calmly_gratitude_journal";

/// Latest gratitude note. Each save replaces the previous one.
pub struct GratitudeJournal {
    store: Arc<dyn KeyValueStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl GratitudeJournal {
    pub fn new(store: Arc<dyn KeyValueStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    fn key(&self) -> Option<String> {
        let user = self.identity.current_user()?;
        Some(namespaced_key(GRATITUDE_JOURNAL_KEY, &user.email, None))
    }

    /// Replace the journal entry
    pub fn save(&self, entry: &str) {
        let Some(key) = self.key() else {
            return;
        };
        if let Err(e) = self.store.set(&key, entry) {
            warn!("Failed to save gratitude entry: {}", e);
        }
    }

    /// Latest entry, or an empty string
    pub fn latest(&self) -> String {
        let Some(key) = self.key() else {
            return String::new();
        };
        match self.store.get(&key) {
            Ok(entry) => entry.unwrap_or_default(),
            Err(e) => {
                warn!("Failed to read gratitude entry: {}", e);
                String::new()
            }
        }
    }
}
