pub mod ai_provider;
pub mod chat;
pub mod cli;
pub mod companion;
pub mod config;
pub mod contact;
pub mod conversation;
pub mod core;
pub mod gratitude;
pub mod mood;
pub mod persona;

pub use ai_provider::{Content, GeminiBackend, GenerativeBackend, Part, Reply};
pub use chat::{ChatSession, ImageAttachment, Message, Sender, SessionStore, Source};
pub use companion::Companion;
pub use config::{AiConfig, Config};
pub use contact::{ContactBook, EmergencyContact};
pub use conversation::ChatAdapter;
pub use gratitude::GratitudeJournal;
pub use mood::{Mood, MoodEntry, MoodTracker};
