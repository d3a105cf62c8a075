use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Datelike, Utc};
use std::path::Path;
use std::sync::Arc;

use crate::ai_provider::GeminiBackend;
use crate::chat::{ImageAttachment, Sender};
use crate::companion::Companion;
use crate::config::Config;
use crate::contact::EmergencyContact;
use crate::core::identity::AnonymousIdentity;
use crate::core::store::{FileStore, KeyValueStore, MemoryStore};
use crate::mood::Mood;

pub mod commands;

pub use commands::{
    Args, ChatCommands, Commands, ConfigCommands, ContactCommands, GratitudeCommands, MoodCommands,
};

pub async fn run(args: Args) -> Result<()> {
    let config = if args.ephemeral {
        Config::ephemeral(args.data_dir.unwrap_or_else(Config::default_data_dir))
    } else {
        Config::new(args.data_dir)?
    };

    let store: Arc<dyn KeyValueStore> = if args.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::open(config.store_file()).context("Failed to open store")?)
    };

    let companion = Companion::new(
        store,
        Arc::new(AnonymousIdentity),
        Arc::new(GeminiBackend::new(config.ai.clone())),
        config.ai.conversation_cache_capacity,
    );

    match args.command {
        Commands::Mood { command } => handle_mood(&companion, command),
        Commands::Chat { command } => handle_chat(&companion, command).await,
        Commands::Contact { command } => handle_contact(&companion, command),
        Commands::Gratitude { command } => handle_gratitude(&companion, command),
        Commands::Config { command } => handle_config(&config, command),
    }
}

pub fn handle_mood(companion: &Companion, command: MoodCommands) -> Result<()> {
    match command {
        MoodCommands::Record { mood } => {
            let mood: Mood = mood.parse()?;
            match companion.moods.record(mood) {
                Some(entry) => println!(
                    "{} Recorded {} at {}",
                    mood.emoji(),
                    mood,
                    entry.timestamp.format("%Y-%m-%d %H:%M")
                ),
                None => println!("No user is signed in; mood not recorded."),
            }
        }
        MoodCommands::History { limit } => {
            let history = companion.moods.history();
            if history.is_empty() {
                println!("No moods recorded yet.");
                return Ok(());
            }
            println!("Mood history ({} total):", history.len());
            for entry in history.iter().take(limit) {
                println!(
                    "  {}  {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.mood_name.emoji(),
                    entry.mood_name
                );
            }
        }
        MoodCommands::Summary => match companion.moods.most_common_this_week() {
            Some(mood) => println!("Most common mood this week: {} {}", mood.emoji(), mood),
            None => println!("No moods recorded in the last seven days."),
        },
        MoodCommands::Calendar { year, month } => {
            let today = Utc::now().date_naive();
            let year = year.unwrap_or(today.year());
            let month = month.unwrap_or(today.month());
            if !(1..=12).contains(&month) {
                return Err(anyhow!("Month must be between 1 and 12, got {}", month));
            }

            let calendar = companion.moods.month_calendar(year, month);
            println!("Moods for {}-{:02}:", year, month);
            if calendar.is_empty() {
                println!("  (none)");
            }
            for (date, mood) in calendar {
                println!("  {}  {} {}", date.format("%d %a"), mood.emoji(), mood);
            }
        }
    }
    Ok(())
}

pub async fn handle_chat(companion: &Companion, command: ChatCommands) -> Result<()> {
    match command {
        ChatCommands::New => {
            let session = companion.start();
            println!("Started session {} ({})", session.id, session.title);
        }
        ChatCommands::List => {
            let sessions = companion.sessions.list();
            if sessions.is_empty() {
                println!("No chat sessions yet.");
                return Ok(());
            }
            for session in sessions {
                println!(
                    "  {}  {}  {}",
                    session.id,
                    session.timestamp.format("%Y-%m-%d %H:%M"),
                    session.title
                );
            }
        }
        ChatCommands::Show { id, search } => {
            let messages = match search {
                Some(query) => companion.sessions.search_messages(&id, &query),
                None => companion.sessions.messages(&id),
            };
            if messages.is_empty() {
                println!("No messages.");
            }
            for message in messages {
                let who = match message.sender {
                    Sender::User => "You",
                    Sender::Ai => "Calmly",
                };
                let attachment = if message.image.is_some() { " [image]" } else { "" };
                println!("{}:{} {}", who, attachment, message.text);
                for source in message.sources.unwrap_or_default() {
                    println!("    ↳ {} <{}>", source.title, source.uri);
                }
            }
        }
        ChatCommands::Send { id, text, image } => {
            if companion.sessions.get(&id).is_none() {
                return Err(anyhow!("Unknown session: {}", id));
            }
            let image = image.as_deref().map(load_image).transpose()?;
            let reply = companion.send(&id, &text, image).await;

            println!("Calmly: {}", reply.text);
            for source in reply.sources.unwrap_or_default() {
                println!("    ↳ {} <{}>", source.title, source.uri);
            }
        }
        ChatCommands::Rename { id, title } => {
            companion.sessions.rename(&id, &title);
            println!("Renamed {} to {}", id, title);
        }
        ChatCommands::Delete { id } => {
            companion.sessions.delete(&id);
            println!("Deleted session {}", id);
        }
    }
    Ok(())
}

pub fn handle_contact(companion: &Companion, command: ContactCommands) -> Result<()> {
    match command {
        ContactCommands::Show => match companion.contacts.get() {
            Some(contact) => {
                println!("{}  {} {}", contact.name, contact.country_code, contact.phone);
                println!("Call: {}", contact.dial_uri());
            }
            None => println!("No emergency contact saved."),
        },
        ContactCommands::Set {
            name,
            country_code,
            phone,
        } => {
            let contact = EmergencyContact::new(name, country_code, phone);
            contact.validate()?;
            companion.contacts.save(&contact);
            println!("Saved emergency contact {}", contact.name);
        }
        ContactCommands::Delete => {
            companion.contacts.delete();
            println!("Emergency contact removed.");
        }
    }
    Ok(())
}

pub fn handle_gratitude(companion: &Companion, command: GratitudeCommands) -> Result<()> {
    match command {
        GratitudeCommands::Write { entry } => {
            companion.gratitude.save(&entry);
            println!("🙏 Saved.");
        }
        GratitudeCommands::Show => {
            let entry = companion.gratitude.latest();
            if entry.is_empty() {
                println!("Nothing written yet.");
            } else {
                println!("{}", entry);
            }
        }
    }
    Ok(())
}

pub fn handle_config(config: &Config, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let mut ai = config.ai.clone();
            if ai.api_key.is_some() {
                ai.api_key = Some("********".to_string());
            }
            println!("Data directory: {}", config.data_dir.display());
            println!("{}", serde_json::to_string_pretty(&ai)?);
        }
    }
    Ok(())
}

/// Reads an image file into an inline attachment.
pub fn load_image(path: &Path) -> Result<ImageAttachment> {
    let mime_type = image_mime_type(path)
        .ok_or_else(|| anyhow!("Unsupported image type: {}", path.display()))?;
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;

    Ok(ImageAttachment {
        base64: STANDARD.encode(bytes),
        mime_type: mime_type.to_string(),
    })
}

fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_type() {
        assert_eq!(image_mime_type(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(image_mime_type(Path::new("dir/b.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime_type(Path::new("notes.txt")), None);
        assert_eq!(image_mime_type(Path::new("noext")), None);
    }

    #[test]
    fn test_load_image_encodes_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let image = load_image(&path).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.base64, "iVBORw==");
    }

    #[test]
    fn test_args_parse() {
        use clap::Parser;

        let args = Args::parse_from(["calmly", "--ephemeral", "contact", "set", "Sam", "5551234567"]);
        assert!(args.ephemeral);
        match args.command {
            Commands::Contact {
                command: ContactCommands::Set { name, country_code, phone },
            } => {
                assert_eq!(name, "Sam");
                assert_eq!(country_code, "+1");
                assert_eq!(phone, "5551234567");
            }
            _ => panic!("expected contact set"),
        }
    }
}
