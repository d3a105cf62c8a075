use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "calmly")]
#[command(about = "Mood tracking, a calm AI companion and your emergency contact")]
#[command(version)]
pub struct Args {
    /// Directory holding config.json and store.json
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Keep everything in memory for this run
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log and review moods
    Mood {
        #[command(subcommand)]
        command: MoodCommands,
    },
    /// Chat sessions with the companion
    Chat {
        #[command(subcommand)]
        command: ChatCommands,
    },
    /// Emergency contact
    Contact {
        #[command(subcommand)]
        command: ContactCommands,
    },
    /// Gratitude journal
    Gratitude {
        #[command(subcommand)]
        command: GratitudeCommands,
    },
    /// Configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum MoodCommands {
    /// Record how you feel (happy, okay, neutral, sad, angry, anxious, tired)
    Record { mood: String },
    /// Show recent entries, newest first
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Most common mood over the last seven days
    Summary,
    /// One mood per day for a month (defaults to the current month)
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum ChatCommands {
    /// Start a new session
    New,
    /// List sessions, newest first
    List,
    /// Print a session's messages
    Show {
        id: String,
        /// Only messages containing this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Send a message in a session
    Send {
        id: String,
        text: String,
        /// Image file to attach
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Rename a session
    Rename { id: String, title: String },
    /// Delete a session and its messages
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum ContactCommands {
    /// Show the saved contact
    Show,
    /// Save or replace the contact
    Set {
        name: String,
        #[arg(long, default_value = "+1")]
        country_code: String,
        phone: String,
    },
    /// Remove the contact
    Delete,
}

#[derive(Subcommand)]
pub enum GratitudeCommands {
    /// Replace the journal entry
    Write { entry: String },
    /// Show the latest entry
    Show,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration (API key redacted)
    Show,
}
