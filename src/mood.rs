use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::error::ValidationError;
use crate::core::identity::IdentityProvider;
use crate::core::store::{namespaced_key, read_json, write_json, KeyValueStore};

pub const MOOD_HISTORY_KEY: &str = "calmly_mood_history";
pub const MAX_MOOD_ENTRIES: usize = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Okay,
    Neutral,
    Sad,
    Angry,
    Anxious,
    Tired,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Happy,
        Mood::Okay,
        Mood::Neutral,
        Mood::Sad,
        Mood::Angry,
        Mood::Anxious,
        Mood::Tired,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Okay => "Okay",
            Mood::Neutral => "Neutral",
            Mood::Sad => "Sad",
            Mood::Angry => "Angry",
            Mood::Anxious => "Anxious",
            Mood::Tired => "Tired",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Mood::Happy => "😄",
            Mood::Okay => "🙂",
            Mood::Neutral => "😐",
            Mood::Sad => "😔",
            Mood::Angry => "😡",
            Mood::Anxious => "😰",
            Mood::Tired => "😴",
        }
    }

    /// Hex display color
    pub fn color(&self) -> &'static str {
        match self {
            Mood::Happy => "#FFD700",
            Mood::Okay => "#32CD32",
            Mood::Neutral => "#B0C4DE",
            Mood::Sad => "#1E90FF",
            Mood::Angry => "#FF4500",
            Mood::Anxious => "#9370DB",
            Mood::Tired => "#48D1CC",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Mood {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownMood(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: String,
    pub mood_name: Mood,
    pub mood_color: String,
    pub timestamp: DateTime<Utc>,
}

impl MoodEntry {
    /// Create an entry for `mood` stamped now
    pub fn new(mood: Mood) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mood_name: mood,
            mood_color: mood.color().to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Mood history for the current user, capped at [`MAX_MOOD_ENTRIES`].
pub struct MoodTracker {
    store: Arc<dyn KeyValueStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl MoodTracker {
    /// Create a tracker scoped to the current user of `identity`
    pub fn new(store: Arc<dyn KeyValueStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    fn key(&self) -> Option<String> {
        let user = self.identity.current_user()?;
        Some(namespaced_key(MOOD_HISTORY_KEY, &user.email, None))
    }

    /// Newest first. Unreadable history is treated as empty.
    pub fn history(&self) -> Vec<MoodEntry> {
        let Some(key) = self.key() else {
            return Vec::new();
        };

        match read_json::<Vec<MoodEntry>>(self.store.as_ref(), &key) {
            Ok(Some(mut history)) => {
                history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                history.truncate(MAX_MOOD_ENTRIES);
                history
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read mood history: {}", e);
                Vec::new()
            }
        }
    }

    /// Record a mood and return the new entry.
    ///
    /// Returns `None` when there is no current user.
    pub fn record(&self, mood: Mood) -> Option<MoodEntry> {
        let key = self.key()?;
        let entry = MoodEntry::new(mood);

        let mut history = Vec::with_capacity(MAX_MOOD_ENTRIES);
        history.push(entry.clone());
        history.extend(self.history());
        history.truncate(MAX_MOOD_ENTRIES);

        if let Err(e) = write_json(self.store.as_ref(), &key, &history) {
            warn!("Failed to save mood entry: {}", e);
        } else {
            debug!("Recorded mood {} ({} entries)", mood, history.len());
        }

        Some(entry)
    }

    /// Mood logged most often since `since`. Ties go to the most recently logged mood.
    pub fn most_common_since(&self, since: DateTime<Utc>) -> Option<Mood> {
        most_common(&self.history(), since)
    }

    /// Most common mood over the last seven days
    pub fn most_common_this_week(&self) -> Option<Mood> {
        self.most_common_since(Utc::now() - Duration::days(7))
    }

    /// Newest mood per day of the given month.
    pub fn month_calendar(&self, year: i32, month: u32) -> BTreeMap<NaiveDate, Mood> {
        month_calendar(&self.history(), year, month)
    }
}

fn most_common(history: &[MoodEntry], since: DateTime<Utc>) -> Option<Mood> {
    let mut counts: HashMap<Mood, usize> = HashMap::new();
    let mut order: Vec<Mood> = Vec::new();

    for entry in history.iter().filter(|e| e.timestamp > since) {
        let count = counts.entry(entry.mood_name).or_insert(0);
        if *count == 0 {
            order.push(entry.mood_name);
        }
        *count += 1;
    }

    // `order` follows the newest-first history, so the first maximum wins ties.
    let mut best: Option<(Mood, usize)> = None;
    for mood in order {
        let count = counts[&mood];
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((mood, count));
        }
    }
    best.map(|(mood, _)| mood)
}

fn month_calendar(history: &[MoodEntry], year: i32, month: u32) -> BTreeMap<NaiveDate, Mood> {
    let mut days = BTreeMap::new();
    for entry in history {
        let date = entry.timestamp.date_naive();
        if date.year() == year && date.month() == month {
            days.entry(date).or_insert(entry.mood_name);
        }
    }
    days
}
