use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const INITIAL_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;

// Scheduling state for one tracked item. `item_id` is the primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    #[serde(alias = "wordId")]
    pub item_id: String,
    pub repetitions: u32,
    pub interval_days: u32,
    pub ease_factor: f64,
    pub due_date: NaiveDate,
    pub lapses: u32,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl ScheduleItem {
    pub fn new(item_id: impl Into<String>, due_date: NaiveDate) -> Self {
        Self {
            item_id: item_id.into(),
            repetitions: 0,
            interval_days: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            due_date,
            lapses: 0,
            last_reviewed_at: None,
        }
    }

    pub fn is_due(&self, as_of: NaiveDate) -> bool {
        self.due_date <= as_of
    }

    pub fn stage_label(&self) -> &'static str {
        match (self.last_reviewed_at, self.interval_days) {
            (None, _) => "New",
            (Some(_), 0..=1) => "Learning",
            (Some(_), 2..=20) => "Young",
            (Some(_), _) => "Mature",
        }
    }
}

// How well the learner recalled an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Hard,
    Normal,
    Easy,
}

impl Rating {
    /// SM-2 quality score (0-5).
    pub fn quality(&self) -> u8 {
        match self {
            Rating::Hard => 2,
            Rating::Normal => 4,
            Rating::Easy => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Hard => "hard",
            Rating::Normal => "normal",
            Rating::Easy => "easy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hard" | "h" | "fail" | "again" | "1" => Some(Rating::Hard),
            "normal" | "n" | "good" | "ok" | "2" => Some(Rating::Normal),
            "easy" | "e" | "3" => Some(Rating::Easy),
            _ => None,
        }
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
