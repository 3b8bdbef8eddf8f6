use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const MOOD_MIN: u8 = 1;
pub const MOOD_MAX: u8 = 5;
pub const SLEEP_SCORE_MAX: u8 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        self.expires_at > now + chrono::Duration::seconds(leeway_seconds)
            && !self.access_token.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub plan_id: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "profile.id")?;
        validate_non_empty(&self.email, "profile.email")?;
        validate_non_empty(&self.plan_id, "profile.plan_id")?;
        Ok(())
    }
}

/// One generated day of wellness metrics for the dashboard charts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyEntry {
    pub date: NaiveDate,
    pub sleep_hours: f64,
    pub sleep_score: u8,
    pub activity_minutes: u32,
    pub steps: u32,
    pub mood: u8,
    pub meals: u32,
    pub habits_completed: u32,
}

impl DailyEntry {
    pub fn validate(&self) -> Result<(), String> {
        if !self.sleep_hours.is_finite() || self.sleep_hours < 0.0 {
            return Err("entry.sleep_hours must be >= 0".to_string());
        }
        if self.sleep_score > SLEEP_SCORE_MAX {
            return Err("entry.sleep_score must be in 0..=100".to_string());
        }
        if self.mood < MOOD_MIN || self.mood > MOOD_MAX {
            return Err("entry.mood must be in 1..=5".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedMeta {
    pub days: u32,
    pub variability: f64,
    pub generated_at: DateTime<Utc>,
}

/// Persisted synthetic dataset driving dashboard visuals when no backend
/// analytics exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedBundle {
    pub dates: Vec<NaiveDate>,
    pub daily: Vec<DailyEntry>,
    pub meta: SeedMeta,
}

impl SeedBundle {
    pub fn validate(&self) -> Result<(), String> {
        if self.dates.len() != self.daily.len() {
            return Err("seed.dates and seed.daily must have equal length".to_string());
        }
        for entry in &self.daily {
            entry.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub title: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
