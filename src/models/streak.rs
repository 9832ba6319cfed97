use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Default milestone thresholds applied when a streak is created without
/// an explicit set.
pub const DEFAULT_MILESTONES: [i32; 6] = [7, 30, 60, 90, 180, 365];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "goal_frequency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GoalFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl Default for GoalFrequency {
    fn default() -> Self {
        Self::Daily
    }
}

/// Full streak record: immutable identity/settings plus the derived state
/// that is recomputed on every log event. Stored as a single row, replaced
/// wholesale on update.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StreakRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: Option<String>,
    pub category: Option<String>,
    pub priority: i32,

    // Goal settings
    pub start_date: NaiveDate,
    pub target_end_date: Option<NaiveDate>,
    pub goal_frequency: GoalFrequency,
    pub target_days: i32,
    pub minimum_days_per_week: Option<i32>,
    pub allowed_skips_per_month: i32,
    pub grace_period_hours: i32,
    pub skip_dates: Vec<NaiveDate>,
    pub is_active: bool,
    pub is_public: bool,

    // Reminders
    pub reminder_enabled: bool,
    pub reminder_time: Option<NaiveTime>,
    /// ISO weekday numbers (1=Mon..7=Sun). Empty means every day.
    pub custom_reminder_days: Vec<i16>,

    // Derived state
    pub daily_log_dates: Vec<NaiveDate>,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub total_completed_days: i32,
    pub last_completed_date: Option<NaiveDate>,
    pub average_completion_rate: f32,
    /// ISO week-of-year -> completed days in that week.
    pub weekly_stats: Json<BTreeMap<u32, u32>>,
    /// Calendar month number (1-12) -> completed days in that month.
    pub monthly_stats: Json<BTreeMap<u32, u32>>,

    // Milestones
    pub milestones: Vec<i32>,
    /// Append-only; an achievement is never recorded twice.
    pub achieved_milestones: Vec<String>,

    // Free-form collections, opaque to the engine
    pub motivational_quotes: Vec<String>,
    pub notes: Vec<String>,
    pub tags: Vec<String>,
    pub shared_with: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StreakRecord {
    /// Minimum completed days a week needs to count toward a WEEKLY streak.
    pub fn required_weekly_minimum(&self) -> i32 {
        self.minimum_days_per_week.unwrap_or(self.target_days)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStreakRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(max = 2000, message = "Description must be under 2000 characters"))]
    pub description: Option<String>,

    pub color: Option<String>,
    pub icon: Option<String>,
    pub category: Option<String>,
    pub priority: Option<i32>,

    /// Defaults to today when omitted.
    pub start_date: Option<NaiveDate>,
    pub target_end_date: Option<NaiveDate>,
    pub goal_frequency: Option<GoalFrequency>,

    #[validate(range(min = 1, message = "target_days must be at least 1"))]
    pub target_days: Option<i32>,

    #[validate(range(min = 1, max = 7, message = "minimum_days_per_week must be 1-7"))]
    pub minimum_days_per_week: Option<i32>,

    #[validate(range(min = 0, message = "allowed_skips_per_month cannot be negative"))]
    pub allowed_skips_per_month: Option<i32>,

    #[validate(range(min = 0, message = "grace_period_hours cannot be negative"))]
    pub grace_period_hours: Option<i32>,

    pub skip_dates: Option<Vec<NaiveDate>>,
    pub reminder_enabled: Option<bool>,
    pub reminder_time: Option<NaiveTime>,
    pub custom_reminder_days: Option<Vec<i16>>,
    pub milestones: Option<Vec<i32>>,
    pub motivational_quotes: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

/// Partial update; all fields optional. Log history is never editable
/// through this request.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStreakRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub color: Option<String>,
    pub icon: Option<String>,
    pub category: Option<String>,
    pub priority: Option<i32>,

    pub target_end_date: Option<NaiveDate>,
    pub goal_frequency: Option<GoalFrequency>,

    #[validate(range(min = 1))]
    pub target_days: Option<i32>,

    #[validate(range(min = 1, max = 7))]
    pub minimum_days_per_week: Option<i32>,

    #[validate(range(min = 0))]
    pub allowed_skips_per_month: Option<i32>,

    #[validate(range(min = 0))]
    pub grace_period_hours: Option<i32>,

    pub skip_dates: Option<Vec<NaiveDate>>,
    pub reminder_enabled: Option<bool>,
    pub reminder_time: Option<NaiveTime>,
    pub custom_reminder_days: Option<Vec<i16>>,
    pub is_active: Option<bool>,
    pub is_public: Option<bool>,
    pub notes: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub shared_with: Option<Vec<String>>,
}

impl CreateStreakRequest {
    /// Custom reminder days must be ISO weekday numbers.
    pub fn validate_reminder_days(&self) -> Result<(), String> {
        validate_reminder_days(self.custom_reminder_days.as_deref())
    }
}

impl UpdateStreakRequest {
    pub fn validate_reminder_days(&self) -> Result<(), String> {
        validate_reminder_days(self.custom_reminder_days.as_deref())
    }
}

fn validate_reminder_days(days: Option<&[i16]>) -> Result<(), String> {
    if let Some(days) = days {
        if days.len() > 7 {
            return Err("custom_reminder_days accepts at most 7 days".into());
        }
        for d in days {
            if !(1..=7).contains(d) {
                return Err(format!("Day {} is invalid; must be 1-7 (Mon-Sun)", d));
            }
        }
    }
    Ok(())
}
