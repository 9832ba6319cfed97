use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::streaks as store;
use crate::engine::stats;
use crate::error::{AppError, AppResult};
use crate::handlers::broadcast_event;
use crate::models::streak::{
    CreateStreakRequest, StreakRecord, UpdateStreakRequest, DEFAULT_MILESTONES,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StreakListQuery {
    pub category: Option<String>,
    pub active: Option<bool>,
    /// "newest" (default), "oldest", "highest_streak", or "alphabetical".
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    pub months: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct HeatmapEntry {
    pub date: NaiveDate,
    pub logged: bool,
}

#[derive(Debug, Serialize)]
pub struct StreakStatistics {
    pub streak_id: Uuid,
    pub total_days_completed: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub average_completion_rate: f32,
    pub last_completed_date: Option<NaiveDate>,
    pub weekly_completion: BTreeMap<NaiveDate, u32>,
    pub monthly_completion: BTreeMap<NaiveDate, u32>,
    pub milestones: Vec<i32>,
    pub achieved_milestones: Vec<String>,
}

pub async fn list_streaks(
    State(state): State<AppState>,
    Query(query): Query<StreakListQuery>,
) -> AppResult<Json<Vec<StreakRecord>>> {
    let mut records = store::list(&state.db).await?;

    if let Some(category) = &query.category {
        records.retain(|r| r.category.as_deref() == Some(category.as_str()));
    }
    if let Some(active) = query.active {
        records.retain(|r| r.is_active == active);
    }

    match query.sort.as_deref() {
        Some("oldest") => records.sort_by_key(|r| r.created_at),
        Some("highest_streak") => records.sort_by_key(|r| std::cmp::Reverse(r.current_streak)),
        Some("alphabetical") => records.sort_by(|a, b| a.name.cmp(&b.name)),
        // store::list already returns newest first
        _ => {}
    }

    Ok(Json(records))
}

/// Streaks that are active, unlogged today, still expected this period,
/// and not currently covered by a grace window.
pub async fn needs_attention(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<StreakRecord>>> {
    let now = Utc::now();
    let mut records = store::list(&state.db).await?;
    records.retain(|r| stats::needs_attention_today(r, now));
    Ok(Json(records))
}

pub async fn get_streak(
    State(state): State<AppState>,
    Path(streak_id): Path<Uuid>,
) -> AppResult<Json<StreakRecord>> {
    let record = store::get(&state.db, streak_id)
        .await?
        .ok_or(AppError::NotFound("Streak not found".into()))?;
    Ok(Json(record))
}

pub async fn create_streak(
    State(state): State<AppState>,
    Json(body): Json<CreateStreakRequest>,
) -> AppResult<Json<StreakRecord>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    body.validate_reminder_days().map_err(AppError::Validation)?;

    let now = Utc::now();
    let start_date = body.start_date.unwrap_or_else(|| now.date_naive());
    if let Some(end) = body.target_end_date {
        if end < start_date {
            return Err(AppError::Validation(
                "target_end_date cannot precede start_date".into(),
            ));
        }
    }

    let record = StreakRecord {
        id: Uuid::new_v4(),
        name: body.name,
        description: body.description,
        color: body.color.unwrap_or_else(|| "#FF4081".into()),
        icon: body.icon,
        category: body.category,
        priority: body.priority.unwrap_or(0),
        start_date,
        target_end_date: body.target_end_date,
        goal_frequency: body.goal_frequency.unwrap_or_default(),
        target_days: body.target_days.unwrap_or(1),
        minimum_days_per_week: body.minimum_days_per_week,
        allowed_skips_per_month: body.allowed_skips_per_month.unwrap_or(0),
        grace_period_hours: body.grace_period_hours.unwrap_or(0),
        skip_dates: body.skip_dates.unwrap_or_default(),
        is_active: true,
        is_public: body.is_public.unwrap_or(false),
        reminder_enabled: body.reminder_enabled.unwrap_or(false),
        reminder_time: body.reminder_time,
        custom_reminder_days: body.custom_reminder_days.unwrap_or_default(),
        daily_log_dates: vec![],
        current_streak: 0,
        longest_streak: 0,
        total_completed_days: 0,
        last_completed_date: None,
        average_completion_rate: 0.0,
        weekly_stats: sqlx::types::Json(BTreeMap::new()),
        monthly_stats: sqlx::types::Json(BTreeMap::new()),
        milestones: body.milestones.unwrap_or_else(|| DEFAULT_MILESTONES.to_vec()),
        achieved_milestones: vec![],
        motivational_quotes: body.motivational_quotes.unwrap_or_default(),
        notes: vec![],
        tags: body.tags.unwrap_or_default(),
        shared_with: vec![],
        created_at: now,
        updated_at: now,
    };

    store::put(&state.db, &record).await?;
    broadcast_event(
        &state,
        serde_json::json!({ "type": "streak_created", "streak_id": record.id }),
    );

    if let Err(e) = state.reminders.schedule_for_streak(&record, now) {
        tracing::warn!(streak_id = %record.id, error = %e, "Reminder scheduling declined");
    }

    tracing::info!(streak_id = %record.id, name = %record.name, "Streak created");
    Ok(Json(record))
}

pub async fn update_streak(
    State(state): State<AppState>,
    Path(streak_id): Path<Uuid>,
    Json(body): Json<UpdateStreakRequest>,
) -> AppResult<Json<StreakRecord>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    body.validate_reminder_days().map_err(AppError::Validation)?;

    let existing = store::get(&state.db, streak_id)
        .await?
        .ok_or(AppError::NotFound("Streak not found".into()))?;

    let now = Utc::now();
    let mut record = existing.clone();

    if let Some(name) = body.name {
        record.name = name;
    }
    if body.description.is_some() {
        record.description = body.description;
    }
    if let Some(color) = body.color {
        record.color = color;
    }
    if body.icon.is_some() {
        record.icon = body.icon;
    }
    if body.category.is_some() {
        record.category = body.category;
    }
    if let Some(priority) = body.priority {
        record.priority = priority;
    }
    if body.target_end_date.is_some() {
        record.target_end_date = body.target_end_date;
    }
    if let Some(frequency) = body.goal_frequency {
        record.goal_frequency = frequency;
    }
    if let Some(target_days) = body.target_days {
        record.target_days = target_days;
    }
    if body.minimum_days_per_week.is_some() {
        record.minimum_days_per_week = body.minimum_days_per_week;
    }
    if let Some(allowed) = body.allowed_skips_per_month {
        record.allowed_skips_per_month = allowed;
    }
    if let Some(grace) = body.grace_period_hours {
        record.grace_period_hours = grace;
    }
    if let Some(skip_dates) = body.skip_dates {
        record.skip_dates = skip_dates;
    }
    if let Some(enabled) = body.reminder_enabled {
        record.reminder_enabled = enabled;
    }
    if body.reminder_time.is_some() {
        record.reminder_time = body.reminder_time;
    }
    if let Some(days) = body.custom_reminder_days {
        record.custom_reminder_days = days;
    }
    if let Some(is_active) = body.is_active {
        record.is_active = is_active;
    }
    if let Some(is_public) = body.is_public {
        record.is_public = is_public;
    }
    if let Some(notes) = body.notes {
        record.notes = notes;
    }
    if let Some(tags) = body.tags {
        record.tags = tags;
    }
    if let Some(shared_with) = body.shared_with {
        record.shared_with = shared_with;
    }

    if let Some(end) = record.target_end_date {
        if end < record.start_date {
            return Err(AppError::Validation(
                "target_end_date cannot precede start_date".into(),
            ));
        }
    }

    record.updated_at = now;
    store::put(&state.db, &record).await?;

    // Reconcile the notification sink: drop everything the old settings
    // could have registered, then register from the new settings.
    state.reminders.cancel_for_streak(&existing, now.date_naive());
    if let Err(e) = state.reminders.schedule_for_streak(&record, now) {
        tracing::warn!(streak_id = %record.id, error = %e, "Reminder scheduling declined");
    }

    broadcast_event(
        &state,
        serde_json::json!({ "type": "streak_updated", "streak_id": record.id }),
    );

    Ok(Json(record))
}

pub async fn delete_streak(
    State(state): State<AppState>,
    Path(streak_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let record = store::get(&state.db, streak_id)
        .await?
        .ok_or(AppError::NotFound("Streak not found".into()))?;

    // Pending alarms must not outlive the record.
    state
        .reminders
        .cancel_for_streak(&record, Utc::now().date_naive());
    store::delete(&state.db, streak_id).await?;

    broadcast_event(
        &state,
        serde_json::json!({ "type": "streak_deleted", "streak_id": streak_id }),
    );

    tracing::info!(streak_id = %streak_id, "Streak deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn get_statistics(
    State(state): State<AppState>,
    Path(streak_id): Path<Uuid>,
) -> AppResult<Json<StreakStatistics>> {
    let record = store::get(&state.db, streak_id)
        .await?
        .ok_or(AppError::NotFound("Streak not found".into()))?;

    let today = Utc::now().date_naive();
    Ok(Json(StreakStatistics {
        streak_id: record.id,
        total_days_completed: record.total_completed_days,
        current_streak: record.current_streak,
        longest_streak: record.longest_streak,
        average_completion_rate: record.average_completion_rate,
        last_completed_date: record.last_completed_date,
        weekly_completion: stats::weekly_completion(&record.daily_log_dates, today),
        monthly_completion: stats::monthly_completion(&record.daily_log_dates, today),
        milestones: record.milestones,
        achieved_milestones: record.achieved_milestones,
    }))
}

/// Calendar heatmap: one entry per day over the requested window.
pub async fn get_heatmap(
    State(state): State<AppState>,
    Path(streak_id): Path<Uuid>,
    Query(query): Query<HeatmapQuery>,
) -> AppResult<Json<Vec<HeatmapEntry>>> {
    let record = store::get(&state.db, streak_id)
        .await?
        .ok_or(AppError::NotFound("Streak not found".into()))?;

    let months = query.months.unwrap_or(3).clamp(1, 12);
    let today = Utc::now().date_naive();
    let window_start = (today - Duration::days(i64::from(months) * 30)).max(record.start_date);

    let mut entries = Vec::new();
    let mut date = window_start;
    while date <= today {
        entries.push(HeatmapEntry {
            date,
            logged: record.daily_log_dates.contains(&date),
        });
        date = date + Duration::days(1);
    }

    Ok(Json(entries))
}

/// Distinct categories in use, for the filter UI.
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    let records = store::list(&state.db).await?;
    let mut categories: Vec<String> = records
        .into_iter()
        .filter_map(|r| r.category)
        .collect();
    categories.sort();
    categories.dedup();
    Ok(Json(categories))
}
