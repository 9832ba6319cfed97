use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::db::streaks as store;
use crate::engine::reminders;
use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UpcomingReminder {
    pub identifier: String,
    pub fire_at: DateTime<Utc>,
}

/// The fire instants currently implied by a streak's reminder settings.
pub async fn upcoming_reminders(
    State(state): State<AppState>,
    Path(streak_id): Path<Uuid>,
) -> AppResult<Json<Vec<UpcomingReminder>>> {
    let record = store::get(&state.db, streak_id)
        .await?
        .ok_or(AppError::NotFound("Streak not found".into()))?;

    let plan = reminders::plan_for_record(&record, &Utc::now())?;
    Ok(Json(
        plan.into_iter()
            .map(|p| UpcomingReminder {
                identifier: p.identifier,
                fire_at: p.fire_at,
            })
            .collect(),
    ))
}

/// Rebuild the whole alarm registry from persisted records. Runs at boot;
/// exposed so operators can force it after clock or zone changes.
pub async fn reschedule_all(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let scheduled = state.reminders.reschedule_all(&state.db).await?;
    Ok(Json(serde_json::json!({ "scheduled": scheduled })))
}
