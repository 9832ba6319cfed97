use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::streaks as store;
use crate::engine::stats::{self, LogOutcome};
use crate::error::{AppError, AppResult};
use crate::handlers::broadcast_event;
use crate::models::streak::StreakRecord;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LogDayRequest {
    /// Defaults to today. Future dates are rejected by the engine.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct LogDayResponse {
    /// False when the date was already logged; the record is returned
    /// unchanged and nothing was written.
    pub logged: bool,
    pub new_achievements: Vec<String>,
    pub streak: StreakRecord,
}

pub async fn log_day(
    State(state): State<AppState>,
    Path(streak_id): Path<Uuid>,
    Json(body): Json<LogDayRequest>,
) -> AppResult<Json<LogDayResponse>> {
    let record = store::get(&state.db, streak_id)
        .await?
        .ok_or(AppError::NotFound("Streak not found".into()))?;

    let now = Utc::now();
    let log_date = body.date.unwrap_or_else(|| now.date_naive());

    match stats::recompute_after_log(&record, log_date, now)? {
        LogOutcome::Updated {
            record: updated,
            new_achievements,
        } => {
            store::put(&state.db, &updated).await?;

            broadcast_event(
                &state,
                serde_json::json!({
                    "type": "streak_logged",
                    "streak_id": updated.id,
                    "date": log_date,
                    "current_streak": updated.current_streak,
                }),
            );
            for achievement in &new_achievements {
                broadcast_event(
                    &state,
                    serde_json::json!({
                        "type": "achievement_unlocked",
                        "streak_id": updated.id,
                        "achievement": achievement,
                    }),
                );
            }

            tracing::info!(
                streak_id = %updated.id,
                date = %log_date,
                current_streak = updated.current_streak,
                "Day logged"
            );
            Ok(Json(LogDayResponse {
                logged: true,
                new_achievements,
                streak: updated,
            }))
        }
        // Re-tapping "log" must never corrupt state: skip the write and
        // report success-with-no-change.
        LogOutcome::AlreadyLogged => Ok(Json(LogDayResponse {
            logged: false,
            new_achievements: vec![],
            streak: record,
        })),
    }
}

/// Manual override: zero the streak and deactivate it. Deactivation also
/// retires any pending reminders.
pub async fn break_streak(
    State(state): State<AppState>,
    Path(streak_id): Path<Uuid>,
) -> AppResult<Json<StreakRecord>> {
    let record = store::get(&state.db, streak_id)
        .await?
        .ok_or(AppError::NotFound("Streak not found".into()))?;

    let now = Utc::now();
    let updated = stats::break_streak(&record, now);
    store::put(&state.db, &updated).await?;
    state.reminders.cancel_for_streak(&record, now.date_naive());

    broadcast_event(
        &state,
        serde_json::json!({ "type": "streak_broken", "streak_id": updated.id }),
    );

    tracing::info!(streak_id = %updated.id, "Streak broken manually");
    Ok(Json(updated))
}
