//! In-process notification sink.
//!
//! Holds the registry of pending one-shot reminder alarms. Each
//! registration spawns a timer task that publishes a `reminder_fired`
//! event on the broadcast channel at its fire instant; unregistering
//! aborts the task. What to register is decided entirely by
//! `engine::reminders` — this module only executes the plan.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db;
use crate::engine::reminders::{self, ScheduleError};
use crate::models::streak::StreakRecord;

/// Carried by every registered alarm and echoed in the fired event.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReminderPayload {
    pub streak_id: Uuid,
    pub streak_name: String,
}

pub struct ReminderService {
    alarms: Mutex<HashMap<String, JoinHandle<()>>>,
    events_tx: broadcast::Sender<String>,
}

impl ReminderService {
    pub fn new(events_tx: broadcast::Sender<String>) -> Arc<Self> {
        Arc::new(Self {
            alarms: Mutex::new(HashMap::new()),
            events_tx,
        })
    }

    /// Register a one-shot alarm. Registering an identifier twice
    /// replaces the earlier alarm.
    pub fn register(
        self: &Arc<Self>,
        identifier: String,
        fire_at: DateTime<Utc>,
        payload: ReminderPayload,
    ) {
        let delay = (fire_at - Utc::now()).to_std().unwrap_or_default();
        let service = Arc::clone(self);
        let task_id = identifier.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let event = serde_json::json!({
                "type": "reminder_fired",
                "identifier": task_id,
                "streak_id": payload.streak_id,
                "streak_name": payload.streak_name,
                "message": "Don't break your streak! Log your progress for today.",
            });
            let _ = service.events_tx.send(event.to_string());
            service.alarms().remove(&task_id);
        });

        if let Some(previous) = self.alarms().insert(identifier, handle) {
            previous.abort();
        }
    }

    /// Idempotent: unknown identifiers are a no-op.
    pub fn unregister(&self, identifier: &str) {
        if let Some(handle) = self.alarms().remove(identifier) {
            handle.abort();
        }
    }

    /// Register every reminder the record's configuration calls for.
    /// Returns how many alarms were registered.
    pub fn schedule_for_streak(
        self: &Arc<Self>,
        record: &StreakRecord,
        now: DateTime<Utc>,
    ) -> Result<usize, ScheduleError> {
        let plan = reminders::plan_for_record(record, &now)?;
        let count = plan.len();
        for planned in plan {
            self.register(
                planned.identifier,
                planned.fire_at,
                ReminderPayload {
                    streak_id: record.id,
                    streak_name: record.name.clone(),
                },
            );
        }
        tracing::debug!(streak_id = %record.id, count, "Reminders registered");
        Ok(count)
    }

    /// Cancel every alarm a prior scheduling call for this record could
    /// have registered.
    pub fn cancel_for_streak(&self, record: &StreakRecord, today: NaiveDate) {
        for identifier in reminders::cancellation_for_record(record, today) {
            self.unregister(&identifier);
        }
        tracing::debug!(streak_id = %record.id, "Reminders cancelled");
    }

    /// Boot hook: re-derive and re-register all reminders from persisted
    /// records. The schedule itself is never persisted; the plan computed
    /// here is the sole source of truth.
    pub async fn reschedule_all(self: &Arc<Self>, pool: &PgPool) -> Result<usize, sqlx::Error> {
        let records = db::streaks::list(pool).await?;
        let now = Utc::now();
        let mut scheduled = 0;

        for record in &records {
            self.cancel_for_streak(record, now.date_naive());
            match self.schedule_for_streak(record, now) {
                Ok(count) => scheduled += count,
                Err(e) => {
                    tracing::warn!(streak_id = %record.id, error = %e, "Skipping reminder schedule")
                }
            }
        }

        tracing::info!(count = scheduled, "Reminder schedule rebuilt");
        Ok(scheduled)
    }

    /// Number of alarms currently pending.
    pub fn pending(&self) -> usize {
        self.alarms().len()
    }

    fn alarms(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.alarms.lock().expect("alarm registry poisoned")
    }
}
