//! Reminder scheduling engine.
//!
//! Converts a streak's reminder configuration into the finite sequence of
//! one-shot fire instants the notification sink must register, and
//! regenerates the matching identifiers for exact cancellation. Instants
//! are resolved against the zone of the injected `now` at scheduling time;
//! later zone-rule changes are not retroactively corrected.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Weekday};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::streak::StreakRecord;

/// How far ahead open-ended streaks (no target end date) get one-shot
/// reminders registered. The boot reschedule hook keeps the window
/// rolling.
pub const DEFAULT_HORIZON_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Reminder start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// One reminder to hand to the notification sink.
#[derive(Debug, Clone)]
pub struct PlannedReminder<Tz: TimeZone> {
    pub identifier: String,
    pub fire_at: DateTime<Tz>,
}

/// Compute the ordered fire instants for a daily reminder between
/// `start_date` and `end_date` inclusive.
///
/// The first candidate day is `max(today, start_date)`; if its instant is
/// not strictly after `now`, that slot has already passed and the
/// sequence starts the next day. A range that is entirely in the past
/// yields an empty sequence, not an error.
pub fn compute_fire_instants<Tz: TimeZone>(
    reminder_time: NaiveTime,
    start_date: NaiveDate,
    end_date: NaiveDate,
    now: &DateTime<Tz>,
) -> Result<Vec<DateTime<Tz>>, ScheduleError> {
    if start_date > end_date {
        return Err(ScheduleError::InvalidRange {
            start: start_date,
            end: end_date,
        });
    }

    let tz = now.timezone();
    let today = now.date_naive();
    let mut date = start_date.max(today);

    let first = resolve_local(&tz, date, reminder_time);
    if !first.map_or(false, |dt| dt > *now) {
        date = date + Duration::days(1);
    }

    let mut instants = Vec::new();
    while date <= end_date {
        if let Some(instant) = resolve_local(&tz, date, reminder_time) {
            instants.push(instant);
        }
        date = date + Duration::days(1);
    }

    Ok(instants)
}

/// Stable identifier for a `(streak, date)` alarm. Deterministic across
/// process restarts: it is the only handle available to cancel that
/// specific alarm later.
pub fn reminder_identifier(streak_id: Uuid, date: NaiveDate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(streak_id.as_bytes());
    hasher.update(b"_");
    hasher.update(date.to_string().as_bytes());
    hex::encode(&hasher.finalize()[..12])
}

/// Regenerate the identifier for every date a scheduling call could have
/// used in `[start_date, end_date]`. Unregistering an identifier that was
/// never registered is a no-op at the sink, so cancellation with this set
/// is exact and idempotent.
pub fn cancellation_identifiers(
    streak_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<String>, ScheduleError> {
    if start_date > end_date {
        return Err(ScheduleError::InvalidRange {
            start: start_date,
            end: end_date,
        });
    }

    let mut identifiers = Vec::new();
    let mut date = start_date;
    while date <= end_date {
        identifiers.push(reminder_identifier(streak_id, date));
        date = date + Duration::days(1);
    }
    Ok(identifiers)
}

/// Full reminder plan for a record: empty when reminders are disabled,
/// unset, or the streak is inactive; otherwise the fire instants over the
/// record's date range (bounded by [`DEFAULT_HORIZON_DAYS`] when no end
/// date is set), filtered to `custom_reminder_days` when present.
pub fn plan_for_record<Tz: TimeZone>(
    record: &StreakRecord,
    now: &DateTime<Tz>,
) -> Result<Vec<PlannedReminder<Tz>>, ScheduleError> {
    let Some(reminder_time) = record.reminder_time else {
        return Ok(Vec::new());
    };
    if !record.reminder_enabled || !record.is_active {
        return Ok(Vec::new());
    }

    let end = schedule_end(record, now.date_naive());
    let instants = compute_fire_instants(reminder_time, record.start_date, end, now)?;

    let weekdays: Vec<Weekday> = record
        .custom_reminder_days
        .iter()
        .filter_map(|d| iso_weekday(*d))
        .collect();

    Ok(instants
        .into_iter()
        .filter(|instant| weekdays.is_empty() || weekdays.contains(&instant.date_naive().weekday()))
        .map(|instant| PlannedReminder {
            identifier: reminder_identifier(record.id, instant.date_naive()),
            fire_at: instant,
        })
        .collect())
}

/// Identifiers covering everything [`plan_for_record`] could ever have
/// registered for this record, from its start date through its schedule
/// end. The weekday filter is ignored so the set is a superset.
pub fn cancellation_for_record(record: &StreakRecord, today: NaiveDate) -> Vec<String> {
    let end = schedule_end(record, today);
    let start = record.start_date.min(today);
    cancellation_identifiers(record.id, start, end).unwrap_or_default()
}

fn schedule_end(record: &StreakRecord, today: NaiveDate) -> NaiveDate {
    record
        .target_end_date
        .unwrap_or_else(|| today + Duration::days(DEFAULT_HORIZON_DAYS))
}

/// A local time that does not exist in `tz` on `date` (DST gap) has no
/// instant; that day is skipped.
fn resolve_local<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(time)).earliest()
}

fn iso_weekday(day: i16) -> Option<Weekday> {
    match day {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}
