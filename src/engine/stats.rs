//! Streak statistics engine.
//!
//! Derives current/longest streak, completion rate, period aggregates and
//! achievements from a streak's configuration and its set of logged dates.
//! All functions are pure; callers own persistence and write-back.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::models::streak::{GoalFrequency, StreakRecord};

/// Total-completed-days checkpoints that earn an achievement, independent
/// of the per-streak milestone set.
pub const TOTAL_DAYS_CHECKPOINTS: [i32; 4] = [7, 30, 100, 365];

/// A declined log attempt. None of these mutate the record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    #[error("Streak is not active")]
    StreakInactive,

    #[error("{0} is an explicit skip day for this streak")]
    DateIsSkipped(NaiveDate),

    #[error("Monthly skip allowance is exhausted")]
    ExceededMonthlySkips,

    #[error("Cannot log a date in the future")]
    DateInFuture,

    #[error("Cannot log a date before the streak started")]
    DateBeforeStart,
}

/// Result of [`recompute_after_log`].
#[derive(Debug, Clone)]
pub enum LogOutcome {
    /// The date was accepted and all derived state recomputed.
    Updated {
        record: StreakRecord,
        /// Achievements crossed by this log, already appended to the record.
        new_achievements: Vec<String>,
    },
    /// The date was already present. Nothing changed; callers should skip
    /// the write entirely.
    AlreadyLogged,
}

struct StreakComputation {
    current: i32,
    longest_candidate: i32,
}

/// Validate a log attempt and return the fully recomputed record.
///
/// `log_date` is normally "today" but is a parameter so history can be
/// replayed in tests. `now` drives the currency and grace-period checks;
/// civil "today" is its UTC date.
pub fn recompute_after_log(
    record: &StreakRecord,
    log_date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<LogOutcome, LogError> {
    if !record.is_active {
        return Err(LogError::StreakInactive);
    }
    if record.daily_log_dates.contains(&log_date) {
        return Ok(LogOutcome::AlreadyLogged);
    }
    if record.skip_dates.contains(&log_date) {
        return Err(LogError::DateIsSkipped(log_date));
    }

    let today = now.date_naive();
    if log_date > today {
        return Err(LogError::DateInFuture);
    }
    if log_date < record.start_date {
        return Err(LogError::DateBeforeStart);
    }

    // The skip cap only gates whether today can still be logged; it is
    // never applied retroactively, and a month with no skip days at all
    // never trips it.
    if log_date == today {
        let skips_this_month = record
            .skip_dates
            .iter()
            .filter(|d| d.year() == log_date.year() && d.month() == log_date.month())
            .count() as i32;
        if skips_this_month > 0 && skips_this_month >= record.allowed_skips_per_month {
            return Err(LogError::ExceededMonthlySkips);
        }
    }

    let mut dates = record.daily_log_dates.clone();
    dates.push(log_date);
    dates.sort_unstable();

    let computed = calculate_streaks(record, &dates, now);

    let mut updated = record.clone();
    updated.daily_log_dates = dates;
    updated.current_streak = computed.current;
    updated.longest_streak = record.longest_streak.max(computed.longest_candidate);
    updated.total_completed_days = updated.daily_log_dates.len() as i32;
    updated.last_completed_date = updated.daily_log_dates.last().copied();
    updated.average_completion_rate =
        completion_rate(&updated.daily_log_dates, updated.start_date, today);
    updated.weekly_stats = sqlx::types::Json(weekly_stats(&updated.daily_log_dates));
    updated.monthly_stats = sqlx::types::Json(monthly_stats(&updated.daily_log_dates));
    updated.updated_at = now;

    let new_achievements = detect_achievements(&updated);
    updated
        .achieved_milestones
        .extend(new_achievements.iter().cloned());

    Ok(LogOutcome::Updated {
        record: updated,
        new_achievements,
    })
}

/// Manual override: zero the current streak and deactivate. No validation.
pub fn break_streak(record: &StreakRecord, now: DateTime<Utc>) -> StreakRecord {
    let mut updated = record.clone();
    updated.current_streak = 0;
    updated.is_active = false;
    updated.updated_at = now;
    updated
}

/// True when the streak is active, today is unlogged, the period still
/// needs completions, and the user is not currently covered by grace.
pub fn needs_attention_today(record: &StreakRecord, now: DateTime<Utc>) -> bool {
    let today = now.date_naive();
    record.is_active
        && !record.daily_log_dates.contains(&today)
        && should_complete_today(record, today)
        && !grace_period_active(record, now)
}

/// Per-frequency "is a completion still expected today" check.
pub fn should_complete_today(record: &StreakRecord, today: NaiveDate) -> bool {
    match record.goal_frequency {
        GoalFrequency::Daily => true,
        GoalFrequency::Weekly => {
            completed_days_in_week(&record.daily_log_dates, today) < record.target_days
        }
        GoalFrequency::Monthly => {
            completed_days_in_month(&record.daily_log_dates, today) < record.target_days
        }
    }
}

fn calculate_streaks(
    record: &StreakRecord,
    sorted_dates: &[NaiveDate],
    now: DateTime<Utc>,
) -> StreakComputation {
    if sorted_dates.is_empty() {
        return StreakComputation {
            current: 0,
            longest_candidate: 0,
        };
    }

    let today = now.date_naive();

    let (raw_current, longest_candidate, broken) = match record.goal_frequency {
        GoalFrequency::Daily => {
            let (run, max_run) = consecutive_runs(sorted_dates);
            // Currency: the run only counts while its tail is today or
            // yesterday.
            let last = sorted_dates[sorted_dates.len() - 1];
            let broken = last != today && last + Duration::days(1) != today;
            (run, max_run, broken)
        }
        GoalFrequency::Weekly => {
            let buckets = bucket_by(sorted_dates, week_start);
            let minimum = record.required_weekly_minimum();
            let (run, max_run) = period_runs(&buckets, minimum, week_start(today), next_week);

            // Early break: the in-progress week can no longer reach its
            // minimum even if every remaining day is logged.
            let logs_this_week = buckets.get(&week_start(today)).copied().unwrap_or(0);
            let days_left = 7 - today.weekday().number_from_monday() as i32 + 1;
            (run, max_run, logs_this_week + days_left < minimum)
        }
        GoalFrequency::Monthly => {
            let buckets = bucket_by(sorted_dates, month_start);
            let (run, max_run) =
                period_runs(&buckets, record.target_days, month_start(today), next_month);

            let logs_this_month = buckets.get(&month_start(today)).copied().unwrap_or(0);
            let days_left = days_in_month(today) - today.day() as i32 + 1;
            (run, max_run, logs_this_month + days_left < record.target_days)
        }
    };

    let mut current = if broken { 0 } else { raw_current };

    // Grace tolerance: a just-broken streak is still reported intact while
    // now is before start-of-today plus the grace window. No date is added
    // to the log by this.
    if current == 0 && raw_current > 0 && record.grace_period_hours > 0 {
        let deadline = today.and_time(NaiveTime::MIN)
            + Duration::hours(i64::from(record.grace_period_hours));
        if now.naive_utc() < deadline {
            current = raw_current;
        }
    }

    StreakComputation {
        current,
        longest_candidate,
    }
}

/// Run lengths over sorted dates where consecutive entries differ by one
/// day. Returns (run ending at the last date, maximum run seen). A gap
/// restarts the running counter at 1: a lone day is a streak of length 1.
fn consecutive_runs(sorted_dates: &[NaiveDate]) -> (i32, i32) {
    let mut run = 0;
    let mut max_run = 0;
    let mut prev: Option<NaiveDate> = None;

    for &date in sorted_dates {
        run = match prev {
            Some(p) if date == p + Duration::days(1) => run + 1,
            _ => 1,
        };
        max_run = max_run.max(run);
        prev = Some(date);
    }

    (run, max_run)
}

/// Week/month analogue of [`consecutive_runs`]: walk period buckets in
/// ascending order, chaining periods that meet `minimum` and are exactly
/// one step apart. A completed period below the minimum breaks the chain
/// outright; the in-progress period below its minimum is left undecided
/// here (the early-break rule handles it).
fn period_runs(
    buckets: &BTreeMap<NaiveDate, i32>,
    minimum: i32,
    current_period: NaiveDate,
    step: fn(NaiveDate) -> NaiveDate,
) -> (i32, i32) {
    let mut run = 0;
    let mut max_run = 0;
    let mut prev_qualifying: Option<NaiveDate> = None;

    for (&period, &count) in buckets {
        if count >= minimum {
            run = match prev_qualifying {
                Some(prev) if step(prev) == period => run + 1,
                _ => 1,
            };
            max_run = max_run.max(run);
            prev_qualifying = Some(period);
        } else if period != current_period {
            run = 0;
            prev_qualifying = None;
        }
    }

    (run, max_run)
}

fn bucket_by(
    sorted_dates: &[NaiveDate],
    key: fn(NaiveDate) -> NaiveDate,
) -> BTreeMap<NaiveDate, i32> {
    let mut buckets = BTreeMap::new();
    for &date in sorted_dates {
        *buckets.entry(key(date)).or_insert(0) += 1;
    }
    buckets
}

/// Completion rate in [0, 100]: logged days over the days elapsed between
/// `max(start_date, earliest log)` and today, inclusive. Empty logs or a
/// window that has not begun yield 0 rather than dividing by a
/// non-positive denominator.
pub fn completion_rate(sorted_dates: &[NaiveDate], start_date: NaiveDate, today: NaiveDate) -> f32 {
    let Some(&earliest) = sorted_dates.first() else {
        return 0.0;
    };
    let window_start = start_date.max(earliest);
    let total_days = (today - window_start).num_days() + 1;
    if total_days <= 0 {
        return 0.0;
    }
    let rate = sorted_dates.len() as f32 / total_days as f32 * 100.0;
    rate.clamp(0.0, 100.0)
}

/// Logged-day counts keyed by ISO week-of-year.
pub fn weekly_stats(dates: &[NaiveDate]) -> BTreeMap<u32, u32> {
    let mut stats = BTreeMap::new();
    for date in dates {
        *stats.entry(date.iso_week().week()).or_insert(0) += 1;
    }
    stats
}

/// Logged-day counts keyed by calendar month number (1-12).
pub fn monthly_stats(dates: &[NaiveDate]) -> BTreeMap<u32, u32> {
    let mut stats = BTreeMap::new();
    for date in dates {
        *stats.entry(date.month()).or_insert(0) += 1;
    }
    stats
}

/// Per-week completed counts from the earliest log through today,
/// zero-filled for empty weeks. Keys are week start dates (Monday).
pub fn weekly_completion(sorted_dates: &[NaiveDate], today: NaiveDate) -> BTreeMap<NaiveDate, u32> {
    period_completion(sorted_dates, today, week_start, next_week)
}

/// Per-month completed counts from the earliest log through today,
/// zero-filled for empty months. Keys are first-of-month dates.
pub fn monthly_completion(
    sorted_dates: &[NaiveDate],
    today: NaiveDate,
) -> BTreeMap<NaiveDate, u32> {
    period_completion(sorted_dates, today, month_start, next_month)
}

fn period_completion(
    sorted_dates: &[NaiveDate],
    today: NaiveDate,
    key: fn(NaiveDate) -> NaiveDate,
    step: fn(NaiveDate) -> NaiveDate,
) -> BTreeMap<NaiveDate, u32> {
    let mut completion = BTreeMap::new();
    let Some(&earliest) = sorted_dates.first() else {
        return completion;
    };

    let mut period = key(earliest);
    while period <= today {
        let end = step(period);
        let count = sorted_dates
            .iter()
            .filter(|d| **d >= period && **d < end)
            .count() as u32;
        completion.insert(period, count);
        period = end;
    }
    completion
}

pub fn completed_days_in_week(dates: &[NaiveDate], today: NaiveDate) -> i32 {
    let start = week_start(today);
    dates.iter().filter(|d| **d >= start && **d <= today).count() as i32
}

pub fn completed_days_in_month(dates: &[NaiveDate], today: NaiveDate) -> i32 {
    let start = month_start(today);
    dates.iter().filter(|d| **d >= start && **d <= today).count() as i32
}

fn detect_achievements(record: &StreakRecord) -> Vec<String> {
    let mut achievements = Vec::new();

    if record.milestones.contains(&record.current_streak) {
        let text = format!("Reached {} day streak!", record.current_streak);
        if !record.achieved_milestones.contains(&text) {
            achievements.push(text);
        }
    }

    if TOTAL_DAYS_CHECKPOINTS.contains(&record.total_completed_days) {
        let text = format!("Completed {} total days!", record.total_completed_days);
        if !record.achieved_milestones.contains(&text) {
            achievements.push(text);
        }
    }

    achievements
}

fn grace_period_active(record: &StreakRecord, now: DateTime<Utc>) -> bool {
    if record.grace_period_hours <= 0 {
        return false;
    }
    let Some(last) = record.last_completed_date else {
        return false;
    };
    let today = now.date_naive();
    if last == today || last + Duration::days(1) == today {
        // Streak is still current; no slack is being consumed.
        return false;
    }
    let deadline =
        today.and_time(NaiveTime::MIN) + Duration::hours(i64::from(record.grace_period_hours));
    now.naive_utc() < deadline
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn next_week(week: NaiveDate) -> NaiveDate {
    week + Duration::days(7)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(month: NaiveDate) -> NaiveDate {
    let (year, month_number) = if month.month() == 12 {
        (month.year() + 1, 1)
    } else {
        (month.year(), month.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month_number, 1).unwrap_or(month)
}

fn days_in_month(date: NaiveDate) -> i32 {
    let start = month_start(date);
    (next_month(start) - start).num_days() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::streak::DEFAULT_MILESTONES;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use sqlx::types::Json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32, min: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&d.and_hms_opt(h, min, 0).unwrap())
    }

    fn record(start: NaiveDate) -> StreakRecord {
        StreakRecord {
            id: uuid::Uuid::new_v4(),
            name: "Morning run".into(),
            description: None,
            color: "#FF4081".into(),
            icon: None,
            category: None,
            priority: 0,
            start_date: start,
            target_end_date: None,
            goal_frequency: GoalFrequency::Daily,
            target_days: 1,
            minimum_days_per_week: None,
            allowed_skips_per_month: 0,
            grace_period_hours: 0,
            skip_dates: vec![],
            is_active: true,
            is_public: false,
            reminder_enabled: false,
            reminder_time: None,
            custom_reminder_days: vec![],
            daily_log_dates: vec![],
            current_streak: 0,
            longest_streak: 0,
            total_completed_days: 0,
            last_completed_date: None,
            average_completion_rate: 0.0,
            weekly_stats: Json(BTreeMap::new()),
            monthly_stats: Json(BTreeMap::new()),
            milestones: DEFAULT_MILESTONES.to_vec(),
            achieved_milestones: vec![],
            motivational_quotes: vec![],
            notes: vec![],
            tags: vec![],
            shared_with: vec![],
            created_at: at(start, 0, 0),
            updated_at: at(start, 0, 0),
        }
    }

    fn log_all(mut rec: StreakRecord, dates: &[NaiveDate], now: DateTime<Utc>) -> StreakRecord {
        for &d in dates {
            match recompute_after_log(&rec, d, now).unwrap() {
                LogOutcome::Updated { record, .. } => rec = record,
                LogOutcome::AlreadyLogged => {}
            }
        }
        rec
    }

    #[test]
    fn consecutive_daily_run_counts_up() {
        let start = date(2024, 3, 1);
        let days: Vec<_> = (0..5).map(|i| start + Duration::days(i)).collect();
        let now = at(date(2024, 3, 5), 12, 0);

        let rec = log_all(record(start), &days, now);
        assert_eq!(rec.current_streak, 5);
        assert_eq!(rec.longest_streak, 5);
        assert_eq!(rec.total_completed_days, 5);
        assert_eq!(rec.last_completed_date, Some(date(2024, 3, 5)));
    }

    #[test]
    fn gap_restarts_run_at_one() {
        let start = date(2024, 3, 1);
        let now = at(date(2024, 3, 10), 12, 0);
        let rec = log_all(
            record(start),
            &[
                date(2024, 3, 1),
                date(2024, 3, 2),
                date(2024, 3, 3),
                date(2024, 3, 10),
            ],
            now,
        );
        assert_eq!(rec.current_streak, 1);
        assert_eq!(rec.longest_streak, 3);
    }

    #[test]
    fn stale_tail_reports_zero_current() {
        let start = date(2024, 3, 1);
        let now = at(date(2024, 3, 10), 12, 0);
        let rec = log_all(
            record(start),
            &[date(2024, 3, 1), date(2024, 3, 2), date(2024, 3, 3)],
            now,
        );
        assert_eq!(rec.current_streak, 0);
        assert_eq!(rec.longest_streak, 3);
    }

    #[test]
    fn yesterday_tail_is_still_current() {
        let start = date(2024, 3, 1);
        let now = at(date(2024, 3, 4), 9, 0);
        let rec = log_all(
            record(start),
            &[date(2024, 3, 1), date(2024, 3, 2), date(2024, 3, 3)],
            now,
        );
        assert_eq!(rec.current_streak, 3);
    }

    #[test]
    fn relogging_same_date_is_a_noop() {
        let start = date(2024, 3, 1);
        let now = at(start, 20, 0);
        let rec = log_all(record(start), &[start], now);

        let outcome = recompute_after_log(&rec, start, now).unwrap();
        assert!(matches!(outcome, LogOutcome::AlreadyLogged));
        assert_eq!(rec.daily_log_dates.len(), 1);
    }

    #[test]
    fn inactive_streak_rejects_logs() {
        let start = date(2024, 3, 1);
        let mut rec = record(start);
        rec.is_active = false;
        let err = recompute_after_log(&rec, start, at(start, 8, 0)).unwrap_err();
        assert_eq!(err, LogError::StreakInactive);
    }

    #[test]
    fn skip_date_rejects_logs() {
        let start = date(2024, 3, 1);
        let mut rec = record(start);
        rec.skip_dates = vec![date(2024, 3, 2)];
        rec.allowed_skips_per_month = 5;
        let err = recompute_after_log(&rec, date(2024, 3, 2), at(date(2024, 3, 2), 8, 0))
            .unwrap_err();
        assert_eq!(err, LogError::DateIsSkipped(date(2024, 3, 2)));
    }

    #[test]
    fn exhausted_skip_allowance_blocks_today() {
        let start = date(2024, 3, 1);
        let mut rec = record(start);
        rec.allowed_skips_per_month = 2;
        rec.skip_dates = vec![date(2024, 3, 2), date(2024, 3, 5)];

        let err =
            recompute_after_log(&rec, date(2024, 3, 8), at(date(2024, 3, 8), 8, 0)).unwrap_err();
        assert_eq!(err, LogError::ExceededMonthlySkips);

        // Backfilling an earlier date is not subject to the cap.
        let outcome = recompute_after_log(&rec, date(2024, 3, 7), at(date(2024, 3, 8), 8, 0));
        assert!(matches!(outcome, Ok(LogOutcome::Updated { .. })));
    }

    #[test]
    fn future_and_prehistoric_dates_are_rejected() {
        let start = date(2024, 3, 10);
        let rec = record(start);
        let now = at(date(2024, 3, 12), 8, 0);

        assert_eq!(
            recompute_after_log(&rec, date(2024, 3, 13), now).unwrap_err(),
            LogError::DateInFuture
        );
        assert_eq!(
            recompute_after_log(&rec, date(2024, 3, 9), now).unwrap_err(),
            LogError::DateBeforeStart
        );
    }

    #[test]
    fn grace_window_reinstates_broken_run() {
        let start = date(2024, 3, 1);
        let mut rec = record(start);
        rec.grace_period_hours = 24;

        // Three-day run whose tail is three days old: past the currency
        // window, but still inside today's 24h grace deadline.
        let now = at(date(2024, 3, 6), 23, 0);
        let rec = log_all(rec, &[date(2024, 3, 1), date(2024, 3, 2), date(2024, 3, 3)], now);
        assert_eq!(rec.current_streak, 3);

        // Same history without grace reports 0.
        let mut bare = record(start);
        bare.grace_period_hours = 0;
        let bare = log_all(bare, &[date(2024, 3, 1), date(2024, 3, 2), date(2024, 3, 3)], now);
        assert_eq!(bare.current_streak, 0);
    }

    #[test]
    fn grace_with_yesterday_tail_keeps_run_intact() {
        let start = date(2024, 3, 1);
        let mut rec = record(start);
        rec.grace_period_hours = 24;
        let now = at(date(2024, 3, 4), 23, 0);
        let rec = log_all(rec, &[date(2024, 3, 1), date(2024, 3, 2), date(2024, 3, 3)], now);
        assert_eq!(rec.current_streak, 3);
    }

    #[test]
    fn expired_grace_window_stays_broken() {
        let start = date(2024, 3, 1);
        let mut rec = record(start);
        rec.grace_period_hours = 5;
        let now = at(date(2024, 3, 8), 9, 0);
        let rec = log_all(rec, &[date(2024, 3, 1), date(2024, 3, 2)], now);
        assert_eq!(rec.current_streak, 0);
    }

    #[test]
    fn weekly_run_counts_qualifying_weeks() {
        let start = date(2024, 1, 1); // Monday
        let mut rec = record(start);
        rec.goal_frequency = GoalFrequency::Weekly;
        rec.target_days = 2;

        // Two qualifying weeks, then two logs in the current week.
        let days = [
            date(2024, 1, 1),
            date(2024, 1, 3),
            date(2024, 1, 8),
            date(2024, 1, 10),
            date(2024, 1, 15),
            date(2024, 1, 16),
        ];
        let now = at(date(2024, 1, 16), 20, 0);
        let rec = log_all(rec, &days, now);
        assert_eq!(rec.current_streak, 3);
        assert_eq!(rec.longest_streak, 3);
    }

    #[test]
    fn weekly_early_break_when_minimum_unreachable() {
        let start = date(2024, 1, 1);
        let mut rec = record(start);
        rec.goal_frequency = GoalFrequency::Weekly;
        rec.target_days = 1;
        rec.minimum_days_per_week = Some(3);

        // A qualifying first week, then nothing. By Saturday the current
        // week has 0 logs and only 2 days remain: 0 + 2 < 3.
        let days = [date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)];
        let saturday = date(2024, 1, 13);
        let rec = log_all(rec, &days, at(saturday, 10, 0));
        assert_eq!(rec.current_streak, 0);
        assert_eq!(rec.longest_streak, 1);
    }

    #[test]
    fn weekly_in_progress_week_below_minimum_keeps_run() {
        let start = date(2024, 1, 1);
        let mut rec = record(start);
        rec.goal_frequency = GoalFrequency::Weekly;
        rec.target_days = 1;
        rec.minimum_days_per_week = Some(3);

        // Qualifying week one; current week has 2 logs by Friday, and
        // 2 + 3 remaining days >= 3, so the run survives.
        let days = [
            date(2024, 1, 1),
            date(2024, 1, 2),
            date(2024, 1, 3),
            date(2024, 1, 8),
            date(2024, 1, 9),
        ];
        let friday = date(2024, 1, 12);
        let rec = log_all(rec, &days, at(friday, 10, 0));
        assert_eq!(rec.current_streak, 1);
    }

    #[test]
    fn monthly_run_mirrors_weekly_bucketing() {
        let start = date(2024, 1, 1);
        let mut rec = record(start);
        rec.goal_frequency = GoalFrequency::Monthly;
        rec.target_days = 2;

        let days = [
            date(2024, 1, 5),
            date(2024, 1, 20),
            date(2024, 2, 3),
            date(2024, 2, 18),
            date(2024, 3, 2),
            date(2024, 3, 9),
        ];
        let now = at(date(2024, 3, 9), 18, 0);
        let rec = log_all(rec, &days, now);
        assert_eq!(rec.current_streak, 3);
    }

    #[test]
    fn monthly_early_break_when_target_unreachable() {
        let start = date(2024, 1, 1);
        let mut rec = record(start);
        rec.goal_frequency = GoalFrequency::Monthly;
        rec.target_days = 10;

        // By March 25 only 2 logs exist and 7 days remain: 2 + 7 < 10.
        let days = [date(2024, 3, 1), date(2024, 3, 2)];
        let rec = log_all(rec, &days, at(date(2024, 3, 25), 9, 0));
        assert_eq!(rec.current_streak, 0);
    }

    #[test]
    fn completion_rate_handles_edge_windows() {
        let today = date(2024, 3, 10);
        assert_eq!(completion_rate(&[], date(2024, 3, 1), today), 0.0);

        // Start date in the future: window has not begun.
        assert_eq!(
            completion_rate(&[date(2024, 3, 10)], date(2024, 4, 1), today),
            0.0
        );

        // 5 logged days over a 10-day window.
        let dates: Vec<_> = (0..5).map(|i| date(2024, 3, 1) + Duration::days(i)).collect();
        let rate = completion_rate(&dates, date(2024, 3, 1), today);
        assert!((rate - 50.0).abs() < f32::EPSILON);

        // Logging every day caps at 100.
        let full: Vec<_> = (0..10).map(|i| date(2024, 3, 1) + Duration::days(i)).collect();
        assert_eq!(completion_rate(&full, date(2024, 3, 1), today), 100.0);
    }

    #[test]
    fn milestone_achievements_recorded_once() {
        let start = date(2024, 3, 1);
        let days: Vec<_> = (0..7).map(|i| start + Duration::days(i)).collect();
        let now = at(date(2024, 3, 7), 21, 0);

        let mut rec = record(start);
        let mut announced = Vec::new();
        for &d in &days {
            if let LogOutcome::Updated {
                record: r,
                new_achievements,
            } = recompute_after_log(&rec, d, now).unwrap()
            {
                announced.extend(new_achievements);
                rec = r;
            }
        }

        assert!(announced.contains(&"Reached 7 day streak!".to_string()));
        assert!(announced.contains(&"Completed 7 total days!".to_string()));
        assert_eq!(
            rec.achieved_milestones
                .iter()
                .filter(|a| a.as_str() == "Reached 7 day streak!")
                .count(),
            1
        );
    }

    #[test]
    fn break_streak_zeroes_and_deactivates() {
        let start = date(2024, 3, 1);
        let now = at(date(2024, 3, 3), 12, 0);
        let rec = log_all(record(start), &[date(2024, 3, 2), date(2024, 3, 3)], now);
        assert_eq!(rec.current_streak, 2);

        let broken = break_streak(&rec, now);
        assert_eq!(broken.current_streak, 0);
        assert!(!broken.is_active);
        assert_eq!(broken.longest_streak, 2);
    }

    #[test]
    fn needs_attention_for_unlogged_active_daily() {
        let start = date(2024, 3, 1);
        let now = at(date(2024, 3, 3), 12, 0);
        let rec = log_all(record(start), &[date(2024, 3, 1), date(2024, 3, 2)], now);
        assert!(needs_attention_today(&rec, now));

        let rec = log_all(rec, &[date(2024, 3, 3)], now);
        assert!(!needs_attention_today(&rec, now));
    }

    #[test]
    fn needs_attention_suppressed_during_grace() {
        let start = date(2024, 3, 1);
        let mut rec = record(start);
        rec.grace_period_hours = 24;
        let now = at(date(2024, 3, 6), 10, 0);
        let rec = log_all(rec, &[date(2024, 3, 1), date(2024, 3, 2)], now);
        assert!(!needs_attention_today(&rec, now));
    }

    #[test]
    fn weekly_target_met_clears_attention() {
        let start = date(2024, 1, 1);
        let mut rec = record(start);
        rec.goal_frequency = GoalFrequency::Weekly;
        rec.target_days = 2;
        let now = at(date(2024, 1, 10), 9, 0);
        let rec = log_all(rec, &[date(2024, 1, 8), date(2024, 1, 9)], now);
        assert!(!needs_attention_today(&rec, now));
    }

    #[test]
    fn period_completion_zero_fills() {
        let dates = [date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 16)];
        let weekly = weekly_completion(&dates, date(2024, 1, 17));
        assert_eq!(weekly.get(&date(2024, 1, 1)), Some(&2));
        assert_eq!(weekly.get(&date(2024, 1, 8)), Some(&0));
        assert_eq!(weekly.get(&date(2024, 1, 15)), Some(&1));

        let monthly = monthly_completion(&dates, date(2024, 3, 5));
        assert_eq!(monthly.get(&date(2024, 1, 1)), Some(&3));
        assert_eq!(monthly.get(&date(2024, 2, 1)), Some(&0));
        assert_eq!(monthly.get(&date(2024, 3, 1)), Some(&0));
    }

    proptest! {
        /// Logging any set of dates in any order keeps the counters
        /// consistent and the rate within bounds.
        #[test]
        fn invariants_hold_for_arbitrary_log_orders(
            offsets in proptest::collection::vec(0i64..60, 1..40)
        ) {
            let start = date(2024, 1, 1);
            let now = at(date(2024, 2, 29), 12, 0);
            let mut rec = record(start);

            for off in offsets {
                let d = start + Duration::days(off);
                match recompute_after_log(&rec, d, now) {
                    Ok(LogOutcome::Updated { record: r, .. }) => rec = r,
                    Ok(LogOutcome::AlreadyLogged) => {}
                    Err(e) => prop_assert!(false, "unexpected rejection: {e}"),
                }
                prop_assert!(rec.current_streak <= rec.longest_streak);
                prop_assert!(rec.current_streak >= 0);
                prop_assert!((0.0..=100.0).contains(&rec.average_completion_rate));
                prop_assert_eq!(rec.total_completed_days as usize, rec.daily_log_dates.len());
            }

            let mut sorted = rec.daily_log_dates.clone();
            sorted.sort_unstable();
            prop_assert_eq!(&sorted, &rec.daily_log_dates);
        }
    }
}
