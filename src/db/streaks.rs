//! Keyed persistence for streak records: get/put/delete plus the list
//! query backing the filtered views. Records are replaced wholesale; the
//! engines never touch this module.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::streak::StreakRecord;

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<StreakRecord>, sqlx::Error> {
    sqlx::query_as::<_, StreakRecord>("SELECT * FROM streaks WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<StreakRecord>, sqlx::Error> {
    sqlx::query_as::<_, StreakRecord>("SELECT * FROM streaks ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

/// Full-row replace keyed by id; inserts when the id is new.
pub async fn put(pool: &PgPool, record: &StreakRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO streaks (
            id, name, description, color, icon, category, priority,
            start_date, target_end_date, goal_frequency, target_days,
            minimum_days_per_week, allowed_skips_per_month, grace_period_hours,
            skip_dates, is_active, is_public,
            reminder_enabled, reminder_time, custom_reminder_days,
            daily_log_dates, current_streak, longest_streak,
            total_completed_days, last_completed_date, average_completion_rate,
            weekly_stats, monthly_stats, milestones, achieved_milestones,
            motivational_quotes, notes, tags, shared_with,
            created_at, updated_at
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
            $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26,
            $27, $28, $29, $30, $31, $32, $33, $34, $35, $36
        )
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            color = EXCLUDED.color,
            icon = EXCLUDED.icon,
            category = EXCLUDED.category,
            priority = EXCLUDED.priority,
            start_date = EXCLUDED.start_date,
            target_end_date = EXCLUDED.target_end_date,
            goal_frequency = EXCLUDED.goal_frequency,
            target_days = EXCLUDED.target_days,
            minimum_days_per_week = EXCLUDED.minimum_days_per_week,
            allowed_skips_per_month = EXCLUDED.allowed_skips_per_month,
            grace_period_hours = EXCLUDED.grace_period_hours,
            skip_dates = EXCLUDED.skip_dates,
            is_active = EXCLUDED.is_active,
            is_public = EXCLUDED.is_public,
            reminder_enabled = EXCLUDED.reminder_enabled,
            reminder_time = EXCLUDED.reminder_time,
            custom_reminder_days = EXCLUDED.custom_reminder_days,
            daily_log_dates = EXCLUDED.daily_log_dates,
            current_streak = EXCLUDED.current_streak,
            longest_streak = EXCLUDED.longest_streak,
            total_completed_days = EXCLUDED.total_completed_days,
            last_completed_date = EXCLUDED.last_completed_date,
            average_completion_rate = EXCLUDED.average_completion_rate,
            weekly_stats = EXCLUDED.weekly_stats,
            monthly_stats = EXCLUDED.monthly_stats,
            milestones = EXCLUDED.milestones,
            achieved_milestones = EXCLUDED.achieved_milestones,
            motivational_quotes = EXCLUDED.motivational_quotes,
            notes = EXCLUDED.notes,
            tags = EXCLUDED.tags,
            shared_with = EXCLUDED.shared_with,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(record.id)
    .bind(&record.name)
    .bind(&record.description)
    .bind(&record.color)
    .bind(&record.icon)
    .bind(&record.category)
    .bind(record.priority)
    .bind(record.start_date)
    .bind(record.target_end_date)
    .bind(record.goal_frequency)
    .bind(record.target_days)
    .bind(record.minimum_days_per_week)
    .bind(record.allowed_skips_per_month)
    .bind(record.grace_period_hours)
    .bind(&record.skip_dates)
    .bind(record.is_active)
    .bind(record.is_public)
    .bind(record.reminder_enabled)
    .bind(record.reminder_time)
    .bind(&record.custom_reminder_days)
    .bind(&record.daily_log_dates)
    .bind(record.current_streak)
    .bind(record.longest_streak)
    .bind(record.total_completed_days)
    .bind(record.last_completed_date)
    .bind(record.average_completion_rate)
    .bind(&record.weekly_stats)
    .bind(&record.monthly_stats)
    .bind(&record.milestones)
    .bind(&record.achieved_milestones)
    .bind(&record.motivational_quotes)
    .bind(&record.notes)
    .bind(&record.tags)
    .bind(&record.shared_with)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns true when a row was actually removed.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM streaks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
