use sqlx::{PgPool, Postgres, Transaction};
use time::Date;
use uuid::Uuid;

use crate::db::models::{
    DeadlinePolicy, DeadlinePolicyInput, WeekWindow, WeeklyReport, WeeklyReportInput,
};
use crate::db::DbResult;

const WEEKLY_COLUMNS: &str = "id, student_id, week_number, week_start, week_end, main_activities, \
    target_achievement, companies_applied, interview_status, challenges_faced, help_needed, \
    next_week_plan, progress_percentage, application_status, is_late, submitted_at, updated_at";

const POLICY_COLUMNS: &str = "id, deadline_date, reminder_frequency_days, description, \
                              email_reminder_enabled, is_active, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WeeklyReportListing {
    #[sqlx(flatten)]
    pub report: WeeklyReport,
    pub student_name: String,
    pub student_number: String,
}

/// A student with no placement who has not reported for the current week.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OverdueStudent {
    pub user_id: Uuid,
    pub student_name: String,
    pub student_number: String,
    pub email: String,
    pub last_week_start: Option<Date>,
}

pub struct WeeklyReportRepository;

impl WeeklyReportRepository {
    pub async fn find_for_week(
        pool: &PgPool,
        student_id: Uuid,
        week_start: Date,
    ) -> DbResult<Option<WeeklyReport>> {
        let report = sqlx::query_as::<_, WeeklyReport>(&format!(
            "SELECT {WEEKLY_COLUMNS} FROM weekly_reports WHERE student_id = $1 AND week_start = $2"
        ))
        .bind(student_id)
        .bind(week_start)
        .fetch_optional(pool)
        .await?;
        Ok(report)
    }

    pub async fn list_for_student(pool: &PgPool, student_id: Uuid) -> DbResult<Vec<WeeklyReport>> {
        let reports = sqlx::query_as::<_, WeeklyReport>(&format!(
            r#"
            SELECT {WEEKLY_COLUMNS}
            FROM weekly_reports
            WHERE student_id = $1
            ORDER BY week_start DESC
            "#
        ))
        .bind(student_id)
        .fetch_all(pool)
        .await?;
        Ok(reports)
    }

    /// One report per (student, week); resubmitting the same week overwrites it.
    pub async fn upsert(
        pool: &PgPool,
        student_id: Uuid,
        window: &WeekWindow,
        is_late: bool,
        input: &WeeklyReportInput,
    ) -> DbResult<WeeklyReport> {
        let report = sqlx::query_as::<_, WeeklyReport>(&format!(
            r#"
            INSERT INTO weekly_reports
                (id, student_id, week_number, week_start, week_end, main_activities,
                 target_achievement, companies_applied, interview_status, challenges_faced,
                 help_needed, next_week_plan, progress_percentage, application_status, is_late)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (student_id, week_start) DO UPDATE
            SET week_number = EXCLUDED.week_number,
                main_activities = EXCLUDED.main_activities,
                target_achievement = EXCLUDED.target_achievement,
                companies_applied = EXCLUDED.companies_applied,
                interview_status = EXCLUDED.interview_status,
                challenges_faced = EXCLUDED.challenges_faced,
                help_needed = EXCLUDED.help_needed,
                next_week_plan = EXCLUDED.next_week_plan,
                progress_percentage = EXCLUDED.progress_percentage,
                application_status = EXCLUDED.application_status,
                is_late = EXCLUDED.is_late,
                updated_at = NOW()
            RETURNING {WEEKLY_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(student_id)
        .bind(window.number)
        .bind(window.start)
        .bind(window.end)
        .bind(input.main_activities.trim())
        .bind(input.target_achievement.trim())
        .bind(input.companies_applied.trim())
        .bind(input.interview_status.trim())
        .bind(input.challenges_faced.trim())
        .bind(input.help_needed.trim())
        .bind(input.next_week_plan.trim())
        .bind(input.progress_percentage)
        .bind(input.application_status)
        .bind(is_late)
        .fetch_one(pool)
        .await?;
        Ok(report)
    }

    pub async fn list_all(pool: &PgPool) -> DbResult<Vec<WeeklyReportListing>> {
        let rows = sqlx::query_as::<_, WeeklyReportListing>(
            r#"
            SELECT w.id, w.student_id, w.week_number, w.week_start, w.week_end, w.main_activities,
                   w.target_achievement, w.companies_applied, w.interview_status,
                   w.challenges_faced, w.help_needed, w.next_week_plan, w.progress_percentage,
                   w.application_status, w.is_late, w.submitted_at, w.updated_at,
                   COALESCE(p.full_name, u.full_name) AS student_name,
                   COALESCE(p.student_number, '') AS student_number
            FROM weekly_reports w
            JOIN users u ON u.id = w.student_id
            LEFT JOIN student_profiles p ON p.user_id = w.student_id
            ORDER BY w.week_start DESC, student_name
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Students without an accepted or completed placement and no report for `week_start`.
    pub async fn overdue_students(
        pool: &PgPool,
        week_start: Date,
    ) -> DbResult<Vec<OverdueStudent>> {
        let rows = sqlx::query_as::<_, OverdueStudent>(
            r#"
            SELECT u.id AS user_id,
                   COALESCE(p.full_name, u.full_name) AS student_name,
                   COALESCE(p.student_number, '') AS student_number,
                   u.email,
                   (SELECT MAX(w.week_start) FROM weekly_reports w WHERE w.student_id = u.id)
                       AS last_week_start
            FROM users u
            LEFT JOIN student_profiles p ON p.user_id = u.id
            WHERE u.role = 'student' AND u.is_active
              AND NOT EXISTS (
                  SELECT 1 FROM internship_confirmations c
                  WHERE c.student_id = u.id AND c.status IN ('accepted', 'completed')
              )
              AND NOT EXISTS (
                  SELECT 1 FROM weekly_reports w
                  WHERE w.student_id = u.id AND w.week_start = $1
              )
            ORDER BY student_name
            "#,
        )
        .bind(week_start)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}

pub struct DeadlinePolicyRepository;

impl DeadlinePolicyRepository {
    pub async fn find_active(pool: &PgPool) -> DbResult<Option<DeadlinePolicy>> {
        let policy = sqlx::query_as::<_, DeadlinePolicy>(&format!(
            r#"
            SELECT {POLICY_COLUMNS} FROM deadline_policies
            WHERE is_active
            ORDER BY updated_at DESC
            LIMIT 1
            "#
        ))
        .fetch_optional(pool)
        .await?;
        Ok(policy)
    }

    pub async fn list_all(pool: &PgPool) -> DbResult<Vec<DeadlinePolicy>> {
        let policies = sqlx::query_as::<_, DeadlinePolicy>(&format!(
            "SELECT {POLICY_COLUMNS} FROM deadline_policies ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(policies)
    }

    pub async fn deactivate_all(tx: &mut Transaction<'_, Postgres>) -> DbResult<()> {
        sqlx::query(
            "UPDATE deadline_policies SET is_active = FALSE, updated_at = NOW() WHERE is_active",
        )
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn create_active(
        tx: &mut Transaction<'_, Postgres>,
        input: &DeadlinePolicyInput,
    ) -> DbResult<DeadlinePolicy> {
        let policy = sqlx::query_as::<_, DeadlinePolicy>(&format!(
            r#"
            INSERT INTO deadline_policies
                (id, deadline_date, reminder_frequency_days, description, email_reminder_enabled,
                 is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING {POLICY_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(input.deadline_date)
        .bind(input.reminder_frequency_days)
        .bind(input.description.trim())
        .bind(input.email_reminder_enabled)
        .fetch_one(&mut **tx)
        .await?;
        Ok(policy)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        input: &DeadlinePolicyInput,
    ) -> DbResult<Option<DeadlinePolicy>> {
        let policy = sqlx::query_as::<_, DeadlinePolicy>(&format!(
            r#"
            UPDATE deadline_policies
            SET deadline_date = $2, reminder_frequency_days = $3, description = $4,
                email_reminder_enabled = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {POLICY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.deadline_date)
        .bind(input.reminder_frequency_days)
        .bind(input.description.trim())
        .bind(input.email_reminder_enabled)
        .fetch_optional(pool)
        .await?;
        Ok(policy)
    }

    pub async fn set_active(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        active: bool,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE deadline_policies SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(active)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
