use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::db::models::{
    FinalReport, FinalReportInput, FinalReportStatus, ProgressReport, ProgressReportInput,
    ProgressReportStatus,
};
use crate::db::DbResult;

const PROGRESS_COLUMNS: &str = "id, confirmation_id, month, company_profile, job_description, \
    work_environment, useful_coursework, learning_gaps, status, submitted_at, created_at, \
    updated_at";

const FINAL_COLUMNS: &str = "id, confirmation_id, activity_summary, achievements, \
    obstacles_and_solutions, suggestions_for_company, suggestions_for_campus, file_url, status, \
    submitted_at, approved_at, created_at, updated_at";

/// Progress report joined with its student for admin and supervisor listings.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProgressReportListing {
    pub id: Uuid,
    pub confirmation_id: Uuid,
    pub month: Date,
    pub status: ProgressReportStatus,
    pub submitted_at: Option<OffsetDateTime>,
    pub student_name: String,
    pub student_number: String,
    pub company_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FinalReportListing {
    pub id: Uuid,
    pub confirmation_id: Uuid,
    pub status: FinalReportStatus,
    pub file_url: Option<String>,
    pub submitted_at: Option<OffsetDateTime>,
    pub approved_at: Option<OffsetDateTime>,
    pub student_name: String,
    pub student_number: String,
    pub company_name: String,
}

pub struct ProgressReportRepository;

impl ProgressReportRepository {
    pub async fn find(
        pool: &PgPool,
        confirmation_id: Uuid,
        month: Date,
    ) -> DbResult<Option<ProgressReport>> {
        let report = sqlx::query_as::<_, ProgressReport>(&format!(
            r#"
            SELECT {PROGRESS_COLUMNS}
            FROM progress_reports
            WHERE confirmation_id = $1 AND month = $2
            "#
        ))
        .bind(confirmation_id)
        .bind(month)
        .fetch_optional(pool)
        .await?;
        Ok(report)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> DbResult<Option<ProgressReport>> {
        let report = sqlx::query_as::<_, ProgressReport>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress_reports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(report)
    }

    pub async fn list_for_confirmation(
        pool: &PgPool,
        confirmation_id: Uuid,
    ) -> DbResult<Vec<ProgressReport>> {
        let reports = sqlx::query_as::<_, ProgressReport>(&format!(
            r#"
            SELECT {PROGRESS_COLUMNS}
            FROM progress_reports
            WHERE confirmation_id = $1
            ORDER BY month DESC
            "#
        ))
        .bind(confirmation_id)
        .fetch_all(pool)
        .await?;
        Ok(reports)
    }

    /// One report per (confirmation, month); a later save for the same month replaces it.
    /// Returns `None` when the existing report was already reviewed.
    pub async fn upsert(
        pool: &PgPool,
        confirmation_id: Uuid,
        input: &ProgressReportInput,
    ) -> DbResult<Option<ProgressReport>> {
        let report = sqlx::query_as::<_, ProgressReport>(&format!(
            r#"
            INSERT INTO progress_reports
                (id, confirmation_id, month, company_profile, job_description, work_environment,
                 useful_coursework, learning_gaps, status, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                    CASE WHEN $9 = 'submitted'::progress_report_status THEN NOW() END)
            ON CONFLICT (confirmation_id, month) DO UPDATE
            SET company_profile = EXCLUDED.company_profile,
                job_description = EXCLUDED.job_description,
                work_environment = EXCLUDED.work_environment,
                useful_coursework = EXCLUDED.useful_coursework,
                learning_gaps = EXCLUDED.learning_gaps,
                status = EXCLUDED.status,
                submitted_at = COALESCE(EXCLUDED.submitted_at, progress_reports.submitted_at),
                updated_at = NOW()
            WHERE progress_reports.status <> 'reviewed'
            RETURNING {PROGRESS_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(confirmation_id)
        .bind(input.month)
        .bind(input.company_profile.trim())
        .bind(input.job_description.trim())
        .bind(input.work_environment.trim())
        .bind(input.useful_coursework.trim())
        .bind(input.learning_gaps.trim())
        .bind(input.status)
        .fetch_optional(pool)
        .await?;
        Ok(report)
    }

    pub async fn mark_reviewed(pool: &PgPool, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE progress_reports SET status = 'reviewed', updated_at = NOW()
            WHERE id = $1 AND status = 'submitted'
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn list_all(
        pool: &PgPool,
        month: Option<Date>,
    ) -> DbResult<Vec<ProgressReportListing>> {
        let rows = sqlx::query_as::<_, ProgressReportListing>(
            r#"
            SELECT r.id, r.confirmation_id, r.month, r.status, r.submitted_at,
                   COALESCE(p.full_name, u.full_name) AS student_name,
                   COALESCE(p.student_number, '') AS student_number,
                   c.company_name
            FROM progress_reports r
            JOIN internship_confirmations c ON c.id = r.confirmation_id
            JOIN users u ON u.id = c.student_id
            LEFT JOIN student_profiles p ON p.user_id = c.student_id
            WHERE ($1::date IS NULL OR r.month = $1)
            ORDER BY r.month DESC, student_name
            "#,
        )
        .bind(month)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Accepted placements with no submitted report for `month`.
    pub async fn missing_for_month(
        pool: &PgPool,
        month: Date,
    ) -> DbResult<Vec<(Uuid, String, String)>> {
        let rows: Vec<(Uuid, String, String)> = sqlx::query_as(
            r#"
            SELECT c.id, COALESCE(p.full_name, u.full_name), c.company_name
            FROM internship_confirmations c
            JOIN users u ON u.id = c.student_id
            LEFT JOIN student_profiles p ON p.user_id = c.student_id
            WHERE c.status = 'accepted'
              AND NOT EXISTS (
                  SELECT 1 FROM progress_reports r
                  WHERE r.confirmation_id = c.id AND r.month = $1 AND r.status <> 'draft'
              )
            ORDER BY 2
            "#,
        )
        .bind(month)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}

pub struct FinalReportRepository;

impl FinalReportRepository {
    pub async fn find_for_confirmation(
        pool: &PgPool,
        confirmation_id: Uuid,
    ) -> DbResult<Option<FinalReport>> {
        let report = sqlx::query_as::<_, FinalReport>(&format!(
            "SELECT {FINAL_COLUMNS} FROM final_reports WHERE confirmation_id = $1"
        ))
        .bind(confirmation_id)
        .fetch_optional(pool)
        .await?;
        Ok(report)
    }

    /// Returns `None` when the report was already approved.
    pub async fn upsert(
        pool: &PgPool,
        confirmation_id: Uuid,
        input: &FinalReportInput,
    ) -> DbResult<Option<FinalReport>> {
        let report = sqlx::query_as::<_, FinalReport>(&format!(
            r#"
            INSERT INTO final_reports
                (id, confirmation_id, activity_summary, achievements, obstacles_and_solutions,
                 suggestions_for_company, suggestions_for_campus, file_url, status, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                    CASE WHEN $9 = 'submitted'::final_report_status THEN NOW() END)
            ON CONFLICT (confirmation_id) DO UPDATE
            SET activity_summary = EXCLUDED.activity_summary,
                achievements = EXCLUDED.achievements,
                obstacles_and_solutions = EXCLUDED.obstacles_and_solutions,
                suggestions_for_company = EXCLUDED.suggestions_for_company,
                suggestions_for_campus = EXCLUDED.suggestions_for_campus,
                file_url = COALESCE(EXCLUDED.file_url, final_reports.file_url),
                status = EXCLUDED.status,
                submitted_at = COALESCE(EXCLUDED.submitted_at, final_reports.submitted_at),
                updated_at = NOW()
            WHERE final_reports.status <> 'approved'
            RETURNING {FINAL_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(confirmation_id)
        .bind(input.activity_summary.trim())
        .bind(input.achievements.trim())
        .bind(input.obstacles_and_solutions.trim())
        .bind(input.suggestions_for_company.trim())
        .bind(input.suggestions_for_campus.trim())
        .bind(&input.file_url)
        .bind(input.status)
        .fetch_optional(pool)
        .await?;
        Ok(report)
    }

    pub async fn approve(pool: &PgPool, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE final_reports
            SET status = 'approved', approved_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'submitted'
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn list_all(pool: &PgPool) -> DbResult<Vec<FinalReportListing>> {
        let rows = sqlx::query_as::<_, FinalReportListing>(
            r#"
            SELECT r.id, r.confirmation_id, r.status, r.file_url, r.submitted_at, r.approved_at,
                   COALESCE(p.full_name, u.full_name) AS student_name,
                   COALESCE(p.student_number, '') AS student_number,
                   c.company_name
            FROM final_reports r
            JOIN internship_confirmations c ON c.id = r.confirmation_id
            JOIN users u ON u.id = c.student_id
            LEFT JOIN student_profiles p ON p.user_id = c.student_id
            ORDER BY r.updated_at DESC
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}
