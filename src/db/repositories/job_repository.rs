use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::db::models::{JobApplication, JobApplicationStatus, JobPosting, JobPostingInput};
use crate::db::DbResult;

const POSTING_COLUMNS: &str = "id, title, company_name, company_logo_url, description, \
    requirements, location, job_type, salary_range, application_deadline, is_active, created_by, \
    posted_at, updated_at";

const APPLICATION_COLUMNS: &str =
    "id, job_id, student_id, cv_url, cover_letter, status, notes, applied_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApplicationWithStudent {
    #[sqlx(flatten)]
    pub application: JobApplication,
    pub student_name: String,
    pub student_number: String,
    pub student_email: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApplicationWithJob {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: JobApplicationStatus,
    pub applied_at: OffsetDateTime,
    pub title: String,
    pub company_name: String,
}

pub struct JobRepository;

impl JobRepository {
    /// Active postings whose deadline has not passed, optionally filtered by a search term.
    pub async fn list_open(
        pool: &PgPool,
        today: Date,
        search: Option<&str>,
    ) -> DbResult<Vec<JobPosting>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")));
        let postings = sqlx::query_as::<_, JobPosting>(&format!(
            r#"
            SELECT {POSTING_COLUMNS} FROM job_postings
            WHERE is_active AND application_deadline >= $1
              AND ($2::text IS NULL OR title ILIKE $2 OR company_name ILIKE $2 OR location ILIKE $2)
            ORDER BY posted_at DESC
            "#
        ))
        .bind(today)
        .bind(pattern)
        .fetch_all(pool)
        .await?;
        Ok(postings)
    }

    pub async fn list_managed(
        pool: &PgPool,
        created_by: Option<Uuid>,
    ) -> DbResult<Vec<JobPosting>> {
        let postings = sqlx::query_as::<_, JobPosting>(&format!(
            r#"
            SELECT {POSTING_COLUMNS} FROM job_postings
            WHERE ($1::uuid IS NULL OR created_by = $1)
            ORDER BY posted_at DESC
            "#
        ))
        .bind(created_by)
        .fetch_all(pool)
        .await?;
        Ok(postings)
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> DbResult<Option<JobPosting>> {
        let posting = sqlx::query_as::<_, JobPosting>(&format!(
            "SELECT {POSTING_COLUMNS} FROM job_postings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(posting)
    }

    pub async fn create(
        pool: &PgPool,
        input: &JobPostingInput,
        created_by: Uuid,
    ) -> DbResult<JobPosting> {
        let posting = sqlx::query_as::<_, JobPosting>(&format!(
            r#"
            INSERT INTO job_postings
                (id, title, company_name, company_logo_url, description, requirements, location,
                 job_type, salary_range, application_deadline, is_active, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {POSTING_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(input.title.trim())
        .bind(input.company_name.trim())
        .bind(&input.company_logo_url)
        .bind(input.description.trim())
        .bind(input.requirements.trim())
        .bind(input.location.trim())
        .bind(input.job_type)
        .bind(input.salary_range.trim())
        .bind(input.application_deadline)
        .bind(input.is_active)
        .bind(created_by)
        .fetch_one(pool)
        .await?;
        Ok(posting)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        input: &JobPostingInput,
    ) -> DbResult<Option<JobPosting>> {
        let posting = sqlx::query_as::<_, JobPosting>(&format!(
            r#"
            UPDATE job_postings
            SET title = $2, company_name = $3,
                company_logo_url = COALESCE($4, company_logo_url),
                description = $5, requirements = $6, location = $7, job_type = $8,
                salary_range = $9, application_deadline = $10, is_active = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING {POSTING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.title.trim())
        .bind(input.company_name.trim())
        .bind(&input.company_logo_url)
        .bind(input.description.trim())
        .bind(input.requirements.trim())
        .bind(input.location.trim())
        .bind(input.job_type)
        .bind(input.salary_range.trim())
        .bind(input.application_deadline)
        .bind(input.is_active)
        .fetch_optional(pool)
        .await?;
        Ok(posting)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> DbResult<Option<JobPosting>> {
        let posting = sqlx::query_as::<_, JobPosting>(&format!(
            "DELETE FROM job_postings WHERE id = $1 RETURNING {POSTING_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(posting)
    }

    pub async fn has_applied(pool: &PgPool, job_id: Uuid, student_id: Uuid) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM job_applications WHERE job_id = $1 AND student_id = $2)",
        )
        .bind(job_id)
        .bind(student_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    pub async fn apply(
        pool: &PgPool,
        job_id: Uuid,
        student_id: Uuid,
        cv_url: &str,
        cover_letter: &str,
    ) -> DbResult<JobApplication> {
        let application = sqlx::query_as::<_, JobApplication>(&format!(
            r#"
            INSERT INTO job_applications (id, job_id, student_id, cv_url, cover_letter)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(job_id)
        .bind(student_id)
        .bind(cv_url)
        .bind(cover_letter.trim())
        .fetch_one(pool)
        .await?;
        Ok(application)
    }

    pub async fn applications_for_job(
        pool: &PgPool,
        job_id: Uuid,
    ) -> DbResult<Vec<ApplicationWithStudent>> {
        let rows = sqlx::query_as::<_, ApplicationWithStudent>(
            r#"
            SELECT a.id, a.job_id, a.student_id, a.cv_url, a.cover_letter, a.status, a.notes,
                   a.applied_at, a.updated_at,
                   COALESCE(p.full_name, u.full_name) AS student_name,
                   COALESCE(p.student_number, '') AS student_number,
                   u.email AS student_email
            FROM job_applications a
            JOIN users u ON u.id = a.student_id
            LEFT JOIN student_profiles p ON p.user_id = a.student_id
            WHERE a.job_id = $1
            ORDER BY a.applied_at DESC
            "#,
        )
        .bind(job_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn applications_for_student(
        pool: &PgPool,
        student_id: Uuid,
    ) -> DbResult<Vec<ApplicationWithJob>> {
        let rows = sqlx::query_as::<_, ApplicationWithJob>(
            r#"
            SELECT a.id, a.job_id, a.status, a.applied_at, j.title, j.company_name
            FROM job_applications a
            JOIN job_postings j ON j.id = a.job_id
            WHERE a.student_id = $1
            ORDER BY a.applied_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_application(pool: &PgPool, id: Uuid) -> DbResult<Option<JobApplication>> {
        let application = sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(application)
    }

    pub async fn update_application_status(
        pool: &PgPool,
        id: Uuid,
        status: JobApplicationStatus,
        notes: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE job_applications SET status = $2, notes = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(notes.trim())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
