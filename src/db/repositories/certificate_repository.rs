use sqlx::{PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::db::models::{
    certificate_number, Certificate, CertificateStatus, ConfirmationStatus, Grade,
};
use crate::db::DbResult;

const CERTIFICATE_COLUMNS: &str = "id, confirmation_id, number, grade, status, graduation_date, \
                                   issued_by, created_at, updated_at";

/// Everything printed on a certificate.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CertificateListing {
    pub id: Uuid,
    pub confirmation_id: Uuid,
    pub student_id: Uuid,
    pub number: String,
    pub grade: Grade,
    pub status: CertificateStatus,
    pub graduation_date: Date,
    pub student_name: String,
    pub student_number: String,
    pub study_program: String,
    pub company_name: String,
    pub position: String,
    pub period_start: Date,
    pub period_end: Date,
}

const LISTING_SELECT: &str = r#"
    SELECT s.id, s.confirmation_id, c.student_id, s.number, s.grade, s.status, s.graduation_date,
           COALESCE(p.full_name, u.full_name) AS student_name,
           COALESCE(p.student_number, '') AS student_number,
           COALESCE(p.study_program, '') AS study_program,
           c.company_name, c.position, c.period_start, c.period_end
    FROM certificates s
    JOIN internship_confirmations c ON c.id = s.confirmation_id
    JOIN users u ON u.id = c.student_id
    LEFT JOIN student_profiles p ON p.user_id = c.student_id
"#;

pub struct CertificateRepository;

impl CertificateRepository {
    pub async fn find_for_confirmation(
        pool: &PgPool,
        confirmation_id: Uuid,
    ) -> DbResult<Option<Certificate>> {
        let certificate = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE confirmation_id = $1"
        ))
        .bind(confirmation_id)
        .fetch_optional(pool)
        .await?;
        Ok(certificate)
    }

    pub async fn find_listing(pool: &PgPool, id: Uuid) -> DbResult<Option<CertificateListing>> {
        let row =
            sqlx::query_as::<_, CertificateListing>(&format!("{LISTING_SELECT} WHERE s.id = $1"))
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(row)
    }

    pub async fn find_listing_by_number(
        pool: &PgPool,
        number: &str,
    ) -> DbResult<Option<CertificateListing>> {
        let row = sqlx::query_as::<_, CertificateListing>(&format!(
            "{LISTING_SELECT} WHERE s.number = $1"
        ))
        .bind(number)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    pub async fn list_all(pool: &PgPool) -> DbResult<Vec<CertificateListing>> {
        let rows = sqlx::query_as::<_, CertificateListing>(&format!(
            "{LISTING_SELECT} ORDER BY s.created_at DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Count used for numbering. `created_at` is bucketed by its UTC year so the result does
    /// not depend on the session time zone. Not locked: two concurrent issues can read the same
    /// count, in which case the unique constraint on `number` rejects the second insert.
    async fn count_created_in_year(
        tx: &mut Transaction<'_, Postgres>,
        year: i32,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM certificates
            WHERE EXTRACT(YEAR FROM created_at AT TIME ZONE 'UTC')::int = $1
            "#,
        )
        .bind(year)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count)
    }

    /// Assigns the next number of the current UTC year and inserts the certificate.
    pub async fn create_numbered(
        tx: &mut Transaction<'_, Postgres>,
        confirmation_id: Uuid,
        grade: Grade,
        status: CertificateStatus,
        graduation_date: Date,
        issued_by: Option<Uuid>,
    ) -> DbResult<Certificate> {
        let year = OffsetDateTime::now_utc().year();
        let count = Self::count_created_in_year(tx, year).await?;
        let certificate = sqlx::query_as::<_, Certificate>(&format!(
            r#"
            INSERT INTO certificates
                (id, confirmation_id, number, grade, status, graduation_date, issued_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CERTIFICATE_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(confirmation_id)
        .bind(certificate_number(year, count))
        .bind(grade)
        .bind(status)
        .bind(graduation_date)
        .bind(issued_by)
        .fetch_one(&mut **tx)
        .await?;
        Ok(certificate)
    }

    /// The number never changes after creation.
    pub async fn update_grade(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        grade: Grade,
        issued_by: Option<Uuid>,
    ) -> DbResult<Certificate> {
        let certificate = sqlx::query_as::<_, Certificate>(&format!(
            r#"
            UPDATE certificates
            SET grade = $2, status = 'issued', issued_by = COALESCE($3, issued_by),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CERTIFICATE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(grade)
        .bind(issued_by)
        .fetch_one(&mut **tx)
        .await?;
        Ok(certificate)
    }

    pub async fn set_status(pool: &PgPool, id: Uuid, status: CertificateStatus) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE certificates SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Completed placements that have no certificate yet.
    pub async fn completed_without_certificate(
        pool: &PgPool,
    ) -> DbResult<Vec<(Uuid, String, String)>> {
        let rows: Vec<(Uuid, String, String)> = sqlx::query_as(
            r#"
            SELECT c.id, COALESCE(p.full_name, u.full_name), c.company_name
            FROM internship_confirmations c
            JOIN users u ON u.id = c.student_id
            LEFT JOIN student_profiles p ON p.user_id = c.student_id
            LEFT JOIN certificates s ON s.confirmation_id = c.id
            WHERE c.status = $1 AND s.id IS NULL
            ORDER BY 2
            "#,
        )
        .bind(ConfirmationStatus::Completed)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}
