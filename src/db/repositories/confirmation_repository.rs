use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::models::{
    ConfirmationStatus, ConfirmationWithStudent, InternshipConfirmation, NewConfirmation,
};
use crate::db::DbResult;

const CONFIRMATION_COLUMNS: &str = "id, student_id, period_start, period_end, position, \
    company_name, company_address, business_field, supervisor_name, supervisor_email, \
    supervisor_phone, supervisor_user_id, acceptance_letter_url, status, approval_notes, \
    rejection_reason, reviewed_at, created_at, updated_at";

const WITH_STUDENT_SELECT: &str = r#"
    SELECT c.id, c.student_id, c.period_start, c.period_end, c.position, c.company_name,
           c.company_address, c.business_field, c.supervisor_name, c.supervisor_email,
           c.supervisor_phone, c.supervisor_user_id, c.acceptance_letter_url, c.status,
           c.approval_notes, c.rejection_reason, c.reviewed_at, c.created_at, c.updated_at,
           COALESCE(p.full_name, u.full_name) AS student_name,
           COALESCE(p.student_number, '') AS student_number,
           COALESCE(p.study_program, '') AS study_program,
           u.email AS student_email
    FROM internship_confirmations c
    JOIN users u ON u.id = c.student_id
    LEFT JOIN student_profiles p ON p.user_id = c.student_id
"#;

pub struct ConfirmationRepository;

impl ConfirmationRepository {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> DbResult<Option<InternshipConfirmation>> {
        let confirmation = sqlx::query_as::<_, InternshipConfirmation>(&format!(
            "SELECT {CONFIRMATION_COLUMNS} FROM internship_confirmations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(confirmation)
    }

    pub async fn find_by_student(
        pool: &PgPool,
        student_id: Uuid,
    ) -> DbResult<Option<InternshipConfirmation>> {
        let confirmation = sqlx::query_as::<_, InternshipConfirmation>(&format!(
            "SELECT {CONFIRMATION_COLUMNS} FROM internship_confirmations WHERE student_id = $1"
        ))
        .bind(student_id)
        .fetch_optional(pool)
        .await?;
        Ok(confirmation)
    }

    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> DbResult<Option<InternshipConfirmation>> {
        let confirmation = sqlx::query_as::<_, InternshipConfirmation>(&format!(
            "SELECT {CONFIRMATION_COLUMNS} FROM internship_confirmations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(confirmation)
    }

    pub async fn find_with_student(
        pool: &PgPool,
        id: Uuid,
    ) -> DbResult<Option<ConfirmationWithStudent>> {
        let row = sqlx::query_as::<_, ConfirmationWithStudent>(&format!(
            "{WITH_STUDENT_SELECT} WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        student_id: Uuid,
        form: &NewConfirmation,
        supervisor_user_id: Option<Uuid>,
    ) -> DbResult<InternshipConfirmation> {
        let confirmation = sqlx::query_as::<_, InternshipConfirmation>(&format!(
            r#"
            INSERT INTO internship_confirmations
                (id, student_id, period_start, period_end, position, company_name, company_address,
                 business_field, supervisor_name, supervisor_email, supervisor_phone,
                 supervisor_user_id, acceptance_letter_url, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'pending')
            RETURNING {CONFIRMATION_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(student_id)
        .bind(form.period_start)
        .bind(form.period_end)
        .bind(form.position.trim())
        .bind(form.company_name.trim())
        .bind(form.company_address.trim())
        .bind(form.business_field.trim())
        .bind(form.supervisor_name.trim())
        .bind(form.supervisor_email.trim())
        .bind(form.supervisor_phone.trim())
        .bind(supervisor_user_id)
        .bind(&form.acceptance_letter_url)
        .fetch_one(&mut **tx)
        .await?;
        Ok(confirmation)
    }

    /// Overwrites a submission that is still pending. Returns `None` once it has been reviewed.
    pub async fn update_pending(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        form: &NewConfirmation,
        supervisor_user_id: Option<Uuid>,
    ) -> DbResult<Option<InternshipConfirmation>> {
        let confirmation = sqlx::query_as::<_, InternshipConfirmation>(&format!(
            r#"
            UPDATE internship_confirmations
            SET period_start = $2, period_end = $3, position = $4, company_name = $5,
                company_address = $6, business_field = $7, supervisor_name = $8,
                supervisor_email = $9, supervisor_phone = $10, supervisor_user_id = $11,
                acceptance_letter_url = COALESCE($12, acceptance_letter_url),
                status = 'pending', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {CONFIRMATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(form.period_start)
        .bind(form.period_end)
        .bind(form.position.trim())
        .bind(form.company_name.trim())
        .bind(form.company_address.trim())
        .bind(form.business_field.trim())
        .bind(form.supervisor_name.trim())
        .bind(form.supervisor_email.trim())
        .bind(form.supervisor_phone.trim())
        .bind(supervisor_user_id)
        .bind(&form.acceptance_letter_url)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(confirmation)
    }

    /// Compare-and-set on the status column so a stale page cannot skip a state.
    pub async fn transition(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        from: ConfirmationStatus,
        to: ConfirmationStatus,
        approval_notes: Option<&str>,
        rejection_reason: Option<&str>,
    ) -> DbResult<Option<InternshipConfirmation>> {
        let confirmation = sqlx::query_as::<_, InternshipConfirmation>(&format!(
            r#"
            UPDATE internship_confirmations
            SET status = $3,
                approval_notes = COALESCE($4, approval_notes),
                rejection_reason = COALESCE($5, rejection_reason),
                reviewed_at = CASE
                    WHEN $2 = 'pending'::confirmation_status THEN NOW()
                    ELSE reviewed_at
                END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {CONFIRMATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(approval_notes)
        .bind(rejection_reason)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(confirmation)
    }

    pub async fn list_for_supervisor_email(
        pool: &PgPool,
        supervisor_email: &str,
    ) -> DbResult<Vec<ConfirmationWithStudent>> {
        let rows = sqlx::query_as::<_, ConfirmationWithStudent>(&format!(
            "{WITH_STUDENT_SELECT} WHERE c.supervisor_email = $1 ORDER BY c.created_at DESC"
        ))
        .bind(supervisor_email)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_all(pool: &PgPool) -> DbResult<Vec<ConfirmationWithStudent>> {
        let rows = sqlx::query_as::<_, ConfirmationWithStudent>(&format!(
            "{WITH_STUDENT_SELECT} ORDER BY c.created_at DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_statuses(
        pool: &PgPool,
        statuses: &[ConfirmationStatus],
    ) -> DbResult<Vec<ConfirmationWithStudent>> {
        let rows = sqlx::query_as::<_, ConfirmationWithStudent>(&format!(
            "{WITH_STUDENT_SELECT} WHERE c.status = ANY($1) ORDER BY student_name"
        ))
        .bind(statuses)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_program(
        pool: &PgPool,
        study_program: &str,
    ) -> DbResult<Vec<ConfirmationWithStudent>> {
        let rows = sqlx::query_as::<_, ConfirmationWithStudent>(&format!(
            "{WITH_STUDENT_SELECT} WHERE p.study_program = $1 ORDER BY c.created_at DESC"
        ))
        .bind(study_program)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_by_status(pool: &PgPool) -> DbResult<Vec<(ConfirmationStatus, i64)>> {
        let rows: Vec<(ConfirmationStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM internship_confirmations GROUP BY status",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn student_ids_with_status(
        pool: &PgPool,
        status: ConfirmationStatus,
    ) -> DbResult<Vec<Uuid>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT student_id FROM internship_confirmations WHERE status = $1")
                .bind(status)
                .fetch_all(pool)
                .await?;
        Ok(ids)
    }
}
