use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{
    EvaluationKind, EvaluationRecord, EvaluationStatus, EvaluationTemplate, EvaluationTrackingRow,
    NewEvaluationTemplate,
};
use crate::db::DbResult;

const TEMPLATE_COLUMNS: &str = "id, name, kind, questions, is_active, window_start, window_end, \
                                auto_distribute, created_at, updated_at";

const RECORD_COLUMNS: &str =
    "id, confirmation_id, template_id, answers, status, submitted_at, created_at, updated_at";

/// A record joined with its template and placement, used for mailings and exports.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EvaluationRecordDetail {
    pub record_id: Uuid,
    pub confirmation_id: Uuid,
    pub template_id: Uuid,
    pub template_name: String,
    pub template_kind: EvaluationKind,
    pub questions: Json<Vec<String>>,
    pub answers: Json<BTreeMap<String, String>>,
    pub status: EvaluationStatus,
    pub submitted_at: Option<OffsetDateTime>,
    pub student_name: String,
    pub student_number: String,
    pub company_name: String,
    pub position: String,
    pub supervisor_name: String,
    pub supervisor_email: String,
}

const DETAIL_SELECT: &str = r#"
    SELECT r.id AS record_id, r.confirmation_id, r.template_id,
           t.name AS template_name, t.kind AS template_kind, t.questions,
           r.answers, r.status, r.submitted_at,
           COALESCE(p.full_name, u.full_name) AS student_name,
           COALESCE(p.student_number, '') AS student_number,
           c.company_name, c.position, c.supervisor_name, c.supervisor_email
    FROM evaluation_records r
    JOIN evaluation_templates t ON t.id = r.template_id
    JOIN internship_confirmations c ON c.id = r.confirmation_id
    JOIN users u ON u.id = c.student_id
    LEFT JOIN student_profiles p ON p.user_id = c.student_id
"#;

pub struct EvaluationTemplateRepository;

impl EvaluationTemplateRepository {
    pub async fn list_all(pool: &PgPool) -> DbResult<Vec<EvaluationTemplate>> {
        let templates = sqlx::query_as::<_, EvaluationTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM evaluation_templates ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(templates)
    }

    pub async fn list_active<'e, E: PgExecutor<'e>>(
        executor: E,
    ) -> DbResult<Vec<EvaluationTemplate>> {
        let templates = sqlx::query_as::<_, EvaluationTemplate>(&format!(
            r#"
            SELECT {TEMPLATE_COLUMNS}
            FROM evaluation_templates
            WHERE is_active
            ORDER BY kind, created_at
            "#
        ))
        .fetch_all(executor)
        .await?;
        Ok(templates)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> DbResult<Option<EvaluationTemplate>> {
        let template = sqlx::query_as::<_, EvaluationTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM evaluation_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(template)
    }

    pub async fn create(
        pool: &PgPool,
        form: &NewEvaluationTemplate,
    ) -> DbResult<EvaluationTemplate> {
        let template = sqlx::query_as::<_, EvaluationTemplate>(&format!(
            r#"
            INSERT INTO evaluation_templates
                (id, name, kind, questions, is_active, window_start, window_end, auto_distribute)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(form.name.trim())
        .bind(form.kind)
        .bind(Json(&form.questions))
        .bind(form.is_active)
        .bind(form.window_start)
        .bind(form.window_end)
        .bind(form.auto_distribute)
        .fetch_one(pool)
        .await?;
        Ok(template)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        form: &NewEvaluationTemplate,
    ) -> DbResult<Option<EvaluationTemplate>> {
        let template = sqlx::query_as::<_, EvaluationTemplate>(&format!(
            r#"
            UPDATE evaluation_templates
            SET name = $2, kind = $3, questions = $4, is_active = $5, window_start = $6,
                window_end = $7, auto_distribute = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(form.name.trim())
        .bind(form.kind)
        .bind(Json(&form.questions))
        .bind(form.is_active)
        .bind(form.window_start)
        .bind(form.window_end)
        .bind(form.auto_distribute)
        .fetch_optional(pool)
        .await?;
        Ok(template)
    }

    pub async fn toggle_active(pool: &PgPool, id: Uuid) -> DbResult<Option<bool>> {
        let active: Option<bool> = sqlx::query_scalar(
            r#"
            UPDATE evaluation_templates
            SET is_active = NOT is_active, updated_at = NOW()
            WHERE id = $1
            RETURNING is_active
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(active)
    }
}

pub struct EvaluationRecordRepository;

impl EvaluationRecordRepository {
    /// Inserts a pending record for every active template the confirmation lacks.
    /// Existing records are left untouched; returns how many were created.
    pub async fn create_pending_for_active_templates<'e, E: PgExecutor<'e>>(
        executor: E,
        confirmation_id: Uuid,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO evaluation_records (id, confirmation_id, template_id, status)
            SELECT gen_random_uuid(), $1, t.id, 'pending'
            FROM evaluation_templates t
            WHERE t.is_active
            ON CONFLICT (confirmation_id, template_id) DO NOTHING
            "#,
        )
        .bind(confirmation_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Same as above for one template across every ongoing placement.
    pub async fn create_pending_for_template(pool: &PgPool, template_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO evaluation_records (id, confirmation_id, template_id, status)
            SELECT gen_random_uuid(), c.id, $1, 'pending'
            FROM internship_confirmations c
            WHERE c.status = 'accepted'
            ON CONFLICT (confirmation_id, template_id) DO NOTHING
            "#,
        )
        .bind(template_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find(
        pool: &PgPool,
        confirmation_id: Uuid,
        template_id: Uuid,
    ) -> DbResult<Option<EvaluationRecord>> {
        let record = sqlx::query_as::<_, EvaluationRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM evaluation_records
            WHERE confirmation_id = $1 AND template_id = $2
            "#
        ))
        .bind(confirmation_id)
        .bind(template_id)
        .fetch_optional(pool)
        .await?;
        Ok(record)
    }

    pub async fn list_for_confirmation(
        pool: &PgPool,
        confirmation_id: Uuid,
    ) -> DbResult<Vec<EvaluationRecord>> {
        let records = sqlx::query_as::<_, EvaluationRecord>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM evaluation_records
            WHERE confirmation_id = $1
            ORDER BY created_at
            "#
        ))
        .bind(confirmation_id)
        .fetch_all(pool)
        .await?;
        Ok(records)
    }

    pub async fn list_for_confirmations(
        pool: &PgPool,
        confirmation_ids: &[Uuid],
    ) -> DbResult<Vec<EvaluationRecord>> {
        let records = sqlx::query_as::<_, EvaluationRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM evaluation_records WHERE confirmation_id = ANY($1)"
        ))
        .bind(confirmation_ids)
        .fetch_all(pool)
        .await?;
        Ok(records)
    }

    /// Upserts the answers and marks the record completed. Finished records are not touched.
    pub async fn save_answers(
        pool: &PgPool,
        confirmation_id: Uuid,
        template_id: Uuid,
        answers: &BTreeMap<String, String>,
    ) -> DbResult<Option<EvaluationRecord>> {
        let record = sqlx::query_as::<_, EvaluationRecord>(&format!(
            r#"
            INSERT INTO evaluation_records
                (id, confirmation_id, template_id, answers, status, submitted_at)
            VALUES ($1, $2, $3, $4, 'completed', NOW())
            ON CONFLICT (confirmation_id, template_id) DO UPDATE
            SET answers = EXCLUDED.answers, status = 'completed',
                submitted_at = NOW(), updated_at = NOW()
            WHERE evaluation_records.status <> 'finished'
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(confirmation_id)
        .bind(template_id)
        .bind(Json(answers))
        .fetch_optional(pool)
        .await?;
        Ok(record)
    }

    pub async fn finish_all(
        tx: &mut Transaction<'_, Postgres>,
        confirmation_id: Uuid,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE evaluation_records
            SET status = 'finished', updated_at = NOW()
            WHERE confirmation_id = $1
            "#,
        )
        .bind(confirmation_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Every accepted or completed placement, with the record for `template_id` if any.
    pub async fn tracking_for_template(
        pool: &PgPool,
        template_id: Uuid,
    ) -> DbResult<Vec<EvaluationTrackingRow>> {
        let rows = sqlx::query_as::<_, EvaluationTrackingRow>(
            r#"
            SELECT c.id AS confirmation_id,
                   COALESCE(p.full_name, u.full_name) AS student_name,
                   COALESCE(p.student_number, '') AS student_number,
                   c.company_name, c.supervisor_name, c.supervisor_email,
                   r.status AS record_status, r.submitted_at
            FROM internship_confirmations c
            JOIN users u ON u.id = c.student_id
            LEFT JOIN student_profiles p ON p.user_id = c.student_id
            LEFT JOIN evaluation_records r
                   ON r.confirmation_id = c.id AND r.template_id = $1
            WHERE c.status IN ('accepted', 'completed')
            ORDER BY student_name
            "#,
        )
        .bind(template_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn details_with_status(
        pool: &PgPool,
        statuses: &[EvaluationStatus],
        template_id: Option<Uuid>,
    ) -> DbResult<Vec<EvaluationRecordDetail>> {
        let rows = sqlx::query_as::<_, EvaluationRecordDetail>(&format!(
            r#"
            {DETAIL_SELECT}
            WHERE r.status = ANY($1) AND ($2::uuid IS NULL OR r.template_id = $2)
            ORDER BY t.kind, student_name
            "#
        ))
        .bind(statuses)
        .bind(template_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn detail(
        pool: &PgPool,
        confirmation_id: Uuid,
        template_id: Uuid,
    ) -> DbResult<Option<EvaluationRecordDetail>> {
        let row = sqlx::query_as::<_, EvaluationRecordDetail>(&format!(
            "{DETAIL_SELECT} WHERE r.confirmation_id = $1 AND r.template_id = $2"
        ))
        .bind(confirmation_id)
        .bind(template_id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }
}
