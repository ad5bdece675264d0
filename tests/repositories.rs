//! Repository behaviour against a migrated Postgres database.
//!
//! `sqlx::test` creates a fresh database per test from `DATABASE_URL` and
//! applies `migrations/` before the test body runs.

use std::collections::BTreeMap;

use anyhow::Result;
use sqlx::PgPool;
use time::{macros::date, Date, Month, OffsetDateTime};
use uuid::Uuid;

use coop_portal::db::models::{
    CertificateStatus, ConfirmationStatus, DeadlinePolicyInput, EvaluationKind, EvaluationStatus,
    EvaluationTemplate, Grade, InternshipConfirmation, NewConfirmation, NewEvaluationTemplate,
    NewUser, UserRole,
};
use coop_portal::db::repositories::{
    CertificateRepository, ConfirmationRepository, DeadlinePolicyRepository,
    EvaluationRecordRepository, EvaluationTemplateRepository, UserRepository,
};
use coop_portal::db::DatabaseError;

const SUPERVISOR: &str = "budi@sinarlogistik.co.id";

fn placement() -> NewConfirmation {
    NewConfirmation {
        period_start: date!(2026 - 02 - 02),
        period_end: date!(2026 - 07 - 31),
        position: "Data Analyst Intern".into(),
        company_name: "PT Sinar Logistik".into(),
        company_address: "Jl. Sudirman 10, Jakarta".into(),
        business_field: "Logistics".into(),
        supervisor_name: "Budi Santoso".into(),
        supervisor_email: SUPERVISOR.into(),
        supervisor_phone: "081234567890".into(),
        acceptance_letter_url: None,
    }
}

async fn submitted(pool: &PgPool, email: &str) -> Result<InternshipConfirmation> {
    let mut tx = pool.begin().await?;
    let student = UserRepository::create_user(
        &mut tx,
        &NewUser {
            email: email.into(),
            password_hash: None,
            full_name: "Sari Wulandari".into(),
            role: UserRole::Student,
            must_change_password: false,
        },
    )
    .await?;
    let confirmation =
        ConfirmationRepository::create(&mut tx, student.id, &placement(), None).await?;
    tx.commit().await?;
    Ok(confirmation)
}

async fn template(
    pool: &PgPool,
    name: &str,
    kind: EvaluationKind,
    is_active: bool,
) -> Result<EvaluationTemplate> {
    let form = NewEvaluationTemplate {
        name: name.into(),
        kind,
        questions: vec!["Kedisiplinan".into(), "Kerja sama tim".into()],
        is_active,
        window_start: None,
        window_end: None,
        auto_distribute: false,
    };
    Ok(EvaluationTemplateRepository::create(pool, &form).await?)
}

/// Accept a pending placement the way the supervisor review does.
async fn accept(pool: &PgPool, id: Uuid) -> Result<(Option<InternshipConfirmation>, u64)> {
    let mut tx = pool.begin().await?;
    let updated = ConfirmationRepository::transition(
        &mut tx,
        id,
        ConfirmationStatus::Pending,
        ConfirmationStatus::Accepted,
        Some("Selamat bergabung"),
        None,
    )
    .await?;
    let created =
        EvaluationRecordRepository::create_pending_for_active_templates(&mut *tx, id).await?;
    tx.commit().await?;
    Ok((updated, created))
}

async fn active_policies(pool: &PgPool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM deadline_policies WHERE is_active")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[sqlx::test(migrations = "./migrations")]
async fn accepting_creates_one_pending_record_per_active_template(pool: PgPool) -> Result<()> {
    template(&pool, "Evaluasi Tengah", EvaluationKind::Uts, true).await?;
    template(&pool, "Evaluasi Akhir", EvaluationKind::Uas, true).await?;
    template(&pool, "Arsip 2025", EvaluationKind::Uas, false).await?;
    let confirmation = submitted(&pool, "sari@student.univ.test").await?;

    let (updated, created) = accept(&pool, confirmation.id).await?;
    assert_eq!(updated.map(|c| c.status), Some(ConfirmationStatus::Accepted));
    assert_eq!(created, 2);

    let again =
        EvaluationRecordRepository::create_pending_for_active_templates(&pool, confirmation.id)
            .await?;
    assert_eq!(again, 0);

    let records = EvaluationRecordRepository::list_for_confirmation(&pool, confirmation.id).await?;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.status == EvaluationStatus::Pending));
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn one_evaluation_record_per_confirmation_and_template(pool: PgPool) -> Result<()> {
    let uts = template(&pool, "Evaluasi Tengah", EvaluationKind::Uts, true).await?;
    let confirmation = submitted(&pool, "sari@student.univ.test").await?;
    accept(&pool, confirmation.id).await?;

    let answers: BTreeMap<_, _> = [("0".to_string(), "Sangat baik".to_string())].into();
    let saved = EvaluationRecordRepository::save_answers(&pool, confirmation.id, uts.id, &answers)
        .await?
        .map(|r| r.status);
    assert_eq!(saved, Some(EvaluationStatus::Completed));
    let records = EvaluationRecordRepository::list_for_confirmation(&pool, confirmation.id).await?;
    assert_eq!(records.len(), 1);

    let duplicate = sqlx::query(
        "INSERT INTO evaluation_records (id, confirmation_id, template_id, status) \
         VALUES ($1, $2, $3, 'pending')",
    )
    .bind(Uuid::now_v7())
    .bind(confirmation.id)
    .bind(uts.id)
    .execute(&pool)
    .await
    .unwrap_err();
    assert!(DatabaseError::from(duplicate).is_duplicate());
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn a_stale_review_cannot_overwrite_the_decision(pool: PgPool) -> Result<()> {
    let confirmation = submitted(&pool, "sari@student.univ.test").await?;
    accept(&pool, confirmation.id).await?;

    let mut tx = pool.begin().await?;
    let stale = ConfirmationRepository::transition(
        &mut tx,
        confirmation.id,
        ConfirmationStatus::Pending,
        ConfirmationStatus::Rejected,
        None,
        Some("Dokumen tidak lengkap"),
    )
    .await?;
    assert!(stale.is_none());
    let resubmitted =
        ConfirmationRepository::update_pending(&mut tx, confirmation.id, &placement(), None)
            .await?;
    assert!(resubmitted.is_none());
    tx.commit().await?;

    let current = ConfirmationRepository::find_by_id(&pool, confirmation.id).await?;
    let current = current.expect("confirmation exists");
    assert_eq!(current.status, ConfirmationStatus::Accepted);
    assert_eq!(current.rejection_reason, None);
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn completion_finishes_every_evaluation(pool: PgPool) -> Result<()> {
    let uts = template(&pool, "Evaluasi Tengah", EvaluationKind::Uts, true).await?;
    template(&pool, "Evaluasi Akhir", EvaluationKind::Uas, true).await?;
    let confirmation = submitted(&pool, "sari@student.univ.test").await?;
    accept(&pool, confirmation.id).await?;
    let answers: BTreeMap<_, _> = [("0".to_string(), "Baik".to_string())].into();
    EvaluationRecordRepository::save_answers(&pool, confirmation.id, uts.id, &answers).await?;

    let mut tx = pool.begin().await?;
    let completed = ConfirmationRepository::transition(
        &mut tx,
        confirmation.id,
        ConfirmationStatus::Accepted,
        ConfirmationStatus::Completed,
        None,
        None,
    )
    .await?;
    assert_eq!(completed.map(|c| c.status), Some(ConfirmationStatus::Completed));
    assert_eq!(EvaluationRecordRepository::finish_all(&mut tx, confirmation.id).await?, 2);
    tx.commit().await?;

    let records = EvaluationRecordRepository::list_for_confirmation(&pool, confirmation.id).await?;
    assert!(records.iter().all(|r| r.status == EvaluationStatus::Finished));

    let late_answer =
        EvaluationRecordRepository::save_answers(&pool, confirmation.id, uts.id, &answers).await?;
    assert!(late_answer.is_none());
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn certificate_numbers_run_within_the_utc_year(pool: PgPool) -> Result<()> {
    let first = submitted(&pool, "sari@student.univ.test").await?;
    let second = submitted(&pool, "dimas@student.univ.test").await?;
    let year = OffsetDateTime::now_utc().year();

    let mut tx = pool.begin().await?;
    sqlx::query("SET LOCAL TIME ZONE 'Asia/Jakarta'").execute(&mut *tx).await?;
    let issued = CertificateRepository::create_numbered(
        &mut tx,
        first.id,
        Grade::A,
        CertificateStatus::Issued,
        date!(2026 - 08 - 15),
        None,
    )
    .await?;
    assert_eq!(issued.number, format!("COOP/{year}/0001/UTS"));
    assert_eq!(issued.grade, Grade::A);
    assert_eq!(issued.status, CertificateStatus::Issued);

    // 20:00 UTC on New Year's Eve is already the next day in Jakarta.
    let new_years_eve = Date::from_calendar_date(year, Month::December, 31)?
        .with_hms(20, 0, 0)?
        .assume_utc();
    sqlx::query("UPDATE certificates SET created_at = $2 WHERE id = $1")
        .bind(issued.id)
        .bind(new_years_eve)
        .execute(&mut *tx)
        .await?;

    let next = CertificateRepository::create_numbered(
        &mut tx,
        second.id,
        Grade::B,
        CertificateStatus::Issued,
        date!(2026 - 08 - 15),
        None,
    )
    .await?;
    assert_eq!(next.number, format!("COOP/{year}/0002/UTS"));
    tx.commit().await?;
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn only_one_deadline_policy_is_active(pool: PgPool) -> Result<()> {
    let input = |deadline_date: Date| DeadlinePolicyInput {
        deadline_date,
        reminder_frequency_days: 7,
        description: "Batas konfirmasi magang".into(),
        email_reminder_enabled: true,
    };

    let mut created = Vec::new();
    for deadline in [date!(2026 - 03 - 02), date!(2026 - 04 - 06)] {
        let mut tx = pool.begin().await?;
        DeadlinePolicyRepository::deactivate_all(&mut tx).await?;
        created.push(DeadlinePolicyRepository::create_active(&mut tx, &input(deadline)).await?);
        tx.commit().await?;
        assert_eq!(active_policies(&pool).await?, 1);
    }
    let active = DeadlinePolicyRepository::find_active(&pool).await?;
    assert_eq!(active.map(|p| p.id), Some(created[1].id));

    let mut tx = pool.begin().await?;
    DeadlinePolicyRepository::deactivate_all(&mut tx).await?;
    assert!(DeadlinePolicyRepository::set_active(&mut tx, created[0].id, true).await?);
    tx.commit().await?;

    assert_eq!(active_policies(&pool).await?, 1);
    let active = DeadlinePolicyRepository::find_active(&pool).await?;
    assert_eq!(active.map(|p| p.deadline_date), Some(date!(2026 - 03 - 02)));
    Ok(())
}
