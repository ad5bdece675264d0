//! One placement walked from submission to certificate using the pure
//! lifecycle rules, with records held in memory.

use sqlx::types::{Json, Uuid};
use time::macros::{date, datetime};

use coop_portal::db::models::{
    certificate_number, collect_answers, CertificateStatus, ConfirmationStatus, DeadlinePolicy,
    EvaluationKind, EvaluationStatus, EvaluationTemplate, EvaluationTrackingRow, Grade,
    InternshipConfirmation, SupervisorProfile, TrackingSummary,
};
use coop_portal::workflow::{
    days_overdue, plan_certificate_view, plan_completion, plan_review, plan_submission,
    select_week, weekly_reporting_open, CertificatePlan, ReviewDecision, SubmissionPlan,
    WorkflowError,
};

fn submitted(supervisor_email: &str) -> InternshipConfirmation {
    InternshipConfirmation {
        id: Uuid::new_v4(),
        student_id: Uuid::new_v4(),
        period_start: date!(2026 - 02 - 02),
        period_end: date!(2026 - 07 - 31),
        position: "Data Analyst Intern".into(),
        company_name: "PT Sinar Logistik".into(),
        company_address: "Jl. Sudirman 10, Jakarta".into(),
        business_field: "Logistics".into(),
        supervisor_name: "Budi Santoso".into(),
        supervisor_email: supervisor_email.into(),
        supervisor_phone: "081234567890".into(),
        supervisor_user_id: None,
        acceptance_letter_url: Some("/media/acceptance_letters/2201001_sinar.pdf".into()),
        status: ConfirmationStatus::Pending,
        approval_notes: None,
        rejection_reason: None,
        reviewed_at: None,
        created_at: datetime!(2026-01-20 09:00 UTC),
        updated_at: datetime!(2026-01-20 09:00 UTC),
    }
}

fn supervisor(email: &str) -> SupervisorProfile {
    SupervisorProfile {
        user_id: Uuid::new_v4(),
        full_name: "Budi Santoso".into(),
        email: email.into(),
        phone: String::new(),
        company: "PT Sinar Logistik".into(),
        business_field: "Logistics".into(),
        created_automatically: true,
        created_at: datetime!(2026-01-20 09:00 UTC),
        updated_at: datetime!(2026-01-20 09:00 UTC),
    }
}

fn midterm_template() -> EvaluationTemplate {
    EvaluationTemplate {
        id: Uuid::new_v4(),
        name: "Evaluasi Tengah Magang".into(),
        kind: EvaluationKind::Uts,
        questions: Json(vec![
            "Bagaimana kedisiplinan mahasiswa?".into(),
            "Bagaimana kemampuan kerja sama tim?".into(),
        ]),
        is_active: true,
        window_start: Some(datetime!(2026-04-01 00:00 UTC)),
        window_end: Some(datetime!(2026-04-30 23:59 UTC)),
        auto_distribute: false,
        created_at: datetime!(2026-01-05 09:00 UTC),
        updated_at: datetime!(2026-01-05 09:00 UTC),
    }
}

#[test]
fn placement_runs_from_submission_to_certificate() {
    let email = "budi@sinarlogistik.co.id";
    let profile = supervisor(email);

    assert_eq!(plan_submission(None), Ok(SubmissionPlan::Create));
    let mut confirmation = submitted(email);

    // Still editable until the supervisor acts.
    assert_eq!(
        plan_submission(Some(&confirmation)),
        Ok(SubmissionPlan::OverwritePending)
    );

    let decision = ReviewDecision::from_form("accept", "  Selamat bergabung  ").unwrap();
    assert_eq!(decision.approval_notes(), Some("Selamat bergabung"));
    assert!(decision.creates_evaluations());
    confirmation.status = plan_review(&profile, &confirmation, &decision).unwrap();
    assert_eq!(confirmation.status, ConfirmationStatus::Accepted);

    assert_eq!(
        plan_submission(Some(&confirmation)),
        Err(WorkflowError::Locked(ConfirmationStatus::Accepted))
    );
    assert_eq!(
        plan_certificate_view(&confirmation, None, date!(2026 - 05 - 01)),
        Err(WorkflowError::NotCompleted)
    );

    let template = midterm_template();
    assert!(template.can_be_filled(datetime!(2026-04-15 10:00 UTC)));
    assert!(!template.can_be_filled(datetime!(2026-05-02 10:00 UTC)));
    let answers = collect_answers(
        [
            ("template_id", "ignored"),
            ("answer_0", " Sangat disiplin "),
            ("answer_1", "Aktif dalam tim"),
            ("answer_5", "out of range"),
        ],
        template.question_list().len(),
    );
    assert_eq!(answers.len(), 2);
    assert_eq!(answers["0"], "Sangat disiplin");

    confirmation.status = plan_completion(&profile, &confirmation).unwrap();
    assert_eq!(confirmation.status, ConfirmationStatus::Completed);

    let today = date!(2026 - 08 - 03);
    match plan_certificate_view(&confirmation, None, today).unwrap() {
        CertificatePlan::Create {
            grade,
            status,
            graduation_date,
        } => {
            assert_eq!(grade, Grade::A);
            assert_eq!(status, CertificateStatus::Issued);
            assert_eq!(graduation_date, today);
            assert_eq!(certificate_number(today.year(), 41), "COOP/2026/0042/UTS");
        }
        other => panic!("expected a new certificate, got {other:?}"),
    }
}

#[test]
fn rejection_is_final_and_needs_the_named_supervisor() {
    let email = "budi@sinarlogistik.co.id";
    let mut confirmation = submitted(email);
    let reject = ReviewDecision::from_form("reject", "Posisi tidak relevan").unwrap();

    assert_eq!(
        plan_review(&supervisor("someone@else.co.id"), &confirmation, &reject),
        Err(WorkflowError::NotAssignedSupervisor)
    );

    confirmation.status = plan_review(&supervisor(email), &confirmation, &reject).unwrap();
    assert_eq!(confirmation.status, ConfirmationStatus::Rejected);
    assert_eq!(reject.rejection_reason(), Some("Posisi tidak relevan"));

    let accept = ReviewDecision::from_form("accept", "").unwrap();
    assert_eq!(
        plan_review(&supervisor(email), &confirmation, &accept),
        Err(WorkflowError::InvalidTransition {
            from: ConfirmationStatus::Rejected,
            to: ConfirmationStatus::Accepted,
        })
    );
    assert!(plan_completion(&supervisor(email), &confirmation).is_err());
}

#[test]
fn unplaced_students_report_weekly_after_the_deadline() {
    let policy = DeadlinePolicy {
        id: Uuid::new_v4(),
        deadline_date: date!(2026 - 03 - 02),
        reminder_frequency_days: 7,
        description: "Batas pencarian tempat magang".into(),
        email_reminder_enabled: true,
        is_active: true,
        created_at: datetime!(2026-01-05 09:00 UTC),
        updated_at: datetime!(2026-01-05 09:00 UTC),
    };
    let today = date!(2026 - 03 - 18);

    assert!(!weekly_reporting_open(None, Some(&policy), date!(2026 - 03 - 01)));
    assert!(weekly_reporting_open(None, Some(&policy), today));
    assert!(weekly_reporting_open(
        Some(ConfirmationStatus::Rejected),
        Some(&policy),
        today
    ));
    assert!(!weekly_reporting_open(
        Some(ConfirmationStatus::Accepted),
        Some(&policy),
        today
    ));
    assert!(!weekly_reporting_open(None, None, today));

    let current = select_week(None, today, policy.deadline_date).unwrap();
    assert_eq!(current.start, date!(2026 - 03 - 16));
    assert_eq!(current.number, 3);

    let backlog = select_week(Some(date!(2026 - 03 - 05)), today, policy.deadline_date).unwrap();
    assert_eq!(backlog.number, 1);
    assert!(backlog.is_late(today));
    assert!(select_week(Some(date!(2026 - 03 - 25)), today, policy.deadline_date).is_err());

    assert_eq!(days_overdue(policy.deadline_date, today), 16);
}

#[test]
fn tracking_counts_answered_records_only() {
    let row = |status: Option<EvaluationStatus>| EvaluationTrackingRow {
        confirmation_id: Uuid::new_v4(),
        student_name: "Ayu".into(),
        student_number: "2201001".into(),
        company_name: "PT Sinar Logistik".into(),
        supervisor_name: "Budi".into(),
        supervisor_email: "budi@sinarlogistik.co.id".into(),
        record_status: status,
        submitted_at: None,
    };
    let rows = vec![
        row(Some(EvaluationStatus::Completed)),
        row(Some(EvaluationStatus::Finished)),
        row(Some(EvaluationStatus::Pending)),
        row(None),
    ];

    let summary = TrackingSummary::from_rows(&rows);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.pending, 2);
    assert_eq!(summary.completion_rate, 50);
    assert_eq!(rows[3].status_label(), "not_created");
}
