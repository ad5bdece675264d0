//! Decisions of the internship lifecycle that do not need the database.
//!
//! Handlers load records, ask this module what is allowed, then persist the
//! outcome with compare-and-set updates so a concurrent reviewer loses cleanly.

use thiserror::Error;
use time::Date;

use crate::db::models::{
    Certificate, CertificateStatus, ConfirmationStatus, DeadlinePolicy, Grade,
    InternshipConfirmation, NotificationKind, SupervisorProfile, WeekWindow,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("supervisor is not assigned to this confirmation")]
    NotAssignedSupervisor,

    #[error("cannot move confirmation from {from:?} to {to:?}")]
    InvalidTransition {
        from: ConfirmationStatus,
        to: ConfirmationStatus,
    },

    #[error("confirmation is {0:?} and can no longer be edited")]
    Locked(ConfirmationStatus),

    #[error("certificate requires a completed confirmation")]
    NotCompleted,

    #[error("weekly reporting is not open")]
    WeeklyReportingClosed,

    #[error("week starting {0} is outside the reporting range")]
    WeekOutOfRange(Date),
}

/// What a student's confirmation submission should do with the existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPlan {
    Create,
    OverwritePending,
}

pub fn plan_submission(
    existing: Option<&InternshipConfirmation>,
) -> Result<SubmissionPlan, WorkflowError> {
    match existing {
        None => Ok(SubmissionPlan::Create),
        Some(c) if c.status.accepts_resubmission() => Ok(SubmissionPlan::OverwritePending),
        Some(c) => Err(WorkflowError::Locked(c.status)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Accept { notes: String },
    Reject { reason: String },
}

impl ReviewDecision {
    /// Parses the `action` field of the review form.
    pub fn from_form(action: &str, text: &str) -> Option<Self> {
        let text = text.trim().to_string();
        match action {
            "accept" | "accepted" => Some(ReviewDecision::Accept { notes: text }),
            "reject" | "rejected" => Some(ReviewDecision::Reject { reason: text }),
            _ => None,
        }
    }

    pub fn target(&self) -> ConfirmationStatus {
        match self {
            ReviewDecision::Accept { .. } => ConfirmationStatus::Accepted,
            ReviewDecision::Reject { .. } => ConfirmationStatus::Rejected,
        }
    }

    pub fn student_notice_kind(&self) -> NotificationKind {
        match self {
            ReviewDecision::Accept { .. } => NotificationKind::Success,
            ReviewDecision::Reject { .. } => NotificationKind::Danger,
        }
    }

    pub fn approval_notes(&self) -> Option<&str> {
        match self {
            ReviewDecision::Accept { notes } => Some(notes.as_str()),
            ReviewDecision::Reject { .. } => None,
        }
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            ReviewDecision::Reject { reason } => Some(reason.as_str()),
            ReviewDecision::Accept { .. } => None,
        }
    }

    pub fn creates_evaluations(&self) -> bool {
        matches!(self, ReviewDecision::Accept { .. })
    }
}

/// Supervisors act only on confirmations naming their exact profile email.
pub fn authorize_supervisor(
    profile: &SupervisorProfile,
    confirmation: &InternshipConfirmation,
) -> Result<(), WorkflowError> {
    if profile.supervises(&confirmation.supervisor_email) {
        Ok(())
    } else {
        Err(WorkflowError::NotAssignedSupervisor)
    }
}

fn check_transition(
    confirmation: &InternshipConfirmation,
    to: ConfirmationStatus,
) -> Result<(), WorkflowError> {
    if confirmation.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(WorkflowError::InvalidTransition {
            from: confirmation.status,
            to,
        })
    }
}

pub fn plan_review(
    profile: &SupervisorProfile,
    confirmation: &InternshipConfirmation,
    decision: &ReviewDecision,
) -> Result<ConfirmationStatus, WorkflowError> {
    authorize_supervisor(profile, confirmation)?;
    let target = decision.target();
    check_transition(confirmation, target)?;
    Ok(target)
}

pub fn plan_completion(
    profile: &SupervisorProfile,
    confirmation: &InternshipConfirmation,
) -> Result<ConfirmationStatus, WorkflowError> {
    authorize_supervisor(profile, confirmation)?;
    check_transition(confirmation, ConfirmationStatus::Completed)?;
    Ok(ConfirmationStatus::Completed)
}

/// What to do when a student opens their certificate page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificatePlan {
    Existing,
    Create {
        grade: Grade,
        status: CertificateStatus,
        graduation_date: Date,
    },
}

pub fn plan_certificate_view(
    confirmation: &InternshipConfirmation,
    existing: Option<&Certificate>,
    today: Date,
) -> Result<CertificatePlan, WorkflowError> {
    if confirmation.status != ConfirmationStatus::Completed {
        return Err(WorkflowError::NotCompleted);
    }
    Ok(match existing {
        Some(_) => CertificatePlan::Existing,
        None => CertificatePlan::Create {
            grade: Grade::A,
            status: CertificateStatus::Issued,
            graduation_date: today,
        },
    })
}

/// Weekly reports are for students still searching once the deadline has passed.
pub fn weekly_reporting_open(
    confirmation_status: Option<ConfirmationStatus>,
    policy: Option<&DeadlinePolicy>,
    today: Date,
) -> bool {
    let placed = matches!(
        confirmation_status,
        Some(ConfirmationStatus::Accepted | ConfirmationStatus::Completed)
    );
    !placed && policy.is_some_and(|p| p.is_overdue(today))
}

/// Picks the reporting week: the current one by default, or an earlier backlog week.
pub fn select_week(
    requested: Option<Date>,
    today: Date,
    deadline: Date,
) -> Result<WeekWindow, WorkflowError> {
    let current = WeekWindow::containing(today, deadline);
    let Some(day) = requested else {
        return Ok(current);
    };
    let window = WeekWindow::containing(day, deadline);
    let first = WeekWindow::containing(deadline, deadline);
    if window.start > current.start || window.start < first.start {
        return Err(WorkflowError::WeekOutOfRange(window.start));
    }
    Ok(window)
}

/// Whole days since the deadline. Earlier weekly reports do not reset the count.
pub fn days_overdue(deadline: Date, today: Date) -> i64 {
    (today - deadline).whole_days().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Uuid;
    use time::macros::{date, datetime};

    fn confirmation(status: ConfirmationStatus) -> InternshipConfirmation {
        InternshipConfirmation {
            id: Uuid::nil(),
            student_id: Uuid::nil(),
            period_start: date!(2026 - 02 - 01),
            period_end: date!(2026 - 07 - 31),
            position: "Backend Intern".into(),
            company_name: "PT Nusantara Data".into(),
            company_address: String::new(),
            business_field: String::new(),
            supervisor_name: "Rina".into(),
            supervisor_email: "rina@nusantara.co.id".into(),
            supervisor_phone: String::new(),
            supervisor_user_id: None,
            acceptance_letter_url: None,
            status,
            approval_notes: None,
            rejection_reason: None,
            reviewed_at: None,
            created_at: datetime!(2026-01-15 08:00 UTC),
            updated_at: datetime!(2026-01-15 08:00 UTC),
        }
    }

    fn supervisor(email: &str) -> SupervisorProfile {
        SupervisorProfile {
            user_id: Uuid::nil(),
            full_name: "Rina".into(),
            email: email.into(),
            phone: String::new(),
            company: String::new(),
            business_field: String::new(),
            created_automatically: true,
            created_at: datetime!(2026-01-15 08:00 UTC),
            updated_at: datetime!(2026-01-15 08:00 UTC),
        }
    }

    #[test]
    fn resubmission_only_while_pending() {
        assert_eq!(plan_submission(None), Ok(SubmissionPlan::Create));
        assert_eq!(
            plan_submission(Some(&confirmation(ConfirmationStatus::Pending))),
            Ok(SubmissionPlan::OverwritePending)
        );
        for status in [
            ConfirmationStatus::Accepted,
            ConfirmationStatus::Rejected,
            ConfirmationStatus::Completed,
        ] {
            assert_eq!(
                plan_submission(Some(&confirmation(status))),
                Err(WorkflowError::Locked(status))
            );
        }
    }

    #[test]
    fn review_requires_exact_supervisor_email() {
        let c = confirmation(ConfirmationStatus::Pending);
        let accept = ReviewDecision::Accept { notes: String::new() };
        assert_eq!(
            plan_review(&supervisor("RINA@nusantara.co.id"), &c, &accept),
            Err(WorkflowError::NotAssignedSupervisor)
        );
        assert_eq!(
            plan_review(&supervisor("rina@nusantara.co.id"), &c, &accept),
            Ok(ConfirmationStatus::Accepted)
        );
    }

    #[test]
    fn rejected_cannot_be_accepted() {
        let c = confirmation(ConfirmationStatus::Rejected);
        let accept = ReviewDecision::Accept { notes: String::new() };
        assert!(matches!(
            plan_review(&supervisor("rina@nusantara.co.id"), &c, &accept),
            Err(WorkflowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn completion_only_from_accepted() {
        let sup = supervisor("rina@nusantara.co.id");
        assert!(plan_completion(&sup, &confirmation(ConfirmationStatus::Pending)).is_err());
        assert_eq!(
            plan_completion(&sup, &confirmation(ConfirmationStatus::Accepted)),
            Ok(ConfirmationStatus::Completed)
        );
    }

    #[test]
    fn review_form_actions() {
        let d = ReviewDecision::from_form("reject", "  no placement slot ").unwrap();
        assert_eq!(d.rejection_reason(), Some("no placement slot"));
        assert_eq!(d.student_notice_kind(), NotificationKind::Danger);
        assert!(!d.creates_evaluations());
        assert!(ReviewDecision::from_form("approve", "").is_none());
    }

    #[test]
    fn first_certificate_view_defaults_to_grade_a() {
        let plan = plan_certificate_view(
            &confirmation(ConfirmationStatus::Completed),
            None,
            date!(2026 - 08 - 03),
        )
        .unwrap();
        assert_eq!(
            plan,
            CertificatePlan::Create {
                grade: Grade::A,
                status: CertificateStatus::Issued,
                graduation_date: date!(2026 - 08 - 03),
            }
        );
        assert_eq!(
            plan_certificate_view(
                &confirmation(ConfirmationStatus::Accepted),
                None,
                date!(2026 - 08 - 03)
            ),
            Err(WorkflowError::NotCompleted)
        );
    }

    #[test]
    fn weekly_reporting_opens_after_deadline_for_unplaced_students() {
        let policy = DeadlinePolicy {
            id: Uuid::nil(),
            deadline_date: date!(2026 - 03 - 02),
            reminder_frequency_days: 7,
            description: String::new(),
            email_reminder_enabled: false,
            is_active: true,
            created_at: datetime!(2026-01-01 00:00 UTC),
            updated_at: datetime!(2026-01-01 00:00 UTC),
        };
        assert!(!weekly_reporting_open(None, Some(&policy), date!(2026 - 03 - 02)));
        assert!(weekly_reporting_open(None, Some(&policy), date!(2026 - 03 - 03)));
        assert!(weekly_reporting_open(
            Some(ConfirmationStatus::Rejected),
            Some(&policy),
            date!(2026 - 03 - 03)
        ));
        assert!(!weekly_reporting_open(
            Some(ConfirmationStatus::Accepted),
            Some(&policy),
            date!(2026 - 03 - 03)
        ));
        assert!(!weekly_reporting_open(
            Some(ConfirmationStatus::Completed),
            Some(&policy),
            date!(2026 - 03 - 03)
        ));
        assert!(!weekly_reporting_open(None, None, date!(2026 - 03 - 03)));
    }

    #[test]
    fn backlog_weeks_stay_within_range() {
        let deadline = date!(2026 - 03 - 02);
        let today = date!(2026 - 03 - 18);
        assert_eq!(
            select_week(None, today, deadline).unwrap().start,
            date!(2026 - 03 - 16)
        );
        let backlog = select_week(Some(date!(2026 - 03 - 05)), today, deadline).unwrap();
        assert_eq!(backlog.start, date!(2026 - 03 - 02));
        assert!(backlog.is_late(today));
        assert!(select_week(Some(date!(2026 - 02 - 20)), today, deadline).is_err());
        assert!(select_week(Some(date!(2026 - 03 - 25)), today, deadline).is_err());
    }

    #[test]
    fn overdue_days_count_from_the_deadline() {
        let deadline = date!(2026 - 03 - 02);
        assert_eq!(days_overdue(deadline, date!(2026 - 03 - 12)), 10);
        assert_eq!(days_overdue(deadline, date!(2026 - 03 - 02)), 0);
        assert_eq!(days_overdue(deadline, date!(2026 - 03 - 01)), 0);
    }
}
