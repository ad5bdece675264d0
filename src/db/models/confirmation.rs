use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "confirmation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl ConfirmationStatus {
    /// The only edges in the confirmation lifecycle.
    pub fn can_transition_to(self, next: ConfirmationStatus) -> bool {
        use ConfirmationStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted) | (Pending, Rejected) | (Accepted, Completed)
        )
    }

    /// Students may edit their submission until a supervisor has acted on it.
    pub fn accepts_resubmission(self) -> bool {
        self == ConfirmationStatus::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfirmationStatus::Pending => "pending",
            ConfirmationStatus::Accepted => "accepted",
            ConfirmationStatus::Rejected => "rejected",
            ConfirmationStatus::Completed => "completed",
        }
    }

    pub fn all() -> [ConfirmationStatus; 4] {
        [
            ConfirmationStatus::Pending,
            ConfirmationStatus::Accepted,
            ConfirmationStatus::Rejected,
            ConfirmationStatus::Completed,
        ]
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct InternshipConfirmation {
    pub id: Uuid,
    pub student_id: Uuid,
    pub period_start: Date,
    pub period_end: Date,
    pub position: String,
    pub company_name: String,
    pub company_address: String,
    pub business_field: String,
    pub supervisor_name: String,
    pub supervisor_email: String,
    pub supervisor_phone: String,
    pub supervisor_user_id: Option<Uuid>,
    pub acceptance_letter_url: Option<String>,
    pub status: ConfirmationStatus,
    pub approval_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub reviewed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl InternshipConfirmation {
    pub fn period_label(&self) -> String {
        format!("{} - {}", self.period_start, self.period_end)
    }
}

/// A confirmation joined with the student it belongs to, for listings.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConfirmationWithStudent {
    #[sqlx(flatten)]
    pub confirmation: InternshipConfirmation,
    pub student_name: String,
    pub student_number: String,
    pub study_program: String,
    pub student_email: String,
}

fn validate_period(form: &NewConfirmation) -> Result<(), ValidationError> {
    if form.period_end < form.period_start {
        return Err(ValidationError::new("period_order"));
    }
    Ok(())
}

#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_period"))]
pub struct NewConfirmation {
    pub period_start: Date,
    pub period_end: Date,
    #[validate(length(min = 1, max = 200))]
    pub position: String,
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    pub company_address: String,
    pub business_field: String,
    #[validate(length(min = 1, max = 200))]
    pub supervisor_name: String,
    #[validate(email)]
    pub supervisor_email: String,
    pub supervisor_phone: String,
    pub acceptance_letter_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::date;
    use ConfirmationStatus::*;

    #[rstest]
    #[case(Pending, Accepted, true)]
    #[case(Pending, Rejected, true)]
    #[case(Accepted, Completed, true)]
    #[case(Rejected, Accepted, false)]
    #[case(Completed, Accepted, false)]
    #[case(Completed, Pending, false)]
    #[case(Accepted, Rejected, false)]
    #[case(Pending, Completed, false)]
    #[case(Rejected, Pending, false)]
    fn transition_table(
        #[case] from: ConfirmationStatus,
        #[case] to: ConfirmationStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn no_state_transitions_to_itself() {
        for status in ConfirmationStatus::all() {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn only_pending_is_editable() {
        assert!(Pending.accepts_resubmission());
        assert!(!Accepted.accepts_resubmission());
        assert!(!Rejected.accepts_resubmission());
        assert!(!Completed.accepts_resubmission());
    }

    fn form() -> NewConfirmation {
        NewConfirmation {
            period_start: date!(2026 - 02 - 01),
            period_end: date!(2026 - 07 - 31),
            position: "Backend intern".into(),
            company_name: "PT Contoh".into(),
            company_address: String::new(),
            business_field: String::new(),
            supervisor_name: "Budi".into(),
            supervisor_email: "budi@contoh.test".into(),
            supervisor_phone: String::new(),
            acceptance_letter_url: None,
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(form().validate().is_ok());
    }

    #[test]
    fn reversed_period_is_rejected() {
        let mut f = form();
        f.period_end = date!(2026 - 01 - 01);
        assert!(f.validate().is_err());
    }

    #[test]
    fn malformed_supervisor_email_is_rejected() {
        let mut f = form();
        f.supervisor_email = "not-an-email".into();
        assert!(f.validate().is_err());
    }
}
