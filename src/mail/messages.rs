use askama::Template;

use super::{Email, MailResult};
use crate::db::models::{EvaluationKind, InternshipConfirmation};

/// The student placement a supervisor is told about.
#[derive(Debug, Clone)]
pub struct PlacementSummary {
    pub student_name: String,
    pub study_program: String,
    pub period_start: String,
    pub period_end: String,
    pub position: String,
    pub company_name: String,
}

impl PlacementSummary {
    pub fn new(
        student_name: &str,
        study_program: &str,
        confirmation: &InternshipConfirmation,
    ) -> Self {
        Self {
            student_name: student_name.to_string(),
            study_program: study_program.to_string(),
            period_start: confirmation.period_start.to_string(),
            period_end: confirmation.period_end.to_string(),
            position: confirmation.position.clone(),
            company_name: confirmation.company_name.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "emails/supervisor_welcome.html")]
struct SupervisorWelcomeHtml<'a> {
    supervisor_name: &'a str,
    username: &'a str,
    reset_url: &'a str,
    placement: &'a PlacementSummary,
    kaprodi_email: &'a str,
}

#[derive(Template)]
#[template(path = "emails/supervisor_welcome.txt")]
struct SupervisorWelcomeText<'a> {
    supervisor_name: &'a str,
    username: &'a str,
    reset_url: &'a str,
    placement: &'a PlacementSummary,
    kaprodi_email: &'a str,
}

pub fn supervisor_welcome(
    supervisor_name: &str,
    supervisor_email: &str,
    reset_url: &str,
    placement: &PlacementSummary,
    kaprodi_email: Option<&str>,
) -> MailResult<Email> {
    let kaprodi_email = kaprodi_email.unwrap_or("");
    let html = SupervisorWelcomeHtml {
        supervisor_name,
        username: supervisor_email,
        reset_url,
        placement,
        kaprodi_email,
    }
    .render()?;
    let text = SupervisorWelcomeText {
        supervisor_name,
        username: supervisor_email,
        reset_url,
        placement,
        kaprodi_email,
    }
    .render()?;

    Ok(Email {
        to: vec![supervisor_email.to_string()],
        subject: "Akun Supervisor - Sistem Magang".to_string(),
        text,
        html,
    })
}

/// One evaluation a supervisor is asked to fill in.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub supervisor_name: String,
    pub supervisor_email: String,
    pub template_name: String,
    pub kind: EvaluationKind,
    pub student_name: String,
    pub position: String,
    pub company_name: String,
    pub link: String,
}

#[derive(Template)]
#[template(path = "emails/evaluation_request.html")]
struct EvaluationRequestHtml<'a> {
    request: &'a EvaluationRequest,
    reminder: bool,
}

#[derive(Template)]
#[template(path = "emails/evaluation_request.txt")]
struct EvaluationRequestText<'a> {
    request: &'a EvaluationRequest,
    reminder: bool,
}

fn evaluation_email(request: &EvaluationRequest, reminder: bool) -> MailResult<Email> {
    let prefix = if reminder { "Reminder: " } else { "" };
    Ok(Email {
        to: vec![request.supervisor_email.clone()],
        subject: format!(
            "{prefix}Evaluasi {} - {}",
            request.kind.label(),
            request.student_name
        ),
        text: EvaluationRequestText { request, reminder }.render()?,
        html: EvaluationRequestHtml { request, reminder }.render()?,
    })
}

pub fn evaluation_distribution(request: &EvaluationRequest) -> MailResult<Email> {
    evaluation_email(request, false)
}

pub fn evaluation_reminder(request: &EvaluationRequest) -> MailResult<Email> {
    evaluation_email(request, true)
}

#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub template_name: String,
    pub student_name: String,
    pub student_number: String,
    pub company_name: String,
    pub supervisor_name: String,
    pub status: String,
    pub submitted_at: String,
}

#[derive(Template)]
#[template(path = "emails/evaluation_summary.html")]
struct EvaluationSummaryHtml<'a> {
    rows: &'a [SummaryRow],
}

#[derive(Template)]
#[template(path = "emails/evaluation_summary.txt")]
struct EvaluationSummaryText<'a> {
    rows: &'a [SummaryRow],
}

/// Completed evaluations for the department head and the co-op mentor.
pub fn evaluation_summary(recipients: Vec<String>, rows: &[SummaryRow]) -> MailResult<Email> {
    Ok(Email {
        to: recipients,
        subject: format!("Ringkasan Evaluasi Supervisor ({} evaluasi)", rows.len()),
        text: EvaluationSummaryText { rows }.render()?,
        html: EvaluationSummaryHtml { rows }.render()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement() -> PlacementSummary {
        PlacementSummary {
            student_name: "Sari Wulandari".into(),
            study_program: "Informatika".into(),
            period_start: "2026-02-01".into(),
            period_end: "2026-07-31".into(),
            position: "Backend Intern".into(),
            company_name: "PT Nusantara Data".into(),
        }
    }

    #[test]
    fn welcome_mail_carries_reset_link_and_placement() {
        let email = supervisor_welcome(
            "Rina",
            "rina@nusantara.co.id",
            "https://coop.univ.test/accounts/password/reset/abc",
            &placement(),
            Some("kaprodi@univ.test"),
        )
        .unwrap();
        assert_eq!(email.to, vec!["rina@nusantara.co.id".to_string()]);
        for body in [&email.text, &email.html] {
            assert!(body.contains("https://coop.univ.test/accounts/password/reset/abc"));
            assert!(body.contains("Sari Wulandari"));
            assert!(body.contains("PT Nusantara Data"));
        }
        assert!(email.text.contains("kaprodi@univ.test"));
    }

    #[test]
    fn html_bodies_escape_student_input() {
        let mut p = placement();
        p.company_name = "<script>x</script>".into();
        let email =
            supervisor_welcome("Rina", "rina@nusantara.co.id", "https://x.test", &p, None).unwrap();
        assert!(!email.html.contains("<script>"));
        assert!(email.text.contains("<script>x</script>"));
    }

    #[test]
    fn reminder_subject_is_prefixed() {
        let request = EvaluationRequest {
            supervisor_name: "Rina".into(),
            supervisor_email: "rina@nusantara.co.id".into(),
            template_name: "Evaluasi Tengah Magang".into(),
            kind: EvaluationKind::Uts,
            student_name: "Sari".into(),
            position: "Backend Intern".into(),
            company_name: "PT Nusantara Data".into(),
            link: "https://coop.univ.test/supervisor".into(),
        };
        let first = evaluation_distribution(&request).unwrap();
        let again = evaluation_reminder(&request).unwrap();
        assert!(!first.subject.starts_with("Reminder"));
        assert!(again.subject.starts_with("Reminder: "));
        assert!(again.text.contains("Evaluasi Tengah Magang"));
    }

    #[test]
    fn summary_lists_every_row() {
        let rows = vec![
            SummaryRow {
                template_name: "UTS".into(),
                student_name: "Sari".into(),
                student_number: "2210511".into(),
                company_name: "PT A".into(),
                supervisor_name: "Rina".into(),
                status: "completed".into(),
                submitted_at: "2026-04-01 10:00".into(),
            },
            SummaryRow {
                template_name: "UTS".into(),
                student_name: "Bima".into(),
                student_number: "2210512".into(),
                company_name: "PT B".into(),
                supervisor_name: "Tono".into(),
                status: "finished".into(),
                submitted_at: String::new(),
            },
        ];
        let email = evaluation_summary(vec!["kaprodi@univ.test".into()], &rows).unwrap();
        assert!(email.subject.contains("2 evaluasi"));
        assert!(email.text.contains("Sari") && email.text.contains("Bima"));
        assert!(email.html.contains("2210512"));
    }
}
