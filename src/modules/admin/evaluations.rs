//! Evaluation templates, their distribution, tracking and results.

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::AdminUser;
use crate::db::models::{
    parse_questions, EvaluationKind, EvaluationStatus, EvaluationTemplate, FlashLevel,
    NewEvaluationTemplate, TrackingSummary,
};
use crate::db::repositories::{
    EvaluationRecordDetail, EvaluationRecordRepository, EvaluationTemplateRepository,
};
use crate::error::AppResult;
use crate::export::{evaluation_results_csv, format_timestamp};
use crate::i18n::I18n;
use crate::mail::{self, messages, messages::EvaluationRequest, messages::SummaryRow};
use crate::modules::common::{
    csv_attachment, datetime_input, display_datetime, flash_message_redirect, flash_redirect,
    is_checked, label, parse_datetime_local, validation_message, HtmlTemplate, Page, SelectOption,
};

const TEMPLATES: &str = "/admin/templates";

pub struct TemplateRow {
    pub id: String,
    pub name: String,
    pub kind: &'static str,
    pub question_count: usize,
    pub is_active: bool,
    pub window: String,
    pub period_status: String,
    pub fillable: bool,
}

#[derive(Template)]
#[template(path = "admin/templates.html")]
struct TemplatesTemplate {
    page: Page,
    templates: Vec<TemplateRow>,
}

fn window_label(template: &EvaluationTemplate) -> String {
    match (template.window_start, template.window_end) {
        (Some(start), Some(end)) => format!(
            "{} - {}",
            format_timestamp(Some(start)),
            format_timestamp(Some(end))
        ),
        _ => String::new(),
    }
}

pub async fn templates(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let templates = EvaluationTemplateRepository::list_all(&state.db).await?;
    let now = OffsetDateTime::now_utc();
    let page = Page::for_user(&state, &admin, "title-templates").await;
    let templates = templates
        .iter()
        .map(|t| TemplateRow {
            id: t.id.to_string(),
            name: t.name.clone(),
            kind: t.kind.label(),
            question_count: t.question_list().len(),
            is_active: t.is_active,
            window: window_label(t),
            period_status: label(&page.t, "period-status", t.period_status(now).as_str()),
            fillable: t.can_be_filled(now),
        })
        .collect();
    Ok(HtmlTemplate(TemplatesTemplate { page, templates }))
}

// ---- create and edit ----

#[derive(Debug, Default, Deserialize)]
pub struct TemplateForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub questions: String,
    pub is_active: Option<String>,
    #[serde(default)]
    pub window_start: String,
    #[serde(default)]
    pub window_end: String,
    pub auto_distribute: Option<String>,
}

impl TemplateForm {
    fn from_template(t: &EvaluationTemplate) -> Self {
        TemplateForm {
            name: t.name.clone(),
            kind: t.kind.label().to_ascii_lowercase(),
            questions: t.question_list().join("\n"),
            is_active: t.is_active.then(|| "on".to_string()),
            window_start: datetime_input(t.window_start),
            window_end: datetime_input(t.window_end),
            auto_distribute: t.auto_distribute.then(|| "on".to_string()),
        }
    }

    /// Validated input, or the localized message to show.
    fn parse(&self, t: &I18n) -> Result<NewEvaluationTemplate, String> {
        let kind = EvaluationKind::parse(&self.kind).ok_or_else(|| t.get("error-form-invalid"))?;
        let window_start = parse_datetime_local(&self.window_start);
        let window_end = parse_datetime_local(&self.window_end);
        if let (Some(start), Some(end)) = (window_start, window_end) {
            if end < start {
                return Err(t.get("error-period-order"));
            }
        }
        let input = NewEvaluationTemplate {
            name: self.name.trim().to_string(),
            kind,
            questions: parse_questions(&self.questions),
            is_active: is_checked(&self.is_active),
            window_start,
            window_end,
            auto_distribute: is_checked(&self.auto_distribute),
        };
        input.validate().map_err(|errors| validation_message(t, &errors))?;
        Ok(input)
    }
}

#[derive(Template)]
#[template(path = "admin/template_form.html")]
struct TemplateFormTemplate {
    page: Page,
    action: String,
    form: TemplateForm,
    kinds: Vec<SelectOption>,
    is_active: bool,
    auto_distribute: bool,
}

const KIND_VALUES: [&str; 2] = ["uts", "uas"];

fn render_form(page: Page, action: String, form: TemplateForm) -> Response {
    let kinds = SelectOption::list(&page.t, "evaluation-kind", &KIND_VALUES, &form.kind);
    HtmlTemplate(TemplateFormTemplate {
        is_active: is_checked(&form.is_active),
        auto_distribute: is_checked(&form.auto_distribute),
        page,
        action,
        form,
        kinds,
    })
    .into_response()
}

pub async fn new_template(State(state): State<AppState>, admin: AdminUser) -> Response {
    let page = Page::for_user(&state, &admin, "title-template-new").await;
    let form = TemplateForm {
        kind: "uts".into(),
        is_active: Some("on".into()),
        ..Default::default()
    };
    render_form(page, TEMPLATES.to_string(), form)
}

pub async fn create_template(
    State(state): State<AppState>,
    admin: AdminUser,
    Form(form): Form<TemplateForm>,
) -> AppResult<Response> {
    let t = I18n::new(state.localizer.clone(), admin.language);
    let input = match form.parse(&t) {
        Ok(input) => input,
        Err(message) => {
            let page = Page::for_user(&state, &admin, "title-template-new")
                .await
                .notice(FlashLevel::Error, message);
            return Ok(render_form(page, TEMPLATES.to_string(), form));
        }
    };
    let template = EvaluationTemplateRepository::create(&state.db, &input).await?;
    tracing::info!(
        template_id = %template.id,
        kind = template.kind.label(),
        "Evaluation template created"
    );
    Ok(flash_redirect(&state, &admin, FlashLevel::Success, "template-saved", TEMPLATES).await)
}

pub async fn edit_template(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let Some(template) = EvaluationTemplateRepository::find_by_id(&state.db, id).await? else {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-not-found",
            TEMPLATES,
        )
        .await);
    };
    let page = Page::for_user(&state, &admin, "title-template-edit").await;
    Ok(render_form(page, format!("{TEMPLATES}/{id}"), TemplateForm::from_template(&template)))
}

pub async fn update_template(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Form(form): Form<TemplateForm>,
) -> AppResult<Response> {
    let t = I18n::new(state.localizer.clone(), admin.language);
    let input = match form.parse(&t) {
        Ok(input) => input,
        Err(message) => {
            let page = Page::for_user(&state, &admin, "title-template-edit")
                .await
                .notice(FlashLevel::Error, message);
            return Ok(render_form(page, format!("{TEMPLATES}/{id}"), form));
        }
    };
    if EvaluationTemplateRepository::update(&state.db, id, &input).await?.is_none() {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-not-found",
            TEMPLATES,
        )
        .await);
    }
    tracing::info!(template_id = %id, "Evaluation template updated");
    Ok(flash_redirect(&state, &admin, FlashLevel::Success, "template-saved", TEMPLATES).await)
}

pub async fn toggle_template(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let key = match EvaluationTemplateRepository::toggle_active(&state.db, id).await? {
        Some(true) => "template-activated",
        Some(false) => "template-deactivated",
        None => {
            return Ok(flash_redirect(
                &state,
                &admin,
                FlashLevel::Error,
                "error-not-found",
                TEMPLATES,
            )
            .await);
        }
    };
    tracing::info!(template_id = %id, key, "Evaluation template toggled");
    Ok(flash_redirect(&state, &admin, FlashLevel::Success, key, TEMPLATES).await)
}

// ---- mailings ----

fn evaluation_request(state: &AppState, detail: &EvaluationRecordDetail) -> EvaluationRequest {
    EvaluationRequest {
        supervisor_name: detail.supervisor_name.clone(),
        supervisor_email: detail.supervisor_email.clone(),
        template_name: detail.template_name.clone(),
        kind: detail.template_kind,
        student_name: detail.student_name.clone(),
        position: detail.position.clone(),
        company_name: detail.company_name.clone(),
        link: format!(
            "{}/supervisor/confirmations/{}/evaluate?template={}",
            state.env.app.public_base_url.trim_end_matches('/'),
            detail.confirmation_id,
            detail.template_id
        ),
    }
}

/// Mails every supervisor with a pending record for the template. Returns the number sent.
async fn mail_pending(state: &AppState, template_id: Uuid, reminder: bool) -> AppResult<usize> {
    let pending = EvaluationRecordRepository::details_with_status(
        &state.db,
        &[EvaluationStatus::Pending],
        Some(template_id),
    )
    .await?;
    let mut sent = 0;
    for detail in &pending {
        let request = evaluation_request(state, detail);
        let email = if reminder {
            messages::evaluation_reminder(&request)
        } else {
            messages::evaluation_distribution(&request)
        };
        match email {
            Ok(email) => {
                if mail::deliver(state.mailer.as_ref(), &email).await {
                    sent += 1;
                }
            }
            Err(e) => tracing::error!(
                record_id = %detail.record_id,
                error = %e,
                "Failed to build evaluation email"
            ),
        }
    }
    Ok(sent)
}

async fn sent_redirect(
    state: &AppState,
    admin: &AdminUser,
    key: &str,
    created: u64,
    sent: usize,
) -> Response {
    let t = I18n::new(state.localizer.clone(), admin.language);
    let message = t.get_with_args(
        key,
        &crate::i18n_args!("created" => created as i64, "sent" => sent as i64),
    );
    flash_message_redirect(state, admin, FlashLevel::Success, message, TEMPLATES).await
}

pub async fn distribute_template(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let Some(template) = EvaluationTemplateRepository::find_by_id(&state.db, id).await? else {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-not-found",
            TEMPLATES,
        )
        .await);
    };
    if !template.can_be_filled(OffsetDateTime::now_utc()) {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Warning,
            "error-evaluation-closed",
            TEMPLATES,
        )
        .await);
    }
    let created = EvaluationRecordRepository::create_pending_for_template(&state.db, id).await?;
    let sent = mail_pending(&state, id, false).await?;
    tracing::info!(template_id = %id, created, sent, "Evaluation distributed");
    Ok(sent_redirect(&state, &admin, "evaluation-distributed", created, sent).await)
}

pub async fn remind_template(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    if EvaluationTemplateRepository::find_by_id(&state.db, id).await?.is_none() {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-not-found",
            TEMPLATES,
        )
        .await);
    }
    let sent = mail_pending(&state, id, true).await?;
    tracing::info!(template_id = %id, sent, "Evaluation reminders sent");
    Ok(sent_redirect(&state, &admin, "evaluation-reminded", 0, sent).await)
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplateFilter {
    pub template: Option<Uuid>,
}

async fn answered_details(
    state: &AppState,
    template: Option<Uuid>,
) -> AppResult<Vec<EvaluationRecordDetail>> {
    Ok(EvaluationRecordRepository::details_with_status(
        &state.db,
        &[EvaluationStatus::Completed, EvaluationStatus::Finished],
        template,
    )
    .await?)
}

/// Mails the answered evaluations to the department head and the co-op mentor.
pub async fn send_to_kaprodi(
    State(state): State<AppState>,
    admin: AdminUser,
    Form(filter): Form<TemplateFilter>,
) -> AppResult<Response> {
    let recipients: Vec<String> = [&state.env.app.kaprodi_email, &state.env.app.mentor_email]
        .into_iter()
        .flatten()
        .filter(|address| !address.trim().is_empty())
        .cloned()
        .collect();
    if recipients.is_empty() {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-no-recipients",
            TEMPLATES,
        )
        .await);
    }
    let details = answered_details(&state, filter.template).await?;
    if details.is_empty() {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Info,
            "error-no-answered-evaluations",
            TEMPLATES,
        )
        .await);
    }

    let rows: Vec<SummaryRow> = details
        .iter()
        .map(|d| SummaryRow {
            template_name: d.template_name.clone(),
            student_name: d.student_name.clone(),
            student_number: d.student_number.clone(),
            company_name: d.company_name.clone(),
            supervisor_name: d.supervisor_name.clone(),
            status: d.status.as_str().to_string(),
            submitted_at: format_timestamp(d.submitted_at),
        })
        .collect();
    let delivered = match messages::evaluation_summary(recipients, &rows) {
        Ok(email) => mail::deliver(state.mailer.as_ref(), &email).await,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build evaluation summary");
            false
        }
    };
    let (level, key) = if delivered {
        (FlashLevel::Success, "evaluation-summary-sent")
    } else {
        (FlashLevel::Error, "error-mail-failed")
    };
    Ok(flash_redirect(&state, &admin, level, key, TEMPLATES).await)
}

pub async fn export_results(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<TemplateFilter>,
) -> AppResult<Response> {
    let details = answered_details(&state, filter.template).await?;
    let bytes = evaluation_results_csv(&details)?;
    Ok(csv_attachment(bytes, "hasil_evaluasi.csv"))
}

// ---- tracking ----

pub struct TrackingCard {
    pub id: String,
    pub name: String,
    pub kind: &'static str,
    pub period_status: String,
    pub summary: TrackingSummary,
    pub selected: bool,
}

pub struct TrackingRowView {
    pub confirmation_id: String,
    pub student_name: String,
    pub student_number: String,
    pub company_name: String,
    pub supervisor_name: String,
    pub supervisor_email: String,
    pub status: String,
    pub answered: bool,
    pub submitted_at: String,
}

#[derive(Template)]
#[template(path = "admin/tracking.html")]
struct TrackingTemplate {
    page: Page,
    cards: Vec<TrackingCard>,
    selected_id: String,
    rows: Vec<TrackingRowView>,
}

pub async fn tracking(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(filter): Query<TemplateFilter>,
) -> AppResult<impl IntoResponse> {
    let templates = EvaluationTemplateRepository::list_active(&state.db).await?;
    let now = OffsetDateTime::now_utc();
    let selected = filter.template.or_else(|| templates.first().map(|t| t.id));
    let page = Page::for_user(&state, &admin, "title-tracking").await;

    let mut cards = Vec::with_capacity(templates.len());
    let mut rows = Vec::new();
    for template in &templates {
        let tracked =
            EvaluationRecordRepository::tracking_for_template(&state.db, template.id).await?;
        let is_selected = selected == Some(template.id);
        if is_selected {
            rows = tracked
                .iter()
                .map(|r| TrackingRowView {
                    confirmation_id: r.confirmation_id.to_string(),
                    student_name: r.student_name.clone(),
                    student_number: r.student_number.clone(),
                    company_name: r.company_name.clone(),
                    supervisor_name: r.supervisor_name.clone(),
                    supervisor_email: r.supervisor_email.clone(),
                    status: label(&page.t, "evaluation-status", r.status_label()),
                    answered: r.record_status.is_some_and(EvaluationStatus::is_answered),
                    submitted_at: display_datetime(r.submitted_at),
                })
                .collect();
        }
        cards.push(TrackingCard {
            id: template.id.to_string(),
            name: template.name.clone(),
            kind: template.kind.label(),
            period_status: label(&page.t, "period-status", template.period_status(now).as_str()),
            summary: TrackingSummary::from_rows(&tracked),
            selected: is_selected,
        });
    }

    Ok(HtmlTemplate(TrackingTemplate {
        page,
        cards,
        selected_id: selected.map(|id| id.to_string()).unwrap_or_default(),
        rows,
    }))
}

// ---- result view ----

pub struct AnswerView {
    pub question: String,
    pub answer: String,
}

#[derive(Template)]
#[template(path = "admin/evaluation_result.html")]
struct ResultTemplate {
    page: Page,
    template_name: String,
    kind: &'static str,
    student_name: String,
    student_number: String,
    company_name: String,
    supervisor_name: String,
    status: String,
    submitted_at: String,
    answers: Vec<AnswerView>,
}

/// Pairs each question with its answer in question order.
pub fn pair_answers(detail: &EvaluationRecordDetail, fallback: &str) -> Vec<AnswerView> {
    detail
        .questions
        .0
        .iter()
        .enumerate()
        .map(|(i, question)| AnswerView {
            question: question.clone(),
            answer: detail
                .answers
                .0
                .get(&i.to_string())
                .filter(|a| !a.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| fallback.to_string()),
        })
        .collect()
}

pub async fn evaluation_result(
    State(state): State<AppState>,
    admin: AdminUser,
    Path((confirmation_id, template_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Response> {
    let detail =
        EvaluationRecordRepository::detail(&state.db, confirmation_id, template_id).await?;
    let Some(detail) = detail else {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-not-found",
            "/admin/tracking",
        )
        .await);
    };
    let page = Page::for_user(&state, &admin, "title-evaluation-result").await;
    let answers = pair_answers(&detail, &page.t.get("error-not-answered"));
    Ok(HtmlTemplate(ResultTemplate {
        status: label(&page.t, "evaluation-status", detail.status.as_str()),
        submitted_at: display_datetime(detail.submitted_at),
        template_name: detail.template_name,
        kind: detail.template_kind.label(),
        student_name: detail.student_name,
        student_number: detail.student_number,
        company_name: detail.company_name,
        supervisor_name: detail.supervisor_name,
        answers,
        page,
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;
    use std::collections::BTreeMap;

    fn detail(answers: &[(&str, &str)]) -> EvaluationRecordDetail {
        EvaluationRecordDetail {
            record_id: Uuid::nil(),
            confirmation_id: Uuid::nil(),
            template_id: Uuid::nil(),
            template_name: "Evaluasi Tengah".into(),
            template_kind: EvaluationKind::Uts,
            questions: Json(vec!["Kedisiplinan".into(), "Kerja sama".into(), "Inisiatif".into()]),
            answers: Json(
                answers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            status: EvaluationStatus::Completed,
            submitted_at: None,
            student_name: "Sari".into(),
            student_number: "2210511".into(),
            company_name: "PT A".into(),
            position: "Backend Intern".into(),
            supervisor_name: "Rina".into(),
            supervisor_email: "rina@a.test".into(),
        }
    }

    #[test]
    fn missing_and_blank_answers_show_the_fallback() {
        let pairs = pair_answers(&detail(&[("0", "Sangat baik"), ("1", "  ")]), "Belum dijawab");
        let answers: Vec<&str> = pairs.iter().map(|p| p.answer.as_str()).collect();
        assert_eq!(answers, ["Sangat baik", "Belum dijawab", "Belum dijawab"]);
        assert_eq!(pairs[2].question, "Inisiatif");
    }

    fn keys_only() -> I18n {
        let localizer = crate::i18n::Localizer::new(crate::i18n::FluentLoader::new("unused"));
        I18n::new(std::sync::Arc::new(localizer), crate::i18n::SupportedLanguage::default())
    }

    #[test]
    fn template_form_rejects_reversed_window() {
        let form = TemplateForm {
            name: "UTS".into(),
            kind: "uts".into(),
            questions: "Satu\nDua".into(),
            window_start: "2026-05-10T08:00".into(),
            window_end: "2026-05-01T08:00".into(),
            ..Default::default()
        };
        assert_eq!(form.parse(&keys_only()).unwrap_err(), "error-period-order");
    }

    #[test]
    fn template_form_collects_questions_and_checkboxes() {
        let form = TemplateForm {
            name: " Evaluasi Akhir ".into(),
            kind: "UAS".into(),
            questions: "Kedisiplinan\n\n  Kerja sama \n".into(),
            is_active: Some("on".into()),
            ..Default::default()
        };
        let input = form.parse(&keys_only()).unwrap();
        assert_eq!(input.name, "Evaluasi Akhir");
        assert_eq!(input.kind, EvaluationKind::Uas);
        assert_eq!(input.questions, ["Kedisiplinan", "Kerja sama"]);
        assert!(input.is_active);
        assert!(!input.auto_distribute);
        assert!(input.window_start.is_none());
    }

    #[test]
    fn template_form_needs_a_question() {
        let form = TemplateForm {
            name: "UTS".into(),
            kind: "uts".into(),
            ..Default::default()
        };
        assert!(form.parse(&keys_only()).is_err());
    }
}
