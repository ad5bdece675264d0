use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::types::{Json, Uuid};
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "evaluation_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EvaluationKind {
    /// Mid-program evaluation.
    Uts,
    /// End-of-program evaluation.
    Uas,
}

impl EvaluationKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "uts" => Some(EvaluationKind::Uts),
            "uas" => Some(EvaluationKind::Uas),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EvaluationKind::Uts => "UTS",
            EvaluationKind::Uas => "UAS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "evaluation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Pending,
    Completed,
    Finished,
}

impl EvaluationStatus {
    /// Completed and finished records both count as answered.
    pub fn is_answered(self) -> bool {
        matches!(self, EvaluationStatus::Completed | EvaluationStatus::Finished)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EvaluationStatus::Pending => "pending",
            EvaluationStatus::Completed => "completed",
            EvaluationStatus::Finished => "finished",
        }
    }
}

/// Relation of "now" to a template's fill window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    NoPeriod,
    NotStarted,
    Active,
    Ended,
}

impl PeriodStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodStatus::NoPeriod => "no_period",
            PeriodStatus::NotStarted => "not_started",
            PeriodStatus::Active => "active",
            PeriodStatus::Ended => "ended",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct EvaluationTemplate {
    pub id: Uuid,
    pub name: String,
    pub kind: EvaluationKind,
    pub questions: Json<Vec<String>>,
    pub is_active: bool,
    pub window_start: Option<OffsetDateTime>,
    pub window_end: Option<OffsetDateTime>,
    /// Stored and shown to admins; nothing distributes on its behalf.
    pub auto_distribute: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl EvaluationTemplate {
    /// A window only applies when both bounds are set.
    pub fn period_status(&self, now: OffsetDateTime) -> PeriodStatus {
        match (self.window_start, self.window_end) {
            (Some(start), Some(end)) => {
                if now < start {
                    PeriodStatus::NotStarted
                } else if now > end {
                    PeriodStatus::Ended
                } else {
                    PeriodStatus::Active
                }
            }
            _ => PeriodStatus::NoPeriod,
        }
    }

    pub fn is_period_active(&self, now: OffsetDateTime) -> bool {
        matches!(
            self.period_status(now),
            PeriodStatus::NoPeriod | PeriodStatus::Active
        )
    }

    pub fn can_be_filled(&self, now: OffsetDateTime) -> bool {
        self.is_active && self.is_period_active(now)
    }

    pub fn question_list(&self) -> &[String] {
        &self.questions.0
    }
}

/// Splits a textarea of one question per line, dropping blank lines.
pub fn parse_questions(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: Uuid,
    pub confirmation_id: Uuid,
    pub template_id: Uuid,
    /// Answers keyed by the question index rendered as a decimal string.
    pub answers: Json<BTreeMap<String, String>>,
    pub status: EvaluationStatus,
    pub submitted_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl EvaluationRecord {
    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers
            .0
            .get(&index.to_string())
            .map(String::as_str)
            .filter(|a| !a.trim().is_empty())
    }

    /// Question/answer pairs in question order; unanswered entries carry `fallback`.
    pub fn paired_answers(&self, questions: &[String], fallback: &str) -> Vec<(String, String)> {
        questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let answer = self.answer(i).unwrap_or(fallback);
                (q.clone(), answer.to_string())
            })
            .collect()
    }
}

/// Builds the answer map from submitted form fields named `answer_<index>`.
pub fn collect_answers<'a, I>(fields: I, question_count: usize) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut answers = BTreeMap::new();
    for (name, value) in fields {
        let Some(index) = name.strip_prefix("answer_") else {
            continue;
        };
        let Ok(index) = index.parse::<usize>() else {
            continue;
        };
        if index < question_count {
            answers.insert(index.to_string(), value.trim().to_string());
        }
    }
    answers
}

/// One placement as seen from a template's tracking page; `record_status` is
/// `None` when no record was created yet.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EvaluationTrackingRow {
    pub confirmation_id: Uuid,
    pub student_name: String,
    pub student_number: String,
    pub company_name: String,
    pub supervisor_name: String,
    pub supervisor_email: String,
    pub record_status: Option<EvaluationStatus>,
    pub submitted_at: Option<OffsetDateTime>,
}

impl EvaluationTrackingRow {
    pub fn status_label(&self) -> &'static str {
        self.record_status.map(EvaluationStatus::as_str).unwrap_or("not_created")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TrackingSummary {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Whole percent, rounded down.
    pub completion_rate: usize,
}

impl TrackingSummary {
    pub fn from_rows(rows: &[EvaluationTrackingRow]) -> Self {
        let total = rows.len();
        let completed = rows
            .iter()
            .filter(|r| r.record_status.is_some_and(EvaluationStatus::is_answered))
            .count();
        let completion_rate = if total == 0 { 0 } else { completed * 100 / total };
        TrackingSummary {
            total,
            completed,
            pending: total - completed,
            completion_rate,
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct NewEvaluationTemplate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub kind: EvaluationKind,
    #[validate(length(min = 1))]
    pub questions: Vec<String>,
    pub is_active: bool,
    pub window_start: Option<OffsetDateTime>,
    pub window_end: Option<OffsetDateTime>,
    pub auto_distribute: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn template(
        is_active: bool,
        window_start: Option<OffsetDateTime>,
        window_end: Option<OffsetDateTime>,
    ) -> EvaluationTemplate {
        let now = OffsetDateTime::now_utc();
        EvaluationTemplate {
            id: Uuid::new_v4(),
            name: "Mid evaluation".into(),
            kind: EvaluationKind::Uts,
            questions: Json(vec!["Discipline?".into(), "Teamwork?".into()]),
            is_active,
            window_start,
            window_end,
            auto_distribute: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn active_template_without_window_can_be_filled() {
        let t = template(true, None, None);
        assert_eq!(t.period_status(OffsetDateTime::now_utc()), PeriodStatus::NoPeriod);
        assert!(t.can_be_filled(OffsetDateTime::now_utc()));
    }

    #[test]
    fn inactive_template_is_closed_regardless_of_window() {
        let now = datetime!(2026-03-10 12:00 UTC);
        assert!(!template(false, None, None).can_be_filled(now));
        let open = template(
            false,
            Some(datetime!(2026-03-01 00:00 UTC)),
            Some(datetime!(2026-03-31 00:00 UTC)),
        );
        assert!(!open.can_be_filled(now));
    }

    #[test]
    fn half_open_window_counts_as_no_period() {
        let t = template(true, Some(datetime!(2030-01-01 00:00 UTC)), None);
        assert_eq!(t.period_status(datetime!(2026-01-01 00:00 UTC)), PeriodStatus::NoPeriod);
        assert!(t.can_be_filled(datetime!(2026-01-01 00:00 UTC)));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let start = datetime!(2026-03-01 08:00 UTC);
        let end = datetime!(2026-03-15 17:00 UTC);
        let t = template(true, Some(start), Some(end));

        assert_eq!(t.period_status(start), PeriodStatus::Active);
        assert_eq!(t.period_status(end), PeriodStatus::Active);
        assert_eq!(
            t.period_status(datetime!(2026-03-01 07:59 UTC)),
            PeriodStatus::NotStarted
        );
        assert_eq!(
            t.period_status(datetime!(2026-03-15 17:01 UTC)),
            PeriodStatus::Ended
        );
        assert!(!t.can_be_filled(datetime!(2026-03-16 00:00 UTC)));
    }

    #[test]
    fn questions_are_one_per_line() {
        let parsed = parse_questions("  First?\n\n Second? \r\n");
        assert_eq!(parsed, vec!["First?".to_string(), "Second?".to_string()]);
    }

    #[test]
    fn answers_are_keyed_by_index_and_bounded() {
        let fields = vec![
            ("answer_0", " good "),
            ("answer_1", "fine"),
            ("answer_7", "out of range"),
            ("csrf", "ignored"),
            ("answer_x", "ignored"),
        ];
        let answers = collect_answers(fields, 2);
        assert_eq!(answers.len(), 2);
        assert_eq!(answers.get("0").map(String::as_str), Some("good"));
        assert_eq!(answers.get("1").map(String::as_str), Some("fine"));
    }

    #[test]
    fn missing_answers_use_fallback() {
        let now = OffsetDateTime::now_utc();
        let mut answers = BTreeMap::new();
        answers.insert("1".to_string(), "Always on time".to_string());
        let record = EvaluationRecord {
            id: Uuid::new_v4(),
            confirmation_id: Uuid::new_v4(),
            template_id: Uuid::new_v4(),
            answers: Json(answers),
            status: EvaluationStatus::Completed,
            submitted_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        let questions = vec!["Teamwork?".to_string(), "Punctuality?".to_string()];
        let pairs = record.paired_answers(&questions, "Not answered");
        assert_eq!(pairs[0].1, "Not answered");
        assert_eq!(pairs[1].1, "Always on time");
    }

    #[test]
    fn tracking_counts_missing_records_as_pending() {
        let row = |status: Option<EvaluationStatus>| EvaluationTrackingRow {
            confirmation_id: Uuid::new_v4(),
            student_name: "S".into(),
            student_number: "1".into(),
            company_name: "C".into(),
            supervisor_name: "M".into(),
            supervisor_email: "m@c.test".into(),
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

    #[test]
    fn empty_tracking_has_zero_rate() {
        assert_eq!(TrackingSummary::from_rows(&[]), TrackingSummary::default());
    }
}
