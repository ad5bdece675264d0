use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, Month, OffsetDateTime};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "progress_report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProgressReportStatus {
    Draft,
    Submitted,
    Reviewed,
}

impl ProgressReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressReportStatus::Draft => "draft",
            ProgressReportStatus::Submitted => "submitted",
            ProgressReportStatus::Reviewed => "reviewed",
        }
    }

    /// Reviewed reports are frozen for the student.
    pub fn is_editable(self) -> bool {
        self != ProgressReportStatus::Reviewed
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ProgressReport {
    pub id: Uuid,
    pub confirmation_id: Uuid,
    /// Always the first day of the reported month.
    pub month: Date,
    pub company_profile: String,
    pub job_description: String,
    pub work_environment: String,
    pub useful_coursework: String,
    pub learning_gaps: String,
    pub status: ProgressReportStatus,
    pub submitted_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Validate)]
pub struct ProgressReportInput {
    pub month: Date,
    #[validate(length(max = 5000))]
    pub company_profile: String,
    #[validate(length(max = 5000))]
    pub job_description: String,
    #[validate(length(max = 5000))]
    pub work_environment: String,
    #[validate(length(max = 5000))]
    pub useful_coursework: String,
    #[validate(length(max = 5000))]
    pub learning_gaps: String,
    pub status: ProgressReportStatus,
}

pub fn first_of_month(date: Date) -> Date {
    date.replace_day(1).unwrap_or(date)
}

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_month(value: &str) -> Option<Date> {
    let (year, month) = value.trim().split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u8 = month.parse().ok()?;
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, 1).ok()
}

pub fn month_key(month: Date) -> String {
    format!("{:04}-{:02}", month.year(), u8::from(month.month()))
}

/// The current month followed by the `count - 1` months before it.
pub fn recent_months(today: Date, count: usize) -> Vec<Date> {
    let mut months = Vec::with_capacity(count);
    let mut cursor = first_of_month(today);
    for _ in 0..count {
        months.push(cursor);
        let Some(prev) = cursor.previous_day() else {
            break;
        };
        cursor = first_of_month(prev);
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn month_is_normalized_to_first_day() {
        assert_eq!(first_of_month(date!(2026 - 05 - 19)), date!(2026 - 05 - 01));
    }

    #[test]
    fn parses_month_keys() {
        assert_eq!(parse_month("2026-03"), Some(date!(2026 - 03 - 01)));
        assert_eq!(parse_month("2026-13"), None);
        assert_eq!(parse_month("march"), None);
        assert_eq!(month_key(date!(2026 - 03 - 01)), "2026-03");
    }

    #[test]
    fn recent_months_cross_year_boundary() {
        let months = recent_months(date!(2026 - 02 - 14), 6);
        assert_eq!(
            months,
            vec![
                date!(2026 - 02 - 01),
                date!(2026 - 01 - 01),
                date!(2025 - 12 - 01),
                date!(2025 - 11 - 01),
                date!(2025 - 10 - 01),
                date!(2025 - 09 - 01),
            ]
        );
    }

    #[test]
    fn reviewed_report_is_locked() {
        assert!(ProgressReportStatus::Draft.is_editable());
        assert!(ProgressReportStatus::Submitted.is_editable());
        assert!(!ProgressReportStatus::Reviewed.is_editable());
    }
}
