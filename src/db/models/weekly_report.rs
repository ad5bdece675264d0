use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, Duration, OffsetDateTime};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Searching,
    Applied,
    InterviewScheduled,
    WaitingResponse,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn parse(value: &str) -> Option<Self> {
        Self::all().into_iter().find(|s| s.as_str() == value.trim())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Searching => "searching",
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::InterviewScheduled => "interview_scheduled",
            ApplicationStatus::WaitingResponse => "waiting_response",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn all() -> [ApplicationStatus; 6] {
        [
            ApplicationStatus::Searching,
            ApplicationStatus::Applied,
            ApplicationStatus::InterviewScheduled,
            ApplicationStatus::WaitingResponse,
            ApplicationStatus::Accepted,
            ApplicationStatus::Rejected,
        ]
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub id: Uuid,
    pub student_id: Uuid,
    pub week_number: i32,
    pub week_start: Date,
    pub week_end: Date,
    pub main_activities: String,
    pub target_achievement: String,
    pub companies_applied: String,
    pub interview_status: String,
    pub challenges_faced: String,
    pub help_needed: String,
    pub next_week_plan: String,
    pub progress_percentage: i16,
    pub application_status: ApplicationStatus,
    pub is_late: bool,
    pub submitted_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A Monday-aligned seven-day reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
    pub start: Date,
    pub end: Date,
    /// Whole weeks from the deadline to this window's Monday, plus one.
    pub number: i32,
}

impl WeekWindow {
    pub fn containing(day: Date, deadline: Date) -> Self {
        let offset = i64::from(day.weekday().number_days_from_monday());
        let start = day - Duration::days(offset);
        let end = start + Duration::days(6);
        let number = (start - deadline).whole_days().div_euclid(7) + 1;
        WeekWindow {
            start,
            end,
            number: number as i32,
        }
    }

    pub fn is_late(&self, submitted_on: Date) -> bool {
        submitted_on > self.end
    }

    pub fn contains(&self, day: Date) -> bool {
        day >= self.start && day <= self.end
    }
}

#[derive(Debug, Clone, Validate)]
pub struct WeeklyReportInput {
    #[validate(length(min = 1, max = 5000))]
    pub main_activities: String,
    pub target_achievement: String,
    pub companies_applied: String,
    pub interview_status: String,
    pub challenges_faced: String,
    pub help_needed: String,
    pub next_week_plan: String,
    #[validate(range(min = 0, max = 100))]
    pub progress_percentage: i16,
    pub application_status: ApplicationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::date;

    #[test]
    fn window_is_monday_aligned() {
        // 2026-03-12 is a Thursday.
        let w = WeekWindow::containing(date!(2026 - 03 - 12), date!(2026 - 03 - 01));
        assert_eq!(w.start, date!(2026 - 03 - 09));
        assert_eq!(w.end, date!(2026 - 03 - 15));
    }

    #[test]
    fn monday_is_its_own_week_start() {
        let w = WeekWindow::containing(date!(2026 - 03 - 09), date!(2026 - 03 - 01));
        assert_eq!(w.start, date!(2026 - 03 - 09));
    }

    #[rstest]
    // 2026-03-01 is a Sunday, so its Monday lies before the deadline and floors to week 0.
    #[case(date!(2026 - 03 - 01), date!(2026 - 03 - 01), 0)]
    #[case(date!(2026 - 03 - 02), date!(2026 - 03 - 01), 1)]
    #[case(date!(2026 - 03 - 11), date!(2026 - 03 - 01), 2)]
    #[case(date!(2026 - 03 - 04), date!(2026 - 03 - 02), 1)]
    #[case(date!(2026 - 03 - 16), date!(2026 - 03 - 02), 3)]
    fn week_numbers_count_from_deadline(
        #[case] day: Date,
        #[case] deadline: Date,
        #[case] expected: i32,
    ) {
        assert_eq!(WeekWindow::containing(day, deadline).number, expected);
    }

    #[test]
    fn submission_after_week_end_is_late() {
        let w = WeekWindow::containing(date!(2026 - 03 - 10), date!(2026 - 03 - 01));
        assert!(w.is_late(date!(2026 - 03 - 16)));
        assert!(!w.is_late(date!(2026 - 03 - 15)));
        assert!(!w.is_late(date!(2026 - 03 - 09)));
    }

    #[test]
    fn application_status_round_trips_through_form_value() {
        for status in ApplicationStatus::all() {
            assert_eq!(ApplicationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApplicationStatus::parse("hired"), None);
    }

    #[test]
    fn progress_is_bounded() {
        let input = WeeklyReportInput {
            main_activities: "Applied to three companies".into(),
            target_achievement: String::new(),
            companies_applied: String::new(),
            interview_status: String::new(),
            challenges_faced: String::new(),
            help_needed: String::new(),
            next_week_plan: String::new(),
            progress_percentage: 101,
            application_status: ApplicationStatus::Applied,
        };
        assert!(input.validate().is_err());
    }
}
