use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "job_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Internship,
    FullTime,
    PartTime,
    Contract,
}

impl JobType {
    pub fn parse(value: &str) -> Option<Self> {
        Self::all().into_iter().find(|t| t.as_str() == value.trim())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Internship => "internship",
            JobType::FullTime => "full_time",
            JobType::PartTime => "part_time",
            JobType::Contract => "contract",
        }
    }

    pub fn all() -> [JobType; 4] {
        [
            JobType::Internship,
            JobType::FullTime,
            JobType::PartTime,
            JobType::Contract,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "job_application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobApplicationStatus {
    Applied,
    Reviewed,
    Interview,
    Accepted,
    Rejected,
}

impl JobApplicationStatus {
    pub fn parse(value: &str) -> Option<Self> {
        Self::all().into_iter().find(|t| t.as_str() == value.trim())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobApplicationStatus::Applied => "applied",
            JobApplicationStatus::Reviewed => "reviewed",
            JobApplicationStatus::Interview => "interview",
            JobApplicationStatus::Accepted => "accepted",
            JobApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn all() -> [JobApplicationStatus; 5] {
        [
            JobApplicationStatus::Applied,
            JobApplicationStatus::Reviewed,
            JobApplicationStatus::Interview,
            JobApplicationStatus::Accepted,
            JobApplicationStatus::Rejected,
        ]
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    pub company_name: String,
    pub company_logo_url: Option<String>,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub job_type: JobType,
    pub salary_range: String,
    pub application_deadline: Date,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub posted_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl JobPosting {
    /// Applications close at the end of the deadline day.
    pub fn is_expired(&self, today: Date) -> bool {
        self.application_deadline < today
    }

    pub fn is_open(&self, today: Date) -> bool {
        self.is_active && !self.is_expired(today)
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub student_id: Uuid,
    pub cv_url: String,
    pub cover_letter: String,
    pub status: JobApplicationStatus,
    pub notes: String,
    pub applied_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Validate)]
pub struct JobPostingInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    pub company_logo_url: Option<String>,
    #[validate(length(min = 1))]
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub job_type: JobType,
    pub salary_range: String,
    pub application_deadline: Date,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn posting_closes_after_deadline_day() {
        let now = OffsetDateTime::now_utc();
        let posting = JobPosting {
            id: Uuid::new_v4(),
            title: "Data intern".into(),
            company_name: "PT Data".into(),
            company_logo_url: None,
            description: "Cleaning data".into(),
            requirements: String::new(),
            location: "Jakarta".into(),
            job_type: JobType::Internship,
            salary_range: String::new(),
            application_deadline: date!(2026 - 06 - 30),
            is_active: true,
            created_by: None,
            posted_at: now,
            updated_at: now,
        };
        assert!(posting.is_open(date!(2026 - 06 - 30)));
        assert!(posting.is_expired(date!(2026 - 07 - 01)));
        assert!(!posting.is_open(date!(2026 - 07 - 01)));
    }
}
