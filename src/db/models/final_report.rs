use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "final_report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FinalReportStatus {
    Draft,
    Submitted,
    Approved,
}

impl FinalReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FinalReportStatus::Draft => "draft",
            FinalReportStatus::Submitted => "submitted",
            FinalReportStatus::Approved => "approved",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct FinalReport {
    pub id: Uuid,
    pub confirmation_id: Uuid,
    pub activity_summary: String,
    pub achievements: String,
    pub obstacles_and_solutions: String,
    pub suggestions_for_company: String,
    pub suggestions_for_campus: String,
    pub file_url: Option<String>,
    pub status: FinalReportStatus,
    pub submitted_at: Option<OffsetDateTime>,
    pub approved_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Validate)]
pub struct FinalReportInput {
    #[validate(length(max = 10000))]
    pub activity_summary: String,
    #[validate(length(max = 10000))]
    pub achievements: String,
    #[validate(length(max = 10000))]
    pub obstacles_and_solutions: String,
    #[validate(length(max = 5000))]
    pub suggestions_for_company: String,
    #[validate(length(max = 5000))]
    pub suggestions_for_campus: String,
    pub file_url: Option<String>,
    pub status: FinalReportStatus,
}
