use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DepartmentHead {
    pub user_id: Uuid,
    pub study_program: String,
    pub created_at: OffsetDateTime,
}
