use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SupervisorProfile {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub business_field: String,
    pub created_automatically: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl SupervisorProfile {
    /// Confirmations are linked to supervisors by the address the student typed,
    /// compared byte for byte.
    pub fn supervises(&self, supervisor_email: &str) -> bool {
        self.email == supervisor_email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_match_is_exact() {
        let now = OffsetDateTime::now_utc();
        let profile = SupervisorProfile {
            user_id: Uuid::new_v4(),
            full_name: "Budi".into(),
            email: "budi@company.test".into(),
            phone: String::new(),
            company: String::new(),
            business_field: String::new(),
            created_automatically: true,
            created_at: now,
            updated_at: now,
        };
        assert!(profile.supervises("budi@company.test"));
        assert!(!profile.supervises("Budi@company.test"));
        assert!(!profile.supervises("budi@company.test "));
    }
}
