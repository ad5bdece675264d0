use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Supervisor,
    Admin,
    DepartmentHead,
}

impl UserRole {
    /// Landing page for a freshly authenticated user of this role.
    pub fn dashboard_path(self) -> &'static str {
        match self {
            UserRole::Student => "/student",
            UserRole::Supervisor => "/supervisor",
            UserRole::Admin => "/admin",
            UserRole::DepartmentHead => "/kaprodi",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Supervisor => "supervisor",
            UserRole::Admin => "admin",
            UserRole::DepartmentHead => "department_head",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub full_name: String,
    pub role: UserRole,
    pub must_change_password: bool,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub last_login_at: Option<OffsetDateTime>,
}

impl User {
    /// An account without a stored hash can only be entered through a reset link.
    pub fn has_usable_password(&self) -> bool {
        self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
    }
}

#[derive(Debug, Clone, Validate)]
pub struct NewUser {
    #[validate(email)]
    pub email: String,
    pub password_hash: Option<String>,
    #[validate(length(min = 1))]
    pub full_name: String,
    pub role: UserRole,
    pub must_change_password: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_lands_on_its_own_dashboard() {
        assert_eq!(UserRole::Student.dashboard_path(), "/student");
        assert_eq!(UserRole::Supervisor.dashboard_path(), "/supervisor");
        assert_eq!(UserRole::Admin.dashboard_path(), "/admin");
        assert_eq!(UserRole::DepartmentHead.dashboard_path(), "/kaprodi");
    }

    #[test]
    fn provisioned_account_has_no_usable_password() {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: "mentor@company.test".into(),
            password_hash: None,
            full_name: "Mentor".into(),
            role: UserRole::Supervisor,
            must_change_password: true,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        assert!(!user.has_usable_password());
    }
}
