use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime};
use validator::Validate;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DeadlinePolicy {
    pub id: Uuid,
    pub deadline_date: Date,
    pub reminder_frequency_days: i32,
    pub description: String,
    /// Stored for admins; no dispatcher reads it.
    pub email_reminder_enabled: bool,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl DeadlinePolicy {
    /// Negative once the deadline has passed.
    pub fn days_until(&self, today: Date) -> i64 {
        (self.deadline_date - today).whole_days()
    }

    pub fn is_overdue(&self, today: Date) -> bool {
        today > self.deadline_date
    }
}

#[derive(Debug, Clone, Validate)]
pub struct DeadlinePolicyInput {
    pub deadline_date: Date,
    #[validate(range(min = 1, max = 365))]
    pub reminder_frequency_days: i32,
    #[validate(length(max = 2000))]
    pub description: String,
    pub email_reminder_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn policy(deadline: Date) -> DeadlinePolicy {
        let now = OffsetDateTime::now_utc();
        DeadlinePolicy {
            id: Uuid::new_v4(),
            deadline_date: deadline,
            reminder_frequency_days: 7,
            description: String::new(),
            email_reminder_enabled: true,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn deadline_day_itself_is_not_overdue() {
        let p = policy(date!(2026 - 04 - 30));
        assert!(!p.is_overdue(date!(2026 - 04 - 30)));
        assert!(p.is_overdue(date!(2026 - 05 - 01)));
        assert_eq!(p.days_until(date!(2026 - 04 - 20)), 10);
        assert_eq!(p.days_until(date!(2026 - 05 - 03)), -3);
    }

    #[test]
    fn reminder_frequency_must_be_positive() {
        let input = DeadlinePolicyInput {
            deadline_date: date!(2026 - 04 - 30),
            reminder_frequency_days: 0,
            description: String::new(),
            email_reminder_enabled: false,
        };
        assert!(input.validate().is_err());
    }
}
