use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "certificate_grade", rename_all = "snake_case")]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Grade::A),
            "B" => Some(Grade::B),
            "C" => Some(Grade::C),
            "D" => Some(Grade::D),
            _ => None,
        }
    }

    pub fn letter(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Grade::A => "Sangat Baik",
            Grade::B => "Baik",
            Grade::C => "Cukup",
            Grade::D => "Kurang",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "certificate_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Draft,
    Issued,
    Revoked,
}

impl CertificateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CertificateStatus::Draft => "draft",
            CertificateStatus::Issued => "issued",
            CertificateStatus::Revoked => "revoked",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Certificate {
    pub id: Uuid,
    pub confirmation_id: Uuid,
    pub number: String,
    pub grade: Grade,
    pub status: CertificateStatus,
    pub graduation_date: Date,
    pub issued_by: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// `COOP/<year>/<seq:04>/UTS`. `issued_this_year` is the count before this one.
pub fn certificate_number(year: i32, issued_this_year: i64) -> String {
    format!("COOP/{}/{:04}/UTS", year, issued_this_year + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_sequential_from_one() {
        let numbers: Vec<String> = (0..3).map(|n| certificate_number(2026, n)).collect();
        assert_eq!(
            numbers,
            vec![
                "COOP/2026/0001/UTS".to_string(),
                "COOP/2026/0002/UTS".to_string(),
                "COOP/2026/0003/UTS".to_string(),
            ]
        );
    }

    #[test]
    fn sequence_widens_past_four_digits() {
        assert_eq!(certificate_number(2026, 10_000), "COOP/2026/10001/UTS");
    }

    #[test]
    fn grade_parsing_is_case_insensitive() {
        assert_eq!(Grade::parse("b"), Some(Grade::B));
        assert_eq!(Grade::parse(" D "), Some(Grade::D));
        assert_eq!(Grade::parse("E"), None);
    }
}
