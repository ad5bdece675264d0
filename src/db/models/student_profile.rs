use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "gender", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Accepts the short form used on the registration form (`L`/`P`) as well as the full name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "l" | "m" | "male" => Some(Gender::Male),
            "p" | "f" | "female" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct StudentProfile {
    pub user_id: Uuid,
    pub full_name: String,
    pub student_number: String,
    pub study_program: String,
    pub cohort_year: i32,
    pub gender: Gender,
    pub phone: String,
    pub consultation_url: Option<String>,
    pub sptjm_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub cv_url: Option<String>,
    pub has_internship: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl StudentProfile {
    /// 25% per uploaded document out of cv, portfolio, consultation and sptjm.
    pub fn completion_percentage(&self) -> u8 {
        let documents = [
            &self.cv_url,
            &self.portfolio_url,
            &self.consultation_url,
            &self.sptjm_url,
        ];
        let present = documents
            .iter()
            .filter(|url| url.as_deref().is_some_and(|u| !u.trim().is_empty()))
            .count();
        (present * 25) as u8
    }
}

#[derive(Debug, Clone, Validate)]
pub struct NewStudentProfile {
    pub user_id: Uuid,
    #[validate(length(min = 1))]
    pub full_name: String,
    #[validate(length(min = 1, max = 32))]
    pub student_number: String,
    #[validate(length(min = 1))]
    pub study_program: String,
    #[validate(range(min = 1990, max = 2100))]
    pub cohort_year: i32,
    pub gender: Gender,
    pub phone: String,
}

/// Document slots a student can upload from the profile page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileDocument {
    Cv,
    Portfolio,
    Consultation,
    Sptjm,
}

impl ProfileDocument {
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "cv" => Some(ProfileDocument::Cv),
            "portfolio" => Some(ProfileDocument::Portfolio),
            "consultation" => Some(ProfileDocument::Consultation),
            "sptjm" => Some(ProfileDocument::Sptjm),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            ProfileDocument::Cv => "cv_url",
            ProfileDocument::Portfolio => "portfolio_url",
            ProfileDocument::Consultation => "consultation_url",
            ProfileDocument::Sptjm => "sptjm_url",
        }
    }

    pub fn folder(self) -> &'static str {
        match self {
            ProfileDocument::Cv => "cv",
            ProfileDocument::Portfolio => "portfolio",
            ProfileDocument::Consultation => "consultation",
            ProfileDocument::Sptjm => "sptjm",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn profile() -> StudentProfile {
        let now = OffsetDateTime::now_utc();
        StudentProfile {
            user_id: Uuid::new_v4(),
            full_name: "Sari".into(),
            student_number: "12345".into(),
            study_program: "Informatika".into(),
            cohort_year: 2022,
            gender: Gender::Female,
            phone: String::new(),
            consultation_url: None,
            sptjm_url: None,
            portfolio_url: None,
            cv_url: None,
            has_internship: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn two_of_four_documents_is_half_complete() {
        let mut p = profile();
        p.cv_url = Some("https://files.test/coop/cv/a.pdf".into());
        p.sptjm_url = Some("https://files.test/coop/sptjm/b.pdf".into());
        assert_eq!(p.completion_percentage(), 50);
    }

    #[test]
    fn blank_urls_do_not_count() {
        let mut p = profile();
        p.cv_url = Some("   ".into());
        p.portfolio_url = Some(String::new());
        assert_eq!(p.completion_percentage(), 0);
    }

    #[test]
    fn all_documents_is_complete() {
        let mut p = profile();
        p.cv_url = Some("a".into());
        p.portfolio_url = Some("b".into());
        p.consultation_url = Some("c".into());
        p.sptjm_url = Some("d".into());
        assert_eq!(p.completion_percentage(), 100);
    }

    #[rstest]
    #[case("L", Some(Gender::Male))]
    #[case("p", Some(Gender::Female))]
    #[case("female", Some(Gender::Female))]
    #[case("x", None)]
    fn parses_gender(#[case] input: &str, #[case] expected: Option<Gender>) {
        assert_eq!(Gender::parse(input), expected);
    }
}
