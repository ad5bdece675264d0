use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use unic_langid::{langid, LanguageIdentifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SupportedLanguage {
    #[default]
    #[serde(rename = "id")]
    Indonesian,
    #[serde(rename = "en")]
    English,
}

impl SupportedLanguage {
    /// Get all supported languages
    pub fn all() -> &'static [SupportedLanguage] {
        &[SupportedLanguage::Indonesian, SupportedLanguage::English]
    }

    /// Get the language code as a string
    pub fn code(&self) -> &'static str {
        match self {
            SupportedLanguage::Indonesian => "id",
            SupportedLanguage::English => "en",
        }
    }

    /// Get the language identifier for Fluent
    pub fn lang_id(&self) -> LanguageIdentifier {
        match self {
            SupportedLanguage::Indonesian => langid!("id"),
            SupportedLanguage::English => langid!("en-US"),
        }
    }

    /// Get the human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            SupportedLanguage::Indonesian => "Bahasa Indonesia",
            SupportedLanguage::English => "English",
        }
    }

    /// Parse from Accept-Language header
    pub fn from_accept_language(accept_language: &str) -> Self {
        for lang_part in accept_language.split(',') {
            let lang = lang_part.trim().split(';').next().unwrap_or("");
            let lang = lang.to_lowercase();

            if lang.starts_with("id") || lang.starts_with("in") {
                return SupportedLanguage::Indonesian;
            } else if lang.starts_with("en") {
                return SupportedLanguage::English;
            }
        }

        Self::default()
    }
}

impl Display for SupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for SupportedLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "id" | "id-id" | "indonesian" | "bahasa" => Ok(SupportedLanguage::Indonesian),
            "en" | "english" | "en-us" | "en-gb" => Ok(SupportedLanguage::English),
            _ => Err(format!("Unsupported language: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("id-ID,id;q=0.9,en;q=0.8", SupportedLanguage::Indonesian)]
    #[case("en-US,en;q=0.9", SupportedLanguage::English)]
    #[case("fr-FR, en;q=0.5", SupportedLanguage::English)]
    #[case("de-DE", SupportedLanguage::Indonesian)]
    #[case("", SupportedLanguage::Indonesian)]
    fn accept_language_negotiation(#[case] header: &str, #[case] expected: SupportedLanguage) {
        assert_eq!(SupportedLanguage::from_accept_language(header), expected);
    }

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!("EN".parse::<SupportedLanguage>(), Ok(SupportedLanguage::English));
        assert_eq!("id".parse::<SupportedLanguage>(), Ok(SupportedLanguage::Indonesian));
        assert!("tr".parse::<SupportedLanguage>().is_err());
    }
}
