use anyhow::{anyhow, Result};
use fluent_bundle::{FluentArgs, FluentValue};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::i18n::fluent_loader::FluentLoader;
use crate::i18n::language::SupportedLanguage;

/// A localized string that can be converted to different formats
#[derive(Debug, Clone, Serialize)]
pub struct LocalizedString {
    value: String,
    language: SupportedLanguage,
}

impl LocalizedString {
    pub fn new(value: String, language: SupportedLanguage) -> Self {
        Self { value, language }
    }

    pub fn into_string(self) -> String {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn language(&self) -> SupportedLanguage {
        self.language
    }
}

impl fmt::Display for LocalizedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<LocalizedString> for String {
    fn from(ls: LocalizedString) -> Self {
        ls.value
    }
}

/// Main localization interface
pub struct Localizer {
    loader: FluentLoader,
    default_language: SupportedLanguage,
}

impl Localizer {
    pub fn new(loader: FluentLoader) -> Self {
        Self {
            loader,
            default_language: SupportedLanguage::default(),
        }
    }

    /// Get a localized message for a specific language, falling back to the default bundle
    pub fn get_message_with_language(
        &self,
        language: &SupportedLanguage,
        key: &str,
        args: Option<&HashMap<String, FluentValue>>,
    ) -> Result<LocalizedString> {
        let bundle = self
            .loader
            .get_bundle(language)
            .filter(|b| b.has_message(key))
            .or_else(|| self.loader.get_bundle(&self.default_language))
            .ok_or_else(|| anyhow!("No bundle available for language: {}", language))?;

        let message = bundle
            .get_message(key)
            .ok_or_else(|| anyhow!("Message not found: {}", key))?;

        let pattern = message
            .value()
            .ok_or_else(|| anyhow!("Message has no value: {}", key))?;

        let mut errors = Vec::new();
        let formatted = if let Some(args) = args {
            let mut fluent_args = FluentArgs::new();
            for (k, v) in args {
                fluent_args.set(k.as_str(), v.clone());
            }
            bundle.format_pattern(pattern, Some(&fluent_args), &mut errors)
        } else {
            bundle.format_pattern(pattern, None, &mut errors)
        };

        if !errors.is_empty() {
            tracing::warn!("Fluent formatting errors for key '{}': {:?}", key, errors);
        }

        Ok(LocalizedString::new(formatted.into_owned(), *language))
    }

    /// Get a message for a specific language, or the key itself when missing
    pub fn get_string_for_language(&self, language: &SupportedLanguage, key: &str) -> String {
        self.get_message_with_language(language, key, None)
            .unwrap_or_else(|_| LocalizedString::new(key.to_string(), *language))
            .into_string()
    }

    /// Same as `get_string_for_language`, with Fluent arguments
    pub fn get_string_with_args(
        &self,
        language: &SupportedLanguage,
        key: &str,
        args: &HashMap<String, FluentValue>,
    ) -> String {
        self.get_message_with_language(language, key, Some(args))
            .unwrap_or_else(|_| LocalizedString::new(key.to_string(), *language))
            .into_string()
    }

    /// Check if a message exists for a language
    pub fn has_message(&self, language: &SupportedLanguage, key: &str) -> bool {
        self.loader
            .get_bundle(language)
            .map(|bundle| bundle.has_message(key))
            .unwrap_or(false)
    }

    pub fn default_language(&self) -> SupportedLanguage {
        self.default_language
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::init_i18n;
    use crate::i18n_args;

    #[tokio::test]
    async fn formats_arguments_in_each_language() {
        let localizer = init_i18n("locales").await.unwrap();
        let args = i18n_args! { "name" => "Sari" };

        let id = localizer.get_string_with_args(&SupportedLanguage::Indonesian, "welcome", &args);
        let en = localizer.get_string_with_args(&SupportedLanguage::English, "welcome", &args);
        assert!(id.contains("Sari"));
        assert!(en.contains("Sari"));
        assert_ne!(id, en);
    }

    #[tokio::test]
    async fn unknown_key_falls_back_to_itself() {
        let localizer = init_i18n("locales").await.unwrap();
        assert_eq!(
            localizer.get_string_for_language(&SupportedLanguage::English, "no-such-key"),
            "no-such-key"
        );
    }
}
