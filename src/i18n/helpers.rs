use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use fluent_bundle::FluentValue;
use std::collections::HashMap;
use std::sync::Arc;

use crate::app_state::AppState;
use crate::i18n::{Localizer, SupportedLanguage};

/// Extractor for getting localized messages in handlers
#[derive(Clone)]
pub struct I18n {
    pub localizer: Arc<Localizer>,
    pub language: SupportedLanguage,
}

impl I18n {
    pub fn new(localizer: Arc<Localizer>, language: SupportedLanguage) -> Self {
        Self { localizer, language }
    }

    /// Get a localized message
    pub fn get(&self, key: &str) -> String {
        self.localizer.get_string_for_language(&self.language, key)
    }

    /// Get a localized message with arguments
    pub fn get_with_args(&self, key: &str, args: &HashMap<String, FluentValue>) -> String {
        self.localizer.get_string_with_args(&self.language, key, args)
    }

    /// Get the current language
    pub fn language(&self) -> SupportedLanguage {
        self.language
    }
}

impl FromRequestParts<AppState> for I18n {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let language = parts
            .extensions
            .get::<SupportedLanguage>()
            .copied()
            .unwrap_or_default();

        Ok(I18n::new(state.localizer.clone(), language))
    }
}

/// Helper macro for creating FluentValue arguments easily
#[macro_export]
macro_rules! i18n_args {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut args = std::collections::HashMap::new();
        $(
            args.insert($key.to_string(), fluent_bundle::FluentValue::from($value));
        )*
        args
    }};
}
