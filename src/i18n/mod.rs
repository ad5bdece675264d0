pub mod fluent_loader;
pub mod helpers;
pub mod language;
pub mod localizer;

pub use fluent_loader::FluentLoader;
pub use helpers::I18n;
pub use language::SupportedLanguage;
pub use localizer::{LocalizedString, Localizer};

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;

/// Initialize the i18n system with every supported locale
pub async fn init_i18n(root: impl Into<PathBuf>) -> Result<Localizer> {
    let mut loader = FluentLoader::new(root);

    for language in SupportedLanguage::all() {
        loader.load_locale(*language).await?;
    }

    Ok(Localizer::new(loader))
}

/// Extract a dictionary of key-value pairs for client-side usage
pub fn extract_translations_for_client(
    localizer: &Localizer,
    language: SupportedLanguage,
    keys: &[&str],
) -> HashMap<String, String> {
    let mut translations = HashMap::new();

    for key in keys {
        if let Ok(translation) = localizer.get_message_with_language(&language, key, None) {
            translations.insert(key.to_string(), translation.into_string());
        }
    }

    translations
}
