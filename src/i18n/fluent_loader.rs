use anyhow::{Context, Result};
use fluent_bundle::{concurrent::FluentBundle, FluentResource};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::i18n::language::SupportedLanguage;

pub type Bundle = FluentBundle<FluentResource>;

/// Loads and manages Fluent translation resources
pub struct FluentLoader {
    root: PathBuf,
    bundles: HashMap<SupportedLanguage, Bundle>,
}

impl FluentLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            bundles: HashMap::new(),
        }
    }

    /// Load all FTL files for a specific locale
    pub async fn load_locale(&mut self, language: SupportedLanguage) -> Result<()> {
        let locale_dir = self.root.join(language.code());

        if !locale_dir.exists() {
            fs::create_dir_all(&locale_dir)
                .with_context(|| format!("Failed to create locale directory: {:?}", locale_dir))?;
        }

        let mut sources = read_ftl_files(&locale_dir)?;

        // Fall back to the bundled catalogue when the directory is empty
        if sources.is_empty() {
            let file_path = locale_dir.join("common.ftl");
            let default_content = default_catalogue(language);
            fs::write(&file_path, default_content)
                .with_context(|| format!("Failed to create default FTL file: {:?}", file_path))?;
            tracing::info!("Created default FTL file: {:?}", file_path);
            sources.push((file_path, default_content.to_string()));
        }

        let mut bundle = FluentBundle::new_concurrent(vec![language.lang_id()]);
        // Bidi isolation marks would leak into rendered HTML.
        bundle.set_use_isolating(false);

        for (path, content) in &sources {
            let resource = FluentResource::try_new(content.clone()).map_err(|(_, errors)| {
                anyhow::anyhow!("Failed to parse FTL file {:?}: {:?}", path, errors)
            })?;

            bundle.add_resource(resource).map_err(|errors| {
                anyhow::anyhow!("Failed to add resource to bundle: {:?}", errors)
            })?;
        }

        tracing::info!("Loaded {} FTL files for locale {}", sources.len(), language.code());

        self.bundles.insert(language, bundle);
        Ok(())
    }

    /// Get a bundle for a specific language
    pub fn get_bundle(&self, language: &SupportedLanguage) -> Option<&Bundle> {
        self.bundles.get(language)
    }
}

fn read_ftl_files(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read locale directory: {:?}", dir))?;

    let mut sources = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("ftl") {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read file: {:?}", path))?;
            sources.push((path, content));
        }
    }
    sources.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(sources)
}

fn default_catalogue(language: SupportedLanguage) -> &'static str {
    match language {
        SupportedLanguage::Indonesian => include_str!("../../locales/id/common.ftl"),
        SupportedLanguage::English => include_str!("../../locales/en/common.ftl"),
    }
}

impl Default for FluentLoader {
    fn default() -> Self {
        Self::new("locales")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_directory_gets_the_bundled_catalogue() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = FluentLoader::new(dir.path());
        loader.load_locale(SupportedLanguage::English).await.unwrap();

        assert!(dir.path().join("en").join("common.ftl").exists());
        let bundle = loader.get_bundle(&SupportedLanguage::English).unwrap();
        assert!(bundle.has_message("app-name"));
    }
}
