//! User-facing message catalog.
//!
//! Notices and error texts shown to document owners are kept in Fluent
//! resources so the presentation layer receives finished strings.

use std::collections::HashMap;

use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use tracing::warn;
use unic_langid::LanguageIdentifier;

const DEFAULT_LOCALE: &str = "en";

const EN_MESSAGES: &str = r#"
# Errors
error-document-not-found = Document not found: { $id }
error-tag-not-found = Tag not found: { $tag }
error-ingestion-aborted = Failed to process document with external service. The document has not been saved.
error-training-failed = Failed to train model
error-internal = An internal error occurred

# Documents
doc-upload-success = Document uploaded and processed
doc-upload-queued = Document queued for processing
doc-upload-duplicate = This file has already been uploaded.
doc-delete-success = Document deleted successfully

# Training
train-started = Training initiated successfully!
"#;

/// Fluent-backed message lookup. Bundles are built once at startup and only
/// read afterwards.
pub struct I18n {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl I18n {
    /// Create the catalog with the embedded English messages
    pub fn new() -> Self {
        let mut i18n = Self {
            bundles: HashMap::new(),
        };

        if let Err(e) = i18n.add_locale(DEFAULT_LOCALE, EN_MESSAGES) {
            warn!(error = %e, "Failed to load embedded English messages");
        }

        i18n
    }

    /// Register translations for a locale
    pub fn add_locale(&mut self, locale: &str, content: &str) -> Result<(), String> {
        let lang_id: LanguageIdentifier = locale
            .parse()
            .map_err(|e| format!("Invalid locale '{}': {}", locale, e))?;

        let resource = FluentResource::try_new(content.to_string())
            .map_err(|(_, errors)| format!("Failed to parse Fluent resource: {:?}", errors))?;

        let mut bundle = FluentBundle::new_concurrent(vec![lang_id]);
        // Messages end up in plain-text JSON, not bidi-aware UI
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|errors| format!("Failed to add resource to bundle: {:?}", errors))?;

        self.bundles.insert(locale.to_string(), bundle);
        Ok(())
    }

    /// Look up a message, falling back to the default locale and then the key
    pub fn get(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> String {
        self.lookup(locale, key, args)
            .or_else(|| self.lookup(DEFAULT_LOCALE, key, args))
            .unwrap_or_else(|| key.to_string())
    }

    /// Look up a message with string arguments
    pub fn format(&self, locale: &str, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, *value);
        }
        self.get(locale, key, Some(&fluent_args))
    }

    fn lookup(&self, locale: &str, key: &str, args: Option<&FluentArgs>) -> Option<String> {
        let bundle = self.bundles.get(locale)?;
        let pattern = bundle.get_message(key)?.value()?;

        let mut errors = vec![];
        let text = bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            warn!(key = %key, errors = ?errors, "Fluent formatting errors");
        }

        Some(text.into_owned())
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_message() {
        let i18n = I18n::new();

        let msg = i18n.get("en", "doc-upload-duplicate", None);
        assert_eq!(msg, "This file has already been uploaded.");
    }

    #[test]
    fn test_format_message() {
        let i18n = I18n::new();

        let msg = i18n.format("en", "error-tag-not-found", &[("tag", "invoice")]);
        assert_eq!(msg, "Tag not found: invoice");
    }

    #[test]
    fn test_fallback_to_key() {
        let i18n = I18n::new();

        assert_eq!(i18n.get("en", "nonexistent-key", None), "nonexistent-key");
    }

    #[test]
    fn test_fallback_to_default_locale() {
        let i18n = I18n::new();

        let msg = i18n.get("fr", "train-started", None);
        assert_eq!(msg, "Training initiated successfully!");
    }

    #[test]
    fn test_added_locale_takes_precedence() {
        let mut i18n = I18n::new();
        i18n.add_locale("de", "train-started = Training gestartet!")
            .unwrap();

        assert_eq!(i18n.get("de", "train-started", None), "Training gestartet!");
        // Keys missing from the added locale still resolve through English
        assert_eq!(
            i18n.get("de", "doc-delete-success", None),
            "Document deleted successfully"
        );
    }
}
