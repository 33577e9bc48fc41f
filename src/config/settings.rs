use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Placeholder shown for a collapsed region when the provider supplies none
pub const DEFAULT_PLACEHOLDER: &str = "...";

/// Folding configuration for one language.
///
/// Every field is optional so that configuration layers can be merged, with
/// the `"_"` wildcard entry providing values for languages that omit them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageFoldingConfig {
    /// Path to a `folds.scm` query for this language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folds: Option<String>,
    /// Minimum number of lines a node must span to be foldable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_lines: Option<usize>,
    /// Node kinds collapsed when defaults are applied (first open)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse_by_default: Option<Vec<String>>,
    /// Node kinds whose signatures are qualified by kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_kinds: Option<Vec<String>>,
    /// Placeholder text by node kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholders: Option<HashMap<String, String>>,
}

/// Folding settings as read from a configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldingSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_placeholder: Option<String>,
    /// Decode every freshly encoded signature and log mismatches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_signatures: Option<bool>,
    /// Keep collapsed regions that lost their candidate during a re-parse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_collapsed_on_reparse: Option<bool>,
    #[serde(default)]
    pub languages: HashMap<String, LanguageFoldingConfig>,
}

/// Fully resolved settings used at runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFoldingSettings {
    pub default_placeholder: String,
    pub validate_signatures: bool,
    pub keep_collapsed_on_reparse: bool,
    pub languages: HashMap<String, LanguageFoldingConfig>,
}

impl Default for WorkspaceFoldingSettings {
    fn default() -> Self {
        Self {
            default_placeholder: DEFAULT_PLACEHOLDER.to_string(),
            validate_signatures: false,
            keep_collapsed_on_reparse: true,
            languages: HashMap::new(),
        }
    }
}

impl From<FoldingSettings> for WorkspaceFoldingSettings {
    fn from(settings: FoldingSettings) -> Self {
        let defaults = Self::default();
        Self {
            default_placeholder: settings
                .default_placeholder
                .filter(|placeholder| !placeholder.is_empty())
                .unwrap_or(defaults.default_placeholder),
            validate_signatures: settings
                .validate_signatures
                .unwrap_or(defaults.validate_signatures),
            keep_collapsed_on_reparse: settings
                .keep_collapsed_on_reparse
                .unwrap_or(defaults.keep_collapsed_on_reparse),
            languages: settings.languages,
        }
    }
}

impl WorkspaceFoldingSettings {
    /// Resolve one language's configuration against the `"_"` wildcard
    pub fn language(&self, language_id: &str) -> LanguageFoldingConfig {
        super::resolve_language_with_wildcard(&self.languages, language_id).unwrap_or_default()
    }
}
