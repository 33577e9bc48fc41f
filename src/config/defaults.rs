//! Default configuration values for orikomi.
//!
//! This module provides type-safe default values that are used by `config init`
//! to generate configuration templates.

use super::WILDCARD_KEY;
use super::settings::{DEFAULT_PLACEHOLDER, FoldingSettings, LanguageFoldingConfig};
use std::collections::HashMap;

/// Returns the default FoldingSettings for configuration generation.
pub fn default_settings() -> FoldingSettings {
    let mut languages = HashMap::new();
    languages.insert(WILDCARD_KEY.to_string(), default_language_config());

    FoldingSettings {
        default_placeholder: Some(DEFAULT_PLACEHOLDER.to_string()),
        validate_signatures: Some(false),
        keep_collapsed_on_reparse: Some(true),
        languages,
    }
}

/// Defaults inherited by every language through the wildcard entry
fn default_language_config() -> LanguageFoldingConfig {
    let placeholders = [
        ("block", "{...}"),
        ("declaration_list", "{...}"),
        ("field_declaration_list", "{...}"),
        ("enum_variant_list", "{...}"),
        ("arguments", "(...)"),
        ("parameters", "(...)"),
        ("array_expression", "[...]"),
        ("block_comment", "/*...*/"),
    ]
    .into_iter()
    .map(|(kind, placeholder)| (kind.to_string(), placeholder.to_string()))
    .collect();

    LanguageFoldingConfig {
        folds: None,
        min_lines: Some(2),
        collapse_by_default: Some(Vec::new()),
        signature_kinds: None,
        placeholders: Some(placeholders),
    }
}

/// Default settings rendered as TOML, as written by `config init`
pub fn default_settings_toml() -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&default_settings())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_has_wildcard_language() {
        let settings = default_settings();
        let wildcard = &settings.languages[WILDCARD_KEY];

        assert_eq!(wildcard.min_lines, Some(2));
        assert_eq!(wildcard.placeholders.as_ref().unwrap()["block"], "{...}");
    }

    #[test]
    fn default_settings_keep_collapsed_regions() {
        assert_eq!(default_settings().keep_collapsed_on_reparse, Some(true));
    }

    #[test]
    fn default_settings_serializes_to_valid_toml() {
        let toml_str = default_settings_toml().expect("should serialize to TOML without error");
        let parsed: FoldingSettings =
            toml::from_str(&toml_str).expect("generated TOML should parse back");

        assert_eq!(parsed, default_settings());
    }
}
