pub mod defaults;
pub mod manager;
pub mod settings;
pub mod user;

pub use manager::SettingsManager;
pub use settings::{
    DEFAULT_PLACEHOLDER, FoldingSettings, LanguageFoldingConfig, WorkspaceFoldingSettings,
};
use std::collections::HashMap;
pub use user::{UserConfigError, UserConfigResult, load_config_file, load_user_config, user_config_path};

/// Key of the language entry whose values every other language inherits
pub const WILDCARD_KEY: &str = "_";

/// Resolve a language key from a map with wildcard fallback and merging.
///
/// - If both wildcard ("_") and specific key exist: merge them (specific overrides wildcard)
/// - If only wildcard exists: return wildcard
/// - If only specific key exists: return specific key
/// - If neither exists: return None
pub fn resolve_language_with_wildcard(
    map: &HashMap<String, LanguageFoldingConfig>,
    key: &str,
) -> Option<LanguageFoldingConfig> {
    let wildcard = map.get(WILDCARD_KEY);
    let specific = map.get(key);

    match (wildcard, specific) {
        (Some(w), Some(s)) => Some(merge_language(w.clone(), s.clone())),
        (Some(w), None) => Some(w.clone()),
        (None, Some(s)) => Some(s.clone()),
        (None, None) => None,
    }
}

/// Merge multiple FoldingSettings configs in order.
/// Later configs in the slice have higher precedence (override earlier ones).
/// Use this for layered config: `merge_all(&[defaults, user, project])`
pub fn merge_all(configs: &[Option<FoldingSettings>]) -> Option<FoldingSettings> {
    configs.iter().cloned().reduce(merge_settings).flatten()
}

/// Merge two FoldingSettings, preferring values from `primary` over `fallback`
pub fn merge_settings(
    fallback: Option<FoldingSettings>,
    primary: Option<FoldingSettings>,
) -> Option<FoldingSettings> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) => Some(settings),
        (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => Some(FoldingSettings {
            default_placeholder: primary.default_placeholder.or(fallback.default_placeholder),
            validate_signatures: primary.validate_signatures.or(fallback.validate_signatures),
            keep_collapsed_on_reparse: primary
                .keep_collapsed_on_reparse
                .or(fallback.keep_collapsed_on_reparse),
            // Deep merge: a later layer only overrides the fields it sets
            languages: merge_languages(fallback.languages, primary.languages),
        }),
    }
}

fn merge_languages(
    mut fallback: HashMap<String, LanguageFoldingConfig>,
    primary: HashMap<String, LanguageFoldingConfig>,
) -> HashMap<String, LanguageFoldingConfig> {
    for (key, value) in primary {
        let merged = match fallback.remove(&key) {
            Some(existing) => merge_language(existing, value),
            None => value,
        };
        fallback.insert(key, merged);
    }
    fallback
}

fn merge_language(
    fallback: LanguageFoldingConfig,
    primary: LanguageFoldingConfig,
) -> LanguageFoldingConfig {
    let placeholders = match (fallback.placeholders, primary.placeholders) {
        (Some(mut base), Some(overrides)) => {
            base.extend(overrides);
            Some(base)
        }
        (base, overrides) => overrides.or(base),
    };

    LanguageFoldingConfig {
        folds: primary.folds.or(fallback.folds),
        min_lines: primary.min_lines.or(fallback.min_lines),
        collapse_by_default: primary.collapse_by_default.or(fallback.collapse_by_default),
        signature_kinds: primary.signature_kinds.or(fallback.signature_kinds),
        placeholders,
    }
}
