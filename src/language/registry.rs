use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::provider::LanguageFoldProvider;
use crate::error::LockResultExt;
use crate::syntax::SyntaxTree;

/// Registry of fold providers keyed by language id
pub struct FoldProviderRegistry<T: SyntaxTree> {
    providers: RwLock<HashMap<String, Arc<dyn LanguageFoldProvider<T>>>>,
}

impl<T: SyntaxTree> Default for FoldProviderRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SyntaxTree> FoldProviderRegistry<T> {
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a provider, replacing any previous one for the language
    pub fn register(
        &self,
        language_id: impl Into<String>,
        provider: Arc<dyn LanguageFoldProvider<T>>,
    ) {
        let language_id = language_id.into();
        log::debug!(
            target: "orikomi::aggregator",
            "Registered fold provider for {}",
            language_id
        );
        self.providers
            .write()
            .recover_poison("registry::register")
            .insert(language_id, provider);
    }

    /// Get the provider for a language
    pub fn get(&self, language_id: &str) -> Option<Arc<dyn LanguageFoldProvider<T>>> {
        self.providers
            .read()
            .recover_poison("registry::get")
            .get(language_id)
            .cloned()
    }

    pub fn contains(&self, language_id: &str) -> bool {
        self.providers
            .read()
            .recover_poison("registry::contains")
            .contains_key(language_id)
    }

    pub fn remove(&self, language_id: &str) -> Option<Arc<dyn LanguageFoldProvider<T>>> {
        self.providers
            .write()
            .recover_poison("registry::remove")
            .remove(language_id)
    }

    /// Registered language ids, sorted
    pub fn language_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .providers
            .read()
            .recover_poison("registry::language_ids")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folding::candidate::FoldCandidate;
    use crate::language::provider::ProviderError;
    use crate::syntax::ArenaTree;

    struct NoFolds;

    impl LanguageFoldProvider<ArenaTree> for NoFolds {
        fn build_candidates<'t>(
            &self,
            _tree: &'t ArenaTree,
            _root: crate::syntax::NodeId,
            _text: &str,
            _quick: bool,
        ) -> Vec<FoldCandidate<crate::syntax::NodeId>> {
            Vec::new()
        }

        fn collapsed_by_default<'t>(
            &self,
            _tree: &'t ArenaTree,
            _candidate: &FoldCandidate<crate::syntax::NodeId>,
        ) -> Result<bool, ProviderError> {
            Ok(false)
        }
    }

    #[test]
    fn register_and_lookup() {
        let registry = FoldProviderRegistry::<ArenaTree>::new();
        registry.register("lua", Arc::new(NoFolds));
        registry.register("rust", Arc::new(NoFolds));

        assert!(registry.contains("rust"));
        assert!(registry.get("python").is_none());
        assert_eq!(registry.language_ids(), vec!["lua", "rust"]);

        assert!(registry.remove("lua").is_some());
        assert!(!registry.contains("lua"));
    }
}
