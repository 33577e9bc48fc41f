pub mod kind_provider;
pub mod provider;
pub mod query_provider;
pub mod registry;

pub use kind_provider::KindFoldProvider;
pub use provider::{LanguageFoldProvider, ProviderError};
pub use query_provider::QueryFoldProvider;
pub use registry::FoldProviderRegistry;
