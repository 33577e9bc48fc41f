pub mod coordinates;
pub mod layer;

mod model;

// Re-export main types
pub use coordinates::LineMap;
pub use layer::LanguageLayer;
pub use model::FoldDocument;
