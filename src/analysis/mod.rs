//! Heuristic content-pattern analysis
//!
//! Scores DOM regions of a page by how likely they are to hold valuable
//! content, and turns the scored patterns into selector suggestions for
//! later crawls.

mod analyzer;
mod pattern;
mod selector;

pub use analyzer::{AnalyzerConfig, ContentAnalyzer};
pub use pattern::{ContentPattern, ContentType, CrawlSuggestions, PatternFeatures};
pub use selector::{element_signature, unique_selector};
