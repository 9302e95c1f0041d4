use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of region a pattern is believed to represent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    List,
    Pagination,
    Comments,
    Sidebar,
    Content,
    Nav,
    Main,
    Section,
    Aside,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::List => "list",
            Self::Pagination => "pagination",
            Self::Comments => "comments",
            Self::Sidebar => "sidebar",
            Self::Content => "content",
            Self::Nav => "nav",
            Self::Main => "main",
            Self::Section => "section",
            Self::Aside => "aside",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence attached to a pattern by the pass that produced it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternFeatures {
    /// Produced by the semantic-tag pass
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub semantic: bool,

    /// Class names that matched a content-type keyword set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_keywords: Vec<String>,

    /// Visible characters per descendant tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_density: Option<f64>,

    /// How many elements share the structural signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_count: Option<usize>,

    /// Tag name followed by the immediate child tag names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// A scored, selector-addressable region of a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPattern {
    /// CSS selector locating the region
    pub selector: String,

    pub content_type: ContentType,

    /// Heuristic importance in `[0.0, 1.0]`
    pub importance_score: f64,

    pub features: PatternFeatures,
}

/// Selectors bucketed by what a crawler should do with them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSuggestions {
    pub content_selectors: Vec<String>,
    pub list_selectors: Vec<String>,
    pub pagination_selectors: Vec<String>,
    pub ignore_selectors: Vec<String>,
}

impl CrawlSuggestions {
    pub fn is_empty(&self) -> bool {
        self.content_selectors.is_empty()
            && self.list_selectors.is_empty()
            && self.pagination_selectors.is_empty()
            && self.ignore_selectors.is_empty()
    }
}
