//! Content-pattern scoring
//!
//! Four independent passes emit candidate patterns, a combining pass
//! adjusts and clamps their scores, and the result is sorted by
//! descending importance:
//!
//! 1. Structural: semantic HTML5 region tags get a fixed base score
//! 2. Keyword: class names matching a content-type keyword set
//! 3. Density: block elements with a high text-to-tag ratio
//! 4. Repetition: structural signatures that occur several times

use super::pattern::{ContentPattern, ContentType, CrawlSuggestions, PatternFeatures};
use super::selector::{element_signature, unique_selector};
use scraper::{ElementRef, Html};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Semantic region tags and their base scores, in pass order
const SEMANTIC_TAGS: &[(&str, ContentType, f64)] = &[
    ("article", ContentType::Article, 0.9),
    ("main", ContentType::Main, 0.8),
    ("section", ContentType::Section, 0.7),
    ("nav", ContentType::Nav, 0.6),
    ("aside", ContentType::Aside, 0.4),
];

/// Class-name keyword sets per content type, in pass order
const KEYWORD_SETS: &[(ContentType, &[&str])] = &[
    (
        ContentType::Article,
        &["article", "post", "content", "main-content", "detail"],
    ),
    (
        ContentType::List,
        &["list", "feed", "timeline", "cards", "items"],
    ),
    (ContentType::Pagination, &["pagination", "pages", "next", "prev"]),
    (ContentType::Comments, &["comments", "responses", "replies"]),
    (ContentType::Sidebar, &["sidebar", "related", "recommended"]),
];

const DENSITY_TAGS: &[&str] = &["div", "article", "section"];
const REPETITION_TAGS: &[&str] = &["div", "li", "article"];

/// Tuning knobs for the scoring passes
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Score given to keyword-pass matches
    pub keyword_score: f64,
    /// Minimum characters per descendant tag for a density pattern
    pub density_threshold: f64,
    /// Density is divided by this to get a score
    pub density_divisor: f64,
    /// Cap on density-pass scores
    pub max_density_score: f64,
    /// A signature must occur more often than this to count as a list
    pub min_repetitions: usize,
    /// Repetition count is divided by this to get a score
    pub repetition_divisor: f64,
    /// Cap on repetition-pass scores
    pub max_repetition_score: f64,
    /// Multiplier for semantic patterns
    pub semantic_boost: f64,
    /// Multiplier for patterns carrying a text density
    pub density_boost: f64,
    /// Multiplier for patterns carrying a repetition count
    pub repetition_boost: f64,
    /// Patterns scoring below this are suggested for ignoring
    pub ignore_below: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            keyword_score: 0.7,
            density_threshold: 50.0,
            density_divisor: 1000.0,
            max_density_score: 0.9,
            min_repetitions: 2,
            repetition_divisor: 20.0,
            max_repetition_score: 0.8,
            semantic_boost: 1.2,
            density_boost: 1.1,
            repetition_boost: 1.1,
            ignore_below: 0.3,
        }
    }
}

/// Scores DOM regions of a page by likely importance
///
/// Analysis is a pure function of the HTML: the analyzer keeps no state
/// between calls, so identical input always yields the identical ranking.
#[derive(Debug, Clone, Default)]
pub struct ContentAnalyzer {
    config: AnalyzerConfig,
}

impl ContentAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Finds and ranks content patterns in a page
    ///
    /// Returns patterns sorted by descending `importance_score`; ties keep
    /// the order in which the passes produced them.
    ///
    /// # Example
    ///
    /// ```
    /// use cadence_crawler::{ContentAnalyzer, ContentType};
    ///
    /// let patterns = ContentAnalyzer::new().analyze_page("<article>Hello</article>");
    /// assert_eq!(patterns.len(), 1);
    /// assert_eq!(patterns[0].content_type, ContentType::Article);
    /// assert_eq!(patterns[0].importance_score, 1.0);
    /// ```
    pub fn analyze_page(&self, html: &str) -> Vec<ContentPattern> {
        let document = Html::parse_document(html);
        let elements: Vec<ElementRef<'_>> = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();

        let mut patterns = Vec::new();
        self.structural_pass(&elements, &mut patterns);
        self.keyword_pass(&elements, &mut patterns);
        self.density_pass(&elements, &mut patterns);
        self.repetition_pass(&elements, &mut patterns);
        self.combine_scores(&mut patterns);

        patterns.sort_by(|a, b| {
            b.importance_score
                .partial_cmp(&a.importance_score)
                .unwrap_or(Ordering::Equal)
        });

        tracing::debug!("Found {} content patterns", patterns.len());
        patterns
    }

    /// Buckets pattern selectors by how a crawler should treat them
    ///
    /// Low-scoring patterns go to `ignore_selectors` only. Above the
    /// threshold, article and content patterns are content selectors, list
    /// patterns are list selectors, and pagination patterns are pagination
    /// selectors; other types are not suggested.
    pub fn get_crawl_suggestions(&self, patterns: &[ContentPattern]) -> CrawlSuggestions {
        let mut suggestions = CrawlSuggestions::default();

        for pattern in patterns {
            let selector = pattern.selector.clone();
            if pattern.importance_score < self.config.ignore_below {
                suggestions.ignore_selectors.push(selector);
                continue;
            }

            match pattern.content_type {
                ContentType::Article | ContentType::Content => {
                    suggestions.content_selectors.push(selector)
                }
                ContentType::List => suggestions.list_selectors.push(selector),
                ContentType::Pagination => suggestions.pagination_selectors.push(selector),
                _ => {}
            }
        }

        suggestions
    }

    fn structural_pass(&self, elements: &[ElementRef<'_>], patterns: &mut Vec<ContentPattern>) {
        for (tag, content_type, base_score) in SEMANTIC_TAGS {
            for element in elements.iter().filter(|e| e.value().name() == *tag) {
                patterns.push(ContentPattern {
                    selector: unique_selector(*element),
                    content_type: *content_type,
                    importance_score: *base_score,
                    features: PatternFeatures {
                        semantic: true,
                        ..PatternFeatures::default()
                    },
                });
            }
        }
    }

    fn keyword_pass(&self, elements: &[ElementRef<'_>], patterns: &mut Vec<ContentPattern>) {
        for element in elements {
            let classes: BTreeSet<&str> = match element.value().attr("class") {
                Some(class) => class.split_whitespace().collect(),
                None => continue,
            };
            if classes.is_empty() {
                continue;
            }

            for (content_type, keywords) in KEYWORD_SETS {
                let matched: Vec<String> = classes
                    .iter()
                    .filter(|class| keywords.contains(*class))
                    .map(|class| class.to_string())
                    .collect();

                if !matched.is_empty() {
                    patterns.push(ContentPattern {
                        selector: unique_selector(*element),
                        content_type: *content_type,
                        importance_score: self.config.keyword_score,
                        features: PatternFeatures {
                            matched_keywords: matched,
                            ..PatternFeatures::default()
                        },
                    });
                }
            }
        }
    }

    fn density_pass(&self, elements: &[ElementRef<'_>], patterns: &mut Vec<ContentPattern>) {
        for element in elements
            .iter()
            .filter(|e| DENSITY_TAGS.contains(&e.value().name()))
        {
            let Some(density) = text_density(*element) else {
                continue;
            };

            if density > self.config.density_threshold {
                patterns.push(ContentPattern {
                    selector: unique_selector(*element),
                    content_type: ContentType::Content,
                    importance_score: (density / self.config.density_divisor)
                        .min(self.config.max_density_score),
                    features: PatternFeatures {
                        text_density: Some(density),
                        ..PatternFeatures::default()
                    },
                });
            }
        }
    }

    fn repetition_pass(&self, elements: &[ElementRef<'_>], patterns: &mut Vec<ContentPattern>) {
        // (signature, count, first occurrence) in first-seen order
        let mut groups: Vec<(String, usize, ElementRef<'_>)> = Vec::new();

        for element in elements
            .iter()
            .filter(|e| REPETITION_TAGS.contains(&e.value().name()))
        {
            let signature = element_signature(*element);
            match groups.iter().position(|(seen, _, _)| *seen == signature) {
                Some(index) => groups[index].1 += 1,
                None => groups.push((signature, 1, *element)),
            }
        }

        for (signature, count, first) in groups {
            if count <= self.config.min_repetitions {
                continue;
            }

            patterns.push(ContentPattern {
                selector: repeated_selector(first),
                content_type: ContentType::List,
                importance_score: (count as f64 / self.config.repetition_divisor)
                    .min(self.config.max_repetition_score),
                features: PatternFeatures {
                    repetition_count: Some(count),
                    signature: Some(signature),
                    ..PatternFeatures::default()
                },
            });
        }
    }

    fn combine_scores(&self, patterns: &mut [ContentPattern]) {
        for pattern in patterns {
            let mut score = pattern.importance_score;
            if pattern.features.semantic {
                score *= self.config.semantic_boost;
            }
            if pattern.features.text_density.is_some() {
                score *= self.config.density_boost;
            }
            if pattern.features.repetition_count.is_some() {
                score *= self.config.repetition_boost;
            }
            pattern.importance_score = score.clamp(0.0, 1.0);
        }
    }
}

/// Visible characters per descendant tag, None for elements without children tags
fn text_density(element: ElementRef<'_>) -> Option<f64> {
    let tag_count = element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .count();
    if tag_count == 0 {
        return None;
    }

    let text_length: usize = element
        .text()
        .map(|text| text.trim().chars().count())
        .sum();

    Some(text_length as f64 / tag_count as f64)
}

/// Selector for a repeated structure: the first occurrence's parent, then its tag
fn repeated_selector(first: ElementRef<'_>) -> String {
    let tag = first.value().name();
    match first.parent().and_then(ElementRef::wrap) {
        Some(parent) => format!("{} > {}", unique_selector(parent), tag),
        None => tag.to_string(),
    }
}
