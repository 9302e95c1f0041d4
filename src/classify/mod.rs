//! Keyword-based content classification

use crate::config::CategoryEntry;

/// Label used when no categories are configured
pub const UNCATEGORIZED: &str = "uncategorized";

/// Assigns a category label to extracted page text
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> String;

    /// Known category names in declaration order
    fn categories(&self) -> Vec<String>;
}

/// How `KeywordClassifier::update_keywords` changes a keyword list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordUpdate {
    Add,
    Remove,
}

/// Picks the category whose keywords appear most often in the text
///
/// Each keyword counts once if it occurs anywhere in the text (case
/// insensitive). The category with the most hits wins and ties keep the
/// earlier category. Text with no hits falls back to the first category.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    categories: Vec<(String, Vec<String>)>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a classifier from `[[category]]` config entries
    pub fn from_config(entries: &[CategoryEntry]) -> Self {
        let mut classifier = Self::new();
        for entry in entries {
            classifier.add_category(&entry.name, entry.keywords.clone());
        }
        classifier
    }

    /// Adds a category; existing categories are left untouched
    pub fn add_category(&mut self, name: &str, keywords: Vec<String>) {
        if self.position(name).is_none() {
            self.categories.push((name.to_string(), keywords));
        }
    }

    /// Returns true if the category existed
    pub fn remove_category(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.categories.remove(index);
                true
            }
            None => false,
        }
    }

    /// Adds or removes keywords of a category; false for unknown categories
    pub fn update_keywords(&mut self, name: &str, keywords: &[String], mode: KeywordUpdate) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        let known = &mut self.categories[index].1;

        match mode {
            KeywordUpdate::Add => {
                for keyword in keywords {
                    if !known.contains(keyword) {
                        known.push(keyword.clone());
                    }
                }
            }
            KeywordUpdate::Remove => known.retain(|keyword| !keywords.contains(keyword)),
        }
        true
    }

    /// Learns keywords from labelled samples
    ///
    /// Every whitespace-separated word longer than one character is added
    /// to the sample's category. Samples for unknown categories are ignored.
    pub fn train<S, L>(&mut self, samples: &[(S, L)])
    where
        S: AsRef<str>,
        L: AsRef<str>,
    {
        for (text, label) in samples {
            let Some(index) = self.position(label.as_ref()) else {
                tracing::debug!("Ignoring training sample for unknown category {}", label.as_ref());
                continue;
            };
            let known = &mut self.categories[index].1;

            for word in text.as_ref().split_whitespace() {
                if word.chars().count() > 1 && !known.iter().any(|k| k == word) {
                    known.push(word.to_string());
                }
            }
        }
    }

    pub fn keywords(&self, name: &str) -> Option<&[String]> {
        self.position(name)
            .map(|index| self.categories[index].1.as_slice())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|(known, _)| known == name)
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, text: &str) -> String {
        let Some((first, _)) = self.categories.first() else {
            return UNCATEGORIZED.to_string();
        };

        let text = text.to_lowercase();
        let mut best = first;
        let mut best_hits = 0;

        for (name, keywords) in &self.categories {
            let hits = keywords
                .iter()
                .filter(|keyword| !keyword.is_empty() && text.contains(&keyword.to_lowercase()))
                .count();
            if hits > best_hits {
                best = name;
                best_hits = hits;
            }
        }

        best.clone()
    }

    fn categories(&self) -> Vec<String> {
        self.categories.iter().map(|(name, _)| name.clone()).collect()
    }
}
