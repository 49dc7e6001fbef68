//! Coverage Sources
//!
//! Discoverable elements per screen definition, accumulated as operations are
//! registered.

use crate::model::{ElementInfo, ElementKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Elements discovered on one screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSource {
    pub screen_def: String,
    #[serde(default)]
    pub screen_elements: Vec<ElementInfo>,
}

impl CoverageSource {
    pub fn new(screen_def: impl Into<String>) -> Self {
        Self {
            screen_def: screen_def.into(),
            screen_elements: Vec::new(),
        }
    }

    /// Keys of the elements, in discovery order, without duplicates
    pub fn keys(&self) -> Vec<ElementKey> {
        let mut seen = HashSet::new();
        self.screen_elements
            .iter()
            .map(ElementInfo::key)
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }

    pub fn find(&self, key: &ElementKey) -> Option<&ElementInfo> {
        self.screen_elements.iter().find(|e| &e.key() == key)
    }
}

/// Accumulator of coverage sources for one test result.
///
/// Sources are only ever extended; [`CoverageSources::clear`] is the one way
/// to drop elements, used when the whole history is reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageSources {
    sources: Vec<CoverageSource>,
}

impl CoverageSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge newly discovered elements into the screen's source.
    /// Returns how many elements were new.
    pub fn register(&mut self, screen_def: &str, elements: &[ElementInfo]) -> usize {
        let index = match self.sources.iter().position(|s| s.screen_def == screen_def) {
            Some(index) => index,
            None => {
                self.sources.push(CoverageSource::new(screen_def));
                self.sources.len() - 1
            }
        };
        let source = &mut self.sources[index];
        let mut known: HashSet<ElementKey> = source.screen_elements.iter().map(ElementInfo::key).collect();
        let mut added = 0;
        for element in elements {
            if known.insert(element.key()) {
                source.screen_elements.push(element.clone());
                added += 1;
            }
        }
        added
    }

    pub fn get(&self, screen_def: &str) -> Option<&CoverageSource> {
        self.sources.iter().find(|s| s.screen_def == screen_def)
    }

    pub fn as_slice(&self) -> &[CoverageSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }
}

impl From<Vec<CoverageSource>> for CoverageSources {
    fn from(sources: Vec<CoverageSource>) -> Self {
        let mut merged = CoverageSources::new();
        for source in sources {
            merged.register(&source.screen_def, &source.screen_elements);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_deduplicates_by_key() {
        let mut sources = CoverageSources::new();
        let added = sources.register(
            "Login",
            &[
                ElementInfo::new("input", "/html/body/input[1]"),
                ElementInfo::new("INPUT", "/HTML/BODY/INPUT[1]"),
                ElementInfo::new("button", "/html/body/button"),
            ],
        );
        assert_eq!(added, 2);
        assert_eq!(sources.get("Login").unwrap().screen_elements.len(), 2);

        let added = sources.register("Login", &[ElementInfo::new("button", "/html/body/button")]);
        assert_eq!(added, 0);
        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn test_sources_keep_registration_order() {
        let mut sources = CoverageSources::new();
        sources.register("B", &[]);
        sources.register("A", &[]);
        let names: Vec<&str> = sources.as_slice().iter().map(|s| s.screen_def.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_clear() {
        let mut sources = CoverageSources::new();
        sources.register("A", &[ElementInfo::new("a", "/a")]);
        sources.clear();
        assert!(sources.is_empty());
        assert!(sources.get("A").is_none());
    }

    #[test]
    fn test_from_vec_merges_duplicate_screens() {
        let mut first = CoverageSource::new("A");
        first.screen_elements.push(ElementInfo::new("a", "/a"));
        let mut second = CoverageSource::new("A");
        second.screen_elements.push(ElementInfo::new("b", "/b"));
        let sources = CoverageSources::from(vec![first, second]);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources.get("A").unwrap().keys().len(), 2);
    }
}
