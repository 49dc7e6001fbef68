//! Element Coverage
//!
//! Per screen definition: how many of the discoverable elements were operated.

use crate::history::ScreenHistory;
use crate::model::{ElementInfo, ElementKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Coverage state of one discoverable element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCoverage {
    pub element: ElementInfo,
    pub operated: bool,
}

/// Coverage of one screen definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenCoverage {
    pub screen_def: String,
    pub covered: usize,
    pub total: usize,
    /// `covered / total` in `[0, 1]`; 0 when nothing is discoverable
    pub percentage: f64,
    /// Discoverable elements after tag filtering, in discovery order
    pub elements: Vec<ElementCoverage>,
}

impl ScreenCoverage {
    pub fn covered_elements(&self) -> impl Iterator<Item = &ElementInfo> {
        self.elements.iter().filter(|e| e.operated).map(|e| &e.element)
    }
}

/// Coverage calculator
pub struct CoverageCalculator {
    /// Upper-cased tag names to include; empty includes everything
    include_tags: HashSet<String>,
}

impl CoverageCalculator {
    /// Calculator that includes every element
    pub fn new() -> Self {
        Self {
            include_tags: HashSet::new(),
        }
    }

    /// Calculator restricted to the given tag names (case-insensitive)
    pub fn with_include_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            include_tags: tags
                .into_iter()
                .map(|t| t.as_ref().trim().to_uppercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    fn includes(&self, element: &ElementInfo) -> bool {
        self.include_tags.is_empty() || self.include_tags.contains(&element.tag_name.to_uppercase())
    }

    /// Coverage of every screen definition that appears in the history
    pub fn compute(&self, history: &ScreenHistory) -> BTreeMap<String, ScreenCoverage> {
        let mut operated: BTreeMap<&str, HashSet<ElementKey>> = BTreeMap::new();
        for entry in history.entries() {
            let touched = operated.entry(entry.screen_def()).or_default();
            if let Some(element) = &entry.step.operation.element {
                touched.insert(element.key());
            }
        }

        operated
            .into_iter()
            .map(|(screen_def, touched)| {
                let elements: Vec<ElementCoverage> = history
                    .coverage_sources()
                    .get(screen_def)
                    .map(|source| {
                        let mut seen = HashSet::new();
                        source
                            .screen_elements
                            .iter()
                            .filter(|e| self.includes(e) && seen.insert(e.key()))
                            .map(|e| ElementCoverage {
                                element: e.clone(),
                                operated: touched.contains(&e.key()),
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                let total = elements.len();
                let covered = elements.iter().filter(|e| e.operated).count();
                let percentage = if total == 0 {
                    0.0
                } else {
                    covered as f64 / total as f64
                };
                (
                    screen_def.to_string(),
                    ScreenCoverage {
                        screen_def: screen_def.to_string(),
                        covered,
                        total,
                        percentage,
                        elements,
                    },
                )
            })
            .collect()
    }
}

impl Default for CoverageCalculator {
    fn default() -> Self {
        Self::new()
    }
}
