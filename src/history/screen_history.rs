//! Screen History Builder
//!
//! Projects the flat operation sequence onto screens. For every window the
//! builder remembers the screen it is currently on; an operation whose screen
//! definition differs from that window's current screen records a transition.
//!
//! The screen history is a pure function of its inputs and is rebuilt from
//! scratch whenever the operation history changes.

use super::window::WindowRegistry;
use crate::coverage::{CoverageSource, CoverageSources};
use crate::model::{ElementInfo, ElementKey, OperationType, TestStep};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use tracing::debug;

/// A screen as seen at one operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenRef {
    pub screen_def: String,
    pub title: String,
    pub url: String,
}

impl ScreenRef {
    fn of(step: &TestStep) -> Self {
        Self {
            screen_def: step.operation.screen_def.clone(),
            title: step.operation.title.clone(),
            url: step.operation.url.clone(),
        }
    }
}

/// Screen change of one window. `source` is `None` for the first operation
/// seen in a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenTransition {
    pub source: Option<ScreenRef>,
    pub target: ScreenRef,
}

impl ScreenTransition {
    /// Transitions between two screens (as opposed to a window's first screen)
    pub fn is_edge(&self) -> bool {
        self.source.is_some()
    }
}

/// Index of a screen node in [`ScreenHistory::screens`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenNodeId(pub usize);

/// A distinct `(window, screen definition)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenNode {
    pub id: ScreenNodeId,
    pub window_handle: String,
    pub screen_def: String,
    /// Sequence of the operation that first reached this node
    pub first_sequence: u32,
}

/// One operation in screen context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub step: TestStep,
    pub node: ScreenNodeId,
    pub transition: Option<ScreenTransition>,
}

impl HistoryEntry {
    pub fn sequence(&self) -> u32 {
        self.step.sequence()
    }

    pub fn window_handle(&self) -> &str {
        &self.step.operation.window_handle
    }

    pub fn screen_def(&self) -> &str {
        &self.step.operation.screen_def
    }
}

/// Value held by an input-capable element at the end of a segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputElementValue {
    pub element: ElementInfo,
    /// `None` when the element was not touched during the segment
    pub value: Option<String>,
}

impl InputElementValue {
    pub fn key(&self) -> ElementKey {
        self.element.key()
    }
}

/// Maximal run of consecutive entries on the same window and screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenSegment {
    pub window_handle: String,
    pub screen: ScreenRef,
    pub node: ScreenNodeId,
    /// Range into [`ScreenHistory::entries`]
    pub entries: Range<usize>,
    /// Input-capable elements of the screen and the values set on them
    pub input_elements: Vec<InputElementValue>,
}

/// Screen-level projection of an operation history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenHistory {
    entries: Vec<HistoryEntry>,
    screens: Vec<ScreenNode>,
    segments: Vec<ScreenSegment>,
    windows: WindowRegistry,
    coverage_sources: CoverageSources,
}

impl ScreenHistory {
    /// Build the screen history of `steps` (ordered by sequence, gap-free from 1)
    pub fn build(steps: &[TestStep], coverage_sources: &[CoverageSource]) -> Result<Self> {
        let coverage_sources = CoverageSources::from(coverage_sources.to_vec());
        let mut history = ScreenHistory {
            coverage_sources,
            ..Default::default()
        };

        let mut current: HashMap<String, ScreenRef> = HashMap::new();
        let mut node_index: HashMap<(String, String), ScreenNodeId> = HashMap::new();

        for (index, step) in steps.iter().enumerate() {
            let op = &step.operation;
            let expected = index as u32 + 1;
            if op.sequence != expected {
                return Err(Error::InvalidInput(format!(
                    "operation at position {} has sequence {}, expected {}",
                    index, op.sequence, expected
                )));
            }
            if op.window_handle.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "operation {} has no window handle",
                    op.sequence
                )));
            }

            history.windows.observe(&op.window_handle);

            let key = (op.window_handle.clone(), op.screen_def.clone());
            let node = match node_index.get(&key) {
                Some(node) => *node,
                None => {
                    let id = ScreenNodeId(history.screens.len());
                    history.screens.push(ScreenNode {
                        id,
                        window_handle: op.window_handle.clone(),
                        screen_def: op.screen_def.clone(),
                        first_sequence: op.sequence,
                    });
                    node_index.insert(key, id);
                    id
                }
            };

            let target = ScreenRef::of(step);
            let source = current.insert(op.window_handle.clone(), target.clone());
            let transition = match source {
                Some(source) if source.screen_def == target.screen_def => None,
                source => Some(ScreenTransition { source, target }),
            };

            history.push_entry(HistoryEntry {
                step: step.clone(),
                node,
                transition,
            });
        }

        debug!(
            entries = history.entries.len(),
            screens = history.screens.len(),
            segments = history.segments.len(),
            windows = history.windows.len(),
            "built screen history"
        );
        Ok(history)
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        let index = self.entries.len();
        let continues = self.segments.last().is_some_and(|segment| {
            segment.window_handle == entry.window_handle()
                && segment.screen.screen_def == entry.screen_def()
                && segment.entries.end == index
        });

        if !continues {
            let input_elements = self
                .coverage_sources
                .get(entry.screen_def())
                .map(|source| {
                    source
                        .screen_elements
                        .iter()
                        .filter(|e| e.is_input())
                        .map(|e| InputElementValue {
                            element: e.clone(),
                            value: None,
                        })
                        .collect()
                })
                .unwrap_or_default();
            self.segments.push(ScreenSegment {
                window_handle: entry.window_handle().to_string(),
                screen: ScreenRef::of(&entry.step),
                node: entry.node,
                entries: index..index,
                input_elements,
            });
        }

        if let Some(segment) = self.segments.last_mut() {
            segment.entries.end = index + 1;
            record_input(segment, &entry.step);
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn screens(&self) -> &[ScreenNode] {
        &self.screens
    }

    pub fn screen(&self, id: ScreenNodeId) -> Option<&ScreenNode> {
        self.screens.get(id.0)
    }

    pub fn segments(&self) -> &[ScreenSegment] {
        &self.segments
    }

    /// Entries belonging to a segment
    pub fn segment_entries(&self, segment: &ScreenSegment) -> &[HistoryEntry] {
        &self.entries[segment.entries.clone()]
    }

    pub fn windows(&self) -> &WindowRegistry {
        &self.windows
    }

    pub fn coverage_sources(&self) -> &CoverageSources {
        &self.coverage_sources
    }

    /// Entries of one window, in sequence order
    pub fn window_entries<'a>(&'a self, window_handle: &'a str) -> impl Iterator<Item = &'a HistoryEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.window_handle() == window_handle)
    }

    /// Segments of one window, in sequence order
    pub fn window_segments<'a>(&'a self, window_handle: &'a str) -> impl Iterator<Item = &'a ScreenSegment> + 'a {
        self.segments
            .iter()
            .filter(move |s| s.window_handle == window_handle)
    }

    /// `(source, target, sequence)` for every screen-to-screen transition
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, u32)> + '_ {
        self.entries.iter().filter_map(|entry| {
            let transition = entry.transition.as_ref()?;
            let source = transition.source.as_ref()?;
            Some((
                source.screen_def.as_str(),
                transition.target.screen_def.as_str(),
                entry.sequence(),
            ))
        })
    }

    /// Distinct screen definitions in first-seen order, across windows
    pub fn screen_defs(&self) -> Vec<&str> {
        let mut defs: Vec<&str> = Vec::new();
        for node in &self.screens {
            if !defs.contains(&node.screen_def.as_str()) {
                defs.push(node.screen_def.as_str());
            }
        }
        defs
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn record_input(segment: &mut ScreenSegment, step: &TestStep) {
    let op = &step.operation;
    if op.op_type != OperationType::Change {
        return;
    }
    let Some(element) = &op.element else {
        return;
    };
    let key = element.key();
    match segment.input_elements.iter_mut().find(|i| i.key() == key) {
        Some(input) => input.value = op.input.clone(),
        None => segment.input_elements.push(InputElementValue {
            element: element.clone(),
            value: op.input.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CapturedOperation, KeywordSet, Operation};
    use chrono::Utc;

    fn make_step(sequence: u32, window: &str, screen: &str) -> TestStep {
        TestStep::new(
            format!("s{}", sequence),
            Operation::from_captured(
                sequence,
                CapturedOperation {
                    window_handle: window.to_string(),
                    screen_def: screen.to_string(),
                    title: screen.to_string(),
                    url: format!("http://localhost/{}", screen.to_lowercase()),
                    element: None,
                    op_type: OperationType::Click,
                    input: None,
                    keywords: KeywordSet::new(),
                    image_url: None,
                    timestamp: Utc::now(),
                },
            ),
        )
    }

    fn make_change(sequence: u32, screen: &str, xpath: &str, value: &str) -> TestStep {
        let mut step = make_step(sequence, "w1", screen);
        step.operation.op_type = OperationType::Change;
        step.operation.element = Some(ElementInfo::new("input", xpath));
        step.operation.input = Some(value.to_string());
        step
    }

    #[test]
    fn test_same_screen_produces_no_edge() {
        let steps = vec![
            make_step(1, "w1", "Login"),
            make_step(2, "w1", "Home"),
            make_step(3, "w1", "Home"),
        ];
        let history = ScreenHistory::build(&steps, &[]).unwrap();

        let edges: Vec<_> = history.edges().collect();
        assert_eq!(edges, vec![("Login", "Home", 2)]);
        assert!(history.entries()[2].transition.is_none());
        // First operation of the window still records where it landed
        let first = history.entries()[0].transition.as_ref().unwrap();
        assert!(first.source.is_none());
        assert!(!first.is_edge());
    }

    #[test]
    fn test_nodes_per_window_and_screen() {
        let steps = vec![
            make_step(1, "w1", "Login"),
            make_step(2, "w1", "Home"),
            make_step(3, "w2", "Home"),
            make_step(4, "w1", "Login"),
        ];
        let history = ScreenHistory::build(&steps, &[]).unwrap();

        assert_eq!(history.screens().len(), 3);
        assert_eq!(history.entries()[3].node, history.entries()[0].node);
        assert_ne!(history.entries()[2].node, history.entries()[1].node);
        assert_eq!(history.screen_defs(), vec!["Login", "Home"]);
    }

    #[test]
    fn test_transitions_tracked_per_window() {
        let steps = vec![
            make_step(1, "w1", "Search"),
            make_step(2, "w2", "Detail"),
            make_step(3, "w1", "Search"),
            make_step(4, "w2", "Cart"),
        ];
        let history = ScreenHistory::build(&steps, &[]).unwrap();

        // Interleaving windows is not a screen change for either window
        assert!(history.entries()[2].transition.is_none());
        let edges: Vec<_> = history.edges().collect();
        assert_eq!(edges, vec![("Detail", "Cart", 4)]);
    }

    #[test]
    fn test_window_labels_first_seen() {
        let steps = vec![
            make_step(1, "zzz", "A"),
            make_step(2, "aaa", "B"),
            make_step(3, "zzz", "C"),
        ];
        let history = ScreenHistory::build(&steps, &[]).unwrap();
        assert_eq!(history.windows().label("zzz").as_deref(), Some("window1"));
        assert_eq!(history.windows().label("aaa").as_deref(), Some("window2"));
    }

    #[test]
    fn test_segments() {
        let steps = vec![
            make_step(1, "w1", "Login"),
            make_step(2, "w1", "Login"),
            make_step(3, "w2", "Login"),
            make_step(4, "w1", "Login"),
            make_step(5, "w1", "Home"),
        ];
        let history = ScreenHistory::build(&steps, &[]).unwrap();
        let ranges: Vec<_> = history.segments().iter().map(|s| s.entries.clone()).collect();
        assert_eq!(ranges, vec![0..2, 2..3, 3..4, 4..5]);
        assert_eq!(history.window_segments("w1").count(), 3);
        assert_eq!(history.window_entries("w2").count(), 1);
        let seqs: Vec<u32> = history
            .segment_entries(&history.segments()[0])
            .iter()
            .map(HistoryEntry::sequence)
            .collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn test_segment_input_values() {
        let mut source = CoverageSource::new("Login");
        source.screen_elements = vec![
            ElementInfo::new("input", "/form/input[1]"),
            ElementInfo::new("input", "/form/input[2]"),
            ElementInfo::new("button", "/form/button"),
        ];
        let steps = vec![
            make_change(1, "Login", "/form/input[1]", "al"),
            make_change(2, "Login", "/form/input[1]", "alice"),
            make_change(3, "Login", "/form/input[3]", "extra"),
        ];
        let history = ScreenHistory::build(&steps, &[source]).unwrap();
        let inputs = &history.segments()[0].input_elements;

        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0].value.as_deref(), Some("alice"));
        assert_eq!(inputs[1].value, None);
        assert_eq!(inputs[2].element.xpath, "/form/input[3]");
    }

    #[test]
    fn test_build_is_deterministic() {
        let steps = vec![
            make_step(1, "w1", "Login"),
            make_step(2, "w2", "Home"),
            make_step(3, "w1", "Home"),
        ];
        let first = ScreenHistory::build(&steps, &[]).unwrap();
        let second = ScreenHistory::build(&steps, &[]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_sequence_gap_and_empty_window() {
        let steps = vec![make_step(1, "w1", "A"), make_step(3, "w1", "B")];
        assert!(matches!(ScreenHistory::build(&steps, &[]), Err(Error::InvalidInput(_))));

        let steps = vec![make_step(1, "", "A")];
        assert!(matches!(ScreenHistory::build(&steps, &[]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_empty_history() {
        let history = ScreenHistory::build(&[], &[]).unwrap();
        assert!(history.is_empty());
        assert!(history.windows().is_empty());
        assert_eq!(history.edges().count(), 0);
    }
}
