//! Graph Converters
//!
//! Turn a screen history into an intermediate graph (nodes are screens, edges
//! are transitions carrying the operations behind them), render that graph as
//! Mermaid markup, and produce a [`GraphExtender`] that routes UI events on
//! the rendered diagram back to caller-supplied callbacks.
//!
//! Converters only compute topology and text. Laying out and drawing the
//! diagram is left to whatever renders the markup.

pub mod markup;
pub mod sequence;
pub mod transition;

pub use sequence::SequenceDiagramConverter;
pub use transition::ScreenTransitionDiagramConverter;

use crate::history::{HistoryEntry, ScreenHistory};
use crate::model::{NoteAddress, NoteId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default maximum label length in characters
pub const DEFAULT_MAX_LABEL_LENGTH: usize = 40;

/// Rendering options shared by the converters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverterOptions {
    pub max_label_length: usize,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            max_label_length: DEFAULT_MAX_LABEL_LENGTH,
        }
    }
}

/// A screen in a diagram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub screen_def: String,
}

/// A transition between two screens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Rendered label (unescaped)
    pub label: String,
    /// Sequences of the operations that performed the transition, ascending
    pub sequences: Vec<u32>,
}

/// What an intra-node mark stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkKind {
    /// Operations that did not change the screen
    Operations { sequences: Vec<u32> },
    /// A note attached to an operation on this screen
    Note { id: NoteId, address: NoteAddress },
}

/// Annotation drawn on a node rather than between nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMark {
    pub id: String,
    pub node: String,
    pub text: String,
    pub kind: MarkKind,
}

/// Intermediate graph representation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub marks: Vec<GraphMark>,
}

/// Node set and edge set by screen definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    pub nodes: BTreeSet<String>,
    pub edges: BTreeSet<(String, String)>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn screen_def_of(&self, id: &str) -> String {
        self.node(id).map(|n| n.screen_def.clone()).unwrap_or_default()
    }

    pub fn topology(&self) -> Topology {
        Topology {
            nodes: self.nodes.iter().map(|n| n.screen_def.clone()).collect(),
            edges: self
                .edges
                .iter()
                .map(|e| (self.screen_def_of(&e.source), self.screen_def_of(&e.target)))
                .collect(),
        }
    }
}

/// Converter output: markup, the graph behind it and the event router
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramGraph {
    pub graph_text: String,
    pub graph: Graph,
    pub extender: GraphExtender,
}

/// UI event on a rendered diagram, identified by graph element id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramEvent {
    EdgeClicked(String),
    NodeClicked(String),
    MarkClicked(String),
    NoteClicked(String),
    NoteRightClicked(String),
}

/// Callbacks invoked synchronously from UI events
pub trait DiagramCallbacks {
    /// An edge or an operation mark was clicked
    fn on_select_operations(&mut self, _sequences: &[u32]) {}

    /// A screen node was clicked
    fn on_select_screen(&mut self, _screen_def: &str) {}

    fn on_click_note(&mut self, _id: &NoteId, _address: NoteAddress) {}

    fn on_right_click_note(&mut self, _id: &NoteId, _address: NoteAddress) {}
}

/// Routes diagram events to callbacks
#[derive(Debug, Clone, PartialEq)]
pub struct GraphExtender {
    graph: Graph,
}

impl GraphExtender {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    pub fn dispatch<C: DiagramCallbacks + ?Sized>(&self, event: &DiagramEvent, callbacks: &mut C) -> Result<()> {
        match event {
            DiagramEvent::EdgeClicked(id) => {
                let edge = self
                    .graph
                    .edges
                    .iter()
                    .find(|e| &e.id == id)
                    .ok_or_else(|| unknown("edge", id))?;
                callbacks.on_select_operations(&edge.sequences);
            }
            DiagramEvent::NodeClicked(id) => {
                let node = self.graph.node(id).ok_or_else(|| unknown("node", id))?;
                callbacks.on_select_screen(&node.screen_def);
            }
            DiagramEvent::MarkClicked(id) => match &self.mark(id)?.kind {
                MarkKind::Operations { sequences } => callbacks.on_select_operations(sequences),
                MarkKind::Note { id, address } => callbacks.on_click_note(id, *address),
            },
            DiagramEvent::NoteClicked(id) => {
                let (note_id, address) = self.note(id)?;
                callbacks.on_click_note(note_id, address);
            }
            DiagramEvent::NoteRightClicked(id) => {
                let (note_id, address) = self.note(id)?;
                callbacks.on_right_click_note(note_id, address);
            }
        }
        Ok(())
    }

    fn mark(&self, id: &str) -> Result<&GraphMark> {
        self.graph
            .marks
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| unknown("mark", id))
    }

    fn note(&self, id: &str) -> Result<(&NoteId, NoteAddress)> {
        match &self.mark(id)?.kind {
            MarkKind::Note { id, address } => Ok((id, *address)),
            MarkKind::Operations { .. } => Err(unknown("note", id)),
        }
    }
}

fn unknown(what: &str, id: &str) -> Error {
    Error::InvalidInput(format!("no {} '{}' in diagram", what, id))
}

fn render_error(err: std::fmt::Error) -> Error {
    Error::InvalidInput(format!("failed to render diagram: {}", err))
}

/// The operation that caused the transition at `index`: the previous
/// operation of the same window.
pub(crate) fn trigger_of(history: &ScreenHistory, index: usize) -> Option<&HistoryEntry> {
    let entries = history.entries();
    let window = entries.get(index)?.window_handle();
    entries[..index]
        .iter()
        .rev()
        .find(|e| e.window_handle() == window)
}
