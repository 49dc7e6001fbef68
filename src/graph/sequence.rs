//! Sequence Diagram Converter
//!
//! One lane per window. Participants are the screens the window visited, in
//! visitation order. A screen change becomes a message between participants;
//! operations that stay on the same screen and notes become marks on the
//! participant.

use super::markup::label;
use super::{render_error, trigger_of, ConverterOptions, DiagramGraph, Graph, GraphEdge, GraphExtender, GraphMark, GraphNode, MarkKind};
use crate::history::ScreenHistory;
use crate::model::{NoteAddress, NoteKind};
use crate::{Error, Result};
use std::fmt::Write;
use tracing::debug;

/// Sequence diagram converter
pub struct SequenceDiagramConverter {
    options: ConverterOptions,
}

impl SequenceDiagramConverter {
    pub fn new() -> Self {
        Self::with_options(ConverterOptions::default())
    }

    pub fn with_options(options: ConverterOptions) -> Self {
        Self { options }
    }

    /// Convert the lane of one window
    pub fn convert(&self, history: &ScreenHistory, window_handle: &str) -> Result<DiagramGraph> {
        if !history.windows().contains(window_handle) {
            return Err(Error::InvalidInput(format!(
                "window '{}' does not appear in the history",
                window_handle
            )));
        }

        let graph = self.build_graph(history, window_handle);
        let mut graph_text = String::new();
        self.render(&graph, &mut graph_text).map_err(render_error)?;

        debug!(
            window = window_handle,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            marks = graph.marks.len(),
            "converted sequence diagram"
        );

        Ok(DiagramGraph {
            graph_text,
            extender: GraphExtender::new(graph.clone()),
            graph,
        })
    }

    fn build_graph(&self, history: &ScreenHistory, window_handle: &str) -> Graph {
        let mut graph = Graph::default();
        let mut previous: Option<String> = None;

        for segment in history.window_segments(window_handle) {
            let node = node_id(&mut graph, &segment.screen.screen_def);
            let entries = history.segment_entries(segment);
            let mut operations = Vec::new();

            for (offset, entry) in entries.iter().enumerate() {
                let is_edge = entry.transition.as_ref().is_some_and(|t| t.is_edge());
                match (&previous, is_edge) {
                    (Some(source), true) if source != &node => {
                        let trigger = trigger_of(history, segment.entries.start + offset)
                            .map(|t| t.step.operation.describe())
                            .unwrap_or_else(|| entry.step.operation.describe());
                        graph.edges.push(GraphEdge {
                            id: format!("e{}", graph.edges.len()),
                            source: source.clone(),
                            target: node.clone(),
                            label: trigger,
                            sequences: vec![entry.sequence()],
                        });
                    }
                    _ => operations.push(entry.sequence()),
                }
            }

            if !operations.is_empty() {
                let text = operations
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                graph.marks.push(GraphMark {
                    id: format!("m{}", graph.marks.len()),
                    node: node.clone(),
                    text: format!("ops {}", text),
                    kind: MarkKind::Operations { sequences: operations },
                });
            }

            for entry in entries {
                for kind in [NoteKind::Intention, NoteKind::Bug, NoteKind::Notice] {
                    for (index, note) in entry.step.notes(kind).iter().enumerate() {
                        graph.marks.push(GraphMark {
                            id: format!("m{}", graph.marks.len()),
                            node: node.clone(),
                            text: format!("{}: {}", kind, note.value),
                            kind: MarkKind::Note {
                                id: note.id.clone(),
                                address: NoteAddress::new(kind, entry.sequence(), index),
                            },
                        });
                    }
                }
            }

            previous = Some(node);
        }

        graph
    }

    fn render(&self, graph: &Graph, out: &mut String) -> std::fmt::Result {
        let max = self.options.max_label_length;
        writeln!(out, "sequenceDiagram")?;
        for node in &graph.nodes {
            writeln!(out, "participant {} as {}", node.id, label(&node.screen_def, max))?;
        }

        // Marks and messages interleave in the order the lane produced them
        let mut events: Vec<(u32, String)> = Vec::new();
        for edge in &graph.edges {
            let at = edge.sequences.first().copied().unwrap_or_default();
            events.push((
                at,
                format!("{}->>{}: {}", edge.source, edge.target, label(&edge.label, max)),
            ));
        }
        for mark in &graph.marks {
            let (at, line) = match &mark.kind {
                MarkKind::Operations { sequences } => (
                    sequences.first().copied().unwrap_or_default(),
                    format!("Note over {}: {}", mark.node, label(&mark.text, max)),
                ),
                MarkKind::Note { address, .. } => (
                    address.sequence,
                    format!("Note right of {}: {}", mark.node, label(&mark.text, max)),
                ),
            };
            events.push((at, line));
        }
        // Stable sort keeps edges ahead of marks with the same sequence
        events.sort_by_key(|(at, _)| *at);

        for (_, line) in events {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}

impl Default for SequenceDiagramConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn node_id(graph: &mut Graph, screen_def: &str) -> String {
    if let Some(node) = graph.nodes.iter().find(|n| n.screen_def == screen_def) {
        return node.id.clone();
    }
    let id = format!("s{}", graph.nodes.len());
    graph.nodes.push(GraphNode {
        id: id.clone(),
        screen_def: screen_def.to_string(),
    });
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DiagramEvent;
    use crate::model::{CapturedOperation, ElementInfo, KeywordSet, NoteDraft, NoteId, Operation, OperationType, TestStep};
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
                    url: String::new(),
                    element: Some(ElementInfo::new("button", &format!("/button[{}]", sequence))),
                    op_type: OperationType::Click,
                    input: None,
                    keywords: KeywordSet::new(),
                    image_url: None,
                    timestamp: Utc::now(),
                },
            ),
        )
    }

    fn login_home() -> ScreenHistory {
        let steps = vec![
            make_step(1, "w1", "Login"),
            make_step(2, "w1", "Home"),
            make_step(3, "w1", "Home"),
        ];
        ScreenHistory::build(&steps, &[]).unwrap()
    }

    #[test]
    fn test_login_home_single_edge() {
        let diagram = SequenceDiagramConverter::new().convert(&login_home(), "w1").unwrap();

        assert_eq!(diagram.graph.nodes.len(), 2);
        assert_eq!(diagram.graph.edges.len(), 1);
        let edge = &diagram.graph.edges[0];
        assert_eq!(edge.sequences, vec![2]);
        assert_eq!((edge.source.as_str(), edge.target.as_str()), ("s0", "s1"));

        assert!(diagram.graph_text.starts_with("sequenceDiagram\n"));
        assert!(diagram.graph_text.contains("participant s0 as Login"));
        assert!(diagram.graph_text.contains("s0->>s1: "));
        assert!(diagram.graph_text.contains("Note over s1: ops 3"));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let converter = SequenceDiagramConverter::new();
        let first = converter.convert(&login_home(), "w1").unwrap();
        let second = converter.convert(&login_home(), "w1").unwrap();
        assert_eq!(first.graph_text, second.graph_text);
        assert_eq!(first.graph.topology(), second.graph.topology());
    }

    #[test]
    fn test_unknown_window_rejected() {
        let result = SequenceDiagramConverter::new().convert(&login_home(), "nope");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_lane_ignores_other_windows() {
        let steps = vec![
            make_step(1, "w1", "Search"),
            make_step(2, "w2", "Detail"),
            make_step(3, "w1", "Result"),
        ];
        let history = ScreenHistory::build(&steps, &[]).unwrap();
        let diagram = SequenceDiagramConverter::new().convert(&history, "w1").unwrap();

        assert_eq!(diagram.graph.nodes.len(), 2);
        assert!(!diagram.graph_text.contains("Detail"));
        assert_eq!(diagram.graph.edges[0].sequences, vec![3]);
        // Trigger is the previous operation of the same window
        assert_eq!(diagram.graph.edges[0].label, "click button");
    }

    #[test]
    fn test_notes_become_marks() {
        let mut steps = vec![make_step(1, "w1", "Login"), make_step(2, "w1", "Home")];
        steps[1]
            .bugs
            .push(NoteDraft::bug(2, "broken; logo", "").into_note(NoteId::new("b1")));
        let history = ScreenHistory::build(&steps, &[]).unwrap();
        let diagram = SequenceDiagramConverter::new().convert(&history, "w1").unwrap();

        assert!(diagram.graph_text.contains("Note right of s1: bug: broken#59; logo"));

        let mark = diagram
            .graph
            .marks
            .iter()
            .find(|m| matches!(m.kind, MarkKind::Note { .. }))
            .unwrap();

        struct Clicked(Option<NoteAddress>);
        impl crate::graph::DiagramCallbacks for Clicked {
            fn on_click_note(&mut self, _id: &NoteId, address: NoteAddress) {
                self.0 = Some(address);
            }
        }
        let mut clicked = Clicked(None);
        diagram
            .extender
            .dispatch(&DiagramEvent::NoteClicked(mark.id.clone()), &mut clicked)
            .unwrap();
        assert_eq!(clicked.0, Some(NoteAddress::new(NoteKind::Bug, 2, 0)));
    }

    #[test]
    fn test_long_labels_truncated() {
        let steps = vec![make_step(1, "w1", "A very long screen definition name indeed")];
        let history = ScreenHistory::build(&steps, &[]).unwrap();
        let converter = SequenceDiagramConverter::with_options(ConverterOptions { max_label_length: 10 });
        let diagram = converter.convert(&history, "w1").unwrap();
        assert!(diagram.graph_text.contains("participant s0 as A very ..."));
    }
}
