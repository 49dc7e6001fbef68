//! Screen Transition Diagram Converter
//!
//! Nodes are distinct screen definitions across the selected windows; an edge
//! is drawn once per `(source, target)` pair no matter how often the
//! transition was observed, and carries every contributing operation.

use super::markup::label;
use super::{render_error, trigger_of, ConverterOptions, DiagramGraph, Graph, GraphEdge, GraphExtender, GraphNode};
use crate::history::ScreenHistory;
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt::Write;
use tracing::debug;

/// Separator between the distinct triggers of a collapsed edge
const LABEL_SEPARATOR: &str = " / ";

/// Screen transition diagram converter
pub struct ScreenTransitionDiagramConverter {
    options: ConverterOptions,
}

impl ScreenTransitionDiagramConverter {
    pub fn new() -> Self {
        Self::with_options(ConverterOptions::default())
    }

    pub fn with_options(options: ConverterOptions) -> Self {
        Self { options }
    }

    /// Convert the given windows; an empty selection means every window
    pub fn convert(&self, history: &ScreenHistory, window_handles: &[String]) -> Result<DiagramGraph> {
        if let Some(unknown) = window_handles
            .iter()
            .find(|h| !history.windows().contains(h))
        {
            return Err(Error::InvalidInput(format!(
                "window '{}' does not appear in the history",
                unknown
            )));
        }
        let selected = |handle: &str| window_handles.is_empty() || window_handles.iter().any(|h| h == handle);

        let mut graph = Graph::default();
        let mut node_ids: HashMap<String, String> = HashMap::new();
        let mut edge_index: HashMap<(String, String), usize> = HashMap::new();
        let mut triggers: Vec<Vec<String>> = Vec::new();

        for (index, entry) in history.entries().iter().enumerate() {
            if !selected(entry.window_handle()) {
                continue;
            }
            let target = node_for(&mut graph, &mut node_ids, entry.screen_def());

            let Some(source) = entry
                .transition
                .as_ref()
                .and_then(|t| t.source.as_ref())
            else {
                continue;
            };
            let source = node_for(&mut graph, &mut node_ids, &source.screen_def);

            let trigger = trigger_of(history, index)
                .map(|t| t.step.operation.describe())
                .unwrap_or_else(|| entry.step.operation.describe());

            let position = *edge_index
                .entry((source.clone(), target.clone()))
                .or_insert_with(|| {
                    graph.edges.push(GraphEdge {
                        id: format!("e{}", graph.edges.len()),
                        source,
                        target,
                        label: String::new(),
                        sequences: Vec::new(),
                    });
                    triggers.push(Vec::new());
                    graph.edges.len() - 1
                });

            graph.edges[position].sequences.push(entry.sequence());
            if !triggers[position].contains(&trigger) {
                triggers[position].push(trigger);
            }
        }

        for (edge, labels) in graph.edges.iter_mut().zip(triggers) {
            edge.label = labels.join(LABEL_SEPARATOR);
        }

        let mut graph_text = String::new();
        self.render(&graph, &mut graph_text).map_err(render_error)?;

        debug!(
            windows = window_handles.len(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "converted screen transition diagram"
        );

        Ok(DiagramGraph {
            graph_text,
            extender: GraphExtender::new(graph.clone()),
            graph,
        })
    }

    fn render(&self, graph: &Graph, out: &mut String) -> std::fmt::Result {
        let max = self.options.max_label_length;
        writeln!(out, "graph TD")?;
        for node in &graph.nodes {
            writeln!(out, "{}[\"{}\"]", node.id, label(&node.screen_def, max))?;
        }
        for edge in &graph.edges {
            writeln!(
                out,
                "{} -->|\"{}\"| {}",
                edge.source,
                label(&edge.label, max),
                edge.target
            )?;
        }
        Ok(())
    }
}

impl Default for ScreenTransitionDiagramConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn node_for(graph: &mut Graph, node_ids: &mut HashMap<String, String>, screen_def: &str) -> String {
    node_ids
        .entry(screen_def.to_string())
        .or_insert_with(|| {
            let id = format!("s{}", graph.nodes.len());
            graph.nodes.push(GraphNode {
                id: id.clone(),
                screen_def: screen_def.to_string(),
            });
            id
        })
        .clone()
}
