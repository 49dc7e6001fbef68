//! Diagram orchestration
//!
//! Sequence diagrams are converted per window in independent tasks over a
//! shared read-only snapshot and collected in window order.

use super::SharedSession;
use crate::graph::{ConverterOptions, DiagramGraph, ScreenTransitionDiagramConverter, SequenceDiagramConverter};
use crate::history::ScreenHistory;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::debug;

/// Sequence diagram of one window lane
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDiagram {
    pub window_handle: String,
    /// Display label (`window1`, ...)
    pub label: String,
    pub diagram: DiagramGraph,
}

/// Builds diagrams from screen history snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagramAction {
    options: ConverterOptions,
}

impl DiagramAction {
    pub fn new(options: ConverterOptions) -> Self {
        Self { options }
    }

    /// Snapshot of the current screen history of a session
    pub fn snapshot(session: &SharedSession) -> Arc<ScreenHistory> {
        Arc::new(session.lock().screen_history().clone())
    }

    /// One sequence diagram per window, in first-seen window order
    pub async fn build_sequence_diagrams(&self, history: Arc<ScreenHistory>) -> Result<Vec<WindowDiagram>> {
        let handles: Vec<String> = history.windows().handles().to_vec();
        let mut tasks = Vec::with_capacity(handles.len());
        for handle in &handles {
            let history = Arc::clone(&history);
            let handle = handle.clone();
            let options = self.options;
            tasks.push(tokio::spawn(async move {
                SequenceDiagramConverter::with_options(options).convert(&history, &handle)
            }));
        }

        let mut diagrams = Vec::with_capacity(tasks.len());
        for (handle, task) in handles.into_iter().zip(tasks) {
            let diagram = task
                .await
                .map_err(|e| Error::InvalidInput(format!("diagram task for {} failed: {}", handle, e)))??;
            let label = history.windows().label(&handle).unwrap_or_else(|| handle.clone());
            diagrams.push(WindowDiagram {
                window_handle: handle,
                label,
                diagram,
            });
        }
        debug!(windows = diagrams.len(), "built sequence diagrams");
        Ok(diagrams)
    }

    /// Screen-transition diagram over `window_handles` (all windows when empty)
    pub fn build_screen_transition_diagram(
        &self,
        history: &ScreenHistory,
        window_handles: &[String],
    ) -> Result<DiagramGraph> {
        ScreenTransitionDiagramConverter::with_options(self.options).convert(history, window_handles)
    }
}
