//! Orchestrators
//!
//! Combine the derivation core with a [`TestResultRepository`]. Backend calls
//! always happen first; the local session changes only after they succeed.
//! The derived projections (screen history) are rebuilt from scratch after
//! every local change.

pub mod diagram;
pub mod generate;
pub mod note;
pub mod record;
pub mod resume;

pub use diagram::{DiagramAction, WindowDiagram};
pub use generate::GenerateTestScriptsAction;
pub use note::NoteAction;
pub use record::{RecordOperationAction, RecordedOperation};
pub use resume::ResumeAction;

use crate::coverage::{CoverageSource, CoverageSources};
use crate::history::ScreenHistory;
use crate::model::{OperationHistory, TestResultMetadata};
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Session shared between orchestrators and background tasks
pub type SharedSession = Arc<Mutex<RecordingSession>>;

/// Local state of the test result being recorded
#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub metadata: TestResultMetadata,
    history: OperationHistory,
    coverage_sources: CoverageSources,
    screen_history: ScreenHistory,
}

impl RecordingSession {
    pub fn new(
        metadata: TestResultMetadata,
        history: OperationHistory,
        coverage_sources: Vec<CoverageSource>,
    ) -> Result<Self> {
        let coverage_sources = CoverageSources::from(coverage_sources);
        let screen_history = ScreenHistory::build(history.steps(), coverage_sources.as_slice())?;
        Ok(Self {
            metadata,
            history,
            coverage_sources,
            screen_history,
        })
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn test_result_id(&self) -> &str {
        &self.metadata.id
    }

    pub fn history(&self) -> &OperationHistory {
        &self.history
    }

    pub fn coverage_sources(&self) -> &CoverageSources {
        &self.coverage_sources
    }

    pub fn screen_history(&self) -> &ScreenHistory {
        &self.screen_history
    }

    pub(crate) fn history_mut(&mut self) -> &mut OperationHistory {
        &mut self.history
    }

    pub(crate) fn coverage_sources_mut(&mut self) -> &mut CoverageSources {
        &mut self.coverage_sources
    }

    /// Rebuild the screen history from the operation history
    pub fn rebuild(&mut self) -> Result<()> {
        self.screen_history = ScreenHistory::build(self.history.steps(), self.coverage_sources.as_slice())?;
        Ok(())
    }
}
