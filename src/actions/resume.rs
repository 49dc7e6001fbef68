//! Resume a test result from the backend

use super::RecordingSession;
use crate::model::OperationHistory;
use crate::repository::TestResultRepository;
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Loads a test result into a fresh recording session
pub struct ResumeAction<R> {
    repository: Arc<R>,
}

impl<R: TestResultRepository> ResumeAction<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn resume(&self, test_result_id: &str) -> Result<RecordingSession> {
        let (metadata, steps, coverage_sources) = tokio::try_join!(
            self.repository.get_test_result(test_result_id),
            self.repository.get_test_steps(test_result_id),
            self.repository.get_coverage_sources(test_result_id),
        )?;

        let history = OperationHistory::from_steps(steps)?;
        let session = RecordingSession::new(metadata, history, coverage_sources)?;

        info!(
            test_result = test_result_id,
            operations = session.history().len(),
            windows = session.screen_history().windows().len(),
            "resumed test result"
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{captured, FakeRepository};
    use crate::model::{Operation, OperationType, TestStep};
    use crate::Error;

    #[tokio::test]
    async fn test_resume_builds_session() {
        let repository = FakeRepository::new();
        {
            let mut state = repository.state.lock();
            for (i, screen) in ["Login", "Home"].iter().enumerate() {
                let sequence = i as u32 + 1;
                state.steps.push(TestStep::new(
                    format!("step-{}", sequence),
                    Operation::from_captured(sequence, captured("w1", screen, OperationType::Click)),
                ));
            }
        }

        let session = ResumeAction::new(repository).resume("r1").await.unwrap();
        assert_eq!(session.test_result_id(), "r1");
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.screen_history().edges().count(), 1);
    }

    #[tokio::test]
    async fn test_resume_rejects_inconsistent_steps() {
        let repository = FakeRepository::new();
        repository.state.lock().steps.push(TestStep::new(
            "step-2",
            Operation::from_captured(2, captured("w1", "Login", OperationType::Click)),
        ));

        let result = ResumeAction::new(repository).resume("r1").await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
