//! Record a captured operation
//!
//! The operation is persisted, appended to the local history and the screen
//! history rebuilt. Screenshot compression then runs in the background and
//! patches the image URL of the already committed step; its failure is only
//! logged.

use super::SharedSession;
use crate::model::{CapturedOperation, ElementInfo, TestStep};
use crate::repository::TestResultRepository;
use crate::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Result of recording one operation
#[derive(Debug)]
pub struct RecordedOperation {
    pub step: TestStep,
    /// Background compression, when the operation carried a screenshot
    pub compression: Option<JoinHandle<()>>,
}

/// Records operations into a session
pub struct RecordOperationAction<R> {
    repository: Arc<R>,
}

impl<R: TestResultRepository + 'static> RecordOperationAction<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Persist and commit `captured`. `screen_elements` are the elements
    /// discovered on its screen, merged into the coverage sources.
    pub async fn record(
        &self,
        session: &SharedSession,
        captured: CapturedOperation,
        screen_elements: &[ElementInfo],
    ) -> Result<RecordedOperation> {
        let test_result_id = session.lock().test_result_id().to_string();
        let step = self.repository.post_operation(&test_result_id, &captured).await?;

        {
            let mut session = session.lock();
            session.history_mut().append(step.clone())?;
            if !screen_elements.is_empty() {
                let added = session
                    .coverage_sources_mut()
                    .register(&captured.screen_def, screen_elements);
                debug!(screen = %captured.screen_def, added, "registered coverage elements");
            }
            session.rebuild()?;
        }

        let compression = step
            .operation
            .image_url
            .as_ref()
            .map(|_| self.spawn_compression(session, test_result_id, step.sequence()));

        Ok(RecordedOperation { step, compression })
    }

    fn spawn_compression(&self, session: &SharedSession, test_result_id: String, sequence: u32) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let session = Arc::clone(session);
        tokio::spawn(async move {
            match repository.compress_image(&test_result_id, sequence).await {
                Ok(image_url) => {
                    let mut session = session.lock();
                    if let Err(e) = session.history_mut().replace_image_url(sequence, &image_url) {
                        warn!(sequence, error = %e, "failed to apply compressed image");
                    } else if let Err(e) = session.rebuild() {
                        warn!(sequence, error = %e, "failed to rebuild screen history");
                    }
                }
                Err(e) => {
                    warn!(sequence, error = %e, "image compression failed");
                }
            }
        })
    }
}
