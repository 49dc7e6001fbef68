//! Note orchestration
//!
//! Every mutation is first rehearsed on a scratch copy of the history. That
//! validates it and yields the step linkages to send. The local session is
//! only touched once the backend accepted every call. Notes are addressed
//! by id; the position is looked up again at commit time.

use super::SharedSession;
use crate::model::{Note, NoteAddress, NoteDraft, NoteEdit, NoteId, NoteLinkage, OperationHistory};
use crate::repository::TestResultRepository;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Add, edit, move and delete notes of a session
pub struct NoteAction<R> {
    repository: Arc<R>,
}

impl<R: TestResultRepository> NoteAction<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Persist a new note and link it to its test step
    pub async fn add(&self, session: &SharedSession, draft: NoteDraft) -> Result<Note> {
        let (test_result_id, mut scratch) = snapshot(session);
        // Placeholder id: only the slot checks matter here
        scratch.add_note(draft.clone().into_note(NoteId::new("")))?;

        let note = self.repository.post_note(&test_result_id, &draft).await?;
        let (_, mut linked) = snapshot(session);
        let address = linked.add_note(note.clone())?;
        let linkage = linkage_of(&linked, address.sequence)?;

        if let Err(e) = self
            .repository
            .patch_test_step(&test_result_id, address.sequence, &linkage)
            .await
        {
            if let Err(cleanup) = self.repository.delete_note(&test_result_id, &note.id).await {
                warn!(note = %note.id, error = %cleanup, "failed to remove unlinked note");
            }
            return Err(e);
        }

        let mut session = session.lock();
        session.history_mut().add_note(note.clone())?;
        session.rebuild()?;
        debug!(note = %note.id, kind = %note.kind, sequence = note.sequence, "added note");
        Ok(note)
    }

    /// Update the content of a note
    pub async fn edit(&self, session: &SharedSession, id: &NoteId, edit: &NoteEdit) -> Result<Note> {
        let (test_result_id, history) = snapshot(session);
        locate(&history, id)?;

        let note = self.repository.put_note(&test_result_id, id, edit).await?;

        let mut session = session.lock();
        let address = locate(session.history(), id)?;
        session.history_mut().replace_note(address, note.clone())?;
        session.rebuild()?;
        Ok(note)
    }

    /// Move a note to the test step `dest`.
    ///
    /// The destination is linked before the source is unlinked. If unlinking
    /// fails, the destination linkage is restored and the error returned, so
    /// the note stays attached to exactly one step.
    pub async fn move_note(&self, session: &SharedSession, id: &NoteId, dest: u32) -> Result<NoteAddress> {
        let (test_result_id, mut scratch) = snapshot(session);
        let from = locate(&scratch, id)?;
        if from.sequence == dest {
            return Ok(from);
        }

        let dest_before = linkage_of(&scratch, dest)?;
        scratch.move_note(from, dest)?;
        let dest_after = linkage_of(&scratch, dest)?;
        let source_after = linkage_of(&scratch, from.sequence)?;

        self.repository
            .patch_test_step(&test_result_id, dest, &dest_after)
            .await?;
        if let Err(e) = self
            .repository
            .patch_test_step(&test_result_id, from.sequence, &source_after)
            .await
        {
            if let Err(restore) = self
                .repository
                .patch_test_step(&test_result_id, dest, &dest_before)
                .await
            {
                warn!(note = %id, dest, error = %restore, "failed to restore destination linkage");
            }
            return Err(e);
        }

        let mut session = session.lock();
        let from = locate(session.history(), id)?;
        let address = session.history_mut().move_note(from, dest)?;
        session.rebuild()?;
        Ok(address)
    }

    /// Unlink and delete a note. The step is relinked if deletion fails.
    pub async fn delete(&self, session: &SharedSession, id: &NoteId) -> Result<Note> {
        let (test_result_id, mut scratch) = snapshot(session);
        let address = locate(&scratch, id)?;
        let before = linkage_of(&scratch, address.sequence)?;
        scratch.delete_note(address)?;
        let after = linkage_of(&scratch, address.sequence)?;

        self.repository
            .patch_test_step(&test_result_id, address.sequence, &after)
            .await?;
        if let Err(e) = self.repository.delete_note(&test_result_id, id).await {
            if let Err(relink) = self
                .repository
                .patch_test_step(&test_result_id, address.sequence, &before)
                .await
            {
                warn!(note = %id, sequence = address.sequence, error = %relink, "failed to relink note");
            }
            return Err(e);
        }

        let mut session = session.lock();
        let address = locate(session.history(), id)?;
        let note = session.history_mut().delete_note(address)?;
        session.rebuild()?;
        Ok(note)
    }
}

fn snapshot(session: &SharedSession) -> (String, OperationHistory) {
    let session = session.lock();
    (session.test_result_id().to_string(), session.history().clone())
}

fn locate(history: &OperationHistory, id: &NoteId) -> Result<NoteAddress> {
    history
        .locate(id)
        .ok_or_else(|| Error::InvalidInput(format!("no note with id {}", id)))
}

fn linkage_of(history: &OperationHistory, sequence: u32) -> Result<NoteLinkage> {
    history
        .step(sequence)
        .map(|step| step.linkage())
        .ok_or_else(|| Error::InvalidInput(format!("no test step with sequence {}", sequence)))
}
