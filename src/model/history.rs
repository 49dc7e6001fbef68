//! Operation History
//!
//! The ordered, gap-free list of test steps of one test result, and the only
//! place where notes are attached, edited, relocated and removed.
//!
//! Notes can be addressed positionally ([`NoteAddress`]) or by their stable
//! [`NoteId`] through [`OperationHistory::locate`]. Every mutation validates
//! all of its preconditions before touching any step, so a failed call leaves
//! the history exactly as it was.

use super::note::{Note, NoteAddress, NoteEdit, NoteId, NoteKind};
use super::test_step::TestStep;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHistory {
    steps: Vec<TestStep>,
}

impl OperationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and adopt a list of steps (e.g. fetched on resume)
    pub fn from_steps(steps: Vec<TestStep>) -> Result<Self> {
        let mut history = Self::new();
        for step in steps {
            history.append(step)?;
        }
        Ok(history)
    }

    /// Append the next step; its sequence must be exactly `len() + 1`
    pub fn append(&mut self, step: TestStep) -> Result<()> {
        let expected = self.next_sequence();
        if step.sequence() != expected {
            return Err(Error::InvalidInput(format!(
                "expected sequence {}, got {}",
                expected,
                step.sequence()
            )));
        }
        if step.operation.window_handle.is_empty() {
            return Err(Error::InvalidInput(format!(
                "operation {} has no window handle",
                step.sequence()
            )));
        }
        if let Some(note) = step.all_notes().find(|n| n.sequence != expected) {
            return Err(Error::InvalidInput(format!(
                "note {} claims sequence {} but is attached to {}",
                note.id, note.sequence, expected
            )));
        }
        if let Some(intention) = &step.intention {
            if intention.kind != NoteKind::Intention {
                return Err(Error::InvalidInput(format!(
                    "note {} in intention slot is a {}",
                    intention.id, intention.kind
                )));
            }
        }
        self.steps.push(step);
        Ok(())
    }

    pub fn next_sequence(&self) -> u32 {
        self.steps.len() as u32 + 1
    }

    pub fn steps(&self) -> &[TestStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<TestStep> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, sequence: u32) -> Option<&TestStep> {
        let index = (sequence as usize).checked_sub(1)?;
        self.steps.get(index)
    }

    fn step_mut(&mut self, sequence: u32) -> Result<&mut TestStep> {
        let index = (sequence as usize)
            .checked_sub(1)
            .ok_or_else(|| Error::InvalidInput("sequence numbers start at 1".to_string()))?;
        self.steps
            .get_mut(index)
            .ok_or_else(|| Error::InvalidInput(format!("no test step with sequence {}", sequence)))
    }

    /// Side channel for the compressed screenshot URL
    pub fn replace_image_url(&mut self, sequence: u32, image_url: &str) -> Result<()> {
        let step = self.step_mut(sequence)?;
        step.operation = step.operation.with_image_url(image_url);
        Ok(())
    }

    /// Find the current position of a note by id
    pub fn locate(&self, id: &NoteId) -> Option<NoteAddress> {
        self.steps.iter().find_map(|step| {
            step.position_of(id)
                .map(|(kind, index)| NoteAddress::new(kind, step.sequence(), index))
        })
    }

    pub fn note(&self, address: NoteAddress) -> Result<&Note> {
        let step = self
            .step(address.sequence)
            .ok_or_else(|| inconsistent(address))?;
        step.notes(address.kind)
            .get(address.index)
            .ok_or_else(|| inconsistent(address))
    }

    /// Attach a persisted note to the step named by `note.sequence`
    pub fn add_note(&mut self, note: Note) -> Result<NoteAddress> {
        if self.locate(&note.id).is_some() {
            return Err(Error::InvalidInput(format!("note {} is already attached", note.id)));
        }
        let sequence = note.sequence;
        let kind = note.kind;
        let step = self.step_mut(sequence)?;
        let index = attach(step, note)?;
        Ok(NoteAddress::new(kind, sequence, index))
    }

    /// Merge an edit into the note at `address` and return the new value
    pub fn edit_note(&mut self, address: NoteAddress, edit: &NoteEdit) -> Result<Note> {
        let merged = self.note(address)?.merged(edit);
        self.replace_note(address, merged.clone())?;
        Ok(merged)
    }

    /// Replace the note at `address`, keeping its position
    pub fn replace_note(&mut self, address: NoteAddress, note: Note) -> Result<()> {
        self.note(address)?;
        if note.kind != address.kind || note.sequence != address.sequence {
            return Err(Error::InvalidInput(format!(
                "replacement note {} does not match {} slot of step {}",
                note.id, address.kind, address.sequence
            )));
        }
        let step = self.step_mut(address.sequence)?;
        match address.kind {
            NoteKind::Intention => step.intention = Some(note),
            NoteKind::Bug => step.bugs[address.index] = note,
            NoteKind::Notice => step.notices[address.index] = note,
        }
        Ok(())
    }

    /// Move a note to another step. Moving onto the owning step is a no-op.
    pub fn move_note(&mut self, from: NoteAddress, dest: u32) -> Result<NoteAddress> {
        let note = self.note(from)?.clone();
        if from.sequence == dest {
            return Ok(from);
        }
        let dest_step = self
            .step(dest)
            .ok_or_else(|| Error::InvalidInput(format!("no test step with sequence {}", dest)))?;
        if from.kind == NoteKind::Intention && dest_step.intention.is_some() {
            return Err(Error::InvalidInput(format!(
                "test step {} already has an intention",
                dest
            )));
        }

        // All preconditions hold; neither step below can fail.
        self.detach(from)?;
        let step = self.step_mut(dest)?;
        let index = attach(step, note.relocated(dest))?;
        debug!(note = %note.id, from = from.sequence, dest, "moved note");
        Ok(NoteAddress::new(from.kind, dest, index))
    }

    /// Remove and return the note at `address`
    pub fn delete_note(&mut self, address: NoteAddress) -> Result<Note> {
        self.note(address)?;
        self.detach(address)
    }

    fn detach(&mut self, address: NoteAddress) -> Result<Note> {
        let step = self.step_mut(address.sequence)?;
        let removed = match address.kind {
            NoteKind::Intention => step.intention.take(),
            NoteKind::Bug if address.index < step.bugs.len() => Some(step.bugs.remove(address.index)),
            NoteKind::Notice if address.index < step.notices.len() => {
                Some(step.notices.remove(address.index))
            }
            _ => None,
        };
        removed.ok_or_else(|| inconsistent(address))
    }
}

fn attach(step: &mut TestStep, note: Note) -> Result<usize> {
    match note.kind {
        NoteKind::Intention => {
            if step.intention.is_some() {
                return Err(Error::InvalidInput(format!(
                    "test step {} already has an intention",
                    step.sequence()
                )));
            }
            step.intention = Some(note);
            Ok(0)
        }
        NoteKind::Bug => {
            step.bugs.push(note);
            Ok(step.bugs.len() - 1)
        }
        NoteKind::Notice => {
            step.notices.push(note);
            Ok(step.notices.len() - 1)
        }
    }
}

fn inconsistent(address: NoteAddress) -> Error {
    Error::InconsistentNoteLink {
        kind: address.kind,
        sequence: address.sequence,
        index: address.index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::note::NoteDraft;
    use crate::model::operation::{CapturedOperation, KeywordSet, Operation, OperationType};
    use chrono::Utc;

    fn make_step(sequence: u32) -> TestStep {
        let op = Operation::from_captured(
            sequence,
            CapturedOperation {
                window_handle: "w1".to_string(),
                screen_def: format!("Screen{}", sequence),
                title: String::new(),
                url: String::new(),
                element: None,
                op_type: OperationType::Click,
                input: None,
                keywords: KeywordSet::new(),
                image_url: Some(format!("/raw/{}.png", sequence)),
                timestamp: Utc::now(),
            },
        );
        TestStep::new(format!("s{}", sequence), op)
    }

    fn make_history(len: u32) -> OperationHistory {
        OperationHistory::from_steps((1..=len).map(make_step).collect()).unwrap()
    }

    fn all_ids(history: &OperationHistory) -> Vec<(u32, NoteId)> {
        history
            .steps()
            .iter()
            .flat_map(|s| s.all_notes().map(move |n| (s.sequence(), n.id.clone())))
            .collect()
    }

    #[test]
    fn test_append_requires_gap_free_sequence() {
        let mut history = OperationHistory::new();
        history.append(make_step(1)).unwrap();
        let err = history.append(make_step(3)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        history.append(make_step(2)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.next_sequence(), 3);
    }

    #[test]
    fn test_from_steps_rejects_zero_start() {
        let result = OperationHistory::from_steps(vec![make_step(0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_append_rejects_empty_window() {
        let mut step = make_step(1);
        step.operation.window_handle.clear();
        assert!(OperationHistory::new().append(step).is_err());
    }

    #[test]
    fn test_replace_image_url() {
        let mut history = make_history(2);
        history.replace_image_url(2, "/compressed/2.webp").unwrap();
        assert_eq!(
            history.step(2).unwrap().operation.image_url.as_deref(),
            Some("/compressed/2.webp")
        );
        assert_eq!(
            history.step(1).unwrap().operation.image_url.as_deref(),
            Some("/raw/1.png")
        );
        assert!(history.replace_image_url(9, "/x").is_err());
    }

    #[test]
    fn test_add_and_locate() {
        let mut history = make_history(2);
        let a = history.add_note(NoteDraft::bug(2, "a", "").into_note(NoteId::new("a"))).unwrap();
        let b = history.add_note(NoteDraft::bug(2, "b", "").into_note(NoteId::new("b"))).unwrap();
        assert_eq!(a, NoteAddress::new(NoteKind::Bug, 2, 0));
        assert_eq!(b, NoteAddress::new(NoteKind::Bug, 2, 1));
        assert_eq!(history.locate(&NoteId::new("b")), Some(b));

        // Same id twice is rejected
        let dup = history.add_note(NoteDraft::bug(1, "b", "").into_note(NoteId::new("b")));
        assert!(dup.is_err());
    }

    #[test]
    fn test_single_intention_per_step() {
        let mut history = make_history(1);
        history
            .add_note(NoteDraft::intention(1, "first", "").into_note(NoteId::new("i1")))
            .unwrap();
        let second = history.add_note(NoteDraft::intention(1, "second", "").into_note(NoteId::new("i2")));
        assert!(matches!(second, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_edit_note() {
        let mut history = make_history(1);
        let address = history
            .add_note(NoteDraft::notice(1, "slow", "", vec![]).into_note(NoteId::new("n")))
            .unwrap();
        let edited = history
            .edit_note(
                address,
                &NoteEdit {
                    details: Some("3 seconds".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(edited.details, "3 seconds");
        assert_eq!(history.note(address).unwrap().details, "3 seconds");
        assert_eq!(history.note(address).unwrap().value, "slow");
    }

    #[test]
    fn test_move_note_attaches_exactly_once() {
        let mut history = make_history(3);
        history.add_note(NoteDraft::bug(1, "keep", "").into_note(NoteId::new("k"))).unwrap();
        let from = history.add_note(NoteDraft::bug(1, "move", "").into_note(NoteId::new("m"))).unwrap();

        let to = history.move_note(from, 3).unwrap();
        assert_eq!(to, NoteAddress::new(NoteKind::Bug, 3, 0));

        let ids = all_ids(&history);
        assert_eq!(ids.iter().filter(|(_, id)| id.as_str() == "m").count(), 1);
        assert!(ids.contains(&(3, NoteId::new("m"))));
        assert!(!history.step(1).unwrap().bugs.iter().any(|n| n.id.as_str() == "m"));
        assert_eq!(history.note(to).unwrap().sequence, 3);
    }

    #[test]
    fn test_move_note_to_same_step_is_noop() {
        let mut history = make_history(2);
        history.add_note(NoteDraft::notice(2, "a", "", vec![]).into_note(NoteId::new("a"))).unwrap();
        let from = history.add_note(NoteDraft::notice(2, "b", "", vec![]).into_note(NoteId::new("b"))).unwrap();
        let before = history.clone();

        let to = history.move_note(from, 2).unwrap();
        assert_eq!(to, from);
        assert_eq!(history, before);
    }

    #[test]
    fn test_move_note_failure_leaves_history_untouched() {
        let mut history = make_history(2);
        let from = history
            .add_note(NoteDraft::intention(1, "a", "").into_note(NoteId::new("a")))
            .unwrap();
        history
            .add_note(NoteDraft::intention(2, "b", "").into_note(NoteId::new("b")))
            .unwrap();
        let before = history.clone();

        // Destination already has an intention
        assert!(history.move_note(from, 2).is_err());
        // Destination does not exist
        assert!(history.move_note(from, 7).is_err());
        assert_eq!(history, before);
    }

    #[test]
    fn test_stale_index_is_inconsistent_link() {
        let mut history = make_history(1);
        let err = history
            .move_note(NoteAddress::new(NoteKind::Bug, 1, 4), 1)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InconsistentNoteLink { kind: NoteKind::Bug, sequence: 1, index: 4 }
        ));
        let err = history.delete_note(NoteAddress::new(NoteKind::Notice, 1, 0)).unwrap_err();
        assert_eq!(err.code(), "inconsistent-note-link");
    }

    #[test]
    fn test_delete_note_shifts_positions() {
        let mut history = make_history(1);
        let first = history.add_note(NoteDraft::bug(1, "1", "").into_note(NoteId::new("1"))).unwrap();
        history.add_note(NoteDraft::bug(1, "2", "").into_note(NoteId::new("2"))).unwrap();

        let removed = history.delete_note(first).unwrap();
        assert_eq!(removed.id.as_str(), "1");
        assert_eq!(history.locate(&NoteId::new("2")), Some(NoteAddress::new(NoteKind::Bug, 1, 0)));
    }

    #[test]
    fn test_replace_note_rejects_mismatched_slot() {
        let mut history = make_history(2);
        let address = history.add_note(NoteDraft::bug(1, "a", "").into_note(NoteId::new("a"))).unwrap();
        let wrong = NoteDraft::bug(2, "a", "").into_note(NoteId::new("a"));
        assert!(history.replace_note(address, wrong).is_err());
    }
}
