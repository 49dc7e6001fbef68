//! Test steps: an operation together with the notes attached to it

use super::note::{Note, NoteId, NoteKind};
use super::operation::Operation;
use serde::{Deserialize, Serialize};

/// Note ids linked to a test step, as sent with `patch_test_step`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteLinkage {
    pub intention: Option<NoteId>,
    pub bugs: Vec<NoteId>,
    pub notices: Vec<NoteId>,
}

impl NoteLinkage {
    pub fn contains(&self, id: &NoteId) -> bool {
        self.intention.as_ref() == Some(id) || self.bugs.contains(id) || self.notices.contains(id)
    }
}

/// One operation and its notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    /// Server-assigned step id
    pub id: String,
    pub operation: Operation,
    #[serde(default)]
    pub intention: Option<Note>,
    /// Ordered by attachment
    #[serde(default)]
    pub bugs: Vec<Note>,
    /// Ordered by attachment
    #[serde(default)]
    pub notices: Vec<Note>,
}

impl TestStep {
    pub fn new(id: impl Into<String>, operation: Operation) -> Self {
        Self {
            id: id.into(),
            operation,
            intention: None,
            bugs: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn sequence(&self) -> u32 {
        self.operation.sequence
    }

    /// Notes of one kind, in attachment order
    pub fn notes(&self, kind: NoteKind) -> &[Note] {
        match kind {
            NoteKind::Bug => &self.bugs,
            NoteKind::Notice => &self.notices,
            NoteKind::Intention => self.intention.as_slice(),
        }
    }

    /// All notes: intention first, then bugs, then notices
    pub fn all_notes(&self) -> impl Iterator<Item = &Note> {
        self.intention
            .iter()
            .chain(self.bugs.iter())
            .chain(self.notices.iter())
    }

    /// Position of a note within its kind's list
    pub fn position_of(&self, id: &NoteId) -> Option<(NoteKind, usize)> {
        [NoteKind::Intention, NoteKind::Bug, NoteKind::Notice]
            .into_iter()
            .find_map(|kind| {
                self.notes(kind)
                    .iter()
                    .position(|n| &n.id == id)
                    .map(|index| (kind, index))
            })
    }

    pub fn linkage(&self) -> NoteLinkage {
        NoteLinkage {
            intention: self.intention.as_ref().map(|n| n.id.clone()),
            bugs: self.bugs.iter().map(|n| n.id.clone()).collect(),
            notices: self.notices.iter().map(|n| n.id.clone()).collect(),
        }
    }
}
