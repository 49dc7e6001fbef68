//! Notes attached to test steps (bugs, notices, intentions)

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// A defect found at this step (multi-valued, no tags)
    Bug,
    /// A remark at this step (multi-valued, tagged)
    Notice,
    /// What the tester intends from this step on (at most one per step)
    Intention,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Bug => "bug",
            NoteKind::Notice => "notice",
            NoteKind::Intention => "intention",
        }
    }

    pub fn supports_tags(&self) -> bool {
        !matches!(self, NoteKind::Bug)
    }
}

impl std::fmt::Display for NoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-assigned note identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positional handle of a note: kind, owning step and index within that
/// step's list of that kind (always 0 for intentions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteAddress {
    pub kind: NoteKind,
    pub sequence: u32,
    pub index: usize,
}

impl NoteAddress {
    pub fn new(kind: NoteKind, sequence: u32, index: usize) -> Self {
        Self { kind, sequence, index }
    }
}

/// A persisted note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub kind: NoteKind,
    /// Sequence number of the owning test step
    pub sequence: u32,
    /// Summary
    pub value: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A note that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub kind: NoteKind,
    pub sequence: u32,
    pub value: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NoteDraft {
    pub fn bug(sequence: u32, value: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            kind: NoteKind::Bug,
            sequence,
            value: value.into(),
            details: details.into(),
            tags: BTreeSet::new(),
            image_url: None,
        }
    }

    pub fn notice(
        sequence: u32,
        value: impl Into<String>,
        details: impl Into<String>,
        tags: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            kind: NoteKind::Notice,
            sequence,
            value: value.into(),
            details: details.into(),
            tags: tags.into_iter().collect(),
            image_url: None,
        }
    }

    pub fn intention(sequence: u32, value: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            kind: NoteKind::Intention,
            sequence,
            value: value.into(),
            details: details.into(),
            tags: BTreeSet::new(),
            image_url: None,
        }
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Attach the server-assigned id
    pub fn into_note(self, id: NoteId) -> Note {
        let tags = if self.kind.supports_tags() {
            self.tags
        } else {
            BTreeSet::new()
        };
        Note {
            id,
            kind: self.kind,
            sequence: self.sequence,
            value: self.value,
            details: self.details,
            tags,
            image_url: self.image_url,
        }
    }
}

/// Partial update of a note; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEdit {
    pub value: Option<String>,
    pub details: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub image_url: Option<String>,
}

impl Note {
    /// Merge an edit into a copy of this note
    pub fn merged(&self, edit: &NoteEdit) -> Note {
        let mut note = self.clone();
        if let Some(value) = &edit.value {
            note.value = value.clone();
        }
        if let Some(details) = &edit.details {
            note.details = details.clone();
        }
        if let Some(tags) = &edit.tags {
            if self.kind.supports_tags() {
                note.tags = tags.clone();
            }
        }
        if let Some(image_url) = &edit.image_url {
            note.image_url = Some(image_url.clone());
        }
        note
    }

    /// Copy of this note owned by another test step
    pub fn relocated(&self, sequence: u32) -> Note {
        Note {
            sequence,
            ..self.clone()
        }
    }
}
