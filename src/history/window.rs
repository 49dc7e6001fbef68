//! Window numbering
//!
//! Windows are identified by the raw handle the capture backend assigns.
//! For display they are numbered in order of first appearance.

use serde::{Deserialize, Serialize};

/// Display label prefix
const LABEL_PREFIX: &str = "window";

/// Registry of window handles in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRegistry {
    handles: Vec<String>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a handle; returns its 0-based position
    pub fn observe(&mut self, handle: &str) -> usize {
        match self.position(handle) {
            Some(index) => index,
            None => {
                self.handles.push(handle.to_string());
                self.handles.len() - 1
            }
        }
    }

    pub fn position(&self, handle: &str) -> Option<usize> {
        self.handles.iter().position(|h| h == handle)
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.position(handle).is_some()
    }

    /// `window1`, `window2`, ... in first-seen order
    pub fn label(&self, handle: &str) -> Option<String> {
        self.position(handle)
            .map(|index| format!("{}{}", LABEL_PREFIX, index + 1))
    }

    pub fn handles(&self) -> &[String] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
