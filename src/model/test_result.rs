//! Test Result Export Format
//!
//! Defines the on-disk JSON format of an exported test result: its metadata,
//! test steps and the coverage sources collected while capturing.

use super::history::OperationHistory;
use super::test_step::TestStep;
use crate::coverage::CoverageSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current export format version
pub const CURRENT_FORMAT_VERSION: &str = "1.0";

/// Test result metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestResultMetadata {
    /// Test result id assigned by the service
    pub id: String,
    /// Display name
    pub name: String,
    /// URL the capture started from
    pub initial_url: String,
    pub created_at: DateTime<Utc>,
    /// Version of the export format
    pub format_version: String,
}

impl TestResultMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>, initial_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            initial_url: initial_url.into(),
            ..Default::default()
        }
    }
}

impl Default for TestResultMetadata {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            initial_url: String::new(),
            created_at: Utc::now(),
            format_version: CURRENT_FORMAT_VERSION.to_string(),
        }
    }
}

/// An exported test result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResultExport {
    pub metadata: TestResultMetadata,
    #[serde(default)]
    pub test_steps: Vec<TestStep>,
    #[serde(default)]
    pub coverage_sources: Vec<CoverageSource>,
}

impl TestResultExport {
    pub fn new(metadata: TestResultMetadata) -> Self {
        Self {
            metadata,
            test_steps: Vec::new(),
            coverage_sources: Vec::new(),
        }
    }

    /// Validate the steps into an operation history
    pub fn into_history(self) -> crate::Result<OperationHistory> {
        OperationHistory::from_steps(self.test_steps)
    }

    /// Save to a file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a file.
    ///
    /// Logs a warning if the file was written with another format version,
    /// but still attempts to deserialize it.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let export: TestResultExport = serde_json::from_str(&content)?;
        if export.metadata.format_version != CURRENT_FORMAT_VERSION {
            tracing::warn!(
                name = %export.metadata.name,
                found = %export.metadata.format_version,
                expected = CURRENT_FORMAT_VERSION,
                "Test result has different format version; some fields may use default values"
            );
        }
        Ok(export)
    }

    pub fn len(&self) -> usize {
        self.test_steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_steps.is_empty()
    }
}
