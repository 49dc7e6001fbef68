//! # testflow
//!
//! Derives visual artifacts and automated test scripts from captured browser
//! operation histories.
//!
//! ## Overview
//!
//! A capture backend records every user operation (click, input, navigation)
//! together with the window and screen it happened on. Testers annotate the
//! history with notes: bugs, notices and intentions. This crate turns that
//! linear history into:
//!
//! - a screen history (per-window screen segments and transitions)
//! - per-screen element coverage
//! - sequence and screen-transition diagrams (Mermaid markup)
//! - input value tables for data-driven testing
//! - generated WebdriverIO page objects and test suites
//!
//! ## Quick Start
//!
//! ```no_run
//! use testflow::codegen::{GeneratorOptions, ScriptGenerator, ScriptSource};
//! use testflow::model::TestResultExport;
//! use testflow::ScreenHistory;
//!
//! let export = TestResultExport::load(std::path::Path::new("result.json"))?;
//! let history = export.clone().into_history()?;
//!
//! let screens = ScreenHistory::build(history.steps(), &export.coverage_sources)?;
//! println!("{} screens", screens.screens().len());
//!
//! let generator = ScriptGenerator::new(GeneratorOptions::default());
//! let scripts = generator.generate(&[ScriptSource::new(
//!     export.metadata.initial_url.clone(),
//!     history.steps().to_vec(),
//! )])?;
//! println!("{} page objects", scripts.page_objects.len());
//! # Ok::<(), testflow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │  Captured   │───▶│  Operation  │───▶│   Screen    │───▶│  Coverage / │
//! │ operations  │    │   history   │    │   history   │    │   Graphs    │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//!                                              │
//!                                              ▼
//!                    ┌─────────────┐    ┌─────────────┐
//!                    │ Test script │◀───│ Input value │
//!                    │  generator  │    │    table    │
//!                    └─────────────┘    └─────────────┘
//! ```
//!
//! - [`model`]: operations, notes, test steps and the mutable operation history
//! - [`history`]: screen history builder and window numbering
//! - [`coverage`]: coverage sources and the coverage calculator
//! - [`graph`]: sequence / screen-transition graph converters
//! - [`input_table`]: input value aggregation per intention
//! - [`codegen`]: page object and test suite generation
//! - [`repository`]: backend contract and its HTTP implementation
//! - [`actions`]: orchestrators that combine the above with the backend
//! - [`app`]: CLI and configuration

pub mod model;
pub mod history;
pub mod coverage;
pub mod graph;
pub mod input_table;
pub mod codegen;
pub mod repository;
pub mod actions;
pub mod app;

pub use history::{ScreenHistory, WindowRegistry};
pub use model::{Note, NoteKind, Operation, OperationHistory, TestStep};

/// Result type alias for testflow
pub type Result<T> = std::result::Result<T, Error>;

/// Sub-code carried by [`Error::GenerationEmpty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyGenerationCode {
    /// Optimization produced no usable section
    NoSection,
    /// There was no operation to generate from
    NoOperation,
}

impl EmptyGenerationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyGenerationCode::NoSection => "no-section",
            EmptyGenerationCode::NoOperation => "no-operation",
        }
    }
}

impl std::fmt::Display for EmptyGenerationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for testflow
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend rejected request ({status}): {message}")]
    BackendRejected { status: u16, message: String },

    #[error("Nothing to generate: {0}")]
    GenerationEmpty(EmptyGenerationCode),

    #[error("No {kind} at index {index} of test step {sequence}")]
    InconsistentNoteLink {
        kind: NoteKind,
        sequence: u32,
        index: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Stable machine-readable code, used by front ends to pick a message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::BackendUnavailable(_) => "backend-unavailable",
            Error::BackendRejected { .. } => "backend-rejected",
            Error::GenerationEmpty(code) => code.as_str(),
            Error::InconsistentNoteLink { .. } => "inconsistent-note-link",
            Error::InvalidInput(_) => "invalid-input",
            Error::MalformedResponse(_) => "malformed-response",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
        }
    }
}
