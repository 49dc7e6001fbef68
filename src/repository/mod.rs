//! Test Result Repository
//!
//! Contract between the orchestrators and the backend that persists test
//! results. Every call returns the freshly persisted object with its
//! server-assigned id. Implementations never retry; transport failures map
//! to [`crate::Error::BackendUnavailable`] and non-success statuses to
//! [`crate::Error::BackendRejected`].

pub mod http;

pub use http::HttpRepository;

use crate::codegen::ScriptBundle;
use crate::coverage::CoverageSource;
use crate::model::{CapturedOperation, Note, NoteDraft, NoteEdit, NoteId, NoteLinkage, TestResultMetadata, TestStep};
use crate::Result;
use std::future::Future;

/// Backend persistence for one test result at a time
pub trait TestResultRepository: Send + Sync {
    fn get_test_result(&self, test_result_id: &str) -> impl Future<Output = Result<TestResultMetadata>> + Send;

    /// Test steps ordered by sequence
    fn get_test_steps(&self, test_result_id: &str) -> impl Future<Output = Result<Vec<TestStep>>> + Send;

    fn get_coverage_sources(&self, test_result_id: &str) -> impl Future<Output = Result<Vec<CoverageSource>>> + Send;

    /// Persist a captured operation; the returned step carries its sequence
    fn post_operation(
        &self,
        test_result_id: &str,
        operation: &CapturedOperation,
    ) -> impl Future<Output = Result<TestStep>> + Send;

    /// Compress the screenshot of an operation; returns the new image URL
    fn compress_image(&self, test_result_id: &str, sequence: u32) -> impl Future<Output = Result<String>> + Send;

    fn post_note(&self, test_result_id: &str, draft: &NoteDraft) -> impl Future<Output = Result<Note>> + Send;

    fn put_note(&self, test_result_id: &str, id: &NoteId, edit: &NoteEdit) -> impl Future<Output = Result<Note>> + Send;

    /// Replace the note ids linked to a test step
    fn patch_test_step(
        &self,
        test_result_id: &str,
        sequence: u32,
        linkage: &NoteLinkage,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_note(&self, test_result_id: &str, id: &NoteId) -> impl Future<Output = Result<()>> + Send;

    /// Persist generated scripts; returns the bundle URL
    fn post_test_scripts(
        &self,
        test_result_id: &str,
        bundle: &ScriptBundle,
    ) -> impl Future<Output = Result<String>> + Send;
}
