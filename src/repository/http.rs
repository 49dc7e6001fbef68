//! HTTP repository
//!
//! JSON over HTTP against the test management service:
//!
//! ```text
//! GET    /api/v1/test-results/{id}
//! GET    /api/v1/test-results/{id}/test-steps
//! POST   /api/v1/test-results/{id}/test-steps
//! PATCH  /api/v1/test-results/{id}/test-steps/{sequence}
//! POST   /api/v1/test-results/{id}/test-steps/{sequence}/compressed-image
//! GET    /api/v1/test-results/{id}/coverage-sources
//! POST   /api/v1/test-results/{id}/notes
//! PUT    /api/v1/test-results/{id}/notes/{note_id}
//! DELETE /api/v1/test-results/{id}/notes/{note_id}
//! POST   /api/v1/test-results/{id}/test-scripts
//! ```

use super::TestResultRepository;
use crate::codegen::ScriptBundle;
use crate::coverage::CoverageSource;
use crate::model::{CapturedOperation, Note, NoteDraft, NoteEdit, NoteId, NoteLinkage, TestResultMetadata, TestStep};
use crate::{Error, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const API_PREFIX: &str = "api/v1/test-results";

#[derive(Deserialize)]
struct ImageUrlResponse {
    image_url: String,
}

#[derive(Deserialize)]
struct ScriptUrlResponse {
    url: String,
}

/// Repository backed by the test management service
#[derive(Debug, Clone)]
pub struct HttpRepository {
    client: Client,
    base_url: String,
}

impl HttpRepository {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, test_result_id: &str, path: &str) -> String {
        if path.is_empty() {
            format!("{}/{}/{}", self.base_url, API_PREFIX, test_result_id)
        } else {
            format!("{}/{}/{}/{}", self.base_url, API_PREFIX, test_result_id, path)
        }
    }

    /// Send once and decode a JSON body
    async fn fetch<T, F>(&self, build_request: F, context: &str) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = send(&self.client, build_request, context).await?;
        let body = response.text().await.map_err(|e| {
            warn!("{}: failed to read response body: {}", context, e);
            Error::BackendUnavailable(e.to_string())
        })?;
        serde_json::from_str(&body).map_err(|e| {
            warn!("{}: malformed response: {}", context, e);
            Error::MalformedResponse(format!("{}: {}", context, e))
        })
    }

    /// Send once, ignoring the body
    async fn execute<F>(&self, build_request: F, context: &str) -> Result<()>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        send(&self.client, build_request, context).await.map(|_| ())
    }
}

/// Send an HTTP request once.
///
/// - Transport failure (connect, timeout, ...): `BackendUnavailable`
/// - Non-success status: `BackendRejected` with the response body as message
pub async fn send<F>(client: &Client, build_request: F, context: &str) -> Result<Response>
where
    F: Fn(&Client) -> RequestBuilder,
{
    let response = build_request(client).send().await.map_err(|e| {
        warn!("{}: request failed: {}", context, e);
        Error::BackendUnavailable(format!("{}: {}", context, e))
    })?;

    let status = response.status();
    if status.is_success() {
        debug!(status = status.as_u16(), "{}", context);
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    warn!("{}: rejected ({})", context, status);
    Err(Error::BackendRejected {
        status: status.as_u16(),
        message,
    })
}

impl TestResultRepository for HttpRepository {
    fn get_test_result(&self, test_result_id: &str) -> impl Future<Output = Result<TestResultMetadata>> + Send {
        let url = self.url(test_result_id, "");
        async move { self.fetch(|c| c.get(&url), "get test result").await }
    }

    fn get_test_steps(&self, test_result_id: &str) -> impl Future<Output = Result<Vec<TestStep>>> + Send {
        let url = self.url(test_result_id, "test-steps");
        async move { self.fetch(|c| c.get(&url), "get test steps").await }
    }

    fn get_coverage_sources(&self, test_result_id: &str) -> impl Future<Output = Result<Vec<CoverageSource>>> + Send {
        let url = self.url(test_result_id, "coverage-sources");
        async move { self.fetch(|c| c.get(&url), "get coverage sources").await }
    }

    fn post_operation(
        &self,
        test_result_id: &str,
        operation: &CapturedOperation,
    ) -> impl Future<Output = Result<TestStep>> + Send {
        let url = self.url(test_result_id, "test-steps");
        let body = operation.clone();
        async move { self.fetch(|c| c.post(&url).json(&body), "post operation").await }
    }

    fn compress_image(&self, test_result_id: &str, sequence: u32) -> impl Future<Output = Result<String>> + Send {
        let url = self.url(test_result_id, &format!("test-steps/{}/compressed-image", sequence));
        async move {
            let response: ImageUrlResponse = self.fetch(|c| c.post(&url), "compress image").await?;
            Ok(response.image_url)
        }
    }

    fn post_note(&self, test_result_id: &str, draft: &NoteDraft) -> impl Future<Output = Result<Note>> + Send {
        let url = self.url(test_result_id, "notes");
        let body = draft.clone();
        async move { self.fetch(|c| c.post(&url).json(&body), "post note").await }
    }

    fn put_note(&self, test_result_id: &str, id: &NoteId, edit: &NoteEdit) -> impl Future<Output = Result<Note>> + Send {
        let url = self.url(test_result_id, &format!("notes/{}", id));
        let body = edit.clone();
        async move { self.fetch(|c| c.put(&url).json(&body), "put note").await }
    }

    fn patch_test_step(
        &self,
        test_result_id: &str,
        sequence: u32,
        linkage: &NoteLinkage,
    ) -> impl Future<Output = Result<()>> + Send {
        let url = self.url(test_result_id, &format!("test-steps/{}", sequence));
        let body = linkage.clone();
        async move { self.execute(|c| c.patch(&url).json(&body), "patch test step").await }
    }

    fn delete_note(&self, test_result_id: &str, id: &NoteId) -> impl Future<Output = Result<()>> + Send {
        let url = self.url(test_result_id, &format!("notes/{}", id));
        async move { self.execute(|c| c.delete(&url), "delete note").await }
    }

    fn post_test_scripts(
        &self,
        test_result_id: &str,
        bundle: &ScriptBundle,
    ) -> impl Future<Output = Result<String>> + Send {
        let url = self.url(test_result_id, "test-scripts");
        let body = bundle.clone();
        async move {
            let response: ScriptUrlResponse = self.fetch(|c| c.post(&url).json(&body), "post test scripts").await?;
            Ok(response.url)
        }
    }
}
