//! Test script generation and upload

use super::SharedSession;
use crate::codegen::{GeneratorOptions, ScriptGenerator, ScriptSource, ScriptWriter, UrlResolver};
use crate::repository::TestResultRepository;
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Generates scripts and persists the bundle
pub struct GenerateTestScriptsAction<R> {
    repository: Arc<R>,
    options: GeneratorOptions,
    url_resolver: Option<Arc<dyn UrlResolver>>,
}

impl<R: TestResultRepository> GenerateTestScriptsAction<R> {
    pub fn new(repository: Arc<R>, options: GeneratorOptions) -> Self {
        Self {
            repository,
            options,
            url_resolver: None,
        }
    }

    pub fn with_url_resolver(mut self, resolver: Arc<dyn UrlResolver>) -> Self {
        self.url_resolver = Some(resolver);
        self
    }

    /// Generate from `sources`, upload under `test_result_id` and return the
    /// bundle URL. Nothing is uploaded when generation fails.
    pub async fn generate(&self, test_result_id: &str, sources: &[ScriptSource]) -> Result<String> {
        let mut generator = ScriptGenerator::new(self.options);
        if let Some(resolver) = &self.url_resolver {
            generator = generator.with_url_resolver(Arc::clone(resolver));
        }
        let scripts = generator.generate(sources)?;
        let bundle = ScriptWriter::new().write(&scripts)?;

        let url = self.repository.post_test_scripts(test_result_id, &bundle).await?;
        info!(
            test_result = test_result_id,
            files = bundle.files.len(),
            url = %url,
            "uploaded test scripts"
        );
        Ok(url)
    }

    /// Generate from the session's own history
    pub async fn generate_for_session(&self, session: &SharedSession) -> Result<String> {
        let (test_result_id, source) = {
            let session = session.lock();
            let source = ScriptSource::new(session.metadata.initial_url.clone(), session.history().steps().to_vec())
                .with_name(session.metadata.name.clone());
            (session.test_result_id().to_string(), source)
        };
        self.generate(&test_result_id, &[source]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::{session_with, FakeRepository};
    use crate::codegen::ServiceUrlResolver;
    use crate::{EmptyGenerationCode, Error};

    #[tokio::test]
    async fn test_generate_uploads_bundle() {
        let repository = FakeRepository::new();
        let session = session_with(&["Login", "Home"]);

        let url = GenerateTestScriptsAction::new(Arc::clone(&repository), GeneratorOptions::default())
            .with_url_resolver(Arc::new(ServiceUrlResolver::new("http://localhost:8080")))
            .generate_for_session(&session)
            .await
            .unwrap();

        assert_eq!(url, "http://fake/scripts/1");
        let state = repository.state.lock();
        assert_eq!(state.bundles.len(), 1);
        assert!(state.bundles[0].files.iter().any(|f| f.path.ends_with(".spec.js")));
    }

    #[tokio::test]
    async fn test_empty_generation_posts_nothing() {
        let repository = FakeRepository::new();
        let session = session_with(&[]);

        let optimized = GeneratorOptions {
            optimize: true,
            ..Default::default()
        };
        let result = GenerateTestScriptsAction::new(Arc::clone(&repository), optimized)
            .generate_for_session(&session)
            .await;
        assert!(matches!(
            result,
            Err(Error::GenerationEmpty(EmptyGenerationCode::NoSection))
        ));

        let result = GenerateTestScriptsAction::new(Arc::clone(&repository), GeneratorOptions::default())
            .generate("r1", &[])
            .await;
        assert_eq!(result.unwrap_err().code(), "no-operation");

        assert!(repository.state.lock().bundles.is_empty());
    }
}
