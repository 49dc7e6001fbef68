//! Image URL resolution
//!
//! The backend hands out image URLs relative to its own base. Generated
//! scripts must not depend on any one host, so absolute URLs under the
//! service base are rewritten back to relative form before emission.
//! For display they are resolved against the base instead.

use crate::history::ScreenHistory;

/// Converts image URLs between service-absolute and relative form
pub trait UrlResolver: Send + Sync {
    fn to_absolute(&self, url: &str) -> String;

    fn to_relative(&self, url: &str) -> String;
}

/// Resolver for a single service base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrlResolver {
    base_url: String,
}

impl ServiceUrlResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn has_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("data:")
}

impl UrlResolver for ServiceUrlResolver {
    fn to_absolute(&self, url: &str) -> String {
        if url.is_empty() || has_scheme(url) {
            return url.to_string();
        }
        format!("{}/{}", self.base_url, url.trim_start_matches('/'))
    }

    /// URLs outside the service base are returned unchanged
    fn to_relative(&self, url: &str) -> String {
        match url.strip_prefix(&self.base_url) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
            _ => url.to_string(),
        }
    }
}

/// Screenshot of every operation that has one, as `(sequence, absolute URL)`
pub fn screenshot_links(history: &ScreenHistory, resolver: &dyn UrlResolver) -> Vec<(u32, String)> {
    history
        .entries()
        .iter()
        .filter_map(|entry| {
            let url = entry.step.operation.image_url.as_deref()?;
            Some((entry.step.sequence(), resolver.to_absolute(url)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CapturedOperation, KeywordSet, Operation, OperationType, TestStep};
    use chrono::Utc;

    fn step(sequence: u32, image_url: Option<&str>) -> TestStep {
        TestStep::new(
            format!("s{}", sequence),
            Operation::from_captured(
                sequence,
                CapturedOperation {
                    window_handle: "w1".to_string(),
                    screen_def: "Top".to_string(),
                    title: "Top".to_string(),
                    url: String::new(),
                    element: None,
                    op_type: OperationType::Click,
                    input: None,
                    keywords: KeywordSet::new(),
                    image_url: image_url.map(String::from),
                    timestamp: Utc::now(),
                },
            ),
        )
    }

    #[test]
    fn test_to_absolute() {
        let resolver = ServiceUrlResolver::new("http://localhost:3001/");
        assert_eq!(
            resolver.to_absolute("/images/1.png"),
            "http://localhost:3001/images/1.png"
        );
        assert_eq!(resolver.to_absolute("images/1.png"), "http://localhost:3001/images/1.png");
        assert_eq!(resolver.to_absolute("https://cdn/x.png"), "https://cdn/x.png");
    }

    #[test]
    fn test_to_relative() {
        let resolver = ServiceUrlResolver::new("http://localhost:3001");
        assert_eq!(resolver.to_relative("http://localhost:3001/images/1.png"), "images/1.png");
        assert_eq!(resolver.to_relative("https://cdn/x.png"), "https://cdn/x.png");
        // Same prefix, different host
        assert_eq!(
            resolver.to_relative("http://localhost:30012/x.png"),
            "http://localhost:30012/x.png"
        );
    }

    #[test]
    fn test_round_trip_relative() {
        let resolver = ServiceUrlResolver::new("http://svc");
        let absolute = resolver.to_absolute("shots/a.png");
        assert_eq!(resolver.to_relative(&absolute), "shots/a.png");
    }

    #[test]
    fn test_screenshot_links_resolve_for_display() {
        let steps = vec![step(1, Some("/images/1.webp")), step(2, None), step(3, Some("https://cdn/3.png"))];
        let history = ScreenHistory::build(&steps, &[]).unwrap();
        let links = screenshot_links(&history, &ServiceUrlResolver::new("http://svc:3002"));
        assert_eq!(
            links,
            vec![
                (1, "http://svc:3002/images/1.webp".to_string()),
                (3, "https://cdn/3.png".to_string()),
            ]
        );
    }
}
