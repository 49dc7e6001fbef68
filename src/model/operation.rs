//! Captured Operations
//!
//! Canonical value objects for a single captured browser operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Tag names whose value can be set by the user
const INPUT_TAGS: [&str; 3] = ["INPUT", "TEXTAREA", "SELECT"];

/// Operation types reported by the capture backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Element clicked
    Click,
    /// Element value changed (text input, select, checkbox)
    Change,
    /// Focus moved to another browser window
    SwitchWindow,
    /// Browser history back
    BrowserBack,
    /// Browser history forward
    BrowserForward,
    /// Alert dialog accepted
    AcceptAlert,
    /// Alert dialog dismissed
    DismissAlert,
    /// Page loaded without a user action (redirect, initial load)
    ScreenTransition,
    /// Anything the capture backend reports that we do not interpret
    #[serde(other)]
    Unknown,
}

impl OperationType {
    /// Whether this operation acts on a DOM element
    pub fn targets_element(&self) -> bool {
        matches!(self, OperationType::Click | OperationType::Change)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Click => "click",
            OperationType::Change => "change",
            OperationType::SwitchWindow => "switch_window",
            OperationType::BrowserBack => "browser_back",
            OperationType::BrowserForward => "browser_forward",
            OperationType::AcceptAlert => "accept_alert",
            OperationType::DismissAlert => "dismiss_alert",
            OperationType::ScreenTransition => "screen_transition",
            OperationType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a DOM element: tag name plus locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementKey {
    pub tag_name: String,
    pub locator: String,
}

impl std::fmt::Display for ElementKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.tag_name, self.locator)
    }
}

/// A DOM element as seen by the capture backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementInfo {
    /// Tag name (case as reported)
    pub tag_name: String,
    /// Absolute XPath of the element
    pub xpath: String,
    /// Visible text
    pub text: Option<String>,
    /// DOM attributes (id, name, type, value, ...)
    pub attributes: BTreeMap<String, String>,
}

impl Default for ElementInfo {
    fn default() -> Self {
        Self {
            tag_name: String::new(),
            xpath: String::new(),
            text: None,
            attributes: BTreeMap::new(),
        }
    }
}

impl ElementInfo {
    pub fn new(tag_name: impl Into<String>, xpath: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            xpath: xpath.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Identity used for deduplication across captures
    pub fn key(&self) -> ElementKey {
        ElementKey {
            tag_name: self.tag_name.to_uppercase(),
            locator: self.xpath.to_lowercase(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whether the user can type into / select a value of this element
    pub fn is_input(&self) -> bool {
        let tag = self.tag_name.to_uppercase();
        if !INPUT_TAGS.contains(&tag.as_str()) {
            return false;
        }
        !matches!(
            self.attribute("type").map(str::to_lowercase).as_deref(),
            Some("button" | "submit" | "reset" | "image" | "hidden")
        )
    }

    /// Checkboxes and radio buttons are toggled by clicking rather than typing
    pub fn is_toggle(&self) -> bool {
        self.tag_name.eq_ignore_ascii_case("input")
            && matches!(
                self.attribute("type").map(str::to_lowercase).as_deref(),
                Some("checkbox" | "radio")
            )
    }

    /// Short human-readable label: text, then id/name attributes, then tag name
    pub fn label(&self) -> String {
        if let Some(text) = self.text.as_deref().map(str::trim) {
            if !text.is_empty() {
                return text.to_string();
            }
        }
        for attr in ["id", "name", "aria-label", "placeholder"] {
            if let Some(value) = self.attribute(attr) {
                if !value.is_empty() {
                    return value.to_string();
                }
            }
        }
        self.tag_name.to_lowercase()
    }
}

/// Case-insensitive set of keyword tokens extracted from the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct KeywordSet(BTreeSet<String>);

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, keyword: &str) -> bool {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return false;
        }
        self.0.insert(keyword.to_lowercase())
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains(&keyword.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for KeywordSet {
    fn from(keywords: Vec<String>) -> Self {
        let mut set = KeywordSet::new();
        for keyword in &keywords {
            set.insert(keyword);
        }
        set
    }
}

impl From<KeywordSet> for Vec<String> {
    fn from(set: KeywordSet) -> Self {
        set.0.into_iter().collect()
    }
}

impl<'a> FromIterator<&'a str> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = KeywordSet::new();
        for keyword in iter {
            set.insert(keyword);
        }
        set
    }
}

/// Raw operation as delivered by the capture backend, before it is numbered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedOperation {
    pub window_handle: String,
    pub screen_def: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub element: Option<ElementInfo>,
    pub op_type: OperationType,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub keywords: KeywordSet,
    #[serde(default)]
    pub image_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A numbered, immutable captured operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// 1-based, gap-free within one test result
    pub sequence: u32,
    /// Raw window handle from the capture backend
    pub window_handle: String,
    /// Screen definition (identifier of the page/state)
    pub screen_def: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Target element, when the operation acts on one
    #[serde(default)]
    pub element: Option<ElementInfo>,
    pub op_type: OperationType,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub keywords: KeywordSet,
    /// Screenshot reference; replaced once by the compressed-image URL
    #[serde(default)]
    pub image_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Operation {
    /// Number a captured operation
    pub fn from_captured(sequence: u32, captured: CapturedOperation) -> Self {
        Self {
            sequence,
            window_handle: captured.window_handle,
            screen_def: captured.screen_def,
            title: captured.title,
            url: captured.url,
            element: captured.element,
            op_type: captured.op_type,
            input: captured.input,
            keywords: captured.keywords,
            image_url: captured.image_url,
            timestamp: captured.timestamp,
        }
    }

    /// Copy of this operation pointing at a different image
    pub fn with_image_url(&self, image_url: impl Into<String>) -> Self {
        Self {
            image_url: Some(image_url.into()),
            ..self.clone()
        }
    }

    /// Short description used in diagram labels and script comments
    pub fn describe(&self) -> String {
        match (&self.element, self.op_type) {
            (Some(element), OperationType::Change) => match &self.input {
                Some(input) => format!("change {} = {}", element.label(), input),
                None => format!("change {}", element.label()),
            },
            (Some(element), op_type) => format!("{} {}", op_type, element.label()),
            (None, op_type) => op_type.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_key_normalizes_case() {
        let a = ElementInfo::new("input", "/HTML/BODY/INPUT[1]");
        let b = ElementInfo::new("INPUT", "/html/body/input[1]");
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().tag_name, "INPUT");
    }

    #[test]
    fn test_is_input() {
        assert!(ElementInfo::new("input", "/a").with_attribute("type", "text").is_input());
        assert!(ElementInfo::new("textarea", "/a").is_input());
        assert!(ElementInfo::new("SELECT", "/a").is_input());
        assert!(!ElementInfo::new("input", "/a").with_attribute("type", "submit").is_input());
        assert!(!ElementInfo::new("button", "/a").is_input());
    }

    #[test]
    fn test_is_toggle() {
        assert!(ElementInfo::new("input", "/a").with_attribute("type", "checkbox").is_toggle());
        assert!(!ElementInfo::new("input", "/a").with_attribute("type", "text").is_toggle());
    }

    #[test]
    fn test_element_label_fallbacks() {
        let with_text = ElementInfo::new("a", "/a").with_text("  Sign in ");
        assert_eq!(with_text.label(), "Sign in");

        let with_id = ElementInfo::new("input", "/a").with_attribute("id", "user");
        assert_eq!(with_id.label(), "user");

        let bare = ElementInfo::new("DIV", "/a");
        assert_eq!(bare.label(), "div");
    }

    #[test]
    fn test_keyword_set_case_insensitive() {
        let mut keywords = KeywordSet::new();
        assert!(keywords.insert("Login"));
        assert!(!keywords.insert("LOGIN"));
        assert!(!keywords.insert("   "));
        assert!(keywords.contains("login"));
        assert!(keywords.contains("LoGiN"));
        assert_eq!(keywords.len(), 1);
    }

    #[test]
    fn test_keyword_set_serde() {
        let keywords: KeywordSet = serde_json::from_str(r#"["Home", "home", "Menu"]"#).unwrap();
        assert_eq!(keywords.len(), 2);
        let json = serde_json::to_string(&keywords).unwrap();
        assert_eq!(json, r#"["home","menu"]"#);
    }

    #[test]
    fn test_unknown_operation_type_deserializes() {
        let op_type: OperationType = serde_json::from_str(r#""mouse_hover""#).unwrap();
        assert_eq!(op_type, OperationType::Unknown);
        let op_type: OperationType = serde_json::from_str(r#""browser_back""#).unwrap();
        assert_eq!(op_type, OperationType::BrowserBack);
    }

    #[test]
    fn test_with_image_url_keeps_everything_else() {
        let op = Operation::from_captured(
            4,
            CapturedOperation {
                window_handle: "w1".to_string(),
                screen_def: "Login".to_string(),
                title: String::new(),
                url: String::new(),
                element: None,
                op_type: OperationType::Click,
                input: None,
                keywords: KeywordSet::new(),
                image_url: Some("/raw/4.png".to_string()),
                timestamp: Utc::now(),
            },
        );
        let patched = op.with_image_url("/compressed/4.webp");
        assert_eq!(patched.sequence, 4);
        assert_eq!(patched.image_url.as_deref(), Some("/compressed/4.webp"));
        assert_eq!(patched.screen_def, op.screen_def);
    }

    #[test]
    fn test_describe() {
        let mut op = Operation::from_captured(
            1,
            CapturedOperation {
                window_handle: "w1".to_string(),
                screen_def: "Login".to_string(),
                title: String::new(),
                url: String::new(),
                element: Some(ElementInfo::new("input", "/a").with_attribute("name", "user")),
                op_type: OperationType::Change,
                input: Some("alice".to_string()),
                keywords: KeywordSet::new(),
                image_url: None,
                timestamp: Utc::now(),
            },
        );
        assert_eq!(op.describe(), "change user = alice");
        op.op_type = OperationType::BrowserBack;
        op.element = None;
        assert_eq!(op.describe(), "browser_back");
    }
}
