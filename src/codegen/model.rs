//! Generated Script Model
//!
//! Language-neutral description of page objects, test suites and test data.
//! [`super::writer::ScriptWriter`] renders it to JavaScript.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a method does with an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    SetValue,
    SelectOption,
}

impl ActionKind {
    /// Whether the action consumes a value
    pub fn takes_value(&self) -> bool {
        !matches!(self, ActionKind::Click)
    }

    pub(crate) fn verb(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::SetValue => "set",
            ActionKind::SelectOption => "select",
        }
    }
}

/// Browser-level action emitted inline in suites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserAction {
    /// Switch to the window showing a page with this title
    SwitchWindow { title: String },
    Back,
    Forward,
    AcceptAlert,
    DismissAlert,
}

/// An element a page object exposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageElement {
    /// Getter name
    pub name: String,
    pub xpath: String,
}

/// One statement inside a page method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodAction {
    /// Name of the [`PageElement`] acted on
    pub element: String,
    pub kind: ActionKind,
    /// Parameter supplying the value, for value-taking actions
    pub param: Option<String>,
}

/// Reusable method of a page object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMethod {
    pub name: String,
    pub params: Vec<String>,
    pub actions: Vec<MethodAction>,
    /// Screen the method leads to, when it leaves the page
    pub target: Option<String>,
}

/// Page object for one screen definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageObject {
    pub class_name: String,
    pub screen_def: String,
    pub elements: Vec<PageElement>,
    pub methods: Vec<PageMethod>,
}

impl PageObject {
    pub fn method(&self, name: &str) -> Option<&PageMethod> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn file_name(&self) -> String {
        format!("{}.page.js", self.class_name)
    }
}

/// Argument passed to a page method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Argument {
    Literal(String),
    /// Column of the current data-driven row
    Column(String),
}

/// What a suite step executes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuiteCall {
    Navigate { url: String },
    Invoke {
        /// Page object class name
        page: String,
        method: String,
        args: Vec<Argument>,
    },
    Browser { action: BrowserAction },
}

/// Statement of a test suite with its annotations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteStep {
    /// Intention, bug, notice and screenshot markers
    pub comments: Vec<String>,
    pub call: SuiteCall,
}

/// Test suite replaying one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuite {
    pub name: String,
    /// File stem, unique across suites
    pub file_stem: String,
    pub initial_url: String,
    pub steps: Vec<SuiteStep>,
}

impl TestSuite {
    /// Page classes invoked by the suite, in first-use order
    pub fn pages(&self) -> Vec<&str> {
        let mut pages: Vec<&str> = Vec::new();
        for step in &self.steps {
            if let SuiteCall::Invoke { page, .. } = &step.call {
                if !pages.contains(&page.as_str()) {
                    pages.push(page);
                }
            }
        }
        pages
    }

    /// `(page, method)` of every invocation, in order
    pub fn invocations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.steps.iter().filter_map(|step| match &step.call {
            SuiteCall::Invoke { page, method, .. } => Some((page.as_str(), method.as_str())),
            _ => None,
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}.spec.js", self.file_stem)
    }
}

/// Parameter rows of one page method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDataSet {
    /// Key in the test data file
    pub name: String,
    pub page: String,
    pub method: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A suite replayed once per row of a data set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDrivenSuite {
    /// Index into [`GeneratedScripts::test_suites`]
    pub suite: usize,
    pub data_set: String,
}

/// Generator output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedScripts {
    pub page_objects: Vec<PageObject>,
    pub test_suites: Vec<TestSuite>,
    pub test_data: Vec<TestDataSet>,
    pub data_driven_suites: Vec<DataDrivenSuite>,
}

impl GeneratedScripts {
    pub fn page(&self, class_name: &str) -> Option<&PageObject> {
        self.page_objects.iter().find(|p| p.class_name == class_name)
    }

    pub fn data_set(&self, name: &str) -> Option<&TestDataSet> {
        self.test_data.iter().find(|d| d.name == name)
    }
}

/// A rendered file, path relative to the bundle root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFile {
    pub path: String,
    pub content: String,
}

/// Rendered scripts, ready to persist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptBundle {
    pub files: Vec<CodeFile>,
}

impl ScriptBundle {
    pub fn file(&self, path: &str) -> Option<&CodeFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Write every file below `dir`, creating directories as needed.
    ///
    /// Files are staged in a sibling temporary directory and only moved into
    /// `dir` once all of them were written, so a failed write leaves `dir`
    /// untouched.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        for file in &self.files {
            if file.path.split('/').any(|part| part == ".." || part.is_empty()) {
                return Err(Error::InvalidInput(format!("unsafe bundle path: {}", file.path)));
            }
        }

        let parent = match dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;
        let staging = tempfile::Builder::new().prefix(".testflow-").tempdir_in(parent)?;
        for file in &self.files {
            let path = staging.path().join(&file.path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &file.content)?;
        }

        if !dir.exists() {
            std::fs::rename(staging.path(), dir)?;
            return Ok(());
        }
        for file in &self.files {
            let target = dir.join(&file.path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::rename(staging.path().join(&file.path), &target)?;
        }
        Ok(())
    }
}
