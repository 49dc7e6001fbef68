//! WebdriverIO Script Rendering
//!
//! Renders [`GeneratedScripts`] as a mocha + WebdriverIO project:
//!
//! ```text
//! pageobjects/<Class>.page.js
//! specs/<suite>.spec.js
//! specs/data_driven.spec.js   (data-driven only)
//! data/test_data.json         (data-driven only)
//! ```

use super::model::{
    ActionKind, Argument, BrowserAction, CodeFile, GeneratedScripts, PageObject, ScriptBundle, SuiteCall, SuiteStep,
    TestDataSet, TestSuite,
};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::fmt::Write;

pub const PAGE_OBJECT_DIR: &str = "pageobjects";
pub const SPEC_DIR: &str = "specs";
pub const DATA_FILE: &str = "data/test_data.json";
pub const DATA_DRIVEN_SPEC: &str = "specs/data_driven.spec.js";

const INDENT: &str = "  ";

/// JavaScript writer
pub struct ScriptWriter {
    /// Buffer for the file being rendered
    buffer: String,
}

impl ScriptWriter {
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(4096),
        }
    }

    /// Render every file of the bundle
    pub fn write(&mut self, scripts: &GeneratedScripts) -> Result<ScriptBundle> {
        let mut files = Vec::new();

        for page in &scripts.page_objects {
            self.buffer.clear();
            self.write_page(page).map_err(render_error)?;
            files.push(CodeFile {
                path: format!("{}/{}", PAGE_OBJECT_DIR, page.file_name()),
                content: std::mem::take(&mut self.buffer),
            });
        }

        for suite in &scripts.test_suites {
            self.buffer.clear();
            self.write_suite(suite).map_err(render_error)?;
            files.push(CodeFile {
                path: format!("{}/{}", SPEC_DIR, suite.file_name()),
                content: std::mem::take(&mut self.buffer),
            });
        }

        if !scripts.data_driven_suites.is_empty() {
            self.buffer.clear();
            self.write_data_driven(scripts).map_err(render_error)?;
            files.push(CodeFile {
                path: DATA_DRIVEN_SPEC.to_string(),
                content: std::mem::take(&mut self.buffer),
            });
            files.push(CodeFile {
                path: DATA_FILE.to_string(),
                content: test_data_json(&scripts.test_data)?,
            });
        }

        Ok(ScriptBundle { files })
    }

    fn write_page(&mut self, page: &PageObject) -> std::fmt::Result {
        writeln!(self.buffer, "/**")?;
        writeln!(self.buffer, " * {}", comment_text(&page.screen_def))?;
        writeln!(self.buffer, " */")?;
        writeln!(self.buffer, "class {} {{", page.class_name)?;

        let mut first = true;
        for element in &page.elements {
            if !first {
                writeln!(self.buffer)?;
            }
            first = false;
            writeln!(self.buffer, "{}get {}() {{", INDENT, element.name)?;
            writeln!(self.buffer, "{0}{0}return $({1});", INDENT, js_string(&element.xpath))?;
            writeln!(self.buffer, "{}}}", INDENT)?;
        }

        for method in &page.methods {
            if !first {
                writeln!(self.buffer)?;
            }
            first = false;
            if let Some(target) = &method.target {
                writeln!(self.buffer, "{}/** Leads to {} */", INDENT, comment_text(target))?;
            }
            writeln!(
                self.buffer,
                "{}async {}({}) {{",
                INDENT,
                method.name,
                method.params.join(", ")
            )?;
            for action in &method.actions {
                let statement = match (action.kind, &action.param) {
                    (ActionKind::Click, _) => "click()".to_string(),
                    (ActionKind::SetValue, Some(param)) => format!("setValue({})", param),
                    (ActionKind::SelectOption, Some(param)) => {
                        format!("selectByAttribute(\"value\", {})", param)
                    }
                    (_, None) => "click()".to_string(),
                };
                writeln!(self.buffer, "{0}{0}await this.{1}.{2};", INDENT, action.element, statement)?;
            }
            writeln!(self.buffer, "{}}}", INDENT)?;
        }

        writeln!(self.buffer, "}}")?;
        writeln!(self.buffer)?;
        writeln!(self.buffer, "module.exports = new {}();", page.class_name)?;
        Ok(())
    }

    fn write_requires(&mut self, suite: &TestSuite) -> std::fmt::Result {
        for page in suite.pages() {
            writeln!(
                self.buffer,
                "const {} = require({});",
                page,
                js_string(&format!("../{}/{}.page", PAGE_OBJECT_DIR, page))
            )?;
        }
        Ok(())
    }

    fn write_suite(&mut self, suite: &TestSuite) -> std::fmt::Result {
        self.write_requires(suite)?;
        if !suite.pages().is_empty() {
            writeln!(self.buffer)?;
        }
        writeln!(self.buffer, "describe({}, () => {{", js_string(&suite.name))?;
        writeln!(self.buffer, "{}it(\"replays the recorded operations\", async () => {{", INDENT)?;
        for step in &suite.steps {
            self.write_step(step, 2, None)?;
        }
        writeln!(self.buffer, "{}}});", INDENT)?;
        writeln!(self.buffer, "}});")?;
        Ok(())
    }

    fn write_data_driven(&mut self, scripts: &GeneratedScripts) -> std::fmt::Result {
        let mut pages: Vec<&str> = Vec::new();
        for entry in &scripts.data_driven_suites {
            if let Some(suite) = scripts.test_suites.get(entry.suite) {
                for page in suite.pages() {
                    if !pages.contains(&page) {
                        pages.push(page);
                    }
                }
            }
        }
        for page in &pages {
            writeln!(
                self.buffer,
                "const {} = require({});",
                page,
                js_string(&format!("../{}/{}.page", PAGE_OBJECT_DIR, page))
            )?;
        }
        writeln!(self.buffer, "const testData = require(\"../{}\");", DATA_FILE)?;

        for entry in &scripts.data_driven_suites {
            let (Some(suite), Some(data)) = (
                scripts.test_suites.get(entry.suite),
                scripts.data_set(&entry.data_set),
            ) else {
                continue;
            };
            writeln!(self.buffer)?;
            writeln!(
                self.buffer,
                "describe({}, () => {{",
                js_string(&format!("{} (data driven: {})", suite.name, data.name))
            )?;
            writeln!(
                self.buffer,
                "{}testData[{}].forEach((row, index) => {{",
                INDENT,
                js_string(&data.name)
            )?;
            writeln!(self.buffer, "{0}{0}it(`row ${{index + 1}}`, async () => {{", INDENT)?;
            for step in &suite.steps {
                self.write_step(step, 3, Some(data))?;
            }
            writeln!(self.buffer, "{0}{0}}});", INDENT)?;
            writeln!(self.buffer, "{}}});", INDENT)?;
            writeln!(self.buffer, "}});")?;
        }
        Ok(())
    }

    fn write_step(&mut self, step: &SuiteStep, depth: usize, data: Option<&TestDataSet>) -> std::fmt::Result {
        let indent = INDENT.repeat(depth);
        for comment in &step.comments {
            writeln!(self.buffer, "{}// {}", indent, comment_text(comment))?;
        }
        let statement = match &step.call {
            SuiteCall::Navigate { url } => format!("browser.url({})", js_string(url)),
            SuiteCall::Browser { action } => browser_statement(action),
            SuiteCall::Invoke { page, method, args } => {
                let parameterized = data.filter(|d| &d.page == page && &d.method == method);
                let args: Vec<String> = match parameterized {
                    Some(data) => data
                        .columns
                        .iter()
                        .map(|column| format!("row[{}]", js_string(column)))
                        .collect(),
                    None => args.iter().map(argument).collect(),
                };
                format!("{}.{}({})", page, method, args.join(", "))
            }
        };
        writeln!(self.buffer, "{}await {};", indent, statement)
    }
}

impl Default for ScriptWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn browser_statement(action: &BrowserAction) -> String {
    match action {
        BrowserAction::SwitchWindow { title } => format!("browser.switchWindow({})", js_string(title)),
        BrowserAction::Back => "browser.back()".to_string(),
        BrowserAction::Forward => "browser.forward()".to_string(),
        BrowserAction::AcceptAlert => "browser.acceptAlert()".to_string(),
        BrowserAction::DismissAlert => "browser.dismissAlert()".to_string(),
    }
}

fn argument(arg: &Argument) -> String {
    match arg {
        Argument::Literal(value) => js_string(value),
        Argument::Column(column) => format!("row[{}]", js_string(column)),
    }
}

/// Double-quoted JavaScript string literal
pub fn js_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Single-line comment text; `*/` is broken up for block comments
fn comment_text(text: &str) -> String {
    text.replace(['\r', '\n'], " ").replace("*/", "* /")
}

fn test_data_json(sets: &[TestDataSet]) -> Result<String> {
    let mut root = Map::new();
    for set in sets {
        let rows: Vec<Value> = set
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = set
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned().map(Value::String))
                    .collect();
                Value::Object(object)
            })
            .collect();
        root.insert(set.name.clone(), Value::Array(rows));
    }
    let mut json = serde_json::to_string_pretty(&Value::Object(root))?;
    json.push('\n');
    Ok(json)
}

fn render_error(err: std::fmt::Error) -> Error {
    Error::InvalidInput(format!("failed to render script: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::model::{DataDrivenSuite, MethodAction, PageElement, PageMethod};

    fn login_page() -> PageObject {
        PageObject {
            class_name: "LoginPage".to_string(),
            screen_def: "Login".to_string(),
            elements: vec![
                PageElement {
                    name: "user".to_string(),
                    xpath: "//form/input[@name=\"user\"]".to_string(),
                },
                PageElement {
                    name: "signIn".to_string(),
                    xpath: "/form/button".to_string(),
                },
            ],
            methods: vec![PageMethod {
                name: "goToHome".to_string(),
                params: vec!["user".to_string()],
                actions: vec![
                    MethodAction {
                        element: "user".to_string(),
                        kind: ActionKind::SetValue,
                        param: Some("user".to_string()),
                    },
                    MethodAction {
                        element: "signIn".to_string(),
                        kind: ActionKind::Click,
                        param: None,
                    },
                ],
                target: Some("Home".to_string()),
            }],
        }
    }

    fn login_suite() -> TestSuite {
        TestSuite {
            name: "login flow".to_string(),
            file_stem: "login_flow".to_string(),
            initial_url: "http://localhost/login".to_string(),
            steps: vec![
                SuiteStep {
                    comments: Vec::new(),
                    call: SuiteCall::Navigate {
                        url: "http://localhost/login".to_string(),
                    },
                },
                SuiteStep {
                    comments: vec!["intention: log in\nas admin".to_string()],
                    call: SuiteCall::Invoke {
                        page: "LoginPage".to_string(),
                        method: "goToHome".to_string(),
                        args: vec![Argument::Literal("al\"ice".to_string())],
                    },
                },
                SuiteStep {
                    comments: Vec::new(),
                    call: SuiteCall::Browser {
                        action: BrowserAction::Back,
                    },
                },
            ],
        }
    }

    fn scripts(data_driven: bool) -> GeneratedScripts {
        let mut scripts = GeneratedScripts {
            page_objects: vec![login_page()],
            test_suites: vec![login_suite()],
            ..Default::default()
        };
        if data_driven {
            scripts.test_data.push(TestDataSet {
                name: "LoginPage_goToHome".to_string(),
                page: "LoginPage".to_string(),
                method: "goToHome".to_string(),
                columns: vec!["user".to_string()],
                rows: vec![vec!["a".to_string()], vec!["b".to_string()]],
            });
            scripts.data_driven_suites.push(DataDrivenSuite {
                suite: 0,
                data_set: "LoginPage_goToHome".to_string(),
            });
        }
        scripts
    }

    #[test]
    fn test_page_object_rendering() {
        let bundle = ScriptWriter::new().write(&scripts(false)).unwrap();
        let page = bundle.file("pageobjects/LoginPage.page.js").unwrap();

        assert!(page.content.contains("class LoginPage {"));
        assert!(page.content.contains("return $(\"//form/input[@name=\\\"user\\\"]\");"));
        assert!(page.content.contains("  /** Leads to Home */\n  async goToHome(user) {"));
        assert!(page.content.contains("    await this.user.setValue(user);"));
        assert!(page.content.contains("    await this.signIn.click();"));
        assert!(page.content.ends_with("module.exports = new LoginPage();\n"));
    }

    #[test]
    fn test_suite_rendering() {
        let bundle = ScriptWriter::new().write(&scripts(false)).unwrap();
        let suite = bundle.file("specs/login_flow.spec.js").unwrap();

        assert!(suite
            .content
            .starts_with("const LoginPage = require(\"../pageobjects/LoginPage.page\");\n\n"));
        assert!(suite.content.contains("    await browser.url(\"http://localhost/login\");"));
        assert!(suite.content.contains("    // intention: log in as admin\n"));
        assert!(suite.content.contains("    await LoginPage.goToHome(\"al\\\"ice\");"));
        assert!(suite.content.contains("    await browser.back();"));
        assert_eq!(bundle.files.len(), 2);
    }

    #[test]
    fn test_data_driven_rendering() {
        let bundle = ScriptWriter::new().write(&scripts(true)).unwrap();
        let spec = bundle.file(DATA_DRIVEN_SPEC).unwrap();
        assert!(spec.content.contains("testData[\"LoginPage_goToHome\"].forEach((row, index) => {"));
        assert!(spec.content.contains("await LoginPage.goToHome(row[\"user\"]);"));

        let data = bundle.file(DATA_FILE).unwrap();
        let parsed: Value = serde_json::from_str(&data.content).unwrap();
        assert_eq!(parsed["LoginPage_goToHome"][1]["user"], "b");
        assert_eq!(parsed["LoginPage_goToHome"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_js_string_escaping() {
        assert_eq!(js_string("plain"), "\"plain\"");
        assert_eq!(js_string("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
        assert_eq!(js_string("\u{1}"), "\"\\u0001\"");
    }
}
