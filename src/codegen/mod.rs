//! Test Script Generation
//!
//! Generates WebdriverIO page objects and mocha test suites from recorded
//! operation histories.

pub mod model;
pub mod naming;
pub mod scenario;
pub mod generator;
pub mod writer;
pub mod url_resolver;

pub use generator::{GeneratorOptions, ScriptGenerator, ScriptSource};
pub use model::{GeneratedScripts, PageObject, ScriptBundle, TestDataSet, TestSuite};
pub use url_resolver::{screenshot_links, ServiceUrlResolver, UrlResolver};
pub use writer::ScriptWriter;
