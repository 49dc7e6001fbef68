//! Test Script Generator
//!
//! Builds page objects and test suites from one or more sources.
//!
//! - Plain mode: one page method per distinct (element, action) on a screen;
//!   every operation becomes one invocation.
//! - Optimized mode: one page method per distinct section (source screen,
//!   target screen, element actions); structurally identical sections from
//!   any source share the method. Input values become parameters.
//! - Data-driven: a method whose parameter rows differ across its
//!   invocations gets a data set, and every suite using it gets a
//!   data-driven variant. Rows come from each source's input value table.
//!
//! Generation either returns a complete result or an error; nothing is
//! produced partially.

use super::model::{
    ActionKind, Argument, DataDrivenSuite, GeneratedScripts, MethodAction, PageElement, PageMethod, PageObject,
    SuiteCall, SuiteStep, TestDataSet, TestSuite,
};
use super::naming::{camel_case, pascal_case, snake_case, NameRegistry};
use super::scenario::{Scenario, ScenarioStep, Section, SectionAction, SectionSignature};
use super::url_resolver::UrlResolver;
use crate::history::ScreenHistory;
use crate::input_table::InputValueTable;
use crate::model::{ElementInfo, ElementKey, TestStep};
use crate::{EmptyGenerationCode, Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Generation options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeneratorOptions {
    /// Share methods between structurally identical sections
    pub optimize: bool,
    /// Emit data sets and data-driven suites
    pub data_driven: bool,
    /// Maximum rows per data set; 0 keeps every row
    pub max_generation: usize,
}

/// One recorded history to generate a suite from
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptSource {
    pub name: String,
    pub initial_url: String,
    pub steps: Vec<TestStep>,
}

impl ScriptSource {
    pub fn new(initial_url: impl Into<String>, steps: Vec<TestStep>) -> Self {
        Self {
            name: String::new(),
            initial_url: initial_url.into(),
            steps,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Test script generator
pub struct ScriptGenerator {
    options: GeneratorOptions,
    url_resolver: Option<Arc<dyn UrlResolver>>,
}

impl ScriptGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        Self {
            options,
            url_resolver: None,
        }
    }

    /// Rewrite image URLs in comments through `resolver`
    pub fn with_url_resolver(mut self, resolver: Arc<dyn UrlResolver>) -> Self {
        self.url_resolver = Some(resolver);
        self
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn generate(&self, sources: &[ScriptSource]) -> Result<GeneratedScripts> {
        let mut prepared = Vec::with_capacity(sources.len());
        for source in sources {
            let history = ScreenHistory::build(&source.steps, &[])?;
            let screens: Vec<String> = history.screens().iter().map(|n| n.screen_def.clone()).collect();
            let scenario = Scenario::from_history(&history, self.url_resolver.as_deref());
            let table = if self.options.data_driven {
                InputValueTable::from_screen_history(&history)
            } else {
                InputValueTable::new()
            };
            prepared.push((source, screens, scenario, table));
        }

        let operations: usize = sources.iter().map(|s| s.steps.len()).sum();
        if self.options.optimize {
            let sections: usize = prepared.iter().map(|(_, _, s, _)| s.sections().count()).sum();
            if sections == 0 {
                return Err(Error::GenerationEmpty(EmptyGenerationCode::NoSection));
            }
        } else if operations == 0 {
            return Err(Error::GenerationEmpty(EmptyGenerationCode::NoOperation));
        }

        // One page object per screen, whether or not anything was operated on it
        let mut pages = PageRegistry::default();
        for (_, screens, _, _) in &prepared {
            for screen_def in screens {
                pages.page(screen_def);
            }
        }
        let mut suite_names = NameRegistry::new();
        let mut test_suites = Vec::with_capacity(prepared.len());
        let mut invocations: Vec<Invocation> = Vec::new();

        for (index, (source, _, scenario, table)) in prepared.iter().enumerate() {
            let name = if source.name.is_empty() {
                format!("source {}", index + 1)
            } else {
                source.name.clone()
            };
            let file_stem = suite_names.unique_snake(&snake_case(&name, "suite"));

            let mut steps = Vec::new();
            if !source.initial_url.is_empty() {
                steps.push(SuiteStep {
                    comments: Vec::new(),
                    call: SuiteCall::Navigate {
                        url: source.initial_url.clone(),
                    },
                });
            }

            for step in &scenario.steps {
                match step {
                    ScenarioStep::Browser { action, comments, .. } => steps.push(SuiteStep {
                        comments: comments.clone(),
                        call: SuiteCall::Browser { action: action.clone() },
                    }),
                    ScenarioStep::Section(section) if self.options.optimize => {
                        let (page, method) = pages.section_method(section);
                        let row = data_row(table, section, &section.actions);
                        invocations.push(Invocation {
                            suite: index,
                            page: page.clone(),
                            method: method.clone(),
                            row,
                        });
                        steps.push(SuiteStep {
                            comments: section.comments(),
                            call: SuiteCall::Invoke {
                                page,
                                method,
                                args: literal_args(&section.actions),
                            },
                        });
                    }
                    ScenarioStep::Section(section) => {
                        for action in &section.actions {
                            let (page, method) = pages.action_method(&section.screen_def, action);
                            let actions = std::slice::from_ref(action);
                            invocations.push(Invocation {
                                suite: index,
                                page: page.clone(),
                                method: method.clone(),
                                row: data_row(table, section, actions),
                            });
                            steps.push(SuiteStep {
                                comments: action.comments.clone(),
                                call: SuiteCall::Invoke {
                                    page,
                                    method,
                                    args: literal_args(actions),
                                },
                            });
                        }
                    }
                }
            }

            test_suites.push(TestSuite {
                name,
                file_stem,
                initial_url: source.initial_url.clone(),
                steps,
            });
        }

        let page_objects = pages.into_page_objects();
        let (test_data, data_driven_suites) = if self.options.data_driven {
            self.data_sets(&page_objects, &invocations)
        } else {
            (Vec::new(), Vec::new())
        };

        info!(
            page_objects = page_objects.len(),
            test_suites = test_suites.len(),
            data_sets = test_data.len(),
            optimize = self.options.optimize,
            "generated test scripts"
        );

        Ok(GeneratedScripts {
            page_objects,
            test_suites,
            test_data,
            data_driven_suites,
        })
    }

    /// Data sets for methods whose rows differ, and the suites replaying them
    fn data_sets(
        &self,
        page_objects: &[PageObject],
        invocations: &[Invocation],
    ) -> (Vec<TestDataSet>, Vec<DataDrivenSuite>) {
        let mut test_data = Vec::new();
        let mut suites = Vec::new();

        for page in page_objects {
            for method in page.methods.iter().filter(|m| !m.params.is_empty()) {
                let calls: Vec<&Invocation> = invocations
                    .iter()
                    .filter(|i| i.page == page.class_name && i.method == method.name)
                    .collect();

                let mut rows: Vec<Vec<String>> = Vec::new();
                for call in &calls {
                    if !rows.contains(&call.row) {
                        rows.push(call.row.clone());
                    }
                }
                if rows.len() < 2 {
                    continue;
                }
                if self.options.max_generation > 0 {
                    rows.truncate(self.options.max_generation);
                }

                let name = format!("{}_{}", page.class_name, method.name);
                debug!(data_set = %name, rows = rows.len(), "parameterized method");

                let mut used_by: Vec<usize> = calls.iter().map(|c| c.suite).collect();
                used_by.dedup();
                suites.extend(used_by.into_iter().map(|suite| DataDrivenSuite {
                    suite,
                    data_set: name.clone(),
                }));

                test_data.push(TestDataSet {
                    name,
                    page: page.class_name.clone(),
                    method: method.name.clone(),
                    columns: method.params.clone(),
                    rows,
                });
            }
        }

        (test_data, suites)
    }
}

impl Default for ScriptGenerator {
    fn default() -> Self {
        Self::new(GeneratorOptions::default())
    }
}

/// A page method call and the values it was made with
struct Invocation {
    suite: usize,
    page: String,
    method: String,
    row: Vec<String>,
}

fn literal_args(actions: &[SectionAction]) -> Vec<Argument> {
    actions
        .iter()
        .filter_map(|a| a.value.clone())
        .map(Argument::Literal)
        .collect()
}

/// Values of the value-taking actions, as recorded in the input value table
/// for the segment they ran in, falling back to the literal value.
fn data_row(table: &InputValueTable, section: &Section, actions: &[SectionAction]) -> Vec<String> {
    actions
        .iter()
        .filter_map(|action| {
            let literal = action.value.as_ref()?;
            let key = action.element.key();
            let recorded = table
                .transitions(&section.intention)
                .iter()
                .find(|t| t.sequences.contains(&action.sequence))
                .and_then(|t| t.inputs.iter().find(|i| i.element.key() == key))
                .map(|i| i.value.clone());
            Some(recorded.unwrap_or_else(|| literal.clone()))
        })
        .collect()
}

/// Page objects under construction
#[derive(Default)]
struct PageRegistry {
    pages: Vec<PageBuilder>,
    by_screen: HashMap<String, usize>,
    class_names: NameRegistry,
}

struct PageBuilder {
    page: PageObject,
    /// Getters and methods share the class namespace
    member_names: NameRegistry,
    elements: HashMap<ElementKey, String>,
    action_methods: HashMap<(ElementKey, ActionKind), String>,
    section_methods: HashMap<SectionSignature, String>,
}

impl PageRegistry {
    fn page(&mut self, screen_def: &str) -> &mut PageBuilder {
        let index = match self.by_screen.get(screen_def) {
            Some(&index) => index,
            None => {
                let base = format!("{}Page", pascal_case(screen_def, "screen"));
                let class_name = self.class_names.unique(&base);
                self.pages.push(PageBuilder {
                    page: PageObject {
                        class_name,
                        screen_def: screen_def.to_string(),
                        elements: Vec::new(),
                        methods: Vec::new(),
                    },
                    member_names: NameRegistry::new(),
                    elements: HashMap::new(),
                    action_methods: HashMap::new(),
                    section_methods: HashMap::new(),
                });
                self.by_screen.insert(screen_def.to_string(), self.pages.len() - 1);
                self.pages.len() - 1
            }
        };
        &mut self.pages[index]
    }

    /// Plain mode: method for one element action
    fn action_method(&mut self, screen_def: &str, action: &SectionAction) -> (String, String) {
        let builder = self.page(screen_def);
        let element = builder.element(&action.element);
        let key = (action.element.key(), action.kind);

        let method = match builder.action_methods.get(&key) {
            Some(name) => name.clone(),
            None => {
                let base = camel_case(&format!("{} {}", action.kind.verb(), element), "action");
                let name = builder.member_names.unique(&base);
                let params = if action.kind.takes_value() {
                    vec!["value".to_string()]
                } else {
                    Vec::new()
                };
                builder.page.methods.push(PageMethod {
                    name: name.clone(),
                    actions: vec![MethodAction {
                        element,
                        kind: action.kind,
                        param: params.first().cloned(),
                    }],
                    params,
                    target: None,
                });
                builder.action_methods.insert(key, name.clone());
                name
            }
        };
        (builder.page.class_name.clone(), method)
    }

    /// Optimized mode: method for a whole section
    fn section_method(&mut self, section: &Section) -> (String, String) {
        let builder = self.page(&section.screen_def);
        let signature = section.signature();

        let method = match builder.section_methods.get(&signature) {
            Some(name) => name.clone(),
            None => {
                let base = match &section.target {
                    Some(target) => camel_case(&format!("go to {}", pascal_case(target, "screen")), "goTo"),
                    None => camel_case(&format!("operate {}", pascal_case(&section.screen_def, "screen")), "operate"),
                };
                let name = builder.member_names.unique(&base);

                let mut param_names = NameRegistry::new();
                let mut params = Vec::new();
                let mut actions = Vec::new();
                for action in &section.actions {
                    let element = builder.element(&action.element);
                    let param = action.kind.takes_value().then(|| param_names.unique(&element));
                    if let Some(param) = &param {
                        params.push(param.clone());
                    }
                    actions.push(MethodAction {
                        element,
                        kind: action.kind,
                        param,
                    });
                }

                builder.page.methods.push(PageMethod {
                    name: name.clone(),
                    params,
                    actions,
                    target: section.target.clone(),
                });
                builder.section_methods.insert(signature, name.clone());
                name
            }
        };
        (builder.page.class_name.clone(), method)
    }

    fn into_page_objects(self) -> Vec<PageObject> {
        self.pages.into_iter().map(|b| b.page).collect()
    }
}

impl PageBuilder {
    /// Getter name of an element, registering it on first use
    fn element(&mut self, element: &ElementInfo) -> String {
        let key = element.key();
        if let Some(name) = self.elements.get(&key) {
            return name.clone();
        }
        let name = self.member_names.unique(&camel_case(&element.label(), "element"));
        self.page.elements.push(PageElement {
            name: name.clone(),
            xpath: element.xpath.clone(),
        });
        self.elements.insert(key, name.clone());
        name
    }
}
