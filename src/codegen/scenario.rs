//! Scenario Extraction
//!
//! Splits one source's screen history into the units the generator emits:
//! sections (runs of element actions on one screen) and inline browser
//! actions. A section ends where the window leaves the screen or a browser
//! action intervenes, so replaying the scenario in order replays the source.

use super::model::{ActionKind, BrowserAction};
use super::url_resolver::UrlResolver;
use crate::history::ScreenHistory;
use crate::model::{ElementInfo, ElementKey, Note, NoteKind, Operation, OperationType, TestStep};
use tracing::debug;

/// One element action inside a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionAction {
    pub element: ElementInfo,
    pub kind: ActionKind,
    pub value: Option<String>,
    pub sequence: u32,
    pub comments: Vec<String>,
}

/// Consecutive element actions on one screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub screen_def: String,
    /// Screen the window moved to right after the section
    pub target: Option<String>,
    /// Intention in effect when the section started; empty before the first
    pub intention: String,
    pub actions: Vec<SectionAction>,
}

/// Structural identity of a section
pub type SectionSignature = (String, Option<String>, Vec<(ElementKey, ActionKind)>);

impl Section {
    pub fn signature(&self) -> SectionSignature {
        (
            self.screen_def.clone(),
            self.target.clone(),
            self.actions
                .iter()
                .map(|a| (a.element.key(), a.kind))
                .collect(),
        )
    }

    /// Comments of every action, in order
    pub fn comments(&self) -> Vec<String> {
        self.actions
            .iter()
            .flat_map(|a| a.comments.iter().cloned())
            .collect()
    }
}

/// Unit of a scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioStep {
    Section(Section),
    Browser {
        action: BrowserAction,
        sequence: u32,
        comments: Vec<String>,
    },
}

/// Emission units of one source, in replay order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scenario {
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.steps.iter().filter_map(|step| match step {
            ScenarioStep::Section(section) => Some(section),
            ScenarioStep::Browser { .. } => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Extract the scenario of a screen history. Image URLs in comments go
    /// through `resolver` when one is given.
    pub fn from_history(history: &ScreenHistory, resolver: Option<&dyn UrlResolver>) -> Self {
        let mut steps: Vec<ScenarioStep> = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        let mut intention = String::new();
        let segments = history.segments();

        for (position, segment) in segments.iter().enumerate() {
            let target = segments[position + 1..]
                .iter()
                .find(|s| s.window_handle == segment.window_handle)
                .map(|s| s.screen.screen_def.clone())
                .filter(|def| def != &segment.screen.screen_def);

            let mut section: Option<Section> = None;
            for entry in history.segment_entries(segment) {
                let step = &entry.step;
                if let Some(note) = step.notes(NoteKind::Intention).first() {
                    intention = note.value.clone();
                }
                pending.extend(comments_of(step, resolver));

                let op = &step.operation;
                if let Some(action) = browser_action(op) {
                    if let Some(section) = section.take() {
                        steps.push(ScenarioStep::Section(section));
                    }
                    steps.push(ScenarioStep::Browser {
                        action,
                        sequence: op.sequence,
                        comments: std::mem::take(&mut pending),
                    });
                    continue;
                }

                let Some((element, kind)) = element_action(op) else {
                    debug!(sequence = op.sequence, op_type = %op.op_type, "operation emits no action");
                    continue;
                };
                section
                    .get_or_insert_with(|| Section {
                        screen_def: segment.screen.screen_def.clone(),
                        target: None,
                        intention: intention.clone(),
                        actions: Vec::new(),
                    })
                    .actions
                    .push(SectionAction {
                        element: element.clone(),
                        kind,
                        value: kind.takes_value().then(|| op.input.clone().unwrap_or_default()),
                        sequence: op.sequence,
                        comments: std::mem::take(&mut pending),
                    });
            }

            if let Some(mut section) = section {
                section.target = target;
                steps.push(ScenarioStep::Section(section));
            }
        }

        // Trailing annotations stay with the last emitted step
        if !pending.is_empty() {
            match steps.last_mut() {
                Some(ScenarioStep::Section(section)) => {
                    if let Some(action) = section.actions.last_mut() {
                        action.comments.append(&mut pending);
                    }
                }
                Some(ScenarioStep::Browser { comments, .. }) => comments.append(&mut pending),
                None => {}
            }
        }

        Scenario { steps }
    }
}

fn browser_action(op: &Operation) -> Option<BrowserAction> {
    match op.op_type {
        OperationType::SwitchWindow => Some(BrowserAction::SwitchWindow {
            title: op.title.clone(),
        }),
        OperationType::BrowserBack => Some(BrowserAction::Back),
        OperationType::BrowserForward => Some(BrowserAction::Forward),
        OperationType::AcceptAlert => Some(BrowserAction::AcceptAlert),
        OperationType::DismissAlert => Some(BrowserAction::DismissAlert),
        _ => None,
    }
}

/// Element action of an operation. A change on a checkbox or radio button
/// follows the click that toggled it and emits nothing.
fn element_action(op: &Operation) -> Option<(&ElementInfo, ActionKind)> {
    let element = op.element.as_ref()?;
    match op.op_type {
        OperationType::Click => Some((element, ActionKind::Click)),
        OperationType::Change if element.is_toggle() => None,
        OperationType::Change if element.tag_name.eq_ignore_ascii_case("select") => {
            Some((element, ActionKind::SelectOption))
        }
        OperationType::Change => Some((element, ActionKind::SetValue)),
        _ => None,
    }
}

fn note_comment(note: &Note, resolver: Option<&dyn UrlResolver>) -> Vec<String> {
    let mut text = format!("{}: {}", note.kind, note.value);
    if !note.tags.is_empty() {
        let tags: Vec<&str> = note.tags.iter().map(String::as_str).collect();
        text.push_str(&format!(" [{}]", tags.join(", ")));
    }
    let mut comments = vec![text];
    if let Some(url) = &note.image_url {
        comments.push(format!("{} image: {}", note.kind, resolve(url, resolver)));
    }
    comments
}

fn comments_of(step: &TestStep, resolver: Option<&dyn UrlResolver>) -> Vec<String> {
    let mut comments = Vec::new();
    for kind in [NoteKind::Intention, NoteKind::Bug, NoteKind::Notice] {
        for note in step.notes(kind) {
            comments.extend(note_comment(note, resolver));
        }
    }
    if let Some(url) = &step.operation.image_url {
        comments.push(format!("screenshot #{}: {}", step.sequence(), resolve(url, resolver)));
    }
    comments
}

fn resolve(url: &str, resolver: Option<&dyn UrlResolver>) -> String {
    match resolver {
        Some(resolver) => resolver.to_relative(url),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::url_resolver::ServiceUrlResolver;
    use crate::model::{CapturedOperation, KeywordSet, NoteDraft, NoteId};
    use chrono::Utc;

    fn make_op(
        sequence: u32,
        screen: &str,
        op_type: OperationType,
        element: Option<ElementInfo>,
        input: Option<&str>,
    ) -> TestStep {
        TestStep::new(
            format!("s{}", sequence),
            Operation::from_captured(
                sequence,
                CapturedOperation {
                    window_handle: "w1".to_string(),
                    screen_def: screen.to_string(),
                    title: format!("{} title", screen),
                    url: String::new(),
                    element,
                    op_type,
                    input: input.map(String::from),
                    keywords: KeywordSet::new(),
                    image_url: None,
                    timestamp: Utc::now(),
                },
            ),
        )
    }

    fn input(xpath: &str) -> Option<ElementInfo> {
        Some(ElementInfo::new("input", xpath))
    }

    fn scenario(steps: &[TestStep]) -> Scenario {
        let history = ScreenHistory::build(steps, &[]).unwrap();
        Scenario::from_history(&history, None)
    }

    #[test]
    fn test_sections_split_at_screen_change() {
        let steps = vec![
            make_op(1, "Login", OperationType::Change, input("/user"), Some("alice")),
            make_op(2, "Login", OperationType::Click, Some(ElementInfo::new("button", "/go")), None),
            make_op(3, "Home", OperationType::Click, Some(ElementInfo::new("a", "/logout")), None),
        ];
        let scenario = scenario(&steps);
        let sections: Vec<&Section> = scenario.sections().collect();

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].target.as_deref(), Some("Home"));
        assert_eq!(sections[0].actions.len(), 2);
        assert_eq!(sections[0].actions[0].value.as_deref(), Some("alice"));
        assert_eq!(sections[0].actions[1].value, None);
        assert_eq!(sections[1].target, None);
    }

    #[test]
    fn test_browser_action_splits_section() {
        let steps = vec![
            make_op(1, "List", OperationType::Click, Some(ElementInfo::new("a", "/a")), None),
            make_op(2, "List", OperationType::AcceptAlert, None, None),
            make_op(3, "List", OperationType::Click, Some(ElementInfo::new("a", "/b")), None),
        ];
        let scenario = scenario(&steps);
        assert_eq!(scenario.steps.len(), 3);
        assert!(matches!(
            scenario.steps[1],
            ScenarioStep::Browser { action: BrowserAction::AcceptAlert, sequence: 2, .. }
        ));
        assert_eq!(scenario.sections().count(), 2);
    }

    #[test]
    fn test_identical_sections_share_signature() {
        let steps = vec![
            make_op(1, "Login", OperationType::Change, input("/user"), Some("alice")),
            make_op(2, "Home", OperationType::BrowserBack, None, None),
            make_op(3, "Login", OperationType::Change, input("/USER"), Some("bob")),
            make_op(4, "Home", OperationType::ScreenTransition, None, None),
        ];
        let scenario = scenario(&steps);
        let sections: Vec<&Section> = scenario.sections().collect();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].signature(), sections[1].signature());
    }

    #[test]
    fn test_toggle_change_is_skipped_and_select_is_option() {
        let checkbox = ElementInfo::new("input", "/agree").with_attribute("type", "checkbox");
        let steps = vec![
            make_op(1, "Form", OperationType::Click, Some(checkbox.clone()), None),
            make_op(2, "Form", OperationType::Change, Some(checkbox), Some("on")),
            make_op(3, "Form", OperationType::Change, Some(ElementInfo::new("select", "/s")), Some("jp")),
        ];
        let scenario = scenario(&steps);
        let kinds: Vec<ActionKind> = scenario.sections().flat_map(|s| s.actions.iter().map(|a| a.kind)).collect();
        assert_eq!(kinds, vec![ActionKind::Click, ActionKind::SelectOption]);
    }

    #[test]
    fn test_notes_and_images_become_comments() {
        let mut first = make_op(1, "Login", OperationType::ScreenTransition, None, None);
        first.intention = Some(NoteDraft::intention(1, "log in", "").into_note(NoteId::new("i1")));
        let mut second = make_op(2, "Login", OperationType::Click, Some(ElementInfo::new("button", "/go")), None);
        second.operation = second.operation.with_image_url("http://svc/shots/2.png");
        second.notices.push(
            NoteDraft::notice(2, "slow", "", vec!["perf".to_string()]).into_note(NoteId::new("n1")),
        );

        let history = ScreenHistory::build(&[first, second], &[]).unwrap();
        let resolver = ServiceUrlResolver::new("http://svc");
        let scenario = Scenario::from_history(&history, Some(&resolver));
        let section = scenario.sections().next().unwrap();

        assert_eq!(section.intention, "log in");
        assert_eq!(
            section.actions[0].comments,
            vec![
                "intention: log in".to_string(),
                "notice: slow [perf]".to_string(),
                "screenshot #2: shots/2.png".to_string(),
            ]
        );
    }
}
