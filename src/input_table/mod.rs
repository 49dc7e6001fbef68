//! Input Value Table
//!
//! Groups the values typed into input elements by the intention under which
//! they were entered. Each registration is a transition record: the screen
//! the inputs were made on, the screen reached afterwards, and the inputs.
//! Reading an intention yields deduplicated rows for data-driven generation.

use crate::history::ScreenHistory;
use crate::model::{ElementInfo, ElementKey, NoteKind, OperationType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// An input made during a transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionInput {
    pub element: ElementInfo,
    pub value: String,
}

/// Inputs made on one screen before leaving it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionInputs {
    /// Screen the inputs were made on
    pub source: String,
    /// Screen reached afterwards; `None` when the window never left `source`
    pub target: Option<String>,
    /// Operations of the segment, ascending
    pub sequences: Vec<u32>,
    pub inputs: Vec<TransitionInput>,
}

/// One data-driven row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputValueRow {
    pub screen_def: String,
    pub element_locator: String,
    pub value: String,
}

/// Transition records keyed by intention label, in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputValueTable {
    intentions: Vec<(String, Vec<TransitionInputs>)>,
}

impl InputValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append transition records under an intention. Registering the same
    /// intention again appends.
    pub fn register_screen_transition_to_intentions<I>(&mut self, intention: &str, transitions: I)
    where
        I: IntoIterator<Item = TransitionInputs>,
    {
        let position = match self.intentions.iter().position(|(label, _)| label == intention) {
            Some(position) => position,
            None => {
                self.intentions.push((intention.to_string(), Vec::new()));
                self.intentions.len() - 1
            }
        };
        self.intentions[position].1.extend(transitions);
    }

    /// Intention labels in registration order
    pub fn intentions(&self) -> impl Iterator<Item = &str> {
        self.intentions.iter().map(|(label, _)| label.as_str())
    }

    pub fn transitions(&self, intention: &str) -> &[TransitionInputs] {
        self.intentions
            .iter()
            .find(|(label, _)| label == intention)
            .map(|(_, records)| records.as_slice())
            .unwrap_or(&[])
    }

    /// Rows of one intention. A `(screen, element)` pair appears once, at the
    /// position of its first input, holding its most recent value.
    pub fn rows(&self, intention: &str) -> Vec<InputValueRow> {
        let mut rows: Vec<InputValueRow> = Vec::new();
        let mut index: HashMap<(String, ElementKey), usize> = HashMap::new();

        for record in self.transitions(intention) {
            for input in &record.inputs {
                let key = (record.source.clone(), input.element.key());
                match index.get(&key) {
                    Some(&position) => rows[position].value = input.value.clone(),
                    None => {
                        index.insert(key, rows.len());
                        rows.push(InputValueRow {
                            screen_def: record.source.clone(),
                            element_locator: input.element.xpath.clone(),
                            value: input.value.clone(),
                        });
                    }
                }
            }
        }
        rows
    }

    pub fn is_empty(&self) -> bool {
        self.intentions.is_empty()
    }

    /// Register every segment of a screen history under the intention in
    /// effect when its operations ran. Operations before the first intention
    /// use the empty label.
    pub fn from_screen_history(history: &ScreenHistory) -> Self {
        let mut table = Self::new();
        let mut current = String::new();
        let segments = history.segments();

        for (position, segment) in segments.iter().enumerate() {
            let target = segments[position + 1..]
                .iter()
                .find(|s| s.window_handle == segment.window_handle)
                .map(|s| s.screen.screen_def.clone())
                .filter(|def| def != &segment.screen.screen_def);

            let mut record: Option<TransitionInputs> = None;
            for entry in history.segment_entries(segment) {
                if let Some(intention) = entry.step.notes(NoteKind::Intention).first() {
                    if intention.value != current {
                        if let Some(record) = record.take() {
                            table.register_screen_transition_to_intentions(&current, [record]);
                        }
                        current = intention.value.clone();
                    }
                }

                let record = record.get_or_insert_with(|| TransitionInputs {
                    source: segment.screen.screen_def.clone(),
                    target: None,
                    sequences: Vec::new(),
                    inputs: Vec::new(),
                });
                record.sequences.push(entry.sequence());

                let op = &entry.step.operation;
                if op.op_type != OperationType::Change {
                    continue;
                }
                let Some(element) = &op.element else {
                    continue;
                };
                let value = op.input.clone().unwrap_or_default();
                let key = element.key();
                match record.inputs.iter_mut().find(|i| i.element.key() == key) {
                    Some(input) => input.value = value,
                    None => record.inputs.push(TransitionInput {
                        element: element.clone(),
                        value,
                    }),
                }
            }

            if let Some(mut record) = record {
                record.target = target;
                table.register_screen_transition_to_intentions(&current, [record]);
            }
        }

        debug!(intentions = table.intentions.len(), "built input value table");
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CapturedOperation, KeywordSet, NoteDraft, NoteId, Operation, TestStep};
    use chrono::Utc;

    fn make_step(sequence: u32, screen: &str, op: Option<(&str, &str)>) -> TestStep {
        let (op_type, element, input) = match op {
            Some((xpath, value)) => (
                OperationType::Change,
                Some(ElementInfo::new("input", xpath)),
                Some(value.to_string()),
            ),
            None => (OperationType::Click, Some(ElementInfo::new("button", "/submit")), None),
        };
        TestStep::new(
            format!("s{}", sequence),
            Operation::from_captured(
                sequence,
                CapturedOperation {
                    window_handle: "w1".to_string(),
                    screen_def: screen.to_string(),
                    title: screen.to_string(),
                    url: String::new(),
                    element,
                    op_type,
                    input,
                    keywords: KeywordSet::new(),
                    image_url: None,
                    timestamp: Utc::now(),
                },
            ),
        )
    }

    fn with_intention(mut step: TestStep, value: &str) -> TestStep {
        let sequence = step.sequence();
        step.intention = Some(
            NoteDraft::intention(sequence, value, "").into_note(NoteId::new(format!("i{}", sequence))),
        );
        step
    }

    fn record(source: &str, inputs: &[(&str, &str)]) -> TransitionInputs {
        TransitionInputs {
            source: source.to_string(),
            target: None,
            sequences: Vec::new(),
            inputs: inputs
                .iter()
                .map(|(xpath, value)| TransitionInput {
                    element: ElementInfo::new("input", *xpath),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_registration_appends() {
        let mut table = InputValueTable::new();
        table.register_screen_transition_to_intentions("login", [record("Login", &[("/user", "alice")])]);
        table.register_screen_transition_to_intentions("login", [record("Login", &[("/pass", "secret")])]);

        assert_eq!(table.transitions("login").len(), 2);
        assert_eq!(table.intentions().collect::<Vec<_>>(), vec!["login"]);
        assert!(table.transitions("missing").is_empty());
    }

    #[test]
    fn test_rows_keep_most_recent_value_in_first_position() {
        let mut table = InputValueTable::new();
        table.register_screen_transition_to_intentions(
            "login",
            [
                record("Login", &[("/user", "al"), ("/pass", "x")]),
                record("Login", &[("/USER", "alice")]),
                record("Home", &[("/user", "other screen")]),
            ],
        );

        let rows = table.rows("login");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].element_locator, "/user");
        assert_eq!(rows[0].value, "alice");
        assert_eq!(rows[1].value, "x");
        assert_eq!(rows[2].screen_def, "Home");
    }

    #[test]
    fn test_from_screen_history_groups_by_intention() {
        let steps = vec![
            make_step(1, "Top", Some(("/q", "shoes"))),
            with_intention(make_step(2, "Login", Some(("/user", "al"))), "log in"),
            make_step(3, "Login", Some(("/user", "alice"))),
            make_step(4, "Login", None),
            make_step(5, "Home", None),
        ];
        let history = ScreenHistory::build(&steps, &[]).unwrap();
        let table = InputValueTable::from_screen_history(&history);

        assert_eq!(table.intentions().collect::<Vec<_>>(), vec!["", "log in"]);
        assert_eq!(table.rows("")[0].value, "shoes");

        let login = table.transitions("log in");
        assert_eq!(login[0].source, "Login");
        assert_eq!(login[0].target.as_deref(), Some("Home"));
        assert_eq!(login[0].sequences, vec![2, 3, 4]);
        assert_eq!(table.rows("log in").len(), 1);
        assert_eq!(table.rows("log in")[0].value, "alice");
    }

    #[test]
    fn test_intention_mid_segment_splits_record() {
        let steps = vec![
            make_step(1, "Form", Some(("/a", "1"))),
            with_intention(make_step(2, "Form", Some(("/a", "2"))), "second"),
        ];
        let history = ScreenHistory::build(&steps, &[]).unwrap();
        let table = InputValueTable::from_screen_history(&history);

        assert_eq!(table.rows("")[0].value, "1");
        assert_eq!(table.rows("second")[0].value, "2");
        assert_eq!(table.transitions("").len(), 1);
    }
}
