//! # Content Descriptions
//!
//! What a screen wants shown, as a flat tree of declarative nodes. The core
//! hands these to the [`Renderer`](crate::core::navigation::Renderer) without
//! looking inside. Interactive nodes carry an [`Intent`] that is routed back
//! to the screen when the user activates them.

use std::collections::HashMap;

use crate::core::action::ScreenRequest;

/// Identifies an editable node within one screen's content.
pub type FieldId = &'static str;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    pub title: String,
    pub nodes: Vec<Node>,
    /// Failure encountered while composing; shown alongside the partial content.
    pub error: Option<String>,
    /// Status line under the body (totals, hints).
    pub footer: Option<String>,
}

impl Content {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn with(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Every interactive node, in display order (rows flattened).
    pub fn focusable(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect_focusable(&mut out);
        }
        out
    }

    /// Initial values of all inputs and choices.
    pub fn form_defaults(&self) -> FormInput {
        let mut input = FormInput::default();
        for node in self.focusable() {
            match node {
                Node::Input { id, value, .. } => input.set(id, value.clone()),
                Node::Choice {
                    id,
                    options,
                    selected,
                    ..
                } => {
                    if let Some(option) = options.get(*selected) {
                        input.set(id, option.value.clone());
                    }
                }
                _ => {}
            }
        }
        input
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    pub label: String,
    pub value: String,
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Header(String),
    Text(String),
    /// Dimmed secondary text.
    Muted(String),
    Markdown(String),
    /// Placeholder while an asynchronous load is in flight.
    Loading(String),
    Separator,
    /// A labelled value pair, e.g. `Due Date: Mar 4 ...`.
    Field { label: String, value: String },
    Button { label: String, intent: Intent },
    /// Nodes laid out on one line.
    Row(Vec<Node>),
    Input {
        id: FieldId,
        label: String,
        value: String,
        placeholder: String,
        max_len: usize,
        multiline: bool,
    },
    Choice {
        id: FieldId,
        label: String,
        options: Vec<ChoiceOption>,
        selected: usize,
    },
}

impl Node {
    pub fn button(label: impl Into<String>, intent: Intent) -> Self {
        Node::Button {
            label: label.into(),
            intent,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn field(label: impl Into<String>, value: impl Into<String>) -> Self {
        Node::Field {
            label: label.into(),
            value: value.into(),
        }
    }

    pub fn input(id: FieldId, label: impl Into<String>, value: impl Into<String>, max_len: usize) -> Self {
        Node::Input {
            id,
            label: label.into(),
            value: value.into(),
            placeholder: String::new(),
            max_len,
            multiline: false,
        }
    }

    pub fn is_focusable(&self) -> bool {
        matches!(
            self,
            Node::Button { .. } | Node::Input { .. } | Node::Choice { .. }
        )
    }

    fn collect_focusable<'a>(&'a self, out: &mut Vec<&'a Node>) {
        match self {
            Node::Row(children) => {
                for child in children {
                    child.collect_focusable(out);
                }
            }
            node if node.is_focusable() => out.push(node),
            _ => {}
        }
    }
}

/// What activating a node asks of its screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Navigate(ScreenRequest),
    GoBack,
    /// Close the screen's topmost child (or, from a child, itself).
    Dismiss,
    Save,
    Delete,
    /// Home: open the most recent list.
    OpenLatestList,
    /// Mutate task: open the due date picker.
    PickDueDate,
    ShiftDueDays(i64),
    ShiftDueHours(i64),
    DueToday,
    ClearDue,
    CycleStatus(u64),
    CyclePriority(u64),
    DeleteTask(u64),
}

/// Values of the focused screen's inputs and choices when an intent fires.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormInput {
    values: HashMap<FieldId, String>,
}

impl FormInput {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }

    pub fn set(&mut self, id: FieldId, value: impl Into<String>) {
        self.values.insert(id, value.into());
    }

    pub fn with(mut self, id: FieldId, value: impl Into<String>) -> Self {
        self.set(id, value);
        self
    }
}
