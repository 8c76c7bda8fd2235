//! # Form State
//!
//! Edits the user has made to the inputs on screen, and which node has
//! focus. Screens only describe initial values; the TUI keeps the edits
//! and hands them back as a [`FormInput`] when a button is activated.
//!
//! There is one [`LayerForm`] per drawn layer: index 0 for the current
//! screen, then one per open child. A layer starts over whenever its
//! [`LayerKey`] changes (another screen, or the same screen activated
//! again), so stale edits never leak into a new activation.

use std::collections::HashMap;

use crate::core::content::{Content, FieldId, FormInput, Intent, Node};
use crate::core::navigation::Presentation;
use crate::tui::component::EventHandler;
use crate::tui::event::TuiEvent;

/// One interactive node, reduced to what editing needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Button(Intent),
    Input {
        id: FieldId,
        max_len: usize,
        multiline: bool,
    },
    Choice {
        id: FieldId,
        values: Vec<String>,
    },
}

impl Slot {
    fn from_node(node: &Node) -> Option<Slot> {
        match node {
            Node::Button { intent, .. } => Some(Slot::Button(intent.clone())),
            Node::Input {
                id,
                max_len,
                multiline,
                ..
            } => Some(Slot::Input {
                id: *id,
                max_len: *max_len,
                multiline: *multiline,
            }),
            Node::Choice { id, options, .. } => Some(Slot::Choice {
                id: *id,
                values: options.iter().map(|o| o.value.clone()).collect(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LayerKey {
    screen_id: u64,
    generation: u64,
    depth: usize,
    /// Children are told apart by title; the current screen by generation alone.
    title: Option<String>,
}

#[derive(Debug)]
pub struct LayerForm {
    key: LayerKey,
    slots: Vec<Slot>,
    defaults: FormInput,
    overrides: HashMap<FieldId, String>,
    focus: usize,
}

impl LayerForm {
    fn new(key: LayerKey, content: &Content) -> Self {
        let mut layer = Self {
            key,
            slots: Vec::new(),
            defaults: FormInput::default(),
            overrides: HashMap::new(),
            focus: 0,
        };
        layer.refresh(content);
        layer
    }

    /// Picks up recomposed content while keeping edits and focus.
    fn refresh(&mut self, content: &Content) {
        self.slots = content
            .focusable()
            .into_iter()
            .filter_map(Slot::from_node)
            .collect();
        self.defaults = content.form_defaults();
        self.focus = self.focus.min(self.slots.len().saturating_sub(1));
    }

    /// Index into `Content::focusable()` of the focused node.
    pub fn focus(&self) -> usize {
        self.focus
    }

    /// Current value of an input or choice, edits first.
    pub fn value(&self, id: &str) -> Option<&str> {
        self.overrides
            .get(id)
            .map(String::as_str)
            .or_else(|| self.defaults.get(id))
    }

    /// Values to hand the screen along with an intent.
    pub fn input(&self) -> FormInput {
        let mut input = self.defaults.clone();
        for (id, value) in &self.overrides {
            input.set(*id, value.clone());
        }
        input
    }

    fn focused(&self) -> Option<&Slot> {
        self.slots.get(self.focus)
    }

    fn move_focus(&mut self, forward: bool) -> Option<FormEvent> {
        let len = self.slots.len();
        if len == 0 {
            return None;
        }
        self.focus = if forward {
            (self.focus + 1) % len
        } else {
            (self.focus + len - 1) % len
        };
        Some(FormEvent::FocusMoved)
    }

    fn cycle_choice(&mut self, id: FieldId, values: &[String], forward: bool) -> Option<FormEvent> {
        if values.is_empty() {
            return None;
        }
        let len = values.len();
        let current = self
            .value(id)
            .and_then(|v| values.iter().position(|candidate| candidate == v))
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.overrides.insert(id, values[next].clone());
        Some(FormEvent::Edited)
    }

    fn edit(&mut self, id: FieldId, max_len: usize, f: impl FnOnce(&mut String, usize)) -> Option<FormEvent> {
        let mut value = self.value(id).unwrap_or_default().to_string();
        let room = max_len.saturating_sub(value.chars().count());
        f(&mut value, room);
        self.overrides.insert(id, value);
        Some(FormEvent::Edited)
    }
}

/// What a key did to the focused layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    Activate(Intent),
    Edited,
    FocusMoved,
}

#[derive(Debug, Default)]
pub struct FormState {
    layers: Vec<LayerForm>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aligns the layers with a new presentation.
    pub fn sync(&mut self, presentation: &Presentation) {
        let contents = std::iter::once(&presentation.content).chain(presentation.overlays.iter());
        let mut synced = Vec::with_capacity(presentation.overlays.len() + 1);
        let mut old = std::mem::take(&mut self.layers).into_iter();
        for (depth, content) in contents.enumerate() {
            let key = LayerKey {
                screen_id: presentation.screen_id,
                generation: presentation.generation,
                depth,
                title: (depth > 0).then(|| content.title.clone()),
            };
            let layer = match old.next() {
                Some(mut layer) if layer.key == key => {
                    layer.refresh(content);
                    layer
                }
                _ => LayerForm::new(key, content),
            };
            synced.push(layer);
        }
        self.layers = synced;
    }

    pub fn layer(&self, depth: usize) -> Option<&LayerForm> {
        self.layers.get(depth)
    }

    /// The layer receiving keys: the top child, else the screen itself.
    pub fn top(&self) -> Option<&LayerForm> {
        self.layers.last()
    }

    pub fn input(&self) -> FormInput {
        self.top().map(LayerForm::input).unwrap_or_default()
    }
}

impl EventHandler for FormState {
    type Event = FormEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<FormEvent> {
        let layer = self.layers.last_mut()?;
        let slot = layer.focused().cloned();
        match (event, slot) {
            (TuiEvent::FocusNext, _) => layer.move_focus(true),
            (TuiEvent::FocusPrev, _) => layer.move_focus(false),

            (TuiEvent::Submit, Some(Slot::Button(intent))) => Some(FormEvent::Activate(intent)),
            (TuiEvent::Submit, Some(Slot::Input { id, max_len, multiline: true })) => {
                layer.edit(id, max_len, |value, room| {
                    if room > 0 {
                        value.push('\n');
                    }
                })
            }
            (TuiEvent::Submit, Some(Slot::Input { .. })) => layer.move_focus(true),
            (TuiEvent::Submit | TuiEvent::Right, Some(Slot::Choice { id, values })) => {
                layer.cycle_choice(id, &values, true)
            }
            (TuiEvent::Left, Some(Slot::Choice { id, values })) => {
                layer.cycle_choice(id, &values, false)
            }
            (TuiEvent::Left, _) => layer.move_focus(false),
            (TuiEvent::Right, _) => layer.move_focus(true),

            (TuiEvent::InputChar(c), Some(Slot::Input { id, max_len, multiline })) => {
                if *c == '\n' && !multiline {
                    return None;
                }
                let c = *c;
                layer.edit(id, max_len, |value, room| {
                    if room > 0 {
                        value.push(c);
                    }
                })
            }
            (TuiEvent::Paste(text), Some(Slot::Input { id, max_len, multiline })) => {
                layer.edit(id, max_len, |value, room| {
                    let pasted = text
                        .chars()
                        .map(|c| if c == '\n' && !multiline { ' ' } else { c })
                        .filter(|c| *c != '\r')
                        .take(room);
                    value.extend(pasted);
                })
            }
            (TuiEvent::Backspace, Some(Slot::Input { id, max_len, .. })) => {
                layer.edit(id, max_len, |value, _| {
                    value.pop();
                })
            }
            _ => None,
        }
    }
}
