//! # ContentView Component
//!
//! Scrollable body that draws one screen's [`Content`]: each node becomes a
//! wrapped `Paragraph` stacked inside a `ScrollView`.
//!
//! `ContentView` is transient (created each frame) and wraps the persistent
//! `&'a mut ContentViewState`, which caches node heights so the focused
//! node can be scrolled into view.

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Paragraph, Wrap};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::content::{Content, Node};
use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;
use crate::tui::form::LayerForm;
use crate::tui::markdown;

const SPINNER: [char; 8] = ['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];

/// Scroll position and layout measurements of the body.
/// Must be persisted in the parent TuiState.
#[derive(Default)]
pub struct ContentViewState {
    pub scroll_state: ScrollViewState,
    /// Height of each node at the last rendered width
    pub heights: Vec<u16>,
    /// Node index holding each focusable, in focus order
    pub focus_nodes: Vec<usize>,
    pub viewport_height: u16,
    /// Set when focus moves; the next render scrolls the focused node into view
    pub follow_focus: bool,
}

impl ContentViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the top, for a newly shown screen.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn total_height(&self) -> u16 {
        self.heights.iter().sum()
    }

    /// Whether content continues below the viewport.
    pub fn has_hidden_content(&self) -> bool {
        let max_y = self.total_height().saturating_sub(self.viewport_height);
        self.scroll_state.offset().y < max_y
    }

    fn clamp_scroll(&mut self) {
        let max_y = self.total_height().saturating_sub(self.viewport_height);
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Scroll so the node holding `focus` is visible, aligning its top edge
    /// when it is taller than the viewport.
    fn scroll_to_focus(&mut self, focus: usize) {
        let Some(&node) = self.focus_nodes.get(focus) else {
            return;
        };
        let top: u16 = self.heights[..node].iter().sum();
        let bottom = top + self.heights[node];
        let offset_y = self.scroll_state.offset().y;
        if top < offset_y {
            self.scroll_state.set_offset(Position { x: 0, y: top });
        } else if bottom > offset_y + self.viewport_height {
            let y = bottom.saturating_sub(self.viewport_height).min(top);
            self.scroll_state.set_offset(Position { x: 0, y });
        }
    }
}

impl EventHandler for ContentViewState {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::ScrollUp => self.scroll_state.scroll_up(),
            TuiEvent::ScrollDown => self.scroll_state.scroll_down(),
            TuiEvent::ScrollPageUp => self.scroll_state.scroll_page_up(),
            TuiEvent::ScrollPageDown => self.scroll_state.scroll_page_down(),
            TuiEvent::FocusNext
            | TuiEvent::FocusPrev
            | TuiEvent::Left
            | TuiEvent::Right => self.follow_focus = true,
            _ => return None,
        }
        self.clamp_scroll();
        None
    }
}

/// Per-frame props shared by every node of one layer.
#[derive(Clone, Copy)]
pub struct NodeProps<'a> {
    /// Edited values and focus of this layer
    pub form: Option<&'a LayerForm>,
    /// Whether this layer receives keys (only then is focus drawn)
    pub active: bool,
    pub spinner_frame: usize,
    pub width: u16,
}

impl NodeProps<'_> {
    fn is_focused(&self, focus_index: usize) -> bool {
        self.active && self.form.is_some_and(|form| form.focus() == focus_index)
    }

    fn value<'v>(&'v self, id: &str, default: &'v str) -> &'v str {
        self.form.and_then(|form| form.value(id)).unwrap_or(default)
    }
}

/// Number of focusables a node contributes.
fn focus_count(node: &Node) -> usize {
    match node {
        Node::Row(children) => children.iter().map(focus_count).sum(),
        node if node.is_focusable() => 1,
        _ => 0,
    }
}

fn button_span(label: &str, focused: bool) -> Span<'static> {
    let style = if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().fg(Color::Cyan)
    };
    Span::styled(format!("[ {label} ]"), style)
}

fn choice_spans(
    label: &str,
    options: &[crate::core::content::ChoiceOption],
    selected: usize,
    id: &str,
    focused: bool,
    props: &NodeProps,
) -> Vec<Span<'static>> {
    let default = options.get(selected).map(|o| o.value.as_str()).unwrap_or("");
    let value = props.value(id, default);
    let shown = options
        .iter()
        .find(|o| o.value == value)
        .map(|o| o.label.clone())
        .unwrap_or_else(|| String::from("(none)"));
    let style = if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().fg(Color::White)
    };
    vec![
        Span::styled(format!("{label}: "), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("‹ {shown} ›"), style),
    ]
}

/// Spans for a node drawn inside a row (no block, no wrapping of its own).
fn inline_spans(node: &Node, focus_index: &mut usize, props: &NodeProps) -> Vec<Span<'static>> {
    let spans = match node {
        Node::Button { label, .. } => vec![button_span(label, props.is_focused(*focus_index))],
        Node::Choice {
            id,
            label,
            options,
            selected,
        } => choice_spans(label, options, *selected, id, props.is_focused(*focus_index), props),
        Node::Text(text) | Node::Header(text) | Node::Markdown(text) => {
            vec![Span::raw(text.clone())]
        }
        Node::Muted(text) => vec![Span::styled(
            text.clone(),
            Style::default().fg(Color::DarkGray),
        )],
        Node::Field { label, value } => vec![
            Span::styled(format!("{label}: "), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(value.clone()),
        ],
        Node::Input { id, value, .. } => vec![Span::raw(props.value(id, value).to_string())],
        Node::Loading(text) => vec![Span::raw(text.clone())],
        Node::Separator => vec![Span::raw("│")],
        Node::Row(children) => {
            return children
                .iter()
                .flat_map(|child| inline_spans(child, focus_index, props))
                .collect();
        }
    };
    *focus_index += focus_count(node);
    spans
}

/// Build the widget for one top-level node. `first_focus` is the focus
/// index of the node's first focusable.
pub fn node_paragraph(node: &Node, first_focus: usize, props: &NodeProps) -> Paragraph<'static> {
    let wrap = Wrap { trim: false };
    match node {
        Node::Header(text) => Paragraph::new(Line::from(Span::styled(
            text.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )))
        .wrap(wrap),
        Node::Text(text) => Paragraph::new(text.clone()).wrap(wrap),
        Node::Muted(text) => Paragraph::new(text.clone())
            .style(Style::default().fg(Color::DarkGray))
            .wrap(wrap),
        Node::Markdown(text) => Paragraph::new(markdown::render(text, Color::Gray)).wrap(wrap),
        Node::Loading(text) => {
            let frame = SPINNER[props.spinner_frame % SPINNER.len()];
            Paragraph::new(format!("{frame} {text}"))
                .style(Style::default().fg(Color::Yellow))
                .wrap(wrap)
        }
        Node::Separator => Paragraph::new(Span::styled(
            "─".repeat(props.width as usize),
            Style::default().fg(Color::DarkGray),
        )),
        Node::Input {
            id,
            label,
            value,
            placeholder,
            max_len,
            ..
        } => {
            let focused = props.is_focused(first_focus);
            let current = props.value(id, value);
            let mut text = if current.is_empty() {
                Text::styled(placeholder.clone(), Style::default().fg(Color::DarkGray))
            } else {
                Text::raw(current.to_string())
            };
            if focused {
                let cursor = Span::styled("▏", Style::default().fg(Color::Yellow));
                if current.is_empty() {
                    text = Text::from(Line::from(cursor));
                } else if let Some(line) = text.lines.last_mut() {
                    line.push_span(cursor);
                }
            }
            let border = if focused {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let counter = format!(" {}/{} ", current.chars().count(), max_len);
            Paragraph::new(text)
                .block(
                    Block::bordered()
                        .title(format!(" {label} "))
                        .title_bottom(Line::from(counter).right_aligned())
                        .border_style(border),
                )
                .wrap(wrap)
        }
        Node::Button { .. } | Node::Choice { .. } | Node::Field { .. } | Node::Row(_) => {
            let mut focus_index = first_focus;
            let mut spans = Vec::new();
            let children = match node {
                Node::Row(children) => children.as_slice(),
                single => std::slice::from_ref(single),
            };
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::raw("  "));
                }
                spans.extend(inline_spans(child, &mut focus_index, props));
            }
            Paragraph::new(Line::from(spans)).wrap(wrap)
        }
    }
}

/// Widgets for every node, with heights and focus bookkeeping.
pub struct LaidOut {
    pub paragraphs: Vec<Paragraph<'static>>,
    pub heights: Vec<u16>,
    pub focus_nodes: Vec<usize>,
}

pub fn lay_out(content: &Content, props: &NodeProps) -> LaidOut {
    let mut laid_out = LaidOut {
        paragraphs: Vec::with_capacity(content.nodes.len()),
        heights: Vec::with_capacity(content.nodes.len()),
        focus_nodes: Vec::new(),
    };
    for (index, node) in content.nodes.iter().enumerate() {
        let first_focus = laid_out.focus_nodes.len();
        let paragraph = node_paragraph(node, first_focus, props);
        let height = paragraph.line_count(props.width) as u16;
        laid_out.paragraphs.push(paragraph);
        laid_out.heights.push(height);
        laid_out
            .focus_nodes
            .extend(std::iter::repeat_n(index, focus_count(node)));
    }
    laid_out
}

pub struct ContentView<'a> {
    pub state: &'a mut ContentViewState,
    pub content: &'a Content,
    pub form: Option<&'a LayerForm>,
    /// False while a child overlay holds the keys
    pub active: bool,
    pub spinner_frame: usize,
}

impl Component for ContentView<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let content_width = area.width.saturating_sub(1); // -1 for scrollbar safe area
        let props = NodeProps {
            form: self.form,
            active: self.active,
            spinner_frame: self.spinner_frame,
            width: content_width,
        };
        let laid_out = lay_out(self.content, &props);
        self.state.heights = laid_out.heights;
        self.state.focus_nodes = laid_out.focus_nodes;
        self.state.viewport_height = area.height;
        self.state.clamp_scroll();
        if self.state.follow_focus {
            if let Some(form) = self.form {
                self.state.scroll_to_focus(form.focus());
            }
            self.state.follow_focus = false;
        }

        let total_height = self.state.total_height();
        let mut scroll_view = ScrollView::new(Size::new(content_width, total_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Automatic)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y_offset: u16 = 0;
        for (paragraph, &height) in laid_out.paragraphs.into_iter().zip(&self.state.heights) {
            scroll_view.render_widget(paragraph, Rect::new(0, y_offset, content_width, height));
            y_offset += height;
        }

        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);
    }
}
