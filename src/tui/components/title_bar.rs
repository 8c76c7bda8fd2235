//! # TitleBar Component
//!
//! Top status bar: application name, the current screen's title, the
//! status message, and a "↓ More" hint when the body has content below
//! the scroll position.
//!
//! Stateless. The bar is a single line rendered as a plain `Span`:
//!
//! 1. **Hidden content**: `"Todo Today | Lists | Loaded 3 lists | ↓ More"`
//! 2. **Status message**: `"Todo Today | Lists | Loaded 3 lists"`
//! 3. **Default**: `"Todo Today | Lists"`

use crate::tui::component::Component;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

pub struct TitleBar<'a> {
    /// Title of the current screen's content
    pub screen_title: &'a str,
    pub status_message: &'a str,
    /// Whether there's content below the current scroll position
    pub has_hidden_content: bool,
}

impl<'a> TitleBar<'a> {
    pub fn new(screen_title: &'a str, status_message: &'a str, has_hidden_content: bool) -> Self {
        Self {
            screen_title,
            status_message,
            has_hidden_content,
        }
    }

    fn text(&self) -> String {
        let mut text = String::from("Todo Today");
        if !self.screen_title.is_empty() {
            text.push_str(" | ");
            text.push_str(self.screen_title);
        }
        if !self.status_message.is_empty() && self.status_message != self.screen_title {
            text.push_str(" | ");
            text.push_str(self.status_message);
        }
        if self.has_hidden_content {
            text.push_str(" | ↓ More");
        }
        text
    }
}

impl Component for TitleBar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let style = Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let line = Line::from(Span::styled(self.text(), style)).style(style);
        frame.render_widget(line, area);
    }
}
