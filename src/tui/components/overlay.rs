//! # Child Overlay Component
//!
//! Draws a child screen's content in a bordered box centered over the
//! body. Nested children stack, each a little smaller than its parent.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};

use crate::core::content::Content;
use crate::tui::component::Component;
use crate::tui::components::content_view::{NodeProps, lay_out};
use crate::tui::form::LayerForm;

pub struct ChildOverlay<'a> {
    pub content: &'a Content,
    pub form: Option<&'a LayerForm>,
    /// Only the topmost child receives keys
    pub active: bool,
    /// 0 for the first child
    pub depth: u16,
    pub spinner_frame: usize,
}

impl Component for ChildOverlay<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let shrink = (self.depth * 6).min(30);
        let overlay = centered_rect(70 - shrink, 60 - shrink, area);

        // Clear underlying content
        frame.render_widget(Clear, overlay);

        let help_text = if self.active {
            " Enter Select  Esc Close "
        } else {
            ""
        };
        let border = if self.active { Color::Yellow } else { Color::DarkGray };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(format!(" {} ", self.content.title))
            .title_alignment(Alignment::Left)
            .title_bottom(Line::from(help_text).centered())
            .padding(Padding::horizontal(1));
        let inner = block.inner(overlay);
        frame.render_widget(block, overlay);

        let props = NodeProps {
            form: self.form,
            active: self.active,
            spinner_frame: self.spinner_frame,
            width: inner.width,
        };
        let mut remaining = inner;
        if let Some(error) = &self.content.error {
            let paragraph = Paragraph::new(error.clone())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true });
            let height = (paragraph.line_count(inner.width) as u16).min(remaining.height);
            frame.render_widget(paragraph, Rect { height, ..remaining });
            remaining.y += height;
            remaining.height -= height;
        }

        let laid_out = lay_out(self.content, &props);
        for (paragraph, height) in laid_out.paragraphs.into_iter().zip(laid_out.heights) {
            if remaining.height == 0 {
                break;
            }
            let height = height.min(remaining.height);
            frame.render_widget(paragraph, Rect { height, ..remaining });
            remaining.y += height;
            remaining.height -= height;
        }
    }
}

/// Compute a centered rect using percentage of the outer rect.
pub fn centered_rect(percent_x: u16, percent_y: u16, outer: Rect) -> Rect {
    let [_, center_v, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(outer);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(center_v);
    center
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::{Intent, Node};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_centered_rect_is_inside_outer() {
        let outer = Rect::new(0, 0, 100, 50);
        let rect = centered_rect(60, 40, outer);
        assert_eq!(rect.width, 60);
        assert_eq!(rect.height, 20);
        assert_eq!(rect.x, 20);
        assert_eq!(rect.y, 15);
    }

    #[test]
    fn test_overlay_draws_title_and_buttons() {
        let content = Content::new("Delete list?")
            .with(Node::text("This also deletes its tasks."))
            .with(Node::Row(vec![
                Node::button("Delete", Intent::Save),
                Node::button("Cancel", Intent::Dismiss),
            ]));
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                let mut overlay = ChildOverlay {
                    content: &content,
                    form: None,
                    active: true,
                    depth: 0,
                    spinner_frame: 0,
                };
                overlay.render(f, f.area());
            })
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Delete list?"));
        assert!(text.contains("[ Cancel ]"));
        assert!(text.contains("Esc Close"));
    }
}
