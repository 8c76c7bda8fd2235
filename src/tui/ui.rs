use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};

use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{ChildOverlay, ContentView, TitleBar};

const KEY_HINTS: &str = "Tab Move  Enter Select  Esc Back  ^N Menu  ^C Quit";

pub fn draw_ui(frame: &mut Frame, tui: &mut TuiState, status_message: &str, spinner_frame: usize) {
    use Constraint::{Length, Min};
    let layout = Layout::vertical([Length(1), Min(0), Length(1)]);
    let [title_area, main_area, footer_area] = layout.areas(frame.area());

    let Some(presentation) = &tui.presentation else {
        TitleBar::new("", status_message, false).render(frame, title_area);
        let waiting = Paragraph::new("Starting...")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(waiting, main_area);
        return;
    };
    let content = &presentation.content;

    // Main area - error panel above the body when the screen reports one
    let body_area = match &content.error {
        Some(error_msg) => {
            let error_height = error_panel_height(error_msg, main_area);
            let [error_area, body_area] =
                Layout::vertical([Length(error_height), Min(0)]).areas(main_area);
            draw_error_view(frame, error_area, error_msg);
            body_area
        }
        None => main_area,
    };

    let overlay_count = presentation.overlays.len();
    ContentView {
        state: &mut tui.body,
        content,
        form: tui.form.layer(0),
        active: overlay_count == 0,
        spinner_frame,
    }
    .render(frame, body_area);

    for (i, child) in presentation.overlays.iter().enumerate() {
        ChildOverlay {
            content: child,
            form: tui.form.layer(i + 1),
            active: i + 1 == overlay_count,
            depth: i as u16,
            spinner_frame,
        }
        .render(frame, main_area);
    }

    // Title bar drawn last so it reflects the scroll state of this frame
    TitleBar::new(&content.title, status_message, tui.body.has_hidden_content())
        .render(frame, title_area);

    draw_footer(frame, footer_area, content.footer.as_deref());
}

fn error_panel_height(error_msg: &str, area: Rect) -> u16 {
    let paragraph = Paragraph::new(error_msg)
        .block(Block::bordered())
        .wrap(Wrap { trim: true });
    (paragraph.line_count(area.width) as u16).min(area.height / 2)
}

fn draw_error_view(frame: &mut Frame, area: Rect, error_msg: &str) {
    let error_paragraph = Paragraph::new(error_msg)
        .block(
            Block::bordered()
                .title("ERROR")
                .border_style(Style::default().fg(Color::Red)),
        )
        .style(Style::default().fg(Color::Red))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    frame.render_widget(error_paragraph, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, footer: Option<&str>) {
    let hint_style = Style::default().fg(Color::DarkGray);
    let mut spans = Vec::new();
    if let Some(footer) = footer {
        spans.push(Span::styled(
            footer.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(" │ ", hint_style));
    }
    spans.push(Span::styled(KEY_HINTS, hint_style));
    frame.render_widget(Line::from(spans), area);
}
