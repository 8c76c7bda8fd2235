//! Markdown → ratatui `Text` for task and list descriptions.
//!
//! Descriptions are short, so this covers the inline styles people type
//! into them (bold, italic, strikethrough, inline code, links), headings,
//! bullet and numbered lists, checkbox items, block quotes and fenced code.
//! Fenced code with a known language is highlighted with syntect.

use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME: LazyLock<Option<Theme>> = LazyLock::new(|| {
    ThemeSet::load_defaults()
        .themes
        .remove("base16-ocean.dark")
});

const RULE_WIDTH: usize = 30;

/// Render a description. Returns owned text so callers aren't tied to the
/// input's lifetime.
pub fn render(source: &str, base_fg: Color) -> Text<'static> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TextBuilder::new(base_fg);
    for event in Parser::new_ext(source, options) {
        builder.event(event);
    }
    builder.finish()
}

/// One open fenced/indented code block.
enum CodeBlock {
    Highlighted(HighlightLines<'static>),
    Plain,
}

struct TextBuilder {
    lines: Vec<Line<'static>>,
    base: Style,
    /// Inline styles, innermost last
    inline: Vec<Style>,
    /// Open lists: `Some(n)` is a numbered list whose next item is `n`
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    code: Option<CodeBlock>,
    link: Option<String>,
    /// A block just closed; the next block gets a blank line first
    gap: bool,
}

impl TextBuilder {
    fn new(base_fg: Color) -> Self {
        Self {
            lines: Vec::new(),
            base: Style::default().fg(base_fg),
            inline: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            code: None,
            link: None,
            gap: false,
        }
    }

    fn finish(self) -> Text<'static> {
        Text::from(self.lines)
    }

    fn style(&self) -> Style {
        self.inline.last().copied().unwrap_or(self.base)
    }

    fn push_inline(&mut self, overlay: Style) {
        self.inline.push(self.style().patch(overlay));
    }

    /// Start a new line, prefixed with the quote bars of enclosing quotes.
    fn new_line(&mut self) {
        let mut line = Line::default();
        for _ in 0..self.quote_depth {
            line.push_span(Span::styled("┃ ", Style::default().fg(Color::DarkGray)));
        }
        self.lines.push(line);
    }

    fn start_block(&mut self) {
        if self.gap && !self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        self.gap = false;
        self.new_line();
    }

    fn span(&mut self, span: Span<'static>) {
        if self.lines.is_empty() {
            self.new_line();
        }
        if let Some(line) = self.lines.last_mut() {
            line.push_span(span);
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => self.close(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.span(Span::styled(
                code.to_string(),
                Style::default().fg(Color::White).bg(Color::DarkGray),
            )),
            Event::SoftBreak => self.span(Span::raw(" ")),
            Event::HardBreak => self.new_line(),
            Event::Rule => {
                self.start_block();
                self.span(Span::styled(
                    "─".repeat(RULE_WIDTH),
                    Style::default().fg(Color::DarkGray),
                ));
                self.gap = true;
            }
            Event::TaskListMarker(done) => {
                let (mark, style) = if done {
                    ("☑ ", Style::default().fg(Color::Green))
                } else {
                    ("☐ ", self.base)
                };
                self.span(Span::styled(mark, style));
            }
            _ => {}
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                // A paragraph inside a list item continues the item's line
                if self.lists.is_empty() || self.gap {
                    self.start_block();
                }
            }
            Tag::Heading { level, .. } => {
                self.start_block();
                self.push_inline(heading_style(level));
            }
            Tag::BlockQuote(_) => {
                self.start_block();
                self.quote_depth += 1;
                self.push_inline(Style::default().add_modifier(Modifier::ITALIC));
                // The quote's first paragraph starts its own line
                self.lines.pop();
            }
            Tag::CodeBlock(kind) => {
                self.start_block();
                self.lines.pop();
                let language = match &kind {
                    CodeBlockKind::Fenced(language) => language.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some(match (syntax_for(&language), THEME.as_ref()) {
                    (Some(syntax), Some(theme)) => {
                        CodeBlock::Highlighted(HighlightLines::new(syntax, theme))
                    }
                    _ => CodeBlock::Plain,
                });
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.start_block();
                    self.lines.pop();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.new_line();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{indent}{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => format!("{indent}• "),
                };
                self.span(Span::styled(marker, Style::default().fg(Color::DarkGray)));
            }
            Tag::Emphasis => self.push_inline(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_inline(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_inline(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.link = Some(dest_url.to_string());
                self.push_inline(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            _ => {}
        }
    }

    fn close(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::List(_) => {
                if matches!(tag, TagEnd::List(_)) {
                    self.lists.pop();
                }
                self.gap = self.lists.is_empty();
            }
            TagEnd::Heading(_) => {
                self.inline.pop();
                self.gap = true;
            }
            TagEnd::BlockQuote(_) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.inline.pop();
                self.gap = true;
            }
            TagEnd::CodeBlock => {
                self.code = None;
                self.gap = true;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.inline.pop();
            }
            TagEnd::Link => {
                self.inline.pop();
                if let Some(url) = self.link.take() {
                    self.span(Span::styled(
                        format!(" <{url}>"),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        // ratatui renders \t as zero-width
        let text = text.replace('\t', "    ");
        match self.code.take() {
            Some(CodeBlock::Highlighted(mut highlighter)) => {
                for source_line in LinesWithEndings::from(&text) {
                    let spans = match highlighter.highlight_line(source_line, &SYNTAX_SET) {
                        Ok(ranges) => ranges
                            .into_iter()
                            .map(|(style, fragment)| {
                                let fg = style.foreground;
                                Span::styled(
                                    fragment.trim_end_matches('\n').to_string(),
                                    Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b)),
                                )
                            })
                            .filter(|span| !span.content.is_empty())
                            .collect(),
                        Err(_) => vec![Span::raw(source_line.trim_end_matches('\n').to_string())],
                    };
                    self.code_line(spans);
                }
                self.code = Some(CodeBlock::Highlighted(highlighter));
            }
            Some(CodeBlock::Plain) => {
                for source_line in text.lines() {
                    let span = Span::styled(source_line.to_string(), Style::default().fg(Color::White));
                    self.code_line(vec![span]);
                }
                self.code = Some(CodeBlock::Plain);
            }
            None => {
                let style = self.style();
                self.span(Span::styled(text, style));
            }
        }
    }

    fn code_line(&mut self, spans: Vec<Span<'static>>) {
        self.new_line();
        self.span(Span::styled("▎ ", Style::default().fg(Color::DarkGray)));
        for span in spans {
            self.span(span);
        }
    }
}

fn syntax_for(language: &str) -> Option<&'static SyntaxReference> {
    if language.is_empty() {
        return None;
    }
    SYNTAX_SET.find_syntax_by_token(language)
}

fn heading_style(level: HeadingLevel) -> Style {
    let style = Style::default().add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => style.add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H2 => style,
        _ => style.add_modifier(Modifier::ITALIC),
    }
}
