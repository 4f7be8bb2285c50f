//! Markdown answer to styled terminal lines
//!
//! Parses with pulldown-cmark (math enabled) and emits ratatui lines already
//! wrapped to the target width, so callers can scroll by row index.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::math::latex_to_unicode;
use crate::theme::Base16Palette;

const QUOTE_BAR: &str = "│ ";
const CODE_INDENT: &str = "  ";
const BULLET: &str = "• ";

#[derive(Debug)]
enum Container {
    Paragraph,
    Heading(u8),
    Quote,
    CodeBlock,
    List { next: Option<u64> },
    Item { marker: String, emitted: bool },
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Other,
}

impl Container {
    fn is_block(&self) -> bool {
        matches!(
            self,
            Container::Paragraph
                | Container::Heading(_)
                | Container::Quote
                | Container::CodeBlock
                | Container::List { .. }
                | Container::Item { .. }
        )
    }
}

/// Render `markdown` into lines no wider than `width` cells
pub fn render_answer(markdown: &str, width: u16, palette: &Base16Palette) -> Vec<Line<'static>> {
    if markdown.trim().is_empty() {
        return Vec::new();
    }

    let options = Options::ENABLE_MATH | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut renderer = Renderer::new(usize::from(width.max(1)), palette);
    for event in Parser::new_ext(markdown, options) {
        renderer.event(event);
    }
    renderer.finish()
}

struct Renderer<'p> {
    palette: &'p Base16Palette,
    width: usize,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    stack: Vec<Container>,
    blank_pending: bool,
}

impl<'p> Renderer<'p> {
    fn new(width: usize, palette: &'p Base16Palette) -> Self {
        Self {
            palette,
            width,
            lines: Vec::new(),
            current: Vec::new(),
            stack: Vec::new(),
            blank_pending: false,
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush(false);
        while self.lines.last().is_some_and(|l| l.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => {
                if self.in_code_block() {
                    self.code_text(&text);
                } else {
                    self.push(text.to_string(), self.inline_style());
                }
            }
            Event::Code(code) => {
                let style = Style::default()
                    .fg(self.palette.base_09)
                    .bg(self.palette.base_01);
                self.push(code.to_string(), style);
            }
            Event::InlineMath(math) => {
                let style = self.inline_style().fg(self.palette.base_0c);
                self.push(latex_to_unicode(&math), style);
            }
            Event::DisplayMath(math) => {
                self.flush(false);
                let style = Style::default()
                    .fg(self.palette.base_0c)
                    .add_modifier(Modifier::ITALIC);
                for row in latex_to_unicode(&math).lines() {
                    self.push(format!("  {row}"), style);
                    self.flush(true);
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push(html.trim_end_matches('\n').to_string(), self.palette.muted_style());
            }
            Event::FootnoteReference(name) => {
                self.push(format!("[{name}]"), self.palette.muted_style());
            }
            Event::SoftBreak => self.push(" ".to_string(), self.inline_style()),
            Event::HardBreak => self.flush(true),
            Event::Rule => {
                self.open_block();
                let rule = "─".repeat(self.width);
                self.push(rule, self.palette.muted_style());
                self.flush(true);
                self.blank_pending = true;
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push(marker.to_string(), self.inline_style());
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let container = match tag {
            Tag::Paragraph => {
                self.open_block();
                Container::Paragraph
            }
            Tag::Heading { level, .. } => {
                self.open_block();
                Container::Heading(level as u8)
            }
            Tag::BlockQuote(_) => {
                self.open_block();
                Container::Quote
            }
            Tag::CodeBlock(kind) => {
                self.open_block();
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.push(format!("{CODE_INDENT}{lang}"), self.palette.muted_style());
                        self.flush(true);
                    }
                }
                Container::CodeBlock
            }
            Tag::List(start) => {
                if self.item_depth() == 0 {
                    self.open_block();
                } else {
                    self.flush(false);
                }
                Container::List { next: start }
            }
            Tag::Item => {
                self.flush(false);
                let marker = match self.stack.iter_mut().rev().find_map(|c| match c {
                    Container::List { next } => Some(next),
                    _ => None,
                }) {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => BULLET.to_string(),
                };
                Container::Item {
                    marker,
                    emitted: false,
                }
            }
            Tag::Emphasis => Container::Emphasis,
            Tag::Strong => Container::Strong,
            Tag::Strikethrough => Container::Strikethrough,
            Tag::Link { .. } => Container::Link,
            _ => Container::Other,
        };
        self.stack.push(container);
    }

    fn end(&mut self) {
        let is_block = self.stack.last().is_some_and(Container::is_block);
        if is_block {
            self.flush(false);
        }

        match self.stack.pop() {
            Some(Container::Paragraph | Container::Heading(_) | Container::CodeBlock | Container::Quote) => {
                self.blank_pending = true;
            }
            Some(Container::List { .. }) if self.item_depth() == 0 => {
                self.blank_pending = true;
            }
            _ => {}
        }
    }

    fn open_block(&mut self) {
        self.flush(false);
        if self.blank_pending && !self.lines.is_empty() {
            let (prefix, _) = self.prefix(false);
            self.lines.push(Line::from(prefix));
        }
        self.blank_pending = false;
    }

    fn in_code_block(&self) -> bool {
        self.stack.iter().any(|c| matches!(c, Container::CodeBlock))
    }

    fn item_depth(&self) -> usize {
        self.stack
            .iter()
            .filter(|c| matches!(c, Container::Item { .. }))
            .count()
    }

    fn inline_style(&self) -> Style {
        let mut style = Style::default().fg(self.palette.base_06);
        for container in &self.stack {
            style = match container {
                Container::Heading(1) => style
                    .fg(self.palette.base_0d)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                Container::Heading(_) => style.fg(self.palette.base_0d).add_modifier(Modifier::BOLD),
                Container::Quote => style.fg(self.palette.base_04),
                Container::Emphasis => style.add_modifier(Modifier::ITALIC),
                Container::Strong => style.add_modifier(Modifier::BOLD),
                Container::Strikethrough => style.add_modifier(Modifier::CROSSED_OUT),
                Container::Link => style.fg(self.palette.base_0c).add_modifier(Modifier::UNDERLINED),
                _ => style,
            };
        }
        style
    }

    fn code_text(&mut self, text: &str) {
        let style = Style::default().fg(self.palette.base_0b);
        for (i, segment) in text.split('\n').enumerate() {
            if i > 0 {
                self.flush(true);
            }
            if !segment.is_empty() {
                self.push(segment.to_string(), style);
            }
        }
    }

    fn push(&mut self, text: String, style: Style) {
        if text.is_empty() {
            return;
        }
        self.current.push(Span::styled(text, style));
    }

    /// Prefix spans for a row and their display width
    fn prefix(&self, first_row: bool) -> (Vec<Span<'static>>, usize) {
        let innermost_item = self
            .stack
            .iter()
            .rposition(|c| matches!(c, Container::Item { .. }));

        let mut spans = Vec::new();
        let mut width = 0;
        for (idx, container) in self.stack.iter().enumerate() {
            let (text, style) = match container {
                Container::Quote => (QUOTE_BAR.to_string(), self.palette.muted_style()),
                Container::CodeBlock => (CODE_INDENT.to_string(), Style::default()),
                Container::Item { marker, emitted } => {
                    if first_row && !emitted && Some(idx) == innermost_item {
                        (marker.clone(), Style::default().fg(self.palette.base_0d))
                    } else {
                        (" ".repeat(marker.width()), Style::default())
                    }
                }
                _ => continue,
            };
            width += text.width();
            spans.push(Span::styled(text, style));
        }
        (spans, width)
    }

    /// Emit the pending spans as wrapped rows; `force` emits even when empty
    fn flush(&mut self, force: bool) {
        if self.current.is_empty() && !force {
            return;
        }

        let spans = std::mem::take(&mut self.current);
        let (_, prefix_width) = self.prefix(true);
        let available = self.width.saturating_sub(prefix_width).max(1);

        for (row_idx, row) in wrap_spans(spans, available).into_iter().enumerate() {
            let (mut line_spans, _) = self.prefix(row_idx == 0);
            line_spans.extend(row);
            self.lines.push(Line::from(line_spans));
        }

        if let Some(Container::Item { emitted, .. }) = self
            .stack
            .iter_mut()
            .rev()
            .find(|c| matches!(c, Container::Item { .. }))
        {
            *emitted = true;
        }
    }
}

/// Word-wrap styled spans to `width` cells; always yields at least one row
fn wrap_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Vec<Span<'static>>> {
    let mut rows: Vec<Vec<Span<'static>>> = vec![Vec::new()];
    let mut row_width = 0usize;

    for span in spans {
        let style = span.style;
        for token in tokens(&span.content) {
            let token_width = token.width();
            let is_space = token.chars().all(char::is_whitespace);

            if is_space {
                if row_width == 0 && rows.len() > 1 {
                    continue;
                }
                if row_width + token_width > width {
                    rows.push(Vec::new());
                    row_width = 0;
                    continue;
                }
                append(&mut rows, token, style);
                row_width += token_width;
                continue;
            }

            if row_width > 0 && row_width + token_width > width {
                rows.push(Vec::new());
                row_width = 0;
            }

            if token_width <= width {
                append(&mut rows, token, style);
                row_width += token_width;
                continue;
            }

            // Longer than a whole row: break anywhere
            for ch in token.chars() {
                let mut buf = [0u8; 4];
                let piece: &str = ch.encode_utf8(&mut buf);
                let w = piece.width();
                if row_width > 0 && row_width + w > width {
                    rows.push(Vec::new());
                    row_width = 0;
                }
                append(&mut rows, piece, style);
                row_width += w;
            }
        }
    }

    rows
}

/// Wrap unstyled text, honouring embedded newlines
pub fn wrap_plain(text: &str, width: usize) -> Vec<String> {
    text.split('\n')
        .flat_map(|paragraph| {
            wrap_spans(vec![Span::raw(paragraph.to_string())], width.max(1))
                .into_iter()
                .map(|row| row.iter().map(|s| s.content.as_ref()).collect::<String>())
        })
        .collect()
}

fn append(rows: &mut [Vec<Span<'static>>], text: &str, style: Style) {
    let Some(row) = rows.last_mut() else {
        return;
    };
    match row.last_mut() {
        Some(last) if last.style == style => {
            last.content.to_mut().push_str(text);
        }
        _ => row.push(Span::styled(text.to_string(), style)),
    }
}

/// Alternating runs of whitespace and non-whitespace
fn tokens(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (idx, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                out.push(&text[start..idx]);
                start = idx;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::current_theme;

    fn render(markdown: &str, width: u16) -> Vec<Line<'static>> {
        render_answer(markdown, width, current_theme())
    }

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn empty_answer_renders_nothing() {
        assert!(render("", 40).is_empty());
        assert!(render("  \n", 40).is_empty());
    }

    #[test]
    fn plain_answer() {
        assert_eq!(text(&render("X", 40)), vec!["X"]);
    }

    #[test]
    fn emphasis_is_styled() {
        let lines = render("Hello **world**", 40);
        assert_eq!(text(&lines), vec!["Hello world"]);
        let bold = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "world")
            .unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn inline_math_becomes_unicode() {
        assert_eq!(
            text(&render(r"Area is $\pi r^2$ here", 40)),
            vec!["Area is π r² here"]
        );
    }

    #[test]
    fn display_math_gets_its_own_line() {
        let lines = text(&render(r"Ratio: $$\frac{a+b}{c}$$", 40));
        assert!(lines.contains(&"  (a+b)/c".to_string()), "{lines:?}");
    }

    #[test]
    fn fenced_code_keeps_layout() {
        let lines = text(&render("```rust\nfn main() {}\n\n    x\n```", 40));
        assert_eq!(lines, vec!["  rust", "  fn main() {}", "", "      x"]);
    }

    #[test]
    fn inline_code_stays_inline() {
        let lines = render("call `foo()` now", 40);
        assert_eq!(text(&lines), vec!["call foo() now"]);
        let code = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "foo()")
            .unwrap();
        assert!(code.style.bg.is_some());
    }

    #[test]
    fn lists_get_markers() {
        assert_eq!(text(&render("- one\n- two", 40)), vec!["• one", "• two"]);
        assert_eq!(
            text(&render("1. first\n2. second", 40)),
            vec!["1. first", "2. second"]
        );
    }

    #[test]
    fn nested_list_is_indented() {
        assert_eq!(
            text(&render("- one\n  - inner\n- two", 40)),
            vec!["• one", "  • inner", "• two"]
        );
    }

    #[test]
    fn heading_and_paragraph_are_separated() {
        let lines = render("# Title\n\nBody", 40);
        assert_eq!(text(&lines), vec!["Title", "", "Body"]);
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn quotes_have_a_bar() {
        assert_eq!(text(&render("> quoted", 40)), vec!["│ quoted"]);
    }

    #[test]
    fn long_lines_wrap_at_words() {
        assert_eq!(text(&render("aaa bbb ccc", 7)), vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn wrapped_list_items_align_under_text() {
        assert_eq!(
            text(&render("- aaa bbb ccc", 9)),
            vec!["• aaa bbb", "  ccc"]
        );
    }

    #[test]
    fn plain_wrap_keeps_empty_lines() {
        assert_eq!(wrap_plain("ab cd\n\nef", 2), vec!["ab", "cd", "", "ef"]);
    }

    #[test]
    fn unbreakable_words_are_split() {
        assert_eq!(text(&render("abcdefgh", 3)), vec!["abc", "def", "gh"]);
    }
}
