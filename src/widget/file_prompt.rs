use std::path::PathBuf;
use std::sync::LazyLock;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use regex::Regex;
use unicode_width::UnicodeWidthStr;

use crate::theme::Base16Palette;

const PROMPT_WIDTH: u16 = 70;

// Backslash-escaped characters, as produced by dropping a file on most terminals
static ESCAPED_CHAR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\\(.)").ok());

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilePromptAction {
    Open(PathBuf),
    Cancel,
    Consumed,
}

/// One-line "open file" input
#[derive(Debug, Default)]
pub struct FilePrompt {
    active: bool,
    input: String,
}

impl FilePrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn open(&mut self) {
        self.active = true;
        self.input.clear();
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.input.clear();
    }

    /// Append pasted text, dropping line breaks
    pub fn paste(&mut self, text: &str) {
        self.input
            .extend(text.chars().filter(|c| *c != '\n' && *c != '\r'));
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FilePromptAction {
        match key.code {
            KeyCode::Esc => {
                self.cancel();
                FilePromptAction::Cancel
            }
            KeyCode::Enter => {
                let path = normalize_path(&self.input);
                self.cancel();
                match path {
                    Some(path) => FilePromptAction::Open(path),
                    None => FilePromptAction::Cancel,
                }
            }
            KeyCode::Backspace => {
                self.input.pop();
                FilePromptAction::Consumed
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.clear();
                FilePromptAction::Consumed
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.push(c);
                FilePromptAction::Consumed
            }
            _ => FilePromptAction::Consumed,
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect, palette: &Base16Palette) {
        if !self.active {
            return;
        }

        let width = PROMPT_WIDTH.min(area.width);
        let popup = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + area.height.saturating_sub(3) / 2,
            width,
            3.min(area.height),
        );
        f.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Open PDF ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.popup_border(true)))
            .style(Style::default().bg(palette.base_00).fg(palette.base_05));
        let inner = block.inner(popup);

        // Keep the end of long paths visible
        let visible_width = usize::from(inner.width.saturating_sub(1));
        let mut shown = self.input.as_str();
        while shown.width() > visible_width {
            let mut chars = shown.chars();
            chars.next();
            shown = chars.as_str();
        }

        f.render_widget(
            Paragraph::new(Line::from(Span::styled(
                shown.to_string(),
                Style::default().fg(palette.base_06),
            )))
            .block(block),
            popup,
        );
        if inner.height > 0 {
            let x = inner.x + (shown.width() as u16).min(inner.width.saturating_sub(1));
            f.set_cursor_position(Position::new(x, inner.y));
        }
    }
}

/// Turn typed or dropped input into a path: trims, strips matching quotes,
/// unescapes `\ ` sequences and expands a leading `~`.
pub fn normalize_path(input: &str) -> Option<PathBuf> {
    let mut text = input.trim();
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            text = &text[1..text.len() - 1];
        }
    }
    if text.is_empty() {
        return None;
    }

    let unescaped = match ESCAPED_CHAR.as_ref() {
        Some(re) => re.replace_all(text, "$1").into_owned(),
        None => text.to_string(),
    };

    if let Some(rest) = unescaped.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Some(home.join(rest));
        }
    }
    Some(PathBuf::from(unescaped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typed_path_is_opened() {
        let mut prompt = FilePrompt::new();
        prompt.open();
        for c in "doc.pdf".chars() {
            assert_eq!(prompt.handle_key(key(KeyCode::Char(c))), FilePromptAction::Consumed);
        }
        assert_eq!(
            prompt.handle_key(key(KeyCode::Enter)),
            FilePromptAction::Open(PathBuf::from("doc.pdf"))
        );
        assert!(!prompt.is_active());
    }

    #[test]
    fn empty_input_cancels() {
        let mut prompt = FilePrompt::new();
        prompt.open();
        prompt.paste("   ");
        assert_eq!(prompt.handle_key(key(KeyCode::Enter)), FilePromptAction::Cancel);
    }

    #[test]
    fn dropped_paths_are_cleaned_up() {
        assert_eq!(
            normalize_path("'/tmp/my paper.pdf'"),
            Some(PathBuf::from("/tmp/my paper.pdf"))
        );
        assert_eq!(
            normalize_path(r"/tmp/my\ paper.pdf "),
            Some(PathBuf::from("/tmp/my paper.pdf"))
        );
        assert_eq!(normalize_path("\"\""), None);
    }

    #[test]
    fn paste_drops_newlines() {
        let mut prompt = FilePrompt::new();
        prompt.open();
        prompt.paste("a.pdf\n");
        assert_eq!(prompt.input(), "a.pdf");
    }
}
