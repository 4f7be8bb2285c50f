use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::debug;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use crate::answer_renderer::{render_answer, wrap_plain};
use crate::ask::{AskOutcome, AskRequest, NO_SELECTION_MESSAGE};
use crate::drag::DragState;
use crate::geometry::{Point, place_within, rect_contains};
use crate::theme::Base16Palette;

/// Rows between the menu anchor and the dialog before it is first dragged
pub const DEFAULT_DIALOG_OFFSET: i32 = 3;

const DIALOG_WIDTH: u16 = 64;
const CONTEXT_ROWS: usize = 4;
const QUESTION_MIN_ROWS: usize = 2;
const QUESTION_MAX_ROWS: usize = 4;
const ERROR_MAX_ROWS: usize = 3;
const ANSWER_MAX_ROWS: usize = 14;

const TITLE: &str = " Ask ";
const PLACEHOLDER: &str = "Your question (optional; leave empty to summarize the selection)";
const SUBMIT_LABEL: &str = " Submit ";
const LOADING_LABEL: &str = " Asking… ";
const CLOSE_LABEL: &str = " Close ";

/// What the user sees in the dialog
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DialogState {
    pub open: bool,
    pub question: String,
    pub answer: Option<String>,
    pub loading: bool,
    pub error: String,
    /// Top-left after the first drag; `None` follows the menu anchor
    pub position: Option<Point>,
}

/// Region of the dialog under a pointer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogHit {
    Title,
    Context,
    Question,
    Submit,
    Close,
    Error,
    Answer,
    Body,
}

impl DialogHit {
    /// Regions that grab the dialog for dragging
    fn starts_drag(self) -> bool {
        matches!(self, DialogHit::Context | DialogHit::Error | DialogHit::Body)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogEvent {
    Submit,
    Close,
    Consumed,
    Ignored,
}

#[derive(Clone, Copy, Debug, Default)]
struct DialogLayout {
    area: Rect,
    title: Rect,
    context: Rect,
    question: Rect,
    submit: Rect,
    close: Rect,
    error: Rect,
    answer: Rect,
}

#[derive(Debug)]
struct RenderedAnswer {
    width: u16,
    lines: Vec<Line<'static>>,
}

/// Draggable question/answer overlay
#[derive(Debug, Default)]
pub struct AskDialog {
    pub state: DialogState,
    drag: DragState,
    layout: Option<DialogLayout>,
    rendered: Option<RenderedAnswer>,
    answer_scroll: usize,
    answer_visible: usize,
}

impl AskDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.state.open
    }

    pub fn open(&mut self) {
        if !self.state.open {
            debug!("Ask dialog opened");
        }
        self.state.open = true;
    }

    pub fn close(&mut self) {
        self.state.open = false;
        self.drag.end();
        self.layout = None;
    }

    /// A new selection was made: closed, no answer or error, unpinned.
    /// The question text is kept.
    pub fn reset_for_selection(&mut self) {
        self.close();
        self.set_answer(None);
        self.state.error.clear();
        self.state.position = None;
    }

    /// Top-left before clamping
    pub fn origin(&self, anchor: Point, dialog_offset: i32) -> Point {
        self.state
            .position
            .unwrap_or_else(|| anchor.offset(0, dialog_offset))
    }

    pub fn area(&self) -> Option<Rect> {
        self.layout.map(|l| l.area)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Start a submission for `context`.
    ///
    /// Returns the request to send, or `None` when nothing should be sent:
    /// either a request is already in flight, or there is no selection, in
    /// which case the validation message is shown.
    pub fn begin_submit(&mut self, context: &str) -> Option<AskRequest> {
        if self.state.loading {
            return None;
        }
        if context.is_empty() {
            self.state.error = NO_SELECTION_MESSAGE.to_string();
            return None;
        }

        self.state.loading = true;
        self.state.error.clear();
        self.set_answer(None);
        Some(AskRequest::new(context, self.state.question.clone()))
    }

    /// Apply a finished submission; the latest one to arrive wins
    pub fn finish_submit(&mut self, outcome: AskOutcome) {
        self.state.loading = false;
        match outcome {
            AskOutcome::Answered(answer) => {
                self.state.error.clear();
                self.set_answer(Some(answer));
            }
            AskOutcome::Failed(message) => {
                self.state.error = message;
                self.set_answer(None);
            }
        }
    }

    fn set_answer(&mut self, answer: Option<String>) {
        self.state.answer = answer;
        self.rendered = None;
        self.answer_scroll = 0;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> DialogEvent {
        if !self.state.open {
            return DialogEvent::Ignored;
        }

        match key.code {
            KeyCode::Enter
                if key
                    .modifiers
                    .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
            {
                self.state.question.push('\n');
                DialogEvent::Consumed
            }
            KeyCode::Enter => {
                if self.state.loading {
                    DialogEvent::Consumed
                } else {
                    DialogEvent::Submit
                }
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.question.clear();
                DialogEvent::Consumed
            }
            KeyCode::Char(_)
                if key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                DialogEvent::Ignored
            }
            KeyCode::Char(c) => {
                self.state.question.push(c);
                DialogEvent::Consumed
            }
            KeyCode::Backspace => {
                self.state.question.pop();
                DialogEvent::Consumed
            }
            KeyCode::Up => {
                self.scroll_answer(-1);
                DialogEvent::Consumed
            }
            KeyCode::Down => {
                self.scroll_answer(1);
                DialogEvent::Consumed
            }
            KeyCode::PageUp => {
                self.scroll_answer(-(self.answer_visible.max(1) as i32));
                DialogEvent::Consumed
            }
            KeyCode::PageDown => {
                self.scroll_answer(self.answer_visible.max(1) as i32);
                DialogEvent::Consumed
            }
            KeyCode::Tab => DialogEvent::Consumed,
            _ => DialogEvent::Ignored,
        }
    }

    /// Bracketed paste goes into the question
    pub fn paste(&mut self, text: &str) {
        if self.state.open {
            self.state.question.push_str(&text.replace("\r\n", "\n"));
        }
    }

    pub fn scroll_answer(&mut self, delta: i32) {
        let total = self.rendered.as_ref().map_or(0, |r| r.lines.len());
        let max = total.saturating_sub(self.answer_visible);
        let next = (self.answer_scroll as i64 + i64::from(delta)).clamp(0, max as i64);
        self.answer_scroll = next as usize;
    }

    pub fn hit_test(&self, point: Point) -> Option<DialogHit> {
        if !self.state.open {
            return None;
        }
        let layout = self.layout?;
        if !rect_contains(layout.area, point) {
            return None;
        }

        let regions = [
            (layout.title, DialogHit::Title),
            (layout.submit, DialogHit::Submit),
            (layout.close, DialogHit::Close),
            (layout.question, DialogHit::Question),
            (layout.answer, DialogHit::Answer),
            (layout.context, DialogHit::Context),
            (layout.error, DialogHit::Error),
        ];
        Some(
            regions
                .iter()
                .find(|(rect, _)| rect_contains(*rect, point))
                .map_or(DialogHit::Body, |(_, hit)| *hit),
        )
    }

    /// Pointer pressed. Anything inside the dialog is consumed; buttons fire
    /// right away and the plain body starts a drag.
    pub fn handle_pointer_down(&mut self, point: Point) -> DialogEvent {
        let Some(hit) = self.hit_test(point) else {
            return DialogEvent::Ignored;
        };

        match hit {
            DialogHit::Submit if !self.state.loading => DialogEvent::Submit,
            DialogHit::Close => DialogEvent::Close,
            hit if hit.starts_drag() => {
                if let Some(layout) = self.layout {
                    let top_left = Point::from_cell(layout.area.x, layout.area.y);
                    self.drag.begin(point, top_left);
                    debug!("Dialog drag started at {point:?}");
                }
                DialogEvent::Consumed
            }
            _ => DialogEvent::Consumed,
        }
    }

    /// Pointer moved with the button held; returns whether the dialog moved
    pub fn handle_pointer_move(&mut self, point: Point) -> bool {
        match self.drag.drag_to(point) {
            Some(top_left) => {
                self.state.position = Some(top_left);
                true
            }
            None => false,
        }
    }

    /// Pointer released anywhere; returns whether a drag ended
    pub fn handle_pointer_up(&mut self) -> bool {
        self.drag.end()
    }

    pub fn render(
        &mut self,
        f: &mut Frame,
        origin: Point,
        bounds: Rect,
        context: &str,
        palette: &Base16Palette,
    ) {
        if !self.state.open {
            self.layout = None;
            return;
        }

        let width = DIALOG_WIDTH.min(bounds.width);
        let inner_width = usize::from(width.saturating_sub(2).max(1));

        let context_lines = clip_rows(wrap_plain(context, inner_width), CONTEXT_ROWS);

        let question_rows = if self.state.question.is_empty() {
            wrap_plain(PLACEHOLDER, inner_width)
        } else {
            wrap_plain(&self.state.question, inner_width)
        };
        let question_height = question_rows.len().clamp(QUESTION_MIN_ROWS, QUESTION_MAX_ROWS);

        let error_rows = if self.state.error.is_empty() {
            Vec::new()
        } else {
            clip_rows(wrap_plain(&self.state.error, inner_width), ERROR_MAX_ROWS)
        };

        let answer_width = inner_width as u16;
        let answer = self.state.answer.as_deref().unwrap_or("");
        if self
            .rendered
            .as_ref()
            .is_none_or(|r| r.width != answer_width)
        {
            self.rendered = Some(RenderedAnswer {
                width: answer_width,
                lines: render_answer(answer, answer_width, palette),
            });
        }
        let answer_total = self.rendered.as_ref().map_or(0, |r| r.lines.len());
        let answer_height = answer_total.min(ANSWER_MAX_ROWS);

        let content_height = context_lines.len()
            + 1
            + question_height
            + 1
            + error_rows.len()
            + if answer_height > 0 { answer_height + 1 } else { 0 };
        let height = (content_height + 2).min(usize::from(u16::MAX)) as u16;

        let area = place_within(origin, width, height, bounds);
        f.render_widget(Clear, area);

        let block = Block::default()
            .title(Span::styled(
                TITLE,
                Style::default().fg(palette.base_0d),
            ))
            .title_bottom(Line::from(Span::styled(
                " drag to move · Esc to dismiss ",
                palette.muted_style(),
            )))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.popup_border(true)))
            .style(Style::default().bg(palette.base_00).fg(palette.base_05));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let [
            context_area,
            _spacer,
            question_area,
            actions_area,
            error_area,
            _gap,
            answer_area,
        ] = Layout::vertical([
            Constraint::Length(context_lines.len() as u16),
            Constraint::Length(1),
            Constraint::Length(question_height as u16),
            Constraint::Length(1),
            Constraint::Length(error_rows.len() as u16),
            Constraint::Length(u16::from(answer_height > 0)),
            Constraint::Min(0),
        ])
        .areas(inner);

        // Selected text
        let context_para: Vec<Line> = context_lines
            .into_iter()
            .map(|l| Line::from(Span::styled(l, palette.muted_style())))
            .collect();
        f.render_widget(Paragraph::new(context_para), context_area);

        // Question input
        let question_style = if self.state.question.is_empty() {
            palette.muted_style().bg(palette.base_01)
        } else {
            Style::default().fg(palette.base_06).bg(palette.base_01)
        };
        let skip = question_rows.len().saturating_sub(question_height);
        let visible_question: Vec<Line> = question_rows
            .iter()
            .skip(skip)
            .map(|l| Line::from(Span::styled(l.clone(), question_style)))
            .collect();
        f.render_widget(
            Paragraph::new(visible_question).style(Style::default().bg(palette.base_01)),
            question_area,
        );
        if question_area.height > 0 {
            let (cursor_row, cursor_col) = if self.state.question.is_empty() {
                (0, 0)
            } else {
                let shown = question_rows.len() - skip;
                let last = question_rows.last().map_or(0, |l| l.width());
                (shown.saturating_sub(1), last)
            };
            let x = question_area.x + (cursor_col as u16).min(question_area.width.saturating_sub(1));
            let y = question_area.y + (cursor_row as u16).min(question_area.height - 1);
            f.set_cursor_position(Position::new(x, y));
        }

        // Buttons
        let submit_label = if self.state.loading {
            LOADING_LABEL
        } else {
            SUBMIT_LABEL
        };
        let submit_width = submit_label.width() as u16;
        let close_width = CLOSE_LABEL.width() as u16;
        let submit = Rect::new(actions_area.x, actions_area.y, submit_width, 1).intersection(actions_area);
        let close = Rect::new(
            actions_area.x + submit_width + 1,
            actions_area.y,
            close_width,
            1,
        )
        .intersection(actions_area);
        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(submit_label, palette.button_style(!self.state.loading)),
                Span::raw(" "),
                Span::styled(CLOSE_LABEL, palette.button_style(true)),
            ])),
            actions_area,
        );

        // Error
        if !error_rows.is_empty() {
            let lines: Vec<Line> = error_rows
                .into_iter()
                .map(|l| Line::from(Span::styled(l, palette.error_style())))
                .collect();
            f.render_widget(Paragraph::new(lines), error_area);
        }

        // Answer
        self.answer_visible = usize::from(answer_area.height);
        let max_scroll = answer_total.saturating_sub(self.answer_visible);
        self.answer_scroll = self.answer_scroll.min(max_scroll);
        if answer_area.height > 0 {
            if let Some(rendered) = &self.rendered {
                let lines: Vec<Line> = rendered
                    .lines
                    .iter()
                    .skip(self.answer_scroll)
                    .take(self.answer_visible)
                    .cloned()
                    .collect();
                f.render_widget(Paragraph::new(lines), answer_area);
            }
        }

        self.layout = Some(DialogLayout {
            area,
            title: Rect::new(area.x, area.y, area.width, 1),
            context: context_area,
            question: question_area,
            submit,
            close,
            error: error_area,
            answer: answer_area,
        });
    }
}

fn clip_rows(mut rows: Vec<String>, max: usize) -> Vec<String> {
    if rows.len() > max {
        rows.truncate(max);
        if let Some(last) = rows.last_mut() {
            last.push('…');
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::current_theme;
    use ratatui::{Terminal, backend::TestBackend};

    fn draw_with(dialog: &mut AskDialog, origin: Point, size: (u16, u16), context: &str) {
        let mut terminal = Terminal::new(TestBackend::new(size.0, size.1)).unwrap();
        terminal
            .draw(|f| dialog.render(f, origin, f.area(), context, current_theme()))
            .unwrap();
    }

    fn draw(dialog: &mut AskDialog, origin: Point, size: (u16, u16)) {
        draw_with(dialog, origin, size, "selected text");
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn drag_moves_dialog_by_grab_offset() {
        let mut dialog = AskDialog::new();
        dialog.open();
        dialog.state.error = "request failed ".repeat(10);
        draw_with(&mut dialog, Point::new(100, 100), (320, 300), &"word ".repeat(100));
        assert_eq!(dialog.area().map(|a| (a.x, a.y)), Some((100, 100)));

        // Rows 101-104 context, 106-107 question, 108 buttons, 109-111 error
        assert_eq!(dialog.hit_test(Point::new(130, 108)), Some(DialogHit::Body));
        assert_eq!(dialog.hit_test(Point::new(120, 102)), Some(DialogHit::Context));
        assert_eq!(dialog.hit_test(Point::new(120, 110)), Some(DialogHit::Error));

        assert_eq!(
            dialog.handle_pointer_down(Point::new(120, 110)),
            DialogEvent::Consumed
        );
        assert!(dialog.is_dragging());
        assert!(dialog.handle_pointer_move(Point::new(200, 250)));
        assert_eq!(dialog.state.position, Some(Point::new(180, 240)));

        assert!(dialog.handle_pointer_up());
        assert!(!dialog.handle_pointer_move(Point::new(10, 10)));
        assert_eq!(dialog.state.position, Some(Point::new(180, 240)));
    }

    #[test]
    fn title_and_buttons_do_not_drag() {
        let mut dialog = AskDialog::new();
        dialog.open();
        draw(&mut dialog, Point::new(2, 2), (80, 40));

        assert_eq!(dialog.hit_test(Point::new(10, 2)), Some(DialogHit::Title));
        assert_eq!(dialog.handle_pointer_down(Point::new(10, 2)), DialogEvent::Consumed);
        assert!(!dialog.is_dragging());

        let layout = dialog.layout.unwrap();
        let submit = Point::from_cell(layout.submit.x, layout.submit.y);
        assert_eq!(dialog.handle_pointer_down(submit), DialogEvent::Submit);
        let close = Point::from_cell(layout.close.x + 1, layout.close.y);
        assert_eq!(dialog.handle_pointer_down(close), DialogEvent::Close);
        let question = Point::from_cell(layout.question.x + 3, layout.question.y);
        assert_eq!(dialog.handle_pointer_down(question), DialogEvent::Consumed);
        assert!(!dialog.is_dragging());
    }

    #[test]
    fn outside_pointer_is_ignored() {
        let mut dialog = AskDialog::new();
        dialog.open();
        draw(&mut dialog, Point::new(2, 2), (80, 40));
        assert_eq!(dialog.handle_pointer_down(Point::new(79, 39)), DialogEvent::Ignored);
    }

    #[test]
    fn origin_follows_anchor_until_dragged() {
        let mut dialog = AskDialog::new();
        assert_eq!(dialog.origin(Point::new(10, 5), 3), Point::new(10, 8));
        dialog.state.position = Some(Point::new(1, 1));
        assert_eq!(dialog.origin(Point::new(10, 5), 3), Point::new(1, 1));
    }

    #[test]
    fn submit_without_selection_is_a_validation_error() {
        let mut dialog = AskDialog::new();
        dialog.open();
        assert!(dialog.begin_submit("").is_none());
        assert_eq!(dialog.state.error, NO_SELECTION_MESSAGE);
        assert!(!dialog.state.loading);
    }

    #[test]
    fn submit_lifecycle() {
        let mut dialog = AskDialog::new();
        dialog.open();
        dialog.state.error = "old".into();
        dialog.state.question = "why?".into();

        let request = dialog.begin_submit("context").unwrap();
        assert_eq!(request, AskRequest::new("context", "why?"));
        assert!(dialog.state.loading);
        assert!(dialog.state.error.is_empty());

        // Disabled while loading
        assert!(dialog.begin_submit("context").is_none());
        assert_eq!(dialog.handle_key(key(KeyCode::Enter)), DialogEvent::Consumed);

        dialog.finish_submit(AskOutcome::Answered("X".into()));
        assert_eq!(dialog.state.answer.as_deref(), Some("X"));
        assert!(!dialog.state.loading);
        assert!(dialog.state.error.is_empty());
    }

    #[test]
    fn failure_leaves_answer_unset() {
        let mut dialog = AskDialog::new();
        dialog.open();
        dialog.begin_submit("context").unwrap();
        dialog.finish_submit(AskOutcome::Failed("bad".into()));
        assert_eq!(dialog.state.error, "bad");
        assert!(dialog.state.answer.is_none());
        assert!(!dialog.state.loading);
    }

    #[test]
    fn typing_edits_question() {
        let mut dialog = AskDialog::new();
        dialog.open();
        for c in "hi".chars() {
            dialog.handle_key(key(KeyCode::Char(c)));
        }
        dialog.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT));
        dialog.handle_key(key(KeyCode::Char('x')));
        dialog.handle_key(key(KeyCode::Backspace));
        assert_eq!(dialog.state.question, "hi\n");
        assert_eq!(dialog.handle_key(key(KeyCode::Enter)), DialogEvent::Submit);
        assert_eq!(
            dialog.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            DialogEvent::Ignored
        );
    }

    #[test]
    fn closed_dialog_ignores_input() {
        let mut dialog = AskDialog::new();
        assert_eq!(dialog.handle_key(key(KeyCode::Char('a'))), DialogEvent::Ignored);
        assert!(dialog.state.question.is_empty());
    }

    #[test]
    fn reset_keeps_question_only() {
        let mut dialog = AskDialog::new();
        dialog.open();
        dialog.state.question = "keep".into();
        dialog.state.error = "err".into();
        dialog.state.position = Some(Point::new(4, 4));
        dialog.finish_submit(AskOutcome::Answered("a".into()));

        dialog.reset_for_selection();
        assert_eq!(
            dialog.state,
            DialogState {
                question: "keep".into(),
                ..DialogState::default()
            }
        );
    }

    #[test]
    fn answer_is_rendered_and_scrollable() {
        let mut dialog = AskDialog::new();
        dialog.open();
        let long: String = (1..=40).map(|i| format!("line {i}\n\n")).collect();
        dialog.finish_submit(AskOutcome::Answered(long));
        draw(&mut dialog, Point::new(0, 0), (80, 60));

        let answer = dialog.layout.unwrap().answer;
        assert_eq!(usize::from(answer.height), ANSWER_MAX_ROWS);
        dialog.scroll_answer(1000);
        assert!(dialog.answer_scroll > 0);
        dialog.scroll_answer(-1000);
        assert_eq!(dialog.answer_scroll, 0);
    }
}
