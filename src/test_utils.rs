pub mod test_helpers {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;

    use crate::app::{Viewer, ViewerOptions};
    use crate::ask::{AskError, AskRequest, AskTransport, TransportReply};
    use crate::clipboard::{ClipboardBackend, ClipboardError, FallbackClipboard};
    use crate::event_source::{Event, KeyCode, KeyEvent, KeyModifiers, SimulatedEventSource};
    use crate::pdf::{
        CellSize, DocumentError, DocumentLoader, DocumentSource, LineBounds, LoadedDocument,
        PageText,
    };
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// Builder for creating test scenarios with simulated user input
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self { events: Vec::new() }
        }

        /// Add a character key press
        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        /// Add a Ctrl+character key press
        pub fn press_ctrl_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::ctrl_char_key(c));
            self
        }

        pub fn press_key(mut self, code: KeyCode) -> Self {
            self.events
                .push(SimulatedEventSource::key_event(code, KeyModifiers::empty()));
            self
        }

        pub fn press_enter(self) -> Self {
            self.press_key(KeyCode::Enter)
        }

        pub fn press_esc(self) -> Self {
            self.press_key(KeyCode::Esc)
        }

        pub fn type_text(mut self, text: &str) -> Self {
            self.events.extend(SimulatedEventSource::type_text(text));
            self
        }

        /// Press at `from`, drag to `to`, release
        pub fn drag_select(mut self, from: (u16, u16), to: (u16, u16)) -> Self {
            self.events
                .extend(SimulatedEventSource::drag_select(from, to));
            self
        }

        pub fn click(mut self, column: u16, row: u16) -> Self {
            self.events.push(SimulatedEventSource::mouse_down(column, row));
            self.events.push(SimulatedEventSource::mouse_up(column, row));
            self
        }

        pub fn scroll_down(mut self, column: u16, row: u16) -> Self {
            self.events
                .push(SimulatedEventSource::scroll_down(column, row));
            self
        }

        /// Quit the application (press 'q')
        pub fn quit(mut self) -> Self {
            self.events.push(SimulatedEventSource::char_key('q'));
            self
        }

        pub fn events(self) -> Vec<Event> {
            self.events
        }

        /// Build the simulated event source
        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    impl Default for TestScenarioBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    pub fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    /// Create a test terminal for snapshot testing
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            // Trim trailing whitespace from each line
            lines.push(line.trim_end().to_string());
        }

        // Remove trailing empty lines
        while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
            lines.pop();
        }

        lines.join("\n")
    }

    /// Points wide enough that 8px cells map one glyph to one column
    pub const FAKE_PAGE_WIDTH: f32 = 640.0;

    /// Page whose lines start at the left edge, one row each
    pub fn text_page(lines: &[&str]) -> PageText {
        let lines = lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let y0 = 10.0 + i as f32 * 14.0;
                let x1 = text.chars().count() as f32 * 8.0;
                LineBounds::from_text(text, 0.0, y0, x1, y0 + 12.0)
            })
            .collect();
        PageText {
            width: FAKE_PAGE_WIDTH,
            height: 800.0,
            lines,
        }
    }

    /// Serves the same in-memory pages for any source except `None` and
    /// paths ending in `missing.pdf`
    pub struct FakeDocumentLoader {
        pages: Vec<Vec<String>>,
    }

    impl FakeDocumentLoader {
        pub fn new(pages: &[&[&str]]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|page| page.iter().map(|l| l.to_string()).collect())
                    .collect(),
            }
        }
    }

    impl DocumentLoader for FakeDocumentLoader {
        fn load(&self, source: &DocumentSource) -> Result<LoadedDocument, DocumentError> {
            match source {
                DocumentSource::None => Err(DocumentError::NoSource),
                DocumentSource::Path(path) if path.ends_with("missing.pdf") => {
                    Err(DocumentError::Io {
                        path: path.display().to_string(),
                        source: std::io::Error::from(std::io::ErrorKind::NotFound),
                    })
                }
                _ => {
                    let pages: Vec<PageText> = self
                        .pages
                        .iter()
                        .map(|page| {
                            let lines: Vec<&str> = page.iter().map(String::as_str).collect();
                            text_page(&lines)
                        })
                        .collect();
                    Ok(LoadedDocument {
                        page_count: pages.len(),
                        title: None,
                        pages,
                    })
                }
            }
        }
    }

    #[derive(Clone)]
    enum FakeReply {
        Reply(u16, String),
        Unreachable,
    }

    /// Records every request and answers with a canned reply
    pub struct FakeTransport {
        reply: FakeReply,
        requests: Mutex<Vec<AskRequest>>,
    }

    impl FakeTransport {
        pub fn with_reply(status: u16, body: &str) -> Self {
            Self {
                reply: FakeReply::Reply(status, body.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn answering(answer: &str) -> Self {
            let body = serde_json::json!({ "answer": answer }).to_string();
            Self::with_reply(200, &body)
        }

        pub fn unreachable() -> Self {
            Self {
                reply: FakeReply::Unreachable,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<AskRequest> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl AskTransport for FakeTransport {
        fn send(&self, request: &AskRequest) -> Result<TransportReply, AskError> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());
            match &self.reply {
                FakeReply::Reply(status, body) => Ok(TransportReply {
                    status: *status,
                    body: body.clone(),
                }),
                FakeReply::Unreachable => Err(AskError::Unreachable("connection refused".into())),
            }
        }
    }

    /// Clipboard backend that keeps what it was given, or always fails
    pub struct RecordingClipboard {
        copied: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl RecordingClipboard {
        pub fn working(copied: Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                copied,
                fail: false,
            }
        }

        pub fn broken(copied: Rc<RefCell<Vec<String>>>) -> Self {
            Self { copied, fail: true }
        }
    }

    impl ClipboardBackend for RecordingClipboard {
        fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Unavailable("no display".into()));
            }
            self.copied.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    /// Everything a viewer test needs to look at afterwards
    pub struct ViewerHarness {
        pub viewer: Viewer,
        pub terminal: Terminal<TestBackend>,
        pub transport: Arc<FakeTransport>,
        pub system_clipboard: Rc<RefCell<Vec<String>>>,
        pub terminal_clipboard: Rc<RefCell<Vec<String>>>,
    }

    impl ViewerHarness {
        pub fn options() -> ViewerOptions {
            ViewerOptions {
                fixed_cell_size: Some(CellSize::new(8, 16)),
                ..ViewerOptions::default()
            }
        }

        /// Viewer with `pages` loaded and drawn once on a `width` x `height`
        /// terminal
        pub fn new(pages: &[&[&str]], width: u16, height: u16) -> Self {
            Self::with(pages, width, height, Self::options(), FakeTransport::answering("42"), true)
        }

        pub fn with(
            pages: &[&[&str]],
            width: u16,
            height: u16,
            options: ViewerOptions,
            transport: FakeTransport,
            clipboard_works: bool,
        ) -> Self {
            let transport = Arc::new(transport);
            let system_clipboard = Rc::new(RefCell::new(Vec::new()));
            let terminal_clipboard = Rc::new(RefCell::new(Vec::new()));
            let primary = if clipboard_works {
                RecordingClipboard::working(Rc::clone(&system_clipboard))
            } else {
                RecordingClipboard::broken(Rc::clone(&system_clipboard))
            };
            let clipboard = FallbackClipboard::new(
                Box::new(primary),
                Box::new(RecordingClipboard::working(Rc::clone(&terminal_clipboard))),
            );

            let mut viewer = Viewer::new(
                Arc::new(FakeDocumentLoader::new(pages)),
                Arc::clone(&transport) as Arc<dyn AskTransport>,
                clipboard,
                options,
            );
            let mut terminal = create_test_terminal(width, height);
            if !pages.is_empty() {
                viewer.open(DocumentSource::Path("paper.pdf".into()));
                assert!(viewer.wait_for_document(Duration::from_secs(5)));
            }
            terminal.draw(|f| viewer.draw(f)).unwrap();

            Self {
                viewer,
                terminal,
                transport,
                system_clipboard,
                terminal_clipboard,
            }
        }

        /// Handle each event, redrawing after every one like the event loop
        pub fn send(&mut self, events: Vec<Event>) {
            for event in events {
                self.viewer.handle_event(&event);
                self.draw();
            }
        }

        pub fn draw(&mut self) {
            let viewer = &mut self.viewer;
            self.terminal.draw(|f| viewer.draw(f)).unwrap();
        }

        /// Wait for the outstanding ask request and redraw
        pub fn settle_answer(&mut self) {
            assert!(self.viewer.wait_for_answer(Duration::from_secs(5)));
            self.draw();
        }

        pub fn screen(&self) -> String {
            capture_terminal_state(&self.terminal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;

    #[test]
    fn test_scenario_builder() {
        let scenario = TestScenarioBuilder::new()
            .drag_select((0, 1), (4, 1))
            .press_char('a')
            .type_text("why")
            .press_enter()
            .quit()
            .build();

        assert_eq!(scenario.events.len(), 9);
    }

    #[test]
    fn fake_pages_map_one_glyph_per_column() {
        let page = text_page(&["hello"]);
        assert_eq!(page.lines[0].x1, 40.0);
        assert_eq!(page.lines[0].chars.len(), 5);
    }
}
