use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, error, info};
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

use crate::ask::{AskService, AskTransport, HttpTransport};
use crate::clipboard::{CopyPath, FallbackClipboard};
use crate::event_source::{Event, EventSource, MouseButton, MouseEvent, MouseEventKind};
use crate::geometry::{Point, rect_contains};
use crate::pdf::{
    CellSize, DocumentLoader, DocumentService, DocumentSource, LayerMapping, LayerPos, LoadEvent,
    LoadedDocument, RowKind, SelectionPoint, TextLayer, TextSelection, WIDE_TAIL,
    centering_offset, default_loader,
};
use crate::selection::{SelectionState, SelectionTracker, TrackOutcome};
use crate::settings;
use crate::terminal::{detect_terminal, query_cell_size};
use crate::theme::{Base16Palette, current_theme};
use crate::viewport::ViewportSizing;
use crate::widget::{
    AskDialog, DialogEvent, DialogState, FilePrompt, FilePromptAction, FloatingMenu, HudMessage,
    MenuAction, MenuHit,
};

const SCROLL_LINES: i64 = 3;
const ANSWER_SCROLL_LINES: i32 = 3;
pub const COPIED_MESSAGE: &str = "Copied";
const HELP_TEXT: &str = " drag: select · c copy · x clear · a ask · o open · Esc dismiss · q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

/// Tunables the viewer is built with
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub ask_endpoint: String,
    pub request_timeout: Duration,
    pub max_render_width: u32,
    pub clear_selection_on_scroll: bool,
    pub menu_offset: i32,
    pub dialog_offset: i32,
    /// Skip querying the terminal for its cell size
    pub fixed_cell_size: Option<CellSize>,
    pub tmux: bool,
}

impl ViewerOptions {
    /// Current settings, CLI overrides included
    pub fn from_settings() -> Self {
        let settings = settings::snapshot();
        Self {
            ask_endpoint: settings.ask_endpoint,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            max_render_width: settings.max_render_width,
            clear_selection_on_scroll: settings.clear_selection_on_scroll,
            menu_offset: settings.menu_offset,
            dialog_offset: settings.dialog_offset,
            fixed_cell_size: None,
            tmux: detect_terminal().wrap_for_tmux,
        }
    }
}

impl Default for ViewerOptions {
    fn default() -> Self {
        let settings = settings::Settings::default();
        Self {
            ask_endpoint: settings.ask_endpoint,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            max_render_width: settings.max_render_width,
            clear_selection_on_scroll: settings.clear_selection_on_scroll,
            menu_offset: settings.menu_offset,
            dialog_offset: settings.dialog_offset,
            fixed_cell_size: None,
            tmux: false,
        }
    }
}

/// The document viewer with its selection menu and ask dialog
pub struct Viewer {
    documents: DocumentService,
    source: DocumentSource,
    document: Option<LoadedDocument>,
    load_error: Option<String>,
    layer: TextLayer,
    layer_stale: bool,
    sizing: ViewportSizing,
    fixed_cell_size: Option<CellSize>,
    scroll: usize,
    viewport: Rect,
    mapping: LayerMapping,
    raw_selection: TextSelection,
    selection: SelectionState,
    tracker: SelectionTracker,
    clear_selection_on_scroll: bool,
    menu: FloatingMenu,
    dialog: AskDialog,
    dialog_offset: i32,
    ask: AskService,
    clipboard: FallbackClipboard,
    file_prompt: FilePrompt,
    hud: Option<HudMessage>,
}

impl Viewer {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        transport: Arc<dyn AskTransport>,
        clipboard: FallbackClipboard,
        options: ViewerOptions,
    ) -> Self {
        let cell_size = options.fixed_cell_size.unwrap_or_default();
        Self {
            documents: DocumentService::new(loader),
            source: DocumentSource::None,
            document: None,
            load_error: None,
            layer: TextLayer::default(),
            layer_stale: false,
            sizing: ViewportSizing::new(options.max_render_width, cell_size),
            fixed_cell_size: options.fixed_cell_size,
            scroll: 0,
            viewport: Rect::default(),
            mapping: LayerMapping {
                origin_x: 0,
                origin_y: 0,
                scroll: 0,
                visible_rows: 0,
            },
            raw_selection: TextSelection::new(),
            selection: SelectionState::default(),
            tracker: SelectionTracker::new(options.menu_offset),
            clear_selection_on_scroll: options.clear_selection_on_scroll,
            menu: FloatingMenu::new(),
            dialog: AskDialog::new(),
            dialog_offset: options.dialog_offset,
            ask: AskService::new(transport),
            clipboard,
            file_prompt: FilePrompt::new(),
            hud: None,
        }
    }

    /// Viewer wired to MuPDF, the HTTP endpoint and the system clipboard
    pub fn with_defaults(options: ViewerOptions) -> Result<Self> {
        let transport = HttpTransport::new(&options.ask_endpoint, options.request_timeout)?;
        info!("Ask endpoint: {}", transport.endpoint());

        let clipboard = FallbackClipboard::system(options.tmux);
        let mut viewer = Self::new(default_loader(), Arc::new(transport), clipboard, options);
        if viewer.fixed_cell_size.is_none() {
            let cell = query_cell_size();
            debug!("Cell size {}x{} px", cell.width, cell.height);
            viewer.sizing.set_cell_size(cell);
        }
        Ok(viewer)
    }

    /// Load a document in the background, replacing the current one
    pub fn open(&mut self, source: DocumentSource) {
        info!("Opening {}", source.display_name());
        self.raw_selection.clear();
        self.clear_selection();
        self.source = source.clone();
        self.document = None;
        self.load_error = None;
        self.layer = TextLayer::default();
        self.scroll = 0;
        if source.is_none() {
            return;
        }
        self.documents.request(source);
    }

    /// Block until the pending load finishes; returns whether a document is loaded
    pub fn wait_for_document(&mut self, timeout: Duration) -> bool {
        if let Some(event) = self.documents.wait(timeout) {
            self.apply_load(event);
        }
        self.document.is_some()
    }

    /// Block until the next ask response arrives and apply it
    pub fn wait_for_answer(&mut self, timeout: Duration) -> bool {
        match self.ask.wait(timeout) {
            Some(completion) => {
                self.dialog.finish_submit(completion.outcome);
                true
            }
            None => false,
        }
    }

    /// Apply finished background work; returns whether a redraw is needed
    pub fn poll_background(&mut self) -> bool {
        let mut changed = false;

        if let Some(event) = self.documents.poll() {
            self.apply_load(event);
            changed = true;
        }

        while let Some(completion) = self.ask.poll() {
            debug!("Ask request {} finished", completion.ticket.0);
            self.dialog.finish_submit(completion.outcome);
            changed = true;
        }

        if self.hud.as_ref().is_some_and(HudMessage::is_expired) {
            self.hud = None;
            changed = true;
        }

        changed
    }

    fn apply_load(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Loaded(document) => {
                info!(
                    "Loaded {} ({} pages)",
                    self.source.display_name(),
                    document.page_count
                );
                self.document = Some(document);
                self.load_error = None;
                self.layer_stale = true;
                self.scroll = 0;
            }
            LoadEvent::Failed(e) => {
                error!("Failed to load {}: {e}", self.source.display_name());
                let message = format!("Could not open {}: {e}", self.source.display_name());
                self.hud = Some(HudMessage::error(message.clone()));
                self.load_error = Some(message);
                self.document = None;
                self.layer = TextLayer::default();
            }
        }
    }

    pub fn handle_event(&mut self, event: &Event) -> Option<AppAction> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(*key),
            Event::Mouse(mouse) => {
                self.handle_mouse(*mouse);
                None
            }
            Event::Paste(text) => {
                if self.file_prompt.is_active() {
                    self.file_prompt.paste(text);
                } else {
                    self.dialog.paste(text);
                }
                None
            }
            Event::Resize(_, _) => {
                self.handle_resize();
                None
            }
            _ => None,
        }
    }

    fn handle_resize(&mut self) {
        let cell = self.fixed_cell_size.unwrap_or_else(query_cell_size);
        if self.sizing.set_cell_size(cell) {
            debug!("Cell size changed to {}x{}", cell.width, cell.height);
            self.layer_stale = true;
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(AppAction::Quit);
        }

        // Escape dismisses everything, whatever has focus
        if key.code == KeyCode::Esc {
            self.file_prompt.cancel();
            self.clear_selection();
            return None;
        }

        if self.file_prompt.is_active() {
            if let FilePromptAction::Open(path) = self.file_prompt.handle_key(key) {
                self.open(DocumentSource::Path(path));
            }
            return None;
        }

        if self.dialog.is_open() {
            match self.dialog.handle_key(key) {
                DialogEvent::Submit => {
                    self.submit();
                    return None;
                }
                DialogEvent::Close => {
                    self.dialog.close();
                    return None;
                }
                // The question has focus; document bindings stay off
                DialogEvent::Consumed | DialogEvent::Ignored => return None,
            }
        }

        if self.selection.is_active() {
            if let KeyCode::Char(c) = key.code {
                if let Some(action) = MenuAction::from_key(c) {
                    self.run_menu_action(action);
                    return None;
                }
            }
        }

        let page = i64::from(self.viewport.height.max(1));
        match key.code {
            KeyCode::Char('q') => return Some(AppAction::Quit),
            KeyCode::Char('o') => self.file_prompt.open(),
            KeyCode::Char('j') | KeyCode::Down => self.scroll_document(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_document(-1),
            KeyCode::PageDown | KeyCode::Char(' ') => self.scroll_document(page),
            KeyCode::PageUp => self.scroll_document(-page),
            KeyCode::Char('g') | KeyCode::Home => self.scroll_document(-(self.scroll as i64)),
            KeyCode::Char('G') | KeyCode::End => self.scroll_document(self.layer.len() as i64),
            _ => {}
        }
        None
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let point = Point::from_cell(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.pointer_down(point),
            MouseEventKind::Drag(MouseButton::Left) => self.pointer_move(point),
            MouseEventKind::Up(MouseButton::Left) => self.pointer_up(point),
            MouseEventKind::ScrollDown => self.wheel(point, 1),
            MouseEventKind::ScrollUp => self.wheel(point, -1),
            _ => {}
        }
    }

    fn pointer_down(&mut self, point: Point) {
        if self.file_prompt.is_active() {
            return;
        }

        match self.dialog.handle_pointer_down(point) {
            DialogEvent::Submit => return self.submit(),
            DialogEvent::Close => return self.dialog.close(),
            DialogEvent::Consumed => return,
            DialogEvent::Ignored => {}
        }

        if self.selection.is_active() {
            match self.menu.hit_test(point) {
                Some(MenuHit::Action(action)) => return self.run_menu_action(action),
                Some(MenuHit::Body) => return,
                None => {}
            }
        }

        if self.layer.is_empty() || !rect_contains(self.viewport, point) {
            return;
        }
        let layer_pos = self.mapping.to_layer(&self.layer, point);
        self.raw_selection.start_at(SelectionPoint {
            screen: point,
            layer: layer_pos,
        });
    }

    fn pointer_move(&mut self, point: Point) {
        if self.dialog.is_dragging() {
            self.dialog.handle_pointer_move(point);
            return;
        }
        if self.raw_selection.is_selecting {
            let layer_pos = self.mapping.to_layer(&self.layer, point);
            self.raw_selection.update_focus(SelectionPoint {
                screen: point,
                layer: layer_pos,
            });
        }
    }

    fn pointer_up(&mut self, point: Point) {
        if self.dialog.handle_pointer_up() {
            debug!("Dialog dropped at {:?}", self.dialog.state.position);
            return;
        }
        if !self.raw_selection.is_selecting {
            return;
        }

        self.pointer_move(point);
        self.raw_selection.finish();

        if !rect_contains(self.viewport, point) {
            return;
        }

        let snapshot = self.raw_selection.snapshot(&self.layer, &self.mapping);
        match self
            .tracker
            .on_pointer_up(snapshot.as_ref(), self.viewport, &mut self.selection)
        {
            TrackOutcome::Selected | TrackOutcome::Cleared => self.dialog.reset_for_selection(),
        }
    }

    fn wheel(&mut self, point: Point, direction: i32) {
        if self.file_prompt.is_active() {
            return;
        }
        if self
            .dialog
            .area()
            .is_some_and(|area| self.dialog.is_open() && rect_contains(area, point))
        {
            self.dialog.scroll_answer(direction * ANSWER_SCROLL_LINES);
            return;
        }
        self.scroll_document(i64::from(direction) * SCROLL_LINES);
    }

    /// Every scroll gesture counts, even one that hits the end of the document
    fn scroll_document(&mut self, delta: i64) {
        let max = self.max_scroll();
        let next = (self.scroll as i64 + delta).clamp(0, max as i64) as usize;
        if next != self.scroll {
            self.scroll = next;
            self.mapping.scroll = next;
        }
        if self.clear_selection_on_scroll && self.selection.is_active() {
            debug!("Scrolled, clearing selection");
            self.raw_selection.clear();
            self.clear_selection();
        }
    }

    fn max_scroll(&self) -> usize {
        self.layer
            .len()
            .saturating_sub(usize::from(self.viewport.height.max(1)))
    }

    fn run_menu_action(&mut self, action: MenuAction) {
        debug!("Menu action {action:?}");
        match action {
            MenuAction::Copy => {
                let text = self.selection.text().to_string();
                let path = self.clipboard.copy(&text);
                debug!("Copy finished via {path:?}");
                if path != CopyPath::Failed {
                    self.hud = Some(HudMessage::info(COPIED_MESSAGE));
                }
                self.clear_selection();
            }
            MenuAction::Clear => {
                self.raw_selection.clear();
                self.clear_selection();
            }
            MenuAction::Ask => self.dialog.open(),
        }
    }

    fn submit(&mut self) {
        if let Some(request) = self.dialog.begin_submit(self.selection.text()) {
            self.ask.submit(request);
        }
    }

    /// Drop the selection state; the dialog closes and forgets its answer
    /// and position, keeping the question
    fn clear_selection(&mut self) {
        self.selection.clear();
        self.dialog.reset_for_selection();
        self.menu.hide();
    }

    fn sync_viewport(&mut self, body: Rect) {
        let width_changed = self.sizing.observe_columns(body.width);
        if width_changed || self.layer_stale {
            if let Some(document) = &self.document {
                self.layer = TextLayer::build(
                    document,
                    self.sizing.render_width(),
                    self.sizing.cell_size(),
                );
                debug!(
                    "Laid out {} rows at {} px ({} columns)",
                    self.layer.len(),
                    self.sizing.render_width(),
                    self.layer.width()
                );
            }
            if width_changed && self.selection.is_active() {
                // Cell positions moved under the selection
                self.raw_selection.clear();
                self.clear_selection();
            }
            self.layer_stale = false;
        }

        self.viewport = body;
        self.scroll = self.scroll.min(self.max_scroll());
        let offset = centering_offset(body.width, self.layer.width());
        self.mapping = LayerMapping {
            origin_x: i32::from(body.x) + i32::from(offset),
            origin_y: i32::from(body.y),
            scroll: self.scroll,
            visible_rows: body.height,
        };
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let palette = current_theme();
        let area = f.area();
        let [header, body, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(area);

        self.sync_viewport(body);

        self.draw_header(f, header, palette);
        self.draw_document(f, body, palette);
        self.draw_status(f, status, palette);

        match self.selection.anchor() {
            Some(anchor) => {
                self.menu.render(f, anchor, area, palette);
                let origin = self.dialog.origin(anchor, self.dialog_offset);
                self.dialog
                    .render(f, origin, area, self.selection.text(), palette);
            }
            None => {
                self.menu.hide();
                self.dialog.close();
            }
        }

        self.file_prompt.render(f, area, palette);
    }

    fn draw_header(&self, f: &mut Frame, area: Rect, palette: &Base16Palette) {
        let (fg, bg) = palette.chrome_colors();
        let mut spans = vec![Span::styled(
            " askpdf ",
            Style::default().fg(palette.base_0d).add_modifier(Modifier::BOLD),
        )];
        if !self.source.is_none() {
            spans.push(Span::raw(format!("· {} ", self.source.display_name())));
        }
        if let Some(count) = self.page_count() {
            let label = if count == 1 { "page" } else { "pages" };
            spans.push(Span::raw(format!("· {count} {label} ")));
        }
        f.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().fg(fg).bg(bg)),
            area,
        );
    }

    fn draw_document(&self, f: &mut Frame, area: Rect, palette: &Base16Palette) {
        let (fg, bg) = palette.page_colors();
        f.render_widget(Block::default().style(Style::default().fg(fg).bg(bg)), area);

        if self.layer.is_empty() {
            let message = if self.documents.is_loading() {
                format!("Loading {}…", self.source.display_name())
            } else if let Some(error) = &self.load_error {
                error.clone()
            } else if self.document.is_some() {
                "This document has no text".to_string()
            } else {
                "No document open. Press o to open a PDF".to_string()
            };
            let row = Rect::new(area.x, area.y + area.height / 2, area.width, 1.min(area.height));
            f.render_widget(
                Paragraph::new(Line::from(Span::styled(message, palette.muted_style())).centered()),
                row,
            );
            return;
        }

        let (sel_bg, sel_fg) = palette.selection_colors();
        let selected = Style::default().bg(sel_bg).fg(sel_fg);
        let offset = u16::try_from(self.mapping.origin_x - i32::from(area.x)).unwrap_or(0);

        let mut lines = Vec::with_capacity(usize::from(area.height));
        for i in 0..usize::from(area.height) {
            let row_idx = self.scroll + i;
            let Some(row) = self.layer.row(row_idx) else {
                break;
            };
            let pad = Span::raw(" ".repeat(usize::from(offset)));

            if matches!(row.kind, RowKind::PageBreak { .. }) {
                lines.push(Line::from(vec![
                    pad,
                    Span::styled(row.text(), palette.muted_style()),
                ]));
                continue;
            }

            let mut spans = vec![pad];
            let mut run = String::new();
            let mut run_selected = false;
            for (col, ch) in row.cells.iter().enumerate() {
                if *ch == WIDE_TAIL {
                    continue;
                }
                let is_selected = self.raw_selection.contains(LayerPos::new(row_idx, col));
                if is_selected != run_selected && !run.is_empty() {
                    let style = if run_selected { selected } else { Style::default() };
                    spans.push(Span::styled(std::mem::take(&mut run), style));
                }
                run_selected = is_selected;
                run.push(*ch);
            }
            if !run.is_empty() {
                let style = if run_selected { selected } else { Style::default() };
                spans.push(Span::styled(run, style));
            }
            lines.push(Line::from(spans));
        }

        f.render_widget(Paragraph::new(lines), area);
    }

    fn draw_status(&self, f: &mut Frame, area: Rect, palette: &Base16Palette) {
        if let Some(hud) = &self.hud {
            hud.render(f, area, palette);
            return;
        }
        let (fg, bg) = palette.chrome_colors();
        f.render_widget(
            Paragraph::new(HELP_TEXT).style(Style::default().fg(fg).bg(bg)),
            area,
        );
    }

    pub fn page_count(&self) -> Option<usize> {
        self.document.as_ref().map(|d| d.page_count)
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn dialog_state(&self) -> &DialogState {
        &self.dialog.state
    }

    pub fn dialog_area(&self) -> Option<Rect> {
        self.dialog.area()
    }

    pub fn menu_area(&self) -> Option<Rect> {
        self.menu.area()
    }

    pub fn has_raw_selection(&self) -> bool {
        self.raw_selection.has_selection()
    }

    pub fn sizing(&self) -> &ViewportSizing {
        &self.sizing
    }

    pub fn layer(&self) -> &TextLayer {
        &self.layer
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn hud_message(&self) -> Option<&str> {
        self.hud.as_ref().map(|h| h.message.as_str())
    }

    pub fn is_file_prompt_active(&self) -> bool {
        self.file_prompt.is_active()
    }

    pub fn asks_in_flight(&self) -> usize {
        self.ask.in_flight()
    }
}

pub fn run_app_with_event_source<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    viewer: &mut Viewer,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();
    let mut first_render = true;

    loop {
        let mut events_processed = 0;
        let mut should_quit = false;

        while event_source.poll(Duration::from_millis(0))? && events_processed < 50 {
            let event = event_source.read()?;
            events_processed += 1;
            if viewer.handle_event(&event) == Some(AppAction::Quit) {
                should_quit = true;
                break;
            }
        }

        let mut needs_redraw = events_processed > 0;
        if first_render {
            needs_redraw = true;
            first_render = false;
        }

        if last_tick.elapsed() >= tick_rate {
            if viewer.poll_background() {
                needs_redraw = true;
            }
            last_tick = Instant::now();
        }

        if needs_redraw {
            terminal.draw(|f| viewer.draw(f))?;
        }

        if should_quit {
            return Ok(());
        }

        if events_processed == 0 {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));
            let _ = event_source.poll(timeout);
        }
    }
}
