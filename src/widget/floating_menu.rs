use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::geometry::{Point, place_within, rect_contains};
use crate::theme::Base16Palette;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuAction {
    Copy,
    Clear,
    Ask,
}

impl MenuAction {
    fn label(self) -> &'static str {
        match self {
            MenuAction::Copy => " Copy ",
            MenuAction::Clear => " Clear ",
            MenuAction::Ask => " Ask ",
        }
    }

    /// Keyboard shortcut while the menu is showing
    pub fn from_key(c: char) -> Option<Self> {
        match c {
            'c' => Some(MenuAction::Copy),
            'x' => Some(MenuAction::Clear),
            'a' => Some(MenuAction::Ask),
            _ => None,
        }
    }
}

const ACTIONS: [MenuAction; 3] = [MenuAction::Copy, MenuAction::Clear, MenuAction::Ask];

/// What a pointer-down inside the menu landed on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuHit {
    Action(MenuAction),
    Body,
}

/// Copy / clear / ask popup shown under a selection
#[derive(Debug, Default)]
pub struct FloatingMenu {
    last_area: Option<Rect>,
    buttons: Vec<(MenuAction, Rect)>,
}

impl FloatingMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outer size including the border
    pub fn size() -> (u16, u16) {
        let labels: u16 = ACTIONS.iter().map(|a| a.label().len() as u16).sum();
        let gaps = ACTIONS.len() as u16 - 1;
        (labels + gaps + 2, 3)
    }

    /// Draw with the top-left at `anchor`, shifted to stay inside `bounds`
    pub fn render(&mut self, f: &mut Frame, anchor: Point, bounds: Rect, palette: &Base16Palette) {
        let (width, height) = Self::size();
        let area = place_within(anchor, width, height, bounds);
        self.last_area = Some(area);

        f.render_widget(Clear, area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.popup_border(true)))
            .style(Style::default().bg(palette.base_01));
        let inner = block.inner(area);

        let mut spans = Vec::new();
        self.buttons.clear();
        let mut x = inner.x;
        for (idx, action) in ACTIONS.iter().enumerate() {
            if idx > 0 {
                spans.push(Span::raw(" "));
                x += 1;
            }
            let label = action.label();
            let w = label.len() as u16;
            spans.push(Span::styled(label, palette.button_style(true)));
            self.buttons
                .push((*action, Rect::new(x, inner.y, w, 1).intersection(inner)));
            x += w;
        }

        f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
    }

    /// Forget the drawn area; nothing is hit until the next render
    pub fn hide(&mut self) {
        self.last_area = None;
        self.buttons.clear();
    }

    pub fn area(&self) -> Option<Rect> {
        self.last_area
    }

    pub fn hit_test(&self, point: Point) -> Option<MenuHit> {
        let area = self.last_area?;
        if !rect_contains(area, point) {
            return None;
        }
        Some(
            self.buttons
                .iter()
                .find(|(_, rect)| rect_contains(*rect, point))
                .map_or(MenuHit::Body, |(action, _)| MenuHit::Action(*action)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::current_theme;
    use ratatui::{Terminal, backend::TestBackend};

    fn rendered_menu(anchor: Point) -> FloatingMenu {
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        let mut menu = FloatingMenu::new();
        terminal
            .draw(|f| menu.render(f, anchor, f.area(), current_theme()))
            .unwrap();
        menu
    }

    #[test]
    fn menu_is_drawn_at_anchor() {
        let menu = rendered_menu(Point::new(10, 5));
        let (w, h) = FloatingMenu::size();
        assert_eq!(menu.area(), Some(Rect::new(10, 5, w, h)));
    }

    #[test]
    fn menu_stays_on_screen() {
        let menu = rendered_menu(Point::new(55, 19));
        let area = menu.area().unwrap();
        assert!(area.right() <= 60);
        assert!(area.bottom() <= 20);
    }

    #[test]
    fn buttons_are_hit_tested() {
        let menu = rendered_menu(Point::new(10, 5));
        // Inner row starts at (11, 6): " Copy " then a gap then " Clear "
        assert_eq!(
            menu.hit_test(Point::new(12, 6)),
            Some(MenuHit::Action(MenuAction::Copy))
        );
        assert_eq!(
            menu.hit_test(Point::new(18, 6)),
            Some(MenuHit::Action(MenuAction::Clear))
        );
        assert_eq!(
            menu.hit_test(Point::new(27, 6)),
            Some(MenuHit::Action(MenuAction::Ask))
        );
        assert_eq!(menu.hit_test(Point::new(10, 5)), Some(MenuHit::Body));
        assert_eq!(menu.hit_test(Point::new(0, 0)), None);
    }

    #[test]
    fn hidden_menu_hits_nothing() {
        let mut menu = rendered_menu(Point::new(10, 5));
        menu.hide();
        assert_eq!(menu.hit_test(Point::new(12, 6)), None);
    }

    #[test]
    fn shortcuts() {
        assert_eq!(MenuAction::from_key('a'), Some(MenuAction::Ask));
        assert_eq!(MenuAction::from_key('q'), None);
    }
}
