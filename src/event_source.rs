use anyhow::Result;
pub use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::time::Duration;

/// Trait for abstracting event sources to enable testing
pub trait EventSource {
    /// Poll for events with a timeout
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    /// Read the next event
    fn read(&mut self) -> Result<Event>;
}

/// Real terminal event source using crossterm
pub struct TerminalEventSource;

impl EventSource for TerminalEventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool> {
        Ok(crossterm::event::poll(timeout)?)
    }

    fn read(&mut self) -> Result<Event> {
        Ok(crossterm::event::read()?)
    }
}

/// Simulated event source for testing
pub struct SimulatedEventSource {
    pub(crate) events: Vec<Event>,
    current_index: usize,
}

impl SimulatedEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            current_index: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.events.len()
    }

    /// Helper method to create a key event
    pub fn key_event(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: crossterm::event::KeyEventKind::Press,
            state: crossterm::event::KeyEventState::empty(),
        })
    }

    /// Helper method to create a simple character key event
    pub fn char_key(c: char) -> Event {
        Self::key_event(KeyCode::Char(c), KeyModifiers::empty())
    }

    /// Helper method to create a Ctrl+char key event
    pub fn ctrl_char_key(c: char) -> Event {
        Self::key_event(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    pub fn mouse_event(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::empty(),
        })
    }

    /// Left button pressed at a cell
    pub fn mouse_down(column: u16, row: u16) -> Event {
        Self::mouse_event(MouseEventKind::Down(MouseButton::Left), column, row)
    }

    /// Pointer moved with the left button held
    pub fn mouse_drag(column: u16, row: u16) -> Event {
        Self::mouse_event(MouseEventKind::Drag(MouseButton::Left), column, row)
    }

    /// Left button released at a cell
    pub fn mouse_up(column: u16, row: u16) -> Event {
        Self::mouse_event(MouseEventKind::Up(MouseButton::Left), column, row)
    }

    pub fn scroll_down(column: u16, row: u16) -> Event {
        Self::mouse_event(MouseEventKind::ScrollDown, column, row)
    }

    pub fn scroll_up(column: u16, row: u16) -> Event {
        Self::mouse_event(MouseEventKind::ScrollUp, column, row)
    }

    /// Press, drag and release: a complete selection gesture
    pub fn drag_select(from: (u16, u16), to: (u16, u16)) -> Vec<Event> {
        vec![
            Self::mouse_down(from.0, from.1),
            Self::mouse_drag(to.0, to.1),
            Self::mouse_up(to.0, to.1),
        ]
    }

    /// One key event per character
    pub fn type_text(text: &str) -> Vec<Event> {
        text.chars().map(Self::char_key).collect()
    }
}

impl EventSource for SimulatedEventSource {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(self.current_index < self.events.len())
    }

    fn read(&mut self) -> Result<Event> {
        if self.current_index < self.events.len() {
            let event = self.events[self.current_index].clone();
            self.current_index += 1;
            Ok(event)
        } else {
            // Quit once the script has run out; Ctrl+C works with any focus
            Ok(SimulatedEventSource::ctrl_char_key('c'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_event_source() {
        let mut events = vec![SimulatedEventSource::char_key('j')];
        events.extend(SimulatedEventSource::drag_select((1, 2), (5, 2)));

        let mut source = SimulatedEventSource::new(events);

        assert!(source.poll(Duration::from_millis(0)).unwrap());

        if let Event::Key(key) = source.read().unwrap() {
            assert_eq!(key.code, KeyCode::Char('j'));
            assert!(key.modifiers.is_empty());
        }

        match source.read().unwrap() {
            Event::Mouse(mouse) => {
                assert_eq!(mouse.kind, MouseEventKind::Down(MouseButton::Left));
                assert_eq!((mouse.column, mouse.row), (1, 2));
            }
            other => panic!("expected mouse event, got {other:?}"),
        }

        source.read().unwrap();
        source.read().unwrap();
        assert!(source.is_exhausted());
        assert!(!source.poll(Duration::from_millis(0)).unwrap());

        if let Event::Key(key) = source.read().unwrap() {
            assert!(key.modifiers.contains(KeyModifiers::CONTROL));
        }
    }
}
