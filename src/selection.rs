//! Selection tracker
//!
//! Validates the raw selection at pointer-up and keeps the
//! `(text, anchor)` pair the floating menu is positioned from. `anchor` is
//! set exactly when `text` is non-empty; the fields are private so nothing
//! else can break that.

use log::debug;
use ratatui::layout::Rect;

use crate::geometry::{Point, rect_contains};
use crate::pdf::SelectionSnapshot;

/// Rows between the bottom of the selection and the floating menu
pub const DEFAULT_MENU_OFFSET: i32 = 1;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    text: String,
    anchor: Option<Point>,
}

impl SelectionState {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn anchor(&self) -> Option<Point> {
        self.anchor
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.text.is_empty() && self.anchor.is_some()
    }

    /// Set a selection; empty text clears instead
    pub fn set(&mut self, text: impl Into<String>, anchor: Point) {
        let text = text.into();
        if text.is_empty() {
            self.clear();
            return;
        }
        self.text = text;
        self.anchor = Some(anchor);
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.anchor = None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackOutcome {
    /// A usable selection was recorded
    Selected,
    /// Nothing usable; the selection state is now empty
    Cleared,
}

/// Turns pointer-up snapshots into [`SelectionState`]
#[derive(Clone, Copy, Debug)]
pub struct SelectionTracker {
    menu_offset: i32,
}

impl SelectionTracker {
    #[must_use]
    pub fn new(menu_offset: i32) -> Self {
        Self { menu_offset }
    }

    /// Validate `snapshot` and update `state`.
    ///
    /// Missing, collapsed, whitespace-only, or outside-anchored selections
    /// clear the state. Otherwise the text is trimmed and the anchor placed
    /// under the horizontal middle of the selection's bounds.
    pub fn on_pointer_up(
        &self,
        snapshot: Option<&SelectionSnapshot>,
        viewport: Rect,
        state: &mut SelectionState,
    ) -> TrackOutcome {
        let Some(snapshot) = snapshot else {
            state.clear();
            return TrackOutcome::Cleared;
        };

        if snapshot.collapsed {
            state.clear();
            return TrackOutcome::Cleared;
        }

        let text = snapshot.text.trim();
        if text.is_empty() {
            state.clear();
            return TrackOutcome::Cleared;
        }

        if !rect_contains(viewport, snapshot.anchor) {
            debug!("Selection anchored outside the viewport, ignoring");
            state.clear();
            return TrackOutcome::Cleared;
        }

        let Some(bounds) = snapshot.bounds else {
            state.clear();
            return TrackOutcome::Cleared;
        };

        let anchor = Point::new(bounds.horizontal_center(), bounds.bottom() + self.menu_offset);
        state.set(text, anchor);
        debug!("Selected {} chars, menu at {anchor:?}", text.chars().count());
        TrackOutcome::Selected
    }
}

impl Default for SelectionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MENU_OFFSET)
    }
}
