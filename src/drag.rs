//! Pointer-drag state machine for movable overlays

use crate::geometry::Point;

/// `Idle` until a grab, `Dragging` until the pointer is released.
///
/// Pointer moves are only interpreted while dragging; an idle overlay does
/// not look at them at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        /// Pointer position relative to the overlay's top-left at grab time
        grab_offset: Point,
    },
}

impl DragState {
    /// Grab the overlay whose top-left is `top_left` at `pointer`
    pub fn begin(&mut self, pointer: Point, top_left: Point) {
        *self = DragState::Dragging {
            grab_offset: pointer.minus(top_left),
        };
    }

    /// New top-left for the overlay, or `None` when not dragging
    #[must_use]
    pub fn drag_to(&self, pointer: Point) -> Option<Point> {
        match self {
            DragState::Idle => None,
            DragState::Dragging { grab_offset } => Some(pointer.minus(*grab_offset)),
        }
    }

    /// Release; returns whether a drag was in progress
    pub fn end(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        *self = DragState::Idle;
        was_dragging
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self, DragState::Dragging { .. })
    }
}
