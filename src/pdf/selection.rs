//! Raw text selection on the document text layer
//!
//! This is the reader's equivalent of a platform selection: it only records
//! where the pointer went down and where it is now. Deciding whether that
//! amounts to a usable selection is the selection tracker's job, done once
//! on pointer-up through [`TextSelection::snapshot`].

use crate::geometry::{Point, ScreenRect};

use super::text_layer::{LayerPos, TextLayer};

/// A point in the selection with both screen and layer coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionPoint {
    /// Where the pointer was, in terminal cells
    pub screen: Point,
    /// The layer cell it maps to (clamped onto the layer)
    pub layer: LayerPos,
}

/// Text selection state
#[derive(Clone, Debug, Default)]
pub struct TextSelection {
    /// Where the selection started
    pub anchor: Option<SelectionPoint>,
    /// Where the selection currently ends
    pub focus: Option<SelectionPoint>,
    /// Whether the pointer is still down
    pub is_selecting: bool,
}

/// What the selection looks like at the moment it is read
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionSnapshot {
    /// Selected text, untrimmed
    pub text: String,
    /// Whether anchor and focus are the same cell
    pub collapsed: bool,
    /// Screen cell where the selection started
    pub anchor: Point,
    /// Screen rectangle covering the selected glyphs
    pub bounds: Option<ScreenRect>,
}

/// Maps layer rows/columns onto the screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerMapping {
    /// Screen column of layer column 0
    pub origin_x: i32,
    /// Screen row of layer row `scroll`
    pub origin_y: i32,
    /// First visible layer row
    pub scroll: usize,
    /// Visible rows
    pub visible_rows: u16,
}

impl LayerMapping {
    /// Screen point to layer position, clamped onto the visible part of the layer
    #[must_use]
    pub fn to_layer(&self, layer: &TextLayer, screen: Point) -> LayerPos {
        let max_row_offset = i32::from(self.visible_rows.max(1)) - 1;
        let row_offset = (screen.y - self.origin_y).clamp(0, max_row_offset) as usize;
        let col = (screen.x - self.origin_x).max(0) as usize;
        layer.clamp(LayerPos::new(self.scroll + row_offset, col))
    }

    /// Layer position to screen point (may be off-screen)
    #[must_use]
    pub fn to_screen(&self, pos: LayerPos) -> Point {
        Point::new(
            self.origin_x + pos.col as i32,
            self.origin_y + pos.row as i32 - self.scroll as i32,
        )
    }
}

impl TextSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start selection at a point
    pub fn start_at(&mut self, point: SelectionPoint) {
        self.anchor = Some(point);
        self.focus = Some(point);
        self.is_selecting = true;
    }

    /// Update the end point during selection
    pub fn update_focus(&mut self, point: SelectionPoint) {
        if self.is_selecting {
            self.focus = Some(point);
        }
    }

    /// Finish selection
    pub fn finish(&mut self) {
        self.is_selecting = false;
    }

    /// Clear selection
    pub fn clear(&mut self) {
        self.anchor = None;
        self.focus = None;
        self.is_selecting = false;
    }

    /// Check if there is an active selection
    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.anchor.is_some() && self.focus.is_some()
    }

    /// Get ordered selection bounds (start before end)
    #[must_use]
    pub fn ordered_bounds(&self) -> Option<(LayerPos, LayerPos)> {
        match (self.anchor, self.focus) {
            (Some(anchor), Some(focus)) => {
                if anchor.layer <= focus.layer {
                    Some((anchor.layer, focus.layer))
                } else {
                    Some((focus.layer, anchor.layer))
                }
            }
            _ => None,
        }
    }

    /// Whether a layer cell is inside a non-collapsed selection
    #[must_use]
    pub fn contains(&self, pos: LayerPos) -> bool {
        match self.ordered_bounds() {
            Some((start, end)) if start != end => start <= pos && pos <= end,
            _ => false,
        }
    }

    /// Read the selection against the current layer and mapping
    #[must_use]
    pub fn snapshot(&self, layer: &TextLayer, mapping: &LayerMapping) -> Option<SelectionSnapshot> {
        let (anchor, focus) = (self.anchor?, self.focus?);
        let collapsed = anchor.layer == focus.layer;

        if collapsed {
            return Some(SelectionSnapshot {
                text: String::new(),
                collapsed,
                anchor: anchor.screen,
                bounds: None,
            });
        }

        let text = layer.text_between(anchor.layer, focus.layer);
        let bounds = layer.span_between(anchor.layer, focus.layer).map(|span| {
            let top_left = mapping.to_screen(LayerPos::new(span.top, span.left));
            ScreenRect::new(
                top_left.x,
                top_left.y,
                (span.right - span.left) as i32,
                (span.bottom - span.top) as i32,
            )
        });

        Some(SelectionSnapshot {
            text,
            collapsed,
            anchor: anchor.screen,
            bounds,
        })
    }
}
