//! Screen-space primitives shared by the overlays.
//!
//! Overlay positions are kept as signed cell coordinates: a dragged dialog
//! can legitimately sit partly off-screen, so nothing here is clamped until
//! the moment a rectangle is handed to ratatui.

use ratatui::layout::Rect;

/// A point in terminal cell coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn from_cell(column: u16, row: u16) -> Self {
        Self::new(i32::from(column), i32::from(row))
    }

    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    #[must_use]
    pub const fn minus(self, other: Point) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Axis-aligned rectangle in terminal cell coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScreenRect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenRect {
    #[must_use]
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    #[must_use]
    pub const fn right(&self) -> i32 {
        self.left + self.width
    }

    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.top + self.height
    }

    #[must_use]
    pub const fn horizontal_center(&self) -> i32 {
        self.left + self.width / 2
    }
}

/// Whether `rect` contains the point (half-open on the right and bottom)
#[must_use]
pub fn rect_contains(rect: Rect, point: Point) -> bool {
    point.x >= i32::from(rect.x)
        && point.y >= i32::from(rect.y)
        && point.x < i32::from(rect.x) + i32::from(rect.width)
        && point.y < i32::from(rect.y) + i32::from(rect.height)
}

/// Place a `width` x `height` box with its top-left at `origin`, shifted so
/// it stays inside `bounds`. The box shrinks only when `bounds` is smaller.
#[must_use]
pub fn place_within(origin: Point, width: u16, height: u16, bounds: Rect) -> Rect {
    let width = width.min(bounds.width);
    let height = height.min(bounds.height);

    let max_x = i32::from(bounds.x) + i32::from(bounds.width) - i32::from(width);
    let max_y = i32::from(bounds.y) + i32::from(bounds.height) - i32::from(height);

    let x = origin.x.clamp(i32::from(bounds.x), max_x.max(i32::from(bounds.x)));
    let y = origin.y.clamp(i32::from(bounds.y), max_y.max(i32::from(bounds.y)));

    Rect::new(x as u16, y as u16, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_is_half_open() {
        let rect = Rect::new(10, 5, 4, 2);
        assert!(rect_contains(rect, Point::new(10, 5)));
        assert!(rect_contains(rect, Point::new(13, 6)));
        assert!(!rect_contains(rect, Point::new(14, 6)));
        assert!(!rect_contains(rect, Point::new(13, 7)));
        assert!(!rect_contains(rect, Point::new(-1, 5)));
    }

    #[test]
    fn place_within_shifts_into_bounds() {
        let bounds = Rect::new(0, 0, 80, 24);

        let placed = place_within(Point::new(75, 22), 20, 5, bounds);
        assert_eq!(placed, Rect::new(60, 19, 20, 5));

        let placed = place_within(Point::new(-30, -2), 20, 5, bounds);
        assert_eq!(placed, Rect::new(0, 0, 20, 5));
    }

    #[test]
    fn place_within_shrinks_oversized_box() {
        let bounds = Rect::new(0, 0, 10, 4);
        let placed = place_within(Point::new(3, 3), 40, 10, bounds);
        assert_eq!(placed, Rect::new(0, 0, 10, 4));
    }

    #[test]
    fn screen_rect_center_and_edges() {
        let rect = ScreenRect::new(10, 4, 9, 2);
        assert_eq!(rect.horizontal_center(), 14);
        assert_eq!(rect.right(), 19);
        assert_eq!(rect.bottom(), 6);
    }
}
