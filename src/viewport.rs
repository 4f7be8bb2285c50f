//! Page width tracking for the document viewport

use crate::pdf::CellSize;

/// Upper bound for the page render width, in pixels
pub const DEFAULT_MAX_RENDER_WIDTH: u32 = 800;

/// Observes the viewport width and derives the page render width
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportSizing {
    observed_width: Option<u32>,
    max_width: u32,
    cell_size: CellSize,
}

impl ViewportSizing {
    #[must_use]
    pub fn new(max_width: u32, cell_size: CellSize) -> Self {
        Self {
            observed_width: None,
            max_width: max_width.max(1),
            cell_size,
        }
    }

    /// Record the viewport content width in columns.
    ///
    /// Returns true when the observed pixel width changed.
    pub fn observe_columns(&mut self, columns: u16) -> bool {
        let width_px = u32::from(columns) * u32::from(self.cell_size.width);
        self.observe(width_px)
    }

    /// Record the viewport content width in pixels
    pub fn observe(&mut self, width_px: u32) -> bool {
        if self.observed_width == Some(width_px) {
            return false;
        }
        self.observed_width = Some(width_px);
        true
    }

    /// Update the cell size after a terminal resize
    pub fn set_cell_size(&mut self, cell_size: CellSize) -> bool {
        if self.cell_size == cell_size {
            return false;
        }
        self.cell_size = cell_size;
        self.observed_width = None;
        true
    }

    #[must_use]
    pub fn observed_width(&self) -> Option<u32> {
        self.observed_width
    }

    #[must_use]
    pub fn cell_size(&self) -> CellSize {
        self.cell_size
    }

    /// `min(observed, max)`, or `max` before anything was observed
    #[must_use]
    pub fn render_width(&self) -> u32 {
        match self.observed_width {
            Some(observed) => observed.min(self.max_width),
            None => self.max_width,
        }
    }
}

impl Default for ViewportSizing {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RENDER_WIDTH, CellSize::FALLBACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_width_before_first_observation() {
        let sizing = ViewportSizing::default();
        assert_eq!(sizing.observed_width(), None);
        assert_eq!(sizing.render_width(), 800);
    }

    #[test]
    fn render_width_is_capped() {
        let mut sizing = ViewportSizing::default();
        assert!(sizing.observe(1200));
        assert_eq!(sizing.render_width(), 800);

        assert!(sizing.observe(640));
        assert_eq!(sizing.render_width(), 640);
    }

    #[test]
    fn repeated_observation_reports_no_change() {
        let mut sizing = ViewportSizing::default();
        assert!(sizing.observe_columns(80));
        assert!(!sizing.observe_columns(80));
        assert_eq!(sizing.observed_width(), Some(640));
    }

    #[test]
    fn cell_size_change_resets_observation() {
        let mut sizing = ViewportSizing::new(800, CellSize::new(8, 16));
        sizing.observe_columns(50);
        assert!(sizing.set_cell_size(CellSize::new(10, 20)));
        assert_eq!(sizing.observed_width(), None);
        assert!(!sizing.set_cell_size(CellSize::new(10, 20)));
    }
}
