//! Core types for PDF text layers

use std::path::PathBuf;
use std::sync::Arc;

/// Character position information for text extraction
#[derive(Clone, Debug)]
pub struct CharInfo {
    /// X coordinate in page points
    pub x: f32,
    /// The character
    pub c: char,
}

/// Line bounding box with character information
#[derive(Clone, Debug)]
pub struct LineBounds {
    /// Left edge X coordinate
    pub x0: f32,
    /// Top edge Y coordinate
    pub y0: f32,
    /// Right edge X coordinate
    pub x1: f32,
    /// Bottom edge Y coordinate
    pub y1: f32,
    /// Characters in this line with their positions
    pub chars: Vec<CharInfo>,
}

impl LineBounds {
    /// Build a line from plain text, spreading glyphs evenly over `x0..x1`
    #[must_use]
    pub fn from_text(text: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        let count = text.chars().count().max(1) as f32;
        let step = (x1 - x0) / count;
        let chars = text
            .chars()
            .enumerate()
            .map(|(i, c)| CharInfo {
                x: x0 + step * i as f32,
                c,
            })
            .collect();

        Self {
            x0,
            y0,
            x1,
            y1,
            chars,
        }
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }
}

/// Extracted text of a single page
#[derive(Clone, Debug, Default)]
pub struct PageText {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Text lines in page coordinates
    pub lines: Vec<LineBounds>,
}

/// Where a document comes from
#[derive(Clone, Debug, Default)]
pub enum DocumentSource {
    /// A file on disk
    Path(PathBuf),
    /// A document held in memory (e.g. read from stdin)
    Bytes { name: String, data: Arc<[u8]> },
    /// No document chosen
    #[default]
    None,
}

impl DocumentSource {
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            DocumentSource::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            DocumentSource::Bytes { name, .. } => name.clone(),
            DocumentSource::None => String::new(),
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, DocumentSource::None)
    }
}

/// A parsed document ready for layout
#[derive(Clone, Debug, Default)]
pub struct LoadedDocument {
    pub page_count: usize,
    pub title: Option<String>,
    pub pages: Vec<PageText>,
}

/// Terminal cell dimensions in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellSize {
    pub width: u16,
    pub height: u16,
}

impl CellSize {
    /// Used when the terminal does not report its pixel size
    pub const FALLBACK: CellSize = CellSize::new(8, 16);

    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Derive the cell size from a terminal window size report
    #[must_use]
    pub fn from_window(columns: u16, rows: u16, width_px: u16, height_px: u16) -> Self {
        if columns == 0 || rows == 0 || width_px == 0 || height_px == 0 {
            return Self::FALLBACK;
        }
        let width = (width_px / columns).max(1);
        let height = (height_px / rows).max(1);
        Self::new(width, height)
    }
}

impl Default for CellSize {
    fn default() -> Self {
        Self::FALLBACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_size_falls_back_without_pixel_report() {
        assert_eq!(CellSize::from_window(80, 24, 0, 0), CellSize::FALLBACK);
        assert_eq!(CellSize::from_window(100, 50, 1000, 1000), CellSize::new(10, 20));
    }

    #[test]
    fn display_name_uses_file_name() {
        let source = DocumentSource::Path(PathBuf::from("/tmp/papers/attention.pdf"));
        assert_eq!(source.display_name(), "attention.pdf");

        let source = DocumentSource::Bytes {
            name: "stdin".to_string(),
            data: Arc::from(Vec::new()),
        };
        assert_eq!(source.display_name(), "stdin");
        assert!(DocumentSource::None.is_none());
    }

    #[test]
    fn line_from_text_spreads_glyphs() {
        let line = LineBounds::from_text("abcd", 0.0, 10.0, 40.0, 22.0);
        let xs: Vec<f32> = line.chars.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![0.0, 10.0, 20.0, 30.0]);
        assert!((line.height() - 12.0).abs() < f32::EPSILON);
    }
}
