//! Terminal text layer for a document
//!
//! Each PDF line becomes one row of cells. Lines sharing a baseline are
//! merged when they do not overlap, and a blank row marks a vertical gap
//! larger than a line. Wide glyphs take two cells; the second cell holds
//! [`WIDE_TAIL`].

use unicode_width::UnicodeWidthChar;

use super::types::{CellSize, LineBounds, LoadedDocument, PageText};

/// Placeholder occupying the second cell of a double-width glyph
pub const WIDE_TAIL: char = '\0';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowKind {
    /// Text belonging to a page (0-indexed)
    Text { page: usize },
    /// Vertical gap inside a page
    Blank,
    /// Separator drawn before a page (0-indexed)
    PageBreak { page: usize },
}

#[derive(Clone, Debug)]
pub struct LayerRow {
    pub kind: RowKind,
    pub cells: Vec<char>,
}

impl LayerRow {
    fn empty(kind: RowKind, width: usize) -> Self {
        Self {
            kind,
            cells: vec![' '; width],
        }
    }

    /// Printable text of the row, wide tails removed
    #[must_use]
    pub fn text(&self) -> String {
        self.cells.iter().filter(|c| **c != WIDE_TAIL).collect()
    }

    fn is_free(&self, from: usize, len: usize) -> bool {
        let end = (from + len).min(self.cells.len());
        self.cells[from.min(end)..end].iter().all(|c| *c == ' ')
    }

    fn last_content_col(&self) -> Option<usize> {
        self.cells.iter().rposition(|c| *c != ' ')
    }
}

/// A position inside the text layer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct LayerPos {
    pub row: usize,
    pub col: usize,
}

impl LayerPos {
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Cell extent of a selection inside the layer (right/bottom exclusive)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerSpan {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

/// Laid-out text of a whole document at a fixed width
#[derive(Clone, Debug, Default)]
pub struct TextLayer {
    rows: Vec<LayerRow>,
    width: u16,
}

impl TextLayer {
    /// Lay out `doc` for a page width of `render_width_px` pixels
    #[must_use]
    pub fn build(doc: &LoadedDocument, render_width_px: u32, cell: CellSize) -> Self {
        let width = (render_width_px / u32::from(cell.width.max(1))).max(1);
        let width = u16::try_from(width).unwrap_or(u16::MAX);
        let mut rows = Vec::new();

        for (page_idx, page) in doc.pages.iter().enumerate() {
            if page_idx > 0 {
                rows.push(page_break_row(page_idx, usize::from(width)));
            }
            layout_page(page, page_idx, usize::from(width), &mut rows);
        }

        Self { rows, width }
    }

    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn row(&self, idx: usize) -> Option<&LayerRow> {
        self.rows.get(idx)
    }

    /// Clamp an arbitrary position onto the layer and off wide-glyph tails
    #[must_use]
    pub fn clamp(&self, pos: LayerPos) -> LayerPos {
        let row = pos.row.min(self.rows.len().saturating_sub(1));
        let mut col = pos.col.min(usize::from(self.width).saturating_sub(1));
        if let Some(layer_row) = self.rows.get(row) {
            while col > 0 && layer_row.cells.get(col) == Some(&WIDE_TAIL) {
                col -= 1;
            }
        }
        LayerPos::new(row, col)
    }

    /// Text between two positions, both inclusive, in reading order.
    ///
    /// Rows are joined with newlines and right-trimmed; page separators are
    /// skipped and in-page gaps become empty lines.
    #[must_use]
    pub fn text_between(&self, a: LayerPos, b: LayerPos) -> String {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        let mut lines: Vec<String> = Vec::new();

        for row_idx in start.row..=end.row.min(self.rows.len().saturating_sub(1)) {
            let row = &self.rows[row_idx];
            match row.kind {
                RowKind::PageBreak { .. } => continue,
                RowKind::Blank => {
                    lines.push(String::new());
                    continue;
                }
                RowKind::Text { .. } => {}
            }

            let (from, to) = row_range(row, row_idx, start, end);
            let text: String = row.cells[from..to]
                .iter()
                .filter(|c| **c != WIDE_TAIL)
                .collect();
            lines.push(text.trim_end().to_string());
        }

        lines.join("\n")
    }

    /// Cells actually covered by text between two positions.
    ///
    /// Returns `None` when the range covers no visible glyph.
    #[must_use]
    pub fn span_between(&self, a: LayerPos, b: LayerPos) -> Option<LayerSpan> {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        let mut span: Option<LayerSpan> = None;

        for row_idx in start.row..=end.row.min(self.rows.len().saturating_sub(1)) {
            let row = &self.rows[row_idx];
            if !matches!(row.kind, RowKind::Text { .. }) {
                continue;
            }

            let (from, to) = row_range(row, row_idx, start, end);
            let slice = &row.cells[from..to];
            let Some(first) = slice.iter().position(|c| *c != ' ' && *c != WIDE_TAIL) else {
                continue;
            };
            let last = slice
                .iter()
                .rposition(|c| *c != ' ')
                .unwrap_or(first);

            let left = from + first;
            let right = from + last + 1;
            span = Some(match span {
                None => LayerSpan {
                    top: row_idx,
                    bottom: row_idx + 1,
                    left,
                    right,
                },
                Some(s) => LayerSpan {
                    top: s.top,
                    bottom: row_idx + 1,
                    left: s.left.min(left),
                    right: s.right.max(right),
                },
            });
        }

        span
    }
}

fn row_range(row: &LayerRow, row_idx: usize, start: LayerPos, end: LayerPos) -> (usize, usize) {
    let len = row.cells.len();
    let mut from = if row_idx == start.row {
        start.col.min(len)
    } else {
        0
    };
    while from > 0 && from < len && row.cells[from] == WIDE_TAIL {
        from -= 1;
    }
    let mut to = if row_idx == end.row {
        (end.col + 1).min(len)
    } else {
        len
    };
    // Keep the tail of a wide glyph together with its head
    while to < len && row.cells[to] == WIDE_TAIL {
        to += 1;
    }
    (from, to.max(from))
}

fn page_break_row(page_idx: usize, width: usize) -> LayerRow {
    let mut row = LayerRow::empty(RowKind::PageBreak { page: page_idx }, width);
    let label = format!(" {} ", page_idx + 1);
    let label_len = label.chars().count();
    for cell in row.cells.iter_mut() {
        *cell = '─';
    }
    if label_len < width {
        let start = (width - label_len) / 2;
        for (i, c) in label.chars().enumerate() {
            row.cells[start + i] = c;
        }
    }
    row
}

fn layout_page(page: &PageText, page_idx: usize, width: usize, rows: &mut Vec<LayerRow>) {
    if page.lines.is_empty() || page.width <= 0.0 {
        rows.push(LayerRow::empty(RowKind::Blank, width));
        return;
    }

    let cols_per_pt = width as f32 / page.width;

    let mut lines: Vec<&LineBounds> = page.lines.iter().collect();
    lines.sort_by(|a, b| {
        a.y0.partial_cmp(&b.y0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut previous: Option<&LineBounds> = None;

    for line in lines {
        let start_col = ((line.x0.max(0.0) * cols_per_pt) as usize).min(width - 1);
        let glyph_cols: usize = line
            .chars
            .iter()
            .map(|ch| ch.c.width().unwrap_or(0))
            .sum();

        let joins_previous = previous.is_some_and(|prev| shares_baseline(prev, line))
            && rows.last().is_some_and(|row| {
                let after_content = row.last_content_col().map_or(0, |c| c + 2);
                row.is_free(start_col.max(after_content), glyph_cols)
                    && start_col.max(after_content) < width
            });

        if !joins_previous {
            if let Some(prev) = previous {
                let gap = line.y0 - prev.y1;
                if gap > prev.height().max(line.height()) * 0.8 {
                    rows.push(LayerRow::empty(RowKind::Blank, width));
                }
            }
            rows.push(LayerRow::empty(RowKind::Text { page: page_idx }, width));
        }

        let Some(row) = rows.last_mut() else {
            continue;
        };
        let mut col = if joins_previous {
            start_col.max(row.last_content_col().map_or(0, |c| c + 2))
        } else {
            start_col
        };

        for ch in &line.chars {
            let w = ch.c.width().unwrap_or(0);
            if w == 0 {
                continue;
            }
            if col + w > width {
                break;
            }
            row.cells[col] = ch.c;
            if w == 2 {
                row.cells[col + 1] = WIDE_TAIL;
            }
            col += w;
        }

        previous = Some(line);
    }
}

fn shares_baseline(a: &LineBounds, b: &LineBounds) -> bool {
    let overlap = a.y1.min(b.y1) - a.y0.max(b.y0);
    overlap > a.height().min(b.height()) * 0.5
}

/// Left padding that centers a layer of `layer_width` inside `viewport_width`
#[must_use]
pub fn centering_offset(viewport_width: u16, layer_width: u16) -> u16 {
    viewport_width.saturating_sub(layer_width) / 2
}
