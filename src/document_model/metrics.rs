use std::fmt;
use unicode_width::UnicodeWidthStr;

/// Font metrics provider used for column layout.
///
/// Widths are in the provider's own units (pixels for a GUI font, cells for
/// a terminal). A glyph occupies `ceil(width / cell_width)` columns, and never
/// less than one.
pub trait FontMetrics: fmt::Debug + Send + Sync {
    /// Width of one column.
    fn cell_width(&self) -> u32;

    /// Width of a single ASCII character.
    fn ascii_width(&self, ch: char) -> u32;

    /// Width of a non-ASCII glyph (one grapheme cluster).
    fn glyph_width(&self, glyph: &str) -> u32;

    fn glyph_columns(&self, glyph: &str) -> usize {
        let cell = self.cell_width().max(1);
        let width = match glyph.chars().next() {
            Some(ch) if glyph.len() == 1 => self.ascii_width(ch),
            _ => self.glyph_width(glyph),
        };
        (width.div_ceil(cell) as usize).max(1)
    }
}

/// Terminal-style metrics: one cell per ASCII character, East Asian wide
/// glyphs take two cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellMetrics;

impl FontMetrics for CellMetrics {
    fn cell_width(&self) -> u32 {
        1
    }

    fn ascii_width(&self, _ch: char) -> u32 {
        1
    }

    fn glyph_width(&self, glyph: &str) -> u32 {
        glyph.width() as u32
    }
}
