use unicode_segmentation::UnicodeSegmentation;

use crate::syntax::SyntaxState;

/// Char offsets where each grapheme cluster of `text` starts.
pub fn glyph_positions(text: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut chars = 0;
    for glyph in text.graphemes(true) {
        positions.push(chars);
        chars += glyph.chars().count();
    }
    positions
}

/// One line of a document, without its line break.
///
/// Only the owning [`Document`](super::Document) mutates lines, so the
/// accessors here assume the caller already holds the document lock.
#[derive(Debug, Clone, Default)]
pub struct DocumentLine {
    text: String,
    char_count: usize,
    /// Char offset of each glyph start.
    glyph_positions: Vec<usize>,
    /// Byte offset of each glyph start, parallel to `glyph_positions`.
    glyph_bytes: Vec<usize>,
    /// Start column of each glyph; only meaningful while `columns_generation`
    /// matches the document's metrics generation.
    glyph_columns: Vec<usize>,
    columns: usize,
    columns_generation: Option<u64>,
    syntax_state: SyntaxState,
}

impl DocumentLine {
    pub fn new(text: &str) -> Self {
        let mut line = Self::default();
        line.set_text(text);
        line
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.glyph_positions.clear();
        self.glyph_bytes.clear();
        let mut chars = 0;
        for (byte, glyph) in self.text.grapheme_indices(true) {
            self.glyph_positions.push(chars);
            self.glyph_bytes.push(byte);
            chars += glyph.chars().count();
        }
        self.char_count = chars;
        self.invalidate_columns();
    }

    pub fn glyph_count(&self) -> usize {
        self.glyph_positions.len()
    }

    pub fn glyph_positions(&self) -> &[usize] {
        &self.glyph_positions
    }

    pub fn glyph_start(&self, glyph: usize) -> usize {
        self.glyph_positions[glyph]
    }

    pub fn glyph_end(&self, glyph: usize) -> usize {
        self.glyph_positions
            .get(glyph + 1)
            .copied()
            .unwrap_or(self.char_count)
    }

    pub fn glyph(&self, glyph: usize) -> &str {
        let start = self.glyph_bytes[glyph];
        let end = self
            .glyph_bytes
            .get(glyph + 1)
            .copied()
            .unwrap_or(self.text.len());
        &self.text[start..end]
    }

    /// Index of the glyph containing char offset `ch`, or the glyph count
    /// when `ch` is at or past the end of the line.
    pub fn char_to_glyph_index(&self, ch: usize) -> usize {
        if ch >= self.char_count {
            return self.glyph_count();
        }
        match self.glyph_positions.binary_search(&ch) {
            Ok(glyph) => glyph,
            Err(next) => next - 1,
        }
    }

    pub fn columns_valid(&self, generation: u64) -> bool {
        self.columns_generation == Some(generation)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn glyph_columns(&self) -> &[usize] {
        &self.glyph_columns
    }

    pub fn set_columns(&mut self, columns: usize, glyph_columns: Vec<usize>, generation: u64) {
        self.columns = columns;
        self.glyph_columns = glyph_columns;
        self.columns_generation = Some(generation);
    }

    pub fn invalidate_columns(&mut self) {
        self.columns_generation = None;
        self.glyph_columns.clear();
    }

    pub fn syntax_state(&self) -> &SyntaxState {
        &self.syntax_state
    }

    pub fn set_syntax_state(&mut self, state: SyntaxState) {
        self.syntax_state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_partition() {
        // "e" + combining acute is one glyph of two chars
        let line = DocumentLine::new("ae\u{301}日");
        assert_eq!(line.char_count(), 4);
        assert_eq!(line.glyph_positions(), &[0, 1, 3]);
        assert_eq!(line.glyph(1), "e\u{301}");
        assert_eq!(line.glyph_end(1), 3);
        assert_eq!(line.glyph_end(2), 4);
    }

    #[test]
    fn test_char_to_glyph_index_inside_cluster() {
        let line = DocumentLine::new("ae\u{301}x");
        assert_eq!(line.char_to_glyph_index(0), 0);
        assert_eq!(line.char_to_glyph_index(1), 1);
        assert_eq!(line.char_to_glyph_index(2), 1);
        assert_eq!(line.char_to_glyph_index(3), 2);
        assert_eq!(line.char_to_glyph_index(4), 3);
        assert_eq!(line.char_to_glyph_index(10), 3);
    }

    #[test]
    fn test_edit_invalidates_columns() {
        let mut line = DocumentLine::new("abc");
        line.set_columns(3, vec![0, 1, 2], 7);
        assert!(line.columns_valid(7));
        assert!(!line.columns_valid(8));

        line.set_text("abcd");
        assert!(!line.columns_valid(7));
        assert!(line.glyph_columns().is_empty());
    }

    #[test]
    fn test_free_glyph_positions() {
        assert_eq!(glyph_positions("a\r\nb"), vec![0, 1, 3]);
        assert!(glyph_positions("").is_empty());
    }
}
