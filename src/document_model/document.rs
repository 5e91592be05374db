use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use unicode_segmentation::UnicodeSegmentation;

use super::encoding::{self, Encoding};
use super::line::{self, DocumentLine};
use super::metrics::{CellMetrics, FontMetrics};
use crate::error::{DocumentError, Result};
use crate::syntax::SyntaxState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Unix,    // \n (LF)
    Windows, // \r\n (CRLF)
    Mac,     // \r (CR)
}

impl LineEnding {
    pub fn system_default() -> Self {
        if cfg!(windows) {
            LineEnding::Windows
        } else {
            LineEnding::Unix
        }
    }

    /// Convention of the first line break in `content`, if any.
    pub fn detect(content: &str) -> Option<Self> {
        let mut chars = content.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\n' => return Some(LineEnding::Unix),
                '\r' if chars.peek() == Some(&'\n') => return Some(LineEnding::Windows),
                '\r' => return Some(LineEnding::Mac),
                _ => {}
            }
        }
        None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Unix => "\n",
            LineEnding::Windows => "\r\n",
            LineEnding::Mac => "\r",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "unix" | "lf" => Some(LineEnding::Unix),
            "dos" | "windows" | "crlf" => Some(LineEnding::Windows),
            "mac" | "cr" => Some(LineEnding::Mac),
            _ => None,
        }
    }
}

/// Split text on any line break (LF, CRLF or CR). Empty text has no lines.
pub fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            '\n' => lines.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    lines.push(current);
    lines
}

/// Change notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// The outermost update scope opened.
    Changing,
    /// The outermost update scope closed.
    Changed,
    Cleared,
    Inserted { start: usize, count: usize },
    Deleted { start: usize, count: usize },
    Put { start: usize, count: usize },
}

type Listener = Arc<dyn Fn(&DocumentEvent) + Send + Sync>;

struct DocumentState {
    lines: Vec<DocumentLine>,
    metrics: Arc<dyn FontMetrics>,
    metrics_generation: u64,
    tab_width: usize,
    newline_type: LineEnding,
    append_newline_at_eof: bool,
    default_encoding: Encoding,
    index_of_longest_line: Option<usize>,
    /// Lines whose width must be folded into the longest-line index when the
    /// outermost update scope closes.
    pending_lines: Vec<usize>,
    update_count: usize,
    listeners: Vec<Listener>,
}

impl DocumentState {
    fn glyph_layout(&self, text: &str, cols_before: usize) -> (Vec<usize>, usize) {
        let tab_width = self.tab_width.max(1);
        let mut starts = Vec::new();
        let mut column = cols_before;
        for glyph in text.graphemes(true) {
            starts.push(column);
            column += if glyph == "\t" {
                tab_width - column % tab_width
            } else {
                self.metrics.glyph_columns(glyph)
            };
        }
        (starts, column - cols_before)
    }

    fn ensure_columns(&mut self, index: usize) -> usize {
        let generation = self.metrics_generation;
        if self.lines[index].columns_valid(generation) {
            return self.lines[index].columns();
        }
        let (glyph_columns, columns) = self.glyph_layout(self.lines[index].text(), 0);
        self.lines[index].set_columns(columns, glyph_columns, generation);
        if let Some(longest) = self.index_of_longest_line {
            if longest != index && columns > self.ensure_columns(longest) {
                self.index_of_longest_line = Some(index);
            }
        }
        columns
    }

    fn recompute_longest(&mut self) {
        self.index_of_longest_line = None;
        let mut best: Option<(usize, usize)> = None;
        for index in 0..self.lines.len() {
            let columns = self.ensure_columns(index);
            if best.is_none_or(|(_, widest)| columns > widest) {
                best = Some((index, columns));
            }
        }
        self.index_of_longest_line = best.map(|(index, _)| index);
    }

    fn flush_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending_lines);
        if self.index_of_longest_line.is_none() {
            self.recompute_longest();
            return;
        }
        for index in pending {
            if index < self.lines.len() {
                self.ensure_columns(index);
            }
        }
    }

    fn invalidate_all(&mut self) {
        self.metrics_generation += 1;
        self.index_of_longest_line = None;
    }

    fn line_touched(&mut self, index: usize) {
        if self.index_of_longest_line == Some(index) {
            // the longest line may have shrunk
            self.index_of_longest_line = None;
        }
        self.pending_lines.push(index);
    }

    fn lines_inserted(&mut self, start: usize, count: usize) {
        for index in self.pending_lines.iter_mut() {
            if *index >= start {
                *index += count;
            }
        }
        if let Some(longest) = self.index_of_longest_line.as_mut() {
            if *longest >= start {
                *longest += count;
            }
        }
        self.pending_lines.extend(start..start + count);
    }

    fn lines_deleted(&mut self, start: usize, count: usize) {
        let end = start + count;
        self.pending_lines.retain(|index| !(start..end).contains(index));
        for index in self.pending_lines.iter_mut() {
            if *index >= end {
                *index -= count;
            }
        }
        self.index_of_longest_line = match self.index_of_longest_line {
            Some(longest) if longest >= end => Some(longest - count),
            Some(longest) if longest < start => Some(longest),
            _ => None,
        };
    }

    fn line_break(&self) -> &'static str {
        self.newline_type.as_str()
    }
}

/// Ordered line storage with glyph-aware column layout and per-line syntax
/// state.
///
/// Every public method takes the document's re-entrant lock, so a background
/// highlighter can read and refresh caches while the foreground edits. Each
/// call is atomic on its own; sequences of calls are not.
///
/// Line and glyph indices are preconditions: out-of-range values panic.
pub struct Document {
    inner: ReentrantMutex<RefCell<DocumentState>>,
}

impl Document {
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(CellMetrics))
    }

    pub fn with_metrics(metrics: Arc<dyn FontMetrics>) -> Self {
        let state = DocumentState {
            lines: Vec::new(),
            metrics,
            metrics_generation: 0,
            tab_width: 4,
            newline_type: LineEnding::system_default(),
            append_newline_at_eof: false,
            default_encoding: Encoding::Utf8,
            index_of_longest_line: None,
            pending_lines: Vec::new(),
            update_count: 0,
            listeners: Vec::new(),
        };
        Self {
            inner: ReentrantMutex::new(RefCell::new(state)),
        }
    }

    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let document = Self::new();
        document.add_lines(lines);
        document
    }

    fn read<R>(&self, f: impl FnOnce(&DocumentState) -> R) -> R {
        let guard = self.inner.lock();
        let state = guard.borrow();
        f(&state)
    }

    fn write<R>(&self, f: impl FnOnce(&mut DocumentState) -> R) -> R {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    fn emit(&self, event: DocumentEvent) {
        let _guard = self.inner.lock();
        let listeners = self.read(|state| state.listeners.clone());
        for listener in listeners {
            listener(&event);
        }
    }

    /// Register a change listener. Listeners run with the document lock held
    /// and may call back into the document.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&DocumentEvent) + Send + Sync + 'static,
    {
        self.write(|state| state.listeners.push(Arc::new(listener)));
    }

    // ----- update scopes -----

    pub fn begin_update(&self) {
        let _guard = self.inner.lock();
        let first = self.write(|state| {
            state.update_count += 1;
            state.update_count == 1
        });
        if first {
            self.emit(DocumentEvent::Changing);
        }
    }

    pub fn end_update(&self) {
        let _guard = self.inner.lock();
        let last = self.write(|state| {
            if state.update_count == 0 {
                return false;
            }
            state.update_count -= 1;
            if state.update_count == 0 {
                state.flush_pending();
                true
            } else {
                false
            }
        });
        if last {
            self.emit(DocumentEvent::Changed);
        }
    }

    pub fn is_updating(&self) -> bool {
        self.read(|state| state.update_count > 0)
    }

    // ----- line access -----

    pub fn count(&self) -> usize {
        self.read(|state| state.lines.len())
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn get_line(&self, index: usize) -> String {
        self.read(|state| state.lines[index].text().to_string())
    }

    pub fn line_char_count(&self, index: usize) -> usize {
        self.read(|state| state.lines[index].char_count())
    }

    pub fn put_line(&self, index: usize, text: &str) {
        let _guard = self.inner.lock();
        self.begin_update();
        self.write(|state| {
            state.lines[index].set_text(text);
            state.line_touched(index);
        });
        self.emit(DocumentEvent::Put { start: index, count: 1 });
        self.end_update();
    }

    pub fn insert_line(&self, index: usize, text: &str) {
        self.insert_many(index, vec![DocumentLine::new(text)]);
    }

    /// Insert `count` empty lines at `index`.
    pub fn insert_lines(&self, index: usize, count: usize) {
        self.insert_many(index, (0..count).map(|_| DocumentLine::default()).collect());
    }

    pub fn add_line(&self, text: &str) -> usize {
        let _guard = self.inner.lock();
        let index = self.count();
        self.insert_line(index, text);
        index
    }

    pub fn add_lines<S: AsRef<str>>(&self, lines: &[S]) {
        let _guard = self.inner.lock();
        let index = self.count();
        self.insert_many(index, lines.iter().map(|s| DocumentLine::new(s.as_ref())).collect());
    }

    fn insert_many(&self, index: usize, new_lines: Vec<DocumentLine>) {
        if new_lines.is_empty() {
            return;
        }
        let _guard = self.inner.lock();
        let count = new_lines.len();
        self.begin_update();
        self.write(|state| {
            assert!(index <= state.lines.len(), "insert index {index} out of range");
            state.lines.splice(index..index, new_lines);
            state.lines_inserted(index, count);
        });
        self.emit(DocumentEvent::Inserted { start: index, count });
        self.end_update();
    }

    pub fn delete_at(&self, index: usize) {
        self.delete_lines(index, 1);
    }

    pub fn delete_lines(&self, index: usize, count: usize) {
        if count == 0 {
            return;
        }
        let _guard = self.inner.lock();
        self.begin_update();
        self.write(|state| {
            state.lines.drain(index..index + count);
            state.lines_deleted(index, count);
        });
        self.emit(DocumentEvent::Deleted { start: index, count });
        self.end_update();
    }

    pub fn exchange(&self, first: usize, second: usize) {
        let _guard = self.inner.lock();
        self.begin_update();
        self.write(|state| {
            state.lines.swap(first, second);
            let swap = |index: usize| {
                if index == first {
                    second
                } else if index == second {
                    first
                } else {
                    index
                }
            };
            state.index_of_longest_line = state.index_of_longest_line.map(swap);
            for index in state.pending_lines.iter_mut() {
                *index = swap(*index);
            }
        });
        self.emit(DocumentEvent::Put { start: first, count: 1 });
        self.emit(DocumentEvent::Put { start: second, count: 1 });
        self.end_update();
    }

    pub fn clear(&self) {
        let _guard = self.inner.lock();
        self.begin_update();
        self.write(|state| {
            state.lines.clear();
            state.pending_lines.clear();
            state.index_of_longest_line = None;
        });
        self.emit(DocumentEvent::Cleared);
        self.end_update();
    }

    // ----- bulk text -----

    pub fn contents(&self) -> Vec<String> {
        self.read(|state| state.lines.iter().map(|line| line.text().to_string()).collect())
    }

    pub fn set_contents<S: AsRef<str>>(&self, lines: &[S]) {
        let _guard = self.inner.lock();
        self.begin_update();
        self.clear();
        self.add_lines(lines);
        self.end_update();
    }

    /// All lines joined by the document's line break.
    pub fn text(&self) -> String {
        self.read(|state| {
            let texts: Vec<&str> = state.lines.iter().map(DocumentLine::text).collect();
            texts.join(state.line_break())
        })
    }

    pub fn set_text(&self, text: &str) {
        self.set_contents(&split_lines(text));
    }

    /// Length in chars of [`text`](Self::text).
    pub fn text_length(&self) -> usize {
        self.read(|state| {
            let chars: usize = state.lines.iter().map(DocumentLine::char_count).sum();
            let breaks = state.lines.len().saturating_sub(1) * state.line_break().chars().count();
            chars + breaks
        })
    }

    // ----- settings -----

    pub fn tab_width(&self) -> usize {
        self.read(|state| state.tab_width)
    }

    pub fn set_tab_width(&self, tab_width: usize) {
        self.write(|state| {
            if state.tab_width != tab_width {
                state.tab_width = tab_width.max(1);
                state.invalidate_all();
            }
        });
    }

    /// Swap the metrics provider; every cached width becomes stale.
    pub fn set_font_metrics(&self, metrics: Arc<dyn FontMetrics>) {
        self.write(|state| {
            state.metrics = metrics;
            state.invalidate_all();
        });
    }

    pub fn invalidate_all_line_columns(&self) {
        self.write(DocumentState::invalidate_all);
    }

    pub fn metrics_generation(&self) -> u64 {
        self.read(|state| state.metrics_generation)
    }

    pub fn newline_type(&self) -> LineEnding {
        self.read(|state| state.newline_type)
    }

    pub fn set_newline_type(&self, newline_type: LineEnding) {
        self.write(|state| state.newline_type = newline_type);
    }

    pub fn line_break(&self) -> &'static str {
        self.read(DocumentState::line_break)
    }

    pub fn append_newline_at_eof(&self) -> bool {
        self.read(|state| state.append_newline_at_eof)
    }

    pub fn set_append_newline_at_eof(&self, append: bool) {
        self.write(|state| state.append_newline_at_eof = append);
    }

    pub fn default_encoding(&self) -> Encoding {
        self.read(|state| state.default_encoding)
    }

    pub fn set_default_encoding(&self, encoding: Encoding) {
        self.write(|state| state.default_encoding = encoding);
    }

    // ----- columns -----

    /// Width of a line in columns, from cache when valid.
    pub fn line_columns(&self, index: usize) -> usize {
        self.write(|state| state.ensure_columns(index))
    }

    /// Width `text` would have if it replaced line `index`; cached width when
    /// the text is unchanged.
    pub fn line_columns_of(&self, index: usize, text: &str) -> usize {
        self.read(|state| {
            let line = &state.lines[index];
            if line.text() == text && line.columns_valid(state.metrics_generation) {
                line.columns()
            } else {
                state.glyph_layout(text, 0).1
            }
        })
    }

    /// Width of `text` when it starts at column `cols_before`, not counting
    /// `cols_before` itself.
    pub fn string_columns(&self, text: &str, cols_before: usize) -> usize {
        self.read(|state| state.glyph_layout(text, cols_before).1)
    }

    pub fn longest_line_columns(&self) -> usize {
        self.write(|state| {
            if state.lines.is_empty() {
                return 0;
            }
            if state.index_of_longest_line.is_none() {
                state.recompute_longest();
            }
            match state.index_of_longest_line {
                Some(index) => state.ensure_columns(index),
                None => 0,
            }
        })
    }

    pub fn index_of_longest_line(&self) -> Option<usize> {
        let _ = self.longest_line_columns();
        self.read(|state| state.index_of_longest_line)
    }

    // ----- glyphs and coordinates -----

    pub fn glyph_count(&self, index: usize) -> usize {
        self.read(|state| state.lines[index].glyph_count())
    }

    pub fn glyph_positions(&self, index: usize) -> Vec<usize> {
        self.read(|state| state.lines[index].glyph_positions().to_vec())
    }

    pub fn glyph_start(&self, index: usize, glyph: usize) -> usize {
        self.read(|state| state.lines[index].glyph_start(glyph))
    }

    pub fn glyph_end(&self, index: usize, glyph: usize) -> usize {
        self.read(|state| state.lines[index].glyph_end(glyph))
    }

    pub fn glyph_text(&self, index: usize, glyph: usize) -> String {
        self.read(|state| state.lines[index].glyph(glyph).to_string())
    }

    pub fn glyph_start_column(&self, index: usize, glyph: usize) -> usize {
        self.write(|state| {
            let columns = state.ensure_columns(index);
            let line = &state.lines[index];
            match line.glyph_columns().get(glyph) {
                Some(&column) => column,
                None => columns + (glyph - line.glyph_count()),
            }
        })
    }

    pub fn glyph_end_column(&self, index: usize, glyph: usize) -> usize {
        self.glyph_start_column(index, glyph + 1)
    }

    pub fn char_to_glyph_index(&self, index: usize, ch: usize) -> usize {
        self.read(|state| state.lines[index].char_to_glyph_index(ch))
    }

    /// Display column of char offset `ch`. Offsets inside a glyph map to the
    /// glyph's start column; offsets past the end count one column each.
    pub fn char_to_column(&self, index: usize, ch: usize) -> usize {
        self.write(|state| {
            let columns = state.ensure_columns(index);
            let line = &state.lines[index];
            let glyph = line.char_to_glyph_index(ch);
            if glyph >= line.glyph_count() {
                columns + (ch - line.char_count())
            } else {
                line.glyph_columns()[glyph]
            }
        })
    }

    pub fn column_to_glyph_index(&self, index: usize, column: usize) -> usize {
        self.write(|state| {
            let columns = state.ensure_columns(index);
            let line = &state.lines[index];
            if column >= columns {
                return line.glyph_count() + (column - columns);
            }
            match line.glyph_columns().binary_search(&column) {
                Ok(glyph) => glyph,
                Err(next) => next - 1,
            }
        })
    }

    /// Char offset of the glyph covering `column`.
    pub fn column_to_char(&self, index: usize, column: usize) -> usize {
        let _guard = self.inner.lock();
        let glyph = self.column_to_glyph_index(index, column);
        self.read(|state| {
            let line = &state.lines[index];
            if glyph >= line.glyph_count() {
                line.char_count() + (glyph - line.glyph_count())
            } else {
                line.glyph_start(glyph)
            }
        })
    }

    /// [`char_to_column`](Self::char_to_column) for text not stored in the
    /// document.
    pub fn char_to_column_of(&self, text: &str, ch: usize) -> usize {
        self.read(|state| {
            let positions = line::glyph_positions(text);
            let (starts, columns) = state.glyph_layout(text, 0);
            let glyph = positions.partition_point(|&start| start <= ch);
            if ch >= text.chars().count() {
                columns + (ch - text.chars().count())
            } else {
                starts[glyph - 1]
            }
        })
    }

    /// [`column_to_char`](Self::column_to_char) for text not stored in the
    /// document.
    pub fn column_to_char_of(&self, text: &str, column: usize) -> usize {
        self.read(|state| {
            let positions = line::glyph_positions(text);
            let (starts, columns) = state.glyph_layout(text, 0);
            if column >= columns {
                return text.chars().count() + (column - columns);
            }
            let glyph = starts.partition_point(|&start| start <= column);
            positions[glyph - 1]
        })
    }

    // ----- syntax state cache -----

    pub fn get_syntax_state(&self, index: usize) -> SyntaxState {
        self.read(|state| state.lines[index].syntax_state().clone())
    }

    pub fn set_syntax_state(&self, index: usize, syntax_state: SyntaxState) {
        self.write(|state| state.lines[index].set_syntax_state(syntax_state));
    }

    pub fn parenthesis_level(&self, index: usize) -> usize {
        self.read(|state| state.lines[index].syntax_state().parenthesis_level)
    }

    pub fn bracket_level(&self, index: usize) -> usize {
        self.read(|state| state.lines[index].syntax_state().bracket_level)
    }

    pub fn brace_level(&self, index: usize) -> usize {
        self.read(|state| state.lines[index].syntax_state().brace_level)
    }

    pub fn block_level(&self, index: usize) -> usize {
        self.read(|state| state.lines[index].syntax_state().block_level)
    }

    pub fn block_started(&self, index: usize) -> usize {
        self.read(|state| state.lines[index].syntax_state().block_started)
    }

    pub fn block_ended(&self, index: usize) -> usize {
        self.read(|state| state.lines[index].syntax_state().block_ended)
    }

    // ----- file io -----

    /// Load `path`, replacing the whole document. Returns the encoding that
    /// decoded the file. On error the document is left untouched.
    pub fn load_from_file(&self, path: impl AsRef<Path>, encoding: Encoding) -> Result<Encoding> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // A decoding with NUL in it only rules out that candidate. The file
        // is binary when every decoding that succeeded had one.
        let chain = encoding::candidates(&bytes, encoding, self.default_encoding());
        let mut saw_nul = false;
        let decoded = chain.iter().find_map(|&candidate| {
            let text = encoding::decode(&bytes, candidate)?;
            if text.contains('\0') {
                saw_nul = true;
                return None;
            }
            Some((text, candidate))
        });
        let Some((text, real_encoding)) = decoded else {
            let path = path.to_path_buf();
            return Err(if saw_nul {
                DocumentError::Binary { path }
            } else {
                DocumentError::Format { path, tried: chain }
            });
        };
        if encoding != Encoding::Auto && real_encoding != encoding {
            tracing::warn!(
                path = %path.display(),
                requested = %encoding,
                used = %real_encoding,
                "encoding fallback on load"
            );
        }

        let ends_with_break = text.ends_with('\n') || text.ends_with('\r');
        let mut lines = split_lines(&text);
        if ends_with_break {
            lines.pop();
        }

        let _guard = self.inner.lock();
        if let Some(newline_type) = LineEnding::detect(&text) {
            self.set_newline_type(newline_type);
        }
        self.set_append_newline_at_eof(ends_with_break);
        self.set_contents(&lines);
        tracing::debug!(
            path = %path.display(),
            encoding = %real_encoding,
            lines = lines.len(),
            "loaded document"
        );
        Ok(real_encoding)
    }

    /// Save to `path`, reapplying the newline convention and trailing-newline
    /// policy. Returns the encoding actually written.
    pub fn save_to_file(&self, path: impl AsRef<Path>, encoding: Encoding) -> Result<Encoding> {
        let path = path.as_ref();
        let mut text = {
            let _guard = self.inner.lock();
            let mut text = self.text();
            if self.append_newline_at_eof() && !self.is_empty() {
                text.push_str(self.line_break());
            }
            text
        };

        let target = if encoding == Encoding::Auto {
            Encoding::Utf8
        } else {
            encoding
        };
        let (bytes, real_encoding) = match encoding::encode(&text, target) {
            Some(bytes) => (bytes, target),
            None => {
                tracing::warn!(
                    path = %path.display(),
                    requested = %target,
                    "text not representable, saving as utf-8"
                );
                (std::mem::take(&mut text).into_bytes(), Encoding::Utf8)
            }
        };
        fs::write(path, &bytes).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            path = %path.display(),
            encoding = %real_encoding,
            bytes = bytes.len(),
            "saved document"
        );
        Ok(real_encoding)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|state| {
            f.debug_struct("Document")
                .field("lines", &state.lines.len())
                .field("tab_width", &state.tab_width)
                .field("newline_type", &state.newline_type)
                .field("update_count", &state.update_count)
                .finish()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Mutex;

    fn recorded(document: &Document) -> Arc<Mutex<Vec<DocumentEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        document.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    #[test]
    fn test_line_operations() {
        let doc = Document::from_lines(&["abc", "def"]);
        doc.insert_line(1, "xyz");
        assert_eq!(doc.contents(), vec!["abc", "xyz", "def"]);

        doc.exchange(0, 2);
        assert_eq!(doc.contents(), vec!["def", "xyz", "abc"]);

        doc.put_line(1, "mid");
        doc.delete_at(0);
        assert_eq!(doc.contents(), vec!["mid", "abc"]);

        doc.insert_lines(1, 2);
        assert_eq!(doc.contents(), vec!["mid", "", "", "abc"]);
        doc.delete_lines(1, 2);
        assert_eq!(doc.add_line("end"), 2);
        assert_eq!(doc.text(), ["mid", "abc", "end"].join(doc.line_break()));
    }

    #[test]
    fn test_set_text_splits_any_break() {
        let doc = Document::new();
        doc.set_newline_type(LineEnding::Unix);
        doc.set_text("a\r\nb\rc\nd");
        assert_eq!(doc.contents(), vec!["a", "b", "c", "d"]);
        assert_eq!(doc.text_length(), 7);

        doc.set_text("");
        assert!(doc.is_empty());
    }

    #[test]
    fn test_tab_expansion() {
        let doc = Document::from_lines(&["\tx", "ab\tc", "\t\t"]);
        doc.set_tab_width(4);
        assert_eq!(doc.line_columns(0), 5);
        assert_eq!(doc.line_columns(1), 5);
        assert_eq!(doc.line_columns(2), 8);
        assert_eq!(doc.string_columns("\tx", 2), 3);
    }

    #[test]
    fn test_wide_and_combining_glyphs() {
        let doc = Document::from_lines(&["a日e\u{301}b"]);
        assert_eq!(doc.glyph_count(0), 4);
        assert_eq!(doc.line_columns(0), 5);
        assert_eq!(doc.glyph_start_column(0, 2), 3);
        assert_eq!(doc.glyph_end_column(0, 1), 3);
        // inside "e\u{301}" rounds to the glyph start
        assert_eq!(doc.char_to_column(0, 3), doc.char_to_column(0, 2));
        assert_eq!(doc.column_to_char(0, 2), 1);
        assert_eq!(doc.column_to_glyph_index(0, 2), 1);
        // virtual space past the end
        assert_eq!(doc.char_to_column(0, 7), 7);
        assert_eq!(doc.column_to_char(0, 7), 7);
    }

    #[test]
    fn test_coordinates_of_free_text() {
        let doc = Document::new();
        assert_eq!(doc.char_to_column_of("\t日x", 2), 6);
        assert_eq!(doc.column_to_char_of("\t日x", 5), 1);
        assert_eq!(doc.column_to_char_of("\t日x", 9), 5);
    }

    #[test]
    fn test_longest_line_tracking() {
        let doc = Document::from_lines(&["ab", "abcdef", "abc"]);
        assert_eq!(doc.longest_line_columns(), 6);
        assert_eq!(doc.index_of_longest_line(), Some(1));

        doc.put_line(2, "abcdefghij");
        assert_eq!(doc.longest_line_columns(), 10);
        assert_eq!(doc.index_of_longest_line(), Some(2));

        doc.delete_at(2);
        assert_eq!(doc.longest_line_columns(), 6);

        doc.insert_line(0, "x");
        assert_eq!(doc.index_of_longest_line(), Some(2));
    }

    #[test]
    fn test_metrics_change_invalidates_by_generation() {
        #[derive(Debug)]
        struct Double;
        impl FontMetrics for Double {
            fn cell_width(&self) -> u32 {
                1
            }
            fn ascii_width(&self, _ch: char) -> u32 {
                2
            }
            fn glyph_width(&self, _glyph: &str) -> u32 {
                2
            }
        }

        let doc = Document::from_lines(&["abc"]);
        assert_eq!(doc.line_columns(0), 3);
        let before = doc.metrics_generation();
        doc.set_font_metrics(Arc::new(Double));
        assert!(doc.metrics_generation() > before);
        assert_eq!(doc.line_columns(0), 6);
        assert_eq!(doc.longest_line_columns(), 6);
    }

    #[test]
    fn test_nested_update_notifies_once() {
        let doc = Document::from_lines(&["a"]);
        let events = recorded(&doc);

        doc.begin_update();
        doc.begin_update();
        doc.add_line("b");
        doc.put_line(0, "A");
        doc.end_update();
        assert!(doc.is_updating());
        doc.end_update();
        assert!(!doc.is_updating());

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                DocumentEvent::Changing,
                DocumentEvent::Inserted { start: 1, count: 1 },
                DocumentEvent::Put { start: 0, count: 1 },
                DocumentEvent::Changed,
            ]
        );
    }

    #[test]
    fn test_unscoped_edit_notifies_each_time() {
        let doc = Document::new();
        let events = recorded(&doc);
        doc.add_line("a");
        doc.clear();
        let events = events.lock().unwrap();
        assert_eq!(events.iter().filter(|e| **e == DocumentEvent::Changed).count(), 2);
        assert!(events.contains(&DocumentEvent::Cleared));
    }

    #[test]
    fn test_listener_may_reenter() {
        let doc = Arc::new(Document::from_lines(&["abc"]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (weak, sink) = (Arc::downgrade(&doc), Arc::clone(&seen));
        doc.subscribe(move |event| {
            if let (DocumentEvent::Changed, Some(doc)) = (event, weak.upgrade()) {
                sink.lock().unwrap().push(doc.line_columns(0));
            }
        });
        doc.put_line(0, "abcd");
        assert_eq!(*seen.lock().unwrap(), vec![4]);
    }

    #[test]
    fn test_background_reader() {
        let doc = Arc::new(Document::from_lines(&["int a;"; 200]));
        let reader = {
            let doc = Arc::clone(&doc);
            std::thread::spawn(move || {
                let mut total = 0;
                for index in 0..100 {
                    total += doc.line_columns(index);
                }
                total
            })
        };
        for index in 100..200 {
            doc.put_line(index, "long long b;");
        }
        assert_eq!(reader.join().unwrap(), 600);
        assert_eq!(doc.longest_line_columns(), 12);
    }

    #[test]
    fn test_syntax_state_cache() {
        let doc = Document::from_lines(&["{", "}"]);
        let mut state = SyntaxState::new();
        state.open_block();
        doc.set_syntax_state(0, state.clone());
        assert_eq!(doc.get_syntax_state(0), state);
        assert_eq!(doc.brace_level(0), 1);
        assert_eq!(doc.block_started(0), 1);
        assert_eq!(doc.block_level(1), 0);
    }

    #[test]
    fn test_line_ending_detection() {
        assert_eq!(LineEnding::detect("a\r\nb\n"), Some(LineEnding::Windows));
        assert_eq!(LineEnding::detect("a\rb\r\n"), Some(LineEnding::Mac));
        assert_eq!(LineEnding::detect("a\nb"), Some(LineEnding::Unix));
        assert_eq!(LineEnding::detect("ab"), None);
    }

    #[test]
    fn test_load_utf16_crlf_and_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.txt");
        let original = encoding::encode("héllo\r\nwörld\r\n", Encoding::Utf16Le).unwrap();
        fs::write(&path, &original).unwrap();

        let doc = Document::new();
        let used = doc.load_from_file(&path, Encoding::Auto).unwrap();
        assert_eq!(used, Encoding::Utf16Le);
        assert_eq!(doc.contents(), vec!["héllo", "wörld"]);
        assert_eq!(doc.newline_type(), LineEnding::Windows);
        assert!(doc.append_newline_at_eof());

        let out = dir.path().join("out.txt");
        assert_eq!(doc.save_to_file(&out, used).unwrap(), Encoding::Utf16Le);
        assert_eq!(fs::read(&out).unwrap(), original);
    }

    #[test]
    fn test_load_falls_back_to_default_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.txt");
        fs::write(&path, [b'c', b'a', b'f', 0xE9]).unwrap();

        let doc = Document::new();
        doc.set_default_encoding(Encoding::Latin1);
        assert_eq!(doc.load_from_file(&path, Encoding::Auto).unwrap(), Encoding::Latin1);
        assert_eq!(doc.contents(), vec!["café"]);
        assert!(!doc.append_newline_at_eof());
    }

    #[test]
    fn test_load_failure_leaves_document_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, [0xFF, 0xFF, 0xC3]).unwrap();

        let doc = Document::from_lines(&["keep"]);
        doc.set_default_encoding(Encoding::Ascii);
        match doc.load_from_file(&path, Encoding::Auto) {
            Err(DocumentError::Format { path: failed, tried }) => {
                assert_eq!(failed, path);
                assert_eq!(tried, vec![Encoding::Utf8, Encoding::Ascii]);
            }
            other => panic!("expected format error, got {other:?}"),
        }
        assert_eq!(doc.contents(), vec!["keep"]);

        let missing = doc.load_from_file(dir.path().join("missing.txt"), Encoding::Auto);
        assert!(matches!(missing, Err(DocumentError::Io { .. })));
    }

    #[test]
    fn test_binary_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin.dat");
        fs::write(&path, b"ab\0cd").unwrap();
        let doc = Document::new();
        assert!(matches!(
            doc.load_from_file(&path, Encoding::Auto),
            Err(DocumentError::Binary { .. })
        ));
    }

    #[test]
    fn test_nul_decoding_moves_on_to_next_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.txt");
        fs::write(&path, b"a\0b\0\n\0").unwrap();
        let doc = Document::new();
        doc.set_default_encoding(Encoding::Utf16Le);
        assert_eq!(doc.load_from_file(&path, Encoding::Auto).unwrap(), Encoding::Utf16Le);
        assert_eq!(doc.contents(), vec!["ab"]);
    }

    #[test]
    fn test_save_falls_back_when_unrepresentable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let doc = Document::from_lines(&["日本"]);
        doc.set_newline_type(LineEnding::Unix);
        doc.set_append_newline_at_eof(true);
        assert_eq!(doc.save_to_file(&path, Encoding::Latin1).unwrap(), Encoding::Utf8);
        assert_eq!(fs::read_to_string(&path).unwrap(), "日本\n");
    }

    proptest! {
        #[test]
        fn char_column_round_trip(text in "[a\t日\u{301}e ]{0,24}", tab_width in 1usize..9) {
            let doc = Document::from_lines(&[text.as_str()]);
            doc.set_tab_width(tab_width);
            let mut boundaries = doc.glyph_positions(0);
            boundaries.push(doc.line_char_count(0));
            for p in boundaries {
                prop_assert_eq!(doc.column_to_char(0, doc.char_to_column(0, p)), p);
            }
        }
    }
}
