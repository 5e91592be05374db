use super::document::{Document, split_lines};
use super::undo::{BufferCoord, ChangeReason, RedoList, SelectionMode, UndoItem, UndoList};
use crate::config::RcConfig;

/// Selection anchor, caret end and mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: BufferCoord,
    pub end: BufferCoord,
    pub mode: SelectionMode,
}

impl Selection {
    pub fn caret(pos: BufferCoord) -> Self {
        Self {
            start: pos,
            end: pos,
            mode: SelectionMode::Normal,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

fn char_byte_offset(text: &str, ch: usize) -> usize {
    text.char_indices().nth(ch).map_or(text.len(), |(offset, _)| offset)
}

fn split_at_char(text: &str, ch: usize) -> (&str, &str) {
    text.split_at(char_byte_offset(text, ch))
}

/// Edits a [`Document`] and journals every change for undo/redo.
///
/// The document always holds at least one line.
#[derive(Debug)]
pub struct DocumentEditor {
    document: Document,
    undo_list: UndoList,
    redo_list: RedoList,
    caret: BufferCoord,
    selection: Selection,
    group_undo: bool,
}

impl DocumentEditor {
    pub fn new(document: Document) -> Self {
        if document.is_empty() {
            document.add_line("");
        }
        Self {
            document,
            undo_list: UndoList::new(),
            redo_list: RedoList::new(),
            caret: BufferCoord::default(),
            selection: Selection::default(),
            group_undo: true,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn undo_list(&self) -> &UndoList {
        &self.undo_list
    }

    pub fn redo_list(&self) -> &RedoList {
        &self.redo_list
    }

    pub fn caret(&self) -> BufferCoord {
        self.caret
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn group_undo(&self) -> bool {
        self.group_undo
    }

    pub fn set_group_undo(&mut self, group_undo: bool) {
        self.group_undo = group_undo;
    }

    pub fn apply_config(&mut self, config: &RcConfig) {
        config.apply_to_document(&self.document);
        self.undo_list.set_max_undo_actions(config.max_undo_actions);
        self.undo_list.set_max_memory_usage(config.max_undo_memory);
        self.group_undo = config.group_undo;
    }

    // ----- journaling -----

    fn push_undo(&mut self, item: UndoItem) {
        if self.undo_list.inside_redo() {
            self.undo_list.restore_change(item);
        } else {
            self.undo_list.add_change(
                item.reason(),
                item.start(),
                item.end(),
                item.text().to_vec(),
                item.sel_mode(),
            );
            self.redo_list.clear();
        }
    }

    fn record(
        &mut self,
        reason: ChangeReason,
        start: BufferCoord,
        end: BufferCoord,
        text: Vec<String>,
    ) {
        let item = UndoItem::new(reason, start, end, text, self.selection.mode, 0);
        self.push_undo(item);
    }

    pub fn begin_block(&mut self) {
        self.undo_list.begin_block();
        self.document.begin_update();
    }

    pub fn end_block(&mut self) {
        self.document.end_update();
        self.undo_list.end_block();
    }

    pub fn add_group_break(&mut self) {
        self.undo_list.add_group_break();
    }

    // ----- raw edits, not journaled -----

    fn clamp(&self, pos: BufferCoord) -> BufferCoord {
        let line = pos.line.min(self.document.count() - 1);
        BufferCoord::new(line, pos.ch.min(self.document.line_char_count(line)))
    }

    fn raw_insert(&self, pos: BufferCoord, lines: &[String]) -> BufferCoord {
        let current = self.document.get_line(pos.line);
        let (before, after) = split_at_char(&current, pos.ch);
        let last = lines.len() - 1;
        self.document.begin_update();
        let end = if last == 0 {
            self.document.put_line(pos.line, &format!("{before}{}{after}", lines[0]));
            BufferCoord::new(pos.line, pos.ch + lines[0].chars().count())
        } else {
            self.document.put_line(pos.line, &format!("{before}{}", lines[0]));
            let mut rest: Vec<String> = lines[1..last].to_vec();
            rest.push(format!("{}{after}", lines[last]));
            for (offset, text) in rest.iter().enumerate() {
                self.document.insert_line(pos.line + 1 + offset, text);
            }
            BufferCoord::new(pos.line + last, lines[last].chars().count())
        };
        self.document.end_update();
        end
    }

    fn text_between(&self, start: BufferCoord, end: BufferCoord) -> Vec<String> {
        let first = self.document.get_line(start.line);
        if start.line == end.line {
            let (_, tail) = split_at_char(&first, start.ch);
            let (middle, _) = split_at_char(tail, end.ch - start.ch);
            return vec![middle.to_string()];
        }
        let mut text = vec![split_at_char(&first, start.ch).1.to_string()];
        text.extend((start.line + 1..end.line).map(|line| self.document.get_line(line)));
        let last = self.document.get_line(end.line);
        text.push(split_at_char(&last, end.ch).0.to_string());
        text
    }

    fn raw_delete(&self, start: BufferCoord, end: BufferCoord) {
        let first = self.document.get_line(start.line);
        let last = self.document.get_line(end.line);
        let joined = format!(
            "{}{}",
            split_at_char(&first, start.ch).0,
            split_at_char(&last, end.ch).1
        );
        self.document.begin_update();
        self.document.put_line(start.line, &joined);
        self.document.delete_lines(start.line + 1, end.line - start.line);
        self.document.end_update();
    }

    fn raw_move_up(&self, first: usize, last: usize) {
        self.document.begin_update();
        for line in first..=last {
            self.document.exchange(line - 1, line);
        }
        self.document.end_update();
    }

    fn raw_move_down(&self, first: usize, last: usize) {
        self.document.begin_update();
        for line in (first..=last).rev() {
            self.document.exchange(line, line + 1);
        }
        self.document.end_update();
    }

    // ----- journaled edits -----

    /// Insert `text` at `pos` (clamped into the document); returns the end of
    /// the inserted text.
    pub fn insert_text(&mut self, pos: BufferCoord, text: &str) -> BufferCoord {
        let pos = self.clamp(pos);
        if text.is_empty() {
            return pos;
        }
        let lines = split_lines(text);
        let end = self.raw_insert(pos, &lines);
        self.record(insert_reason(&lines), pos, end, lines);
        self.caret = end;
        self.selection = Selection::caret(end);
        end
    }

    /// Delete the text between two positions; returns the removed lines.
    pub fn delete_text(&mut self, start: BufferCoord, end: BufferCoord) -> Vec<String> {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        let (start, end) = (self.clamp(start), self.clamp(end));
        if start == end {
            return Vec::new();
        }
        let deleted = self.text_between(start, end);
        self.raw_delete(start, end);
        self.record(ChangeReason::Delete, start, end, deleted.clone());
        self.caret = start;
        self.selection = Selection::caret(start);
        deleted
    }

    /// Insert a whole line before `index`; `index == count()` appends.
    pub fn insert_line(&mut self, index: usize, text: &str) {
        let count = self.document.count();
        if index < count {
            self.insert_text(BufferCoord::new(index, 0), &format!("{text}\n"));
        } else {
            let last = count - 1;
            let end = BufferCoord::new(last, self.document.line_char_count(last));
            self.insert_text(end, &format!("\n{text}"));
        }
        self.caret = BufferCoord::new(index.min(count), 0);
    }

    pub fn delete_line(&mut self, index: usize) {
        let count = self.document.count();
        let line_end = BufferCoord::new(index, self.document.line_char_count(index));
        if count == 1 {
            self.delete_text(BufferCoord::new(index, 0), line_end);
        } else if index + 1 < count {
            self.delete_text(BufferCoord::new(index, 0), BufferCoord::new(index + 1, 0));
        } else {
            let previous = BufferCoord::new(index - 1, self.document.line_char_count(index - 1));
            self.delete_text(previous, line_end);
        }
    }

    /// Replace the text of one line.
    pub fn put_line(&mut self, index: usize, text: &str) {
        let old = self.document.get_line(index);
        if old == text {
            return;
        }
        self.document.put_line(index, text);
        let end = BufferCoord::new(index, text.chars().count());
        self.record(ChangeReason::ReplaceLine, BufferCoord::new(index, 0), end, vec![old]);
        self.caret = BufferCoord::new(index, 0);
    }

    /// Move lines `first..=last` up by one. Returns false at the top.
    pub fn move_lines_up(&mut self, first: usize, last: usize) -> bool {
        if first == 0 || last >= self.document.count() || first > last {
            return false;
        }
        self.raw_move_up(first, last);
        let (start, end) = (BufferCoord::new(first - 1, 0), BufferCoord::new(last - 1, 0));
        self.record(ChangeReason::MoveSelectionUp, start, end, Vec::new());
        self.caret.line = self.caret.line.saturating_sub(1);
        true
    }

    /// Move lines `first..=last` down by one. Returns false at the bottom.
    pub fn move_lines_down(&mut self, first: usize, last: usize) -> bool {
        if last + 1 >= self.document.count() || first > last {
            return false;
        }
        self.raw_move_down(first, last);
        let (start, end) = (BufferCoord::new(first + 1, 0), BufferCoord::new(last + 1, 0));
        self.record(ChangeReason::MoveSelectionDown, start, end, Vec::new());
        self.caret.line += 1;
        true
    }

    pub fn set_selection(&mut self, start: BufferCoord, end: BufferCoord, mode: SelectionMode) {
        let selection = Selection { start, end, mode };
        if selection == self.selection {
            return;
        }
        let previous = std::mem::replace(&mut self.selection, selection);
        let item = UndoItem::new(
            ChangeReason::Selection,
            previous.start,
            previous.end,
            Vec::new(),
            previous.mode,
            0,
        );
        self.push_undo(item);
        self.caret = end;
    }

    /// Move the caret, journaling the previous position.
    pub fn set_caret(&mut self, pos: BufferCoord) {
        if pos == self.caret {
            return;
        }
        let previous = std::mem::replace(&mut self.caret, pos);
        self.record(ChangeReason::Caret, previous, previous, Vec::new());
        self.selection = Selection::caret(pos);
    }

    // ----- undo / redo -----

    /// Apply the reverse of `item` without journaling. Returns the item
    /// that reverses this reversal.
    fn revert(&mut self, item: &UndoItem) -> UndoItem {
        let number = item.change_number();
        let mode = item.sel_mode();
        let (start, end) = (item.start(), item.end());
        let counterpart =
            |reason, start, end, text| UndoItem::new(reason, start, end, text, mode, number);
        match item.reason() {
            ChangeReason::Insert | ChangeReason::LineBreak => {
                self.raw_delete(start, end);
                self.caret = start;
                self.selection = Selection::caret(start);
                counterpart(ChangeReason::Delete, start, end, item.text().to_vec())
            }
            ChangeReason::Delete => {
                let end = self.raw_insert(start, item.text());
                self.caret = end;
                self.selection = Selection::caret(end);
                counterpart(insert_reason(item.text()), start, end, item.text().to_vec())
            }
            ChangeReason::ReplaceLine => {
                let current = self.document.get_line(start.line);
                let restored = item.text().first().cloned().unwrap_or_default();
                self.document.put_line(start.line, &restored);
                self.caret = start;
                self.selection = Selection::caret(start);
                let end = BufferCoord::new(start.line, restored.chars().count());
                counterpart(ChangeReason::ReplaceLine, start, end, vec![current])
            }
            ChangeReason::MoveSelectionUp => {
                self.raw_move_down(start.line, end.line);
                self.caret.line += 1;
                let (start, end) = (
                    BufferCoord::new(start.line + 1, 0),
                    BufferCoord::new(end.line + 1, 0),
                );
                counterpart(ChangeReason::MoveSelectionDown, start, end, Vec::new())
            }
            ChangeReason::MoveSelectionDown => {
                self.raw_move_up(start.line, end.line);
                self.caret.line = self.caret.line.saturating_sub(1);
                let (start, end) = (
                    BufferCoord::new(start.line - 1, 0),
                    BufferCoord::new(end.line - 1, 0),
                );
                counterpart(ChangeReason::MoveSelectionUp, start, end, Vec::new())
            }
            ChangeReason::Selection => {
                let current = std::mem::replace(
                    &mut self.selection,
                    Selection {
                        start,
                        end,
                        mode,
                    },
                );
                self.caret = end;
                UndoItem::new(
                    ChangeReason::Selection,
                    current.start,
                    current.end,
                    Vec::new(),
                    current.mode,
                    number,
                )
            }
            ChangeReason::Caret => {
                let current = std::mem::replace(&mut self.caret, start);
                self.selection = Selection::caret(start);
                counterpart(ChangeReason::Caret, current, current, Vec::new())
            }
            reason @ (ChangeReason::GroupBreak | ChangeReason::Nothing) => {
                counterpart(reason, start, end, item.text().to_vec())
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo_list.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.redo_list.can_redo()
    }

    /// Undo one logical step. Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.document.begin_update();
        while self.undo_list.last_change_reason() == ChangeReason::GroupBreak {
            if let Some(item) = self.undo_list.pop_item() {
                self.redo_list.push(item);
            }
        }
        let mut undone = false;
        let mut last: Option<UndoItem> = None;
        while let Some(next) = self.undo_list.peek_item() {
            let joins_group = match &last {
                None => true,
                Some(prev) if next.change_number() == prev.change_number() => true,
                Some(prev) => self.group_undo && continues_group(next, prev),
            };
            if !joins_group {
                break;
            }
            let Some(item) = self.undo_list.pop_item() else {
                break;
            };
            let redo = self.revert(&item);
            self.redo_list.push(redo);
            last = Some(item);
            undone = true;
        }
        self.document.end_update();
        undone
    }

    /// Redo one logical step. Returns false when there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.document.begin_update();
        self.undo_list.set_inside_redo(true);
        while self.redo_list.last_change_reason() == ChangeReason::GroupBreak {
            if let Some(item) = self.redo_list.pop_item() {
                self.push_undo(item);
            }
        }
        let mut redone = false;
        let mut last: Option<UndoItem> = None;
        while let Some(next) = self.redo_list.peek_item() {
            let joins_group = match &last {
                None => true,
                Some(prev) if next.change_number() == prev.change_number() => true,
                Some(prev) => self.group_undo && continues_group(prev, next),
            };
            if !joins_group {
                break;
            }
            let Some(item) = self.redo_list.pop_item() else {
                break;
            };
            let undo = self.revert(&item);
            self.push_undo(undo);
            last = Some(item);
            redone = true;
        }
        self.undo_list.set_inside_redo(false);
        self.document.end_update();
        redone
    }

    /// Document differs from the last [`set_initial_state`](Self::set_initial_state).
    pub fn modified(&self) -> bool {
        !self.undo_list.initial_state()
    }

    pub fn set_initial_state(&mut self) {
        self.undo_list.set_initial_state();
    }

    pub fn full_undo_impossible(&self) -> bool {
        self.undo_list.full_undo_impossible()
    }

    pub fn clear_undo(&mut self) {
        self.undo_list.clear();
        self.redo_list.clear();
    }
}

/// Whether `later` continues a typing run that `earlier` started: same
/// reason, touching positions.
/// A bare line break is journaled apart from other insertions so it ends a
/// typing run.
fn insert_reason(lines: &[String]) -> ChangeReason {
    if lines.len() == 2 && lines.iter().all(String::is_empty) {
        ChangeReason::LineBreak
    } else {
        ChangeReason::Insert
    }
}

fn is_line_break(item: &UndoItem) -> bool {
    insert_reason(item.text()) == ChangeReason::LineBreak
}

fn continues_group(earlier: &UndoItem, later: &UndoItem) -> bool {
    matches!(earlier.reason(), ChangeReason::Insert | ChangeReason::Delete)
        && earlier.reason() == later.reason()
        && !is_line_break(earlier)
        && !is_line_break(later)
        && (later.start() == earlier.end()
            || later.end() == earlier.start()
            || later.start() == earlier.start())
}
