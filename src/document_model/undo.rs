use std::collections::VecDeque;
use std::mem;

/// Why an undo item was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeReason {
    Insert,
    Delete,
    Caret,
    Selection,
    GroupBreak,
    LineBreak,
    MoveSelectionUp,
    MoveSelectionDown,
    ReplaceLine,
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SelectionMode {
    #[default]
    Normal,
    Line,
    Column,
}

/// Zero-based line and char offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BufferCoord {
    pub line: usize,
    pub ch: usize,
}

impl BufferCoord {
    pub const fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

/// One recorded change. Items are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoItem {
    reason: ChangeReason,
    sel_mode: SelectionMode,
    start: BufferCoord,
    end: BufferCoord,
    text: Vec<String>,
    change_number: usize,
    memory_usage: usize,
}

impl UndoItem {
    pub fn new(
        reason: ChangeReason,
        start: BufferCoord,
        end: BufferCoord,
        text: Vec<String>,
        sel_mode: SelectionMode,
        change_number: usize,
    ) -> Self {
        let memory_usage = mem::size_of::<Self>() + text.iter().map(String::len).sum::<usize>();
        Self {
            reason,
            sel_mode,
            start,
            end,
            text,
            change_number,
            memory_usage,
        }
    }

    pub fn reason(&self) -> ChangeReason {
        self.reason
    }

    pub fn sel_mode(&self) -> SelectionMode {
        self.sel_mode
    }

    pub fn start(&self) -> BufferCoord {
        self.start
    }

    pub fn end(&self) -> BufferCoord {
        self.end
    }

    pub fn text(&self) -> &[String] {
        &self.text
    }

    pub fn change_number(&self) -> usize {
        self.change_number
    }

    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }
}

/// Undo journal.
///
/// Items sharing a change number form one logical step. The budgets count
/// logical steps and item bytes; when either is exceeded the oldest whole
/// step is dropped and full undo is no longer possible.
#[derive(Debug, Clone)]
pub struct UndoList {
    items: VecDeque<UndoItem>,
    step_count: usize,
    memory_usage: usize,
    max_undo_actions: usize,
    max_memory_usage: usize,
    block_lock: usize,
    block_change_number: usize,
    block_count: usize,
    last_change_number: usize,
    initial_change_number: usize,
    inside_redo: bool,
    full_undo_impossible: bool,
}

impl UndoList {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
            step_count: 0,
            memory_usage: 0,
            max_undo_actions: 1024,
            max_memory_usage: 50 * 1024 * 1024,
            block_lock: 0,
            block_change_number: 0,
            block_count: 0,
            last_change_number: 0,
            initial_change_number: 0,
            inside_redo: false,
            full_undo_impossible: false,
        }
    }

    fn next_change_number(&mut self) -> usize {
        self.last_change_number += 1;
        self.last_change_number
    }

    pub fn add_change(
        &mut self,
        reason: ChangeReason,
        start: BufferCoord,
        end: BufferCoord,
        text: Vec<String>,
        sel_mode: SelectionMode,
    ) {
        let change_number = if self.block_lock > 0 {
            self.block_change_number
        } else {
            self.next_change_number()
        };
        self.push(UndoItem::new(reason, start, end, text, sel_mode, change_number));
    }

    /// Push an item keeping its change number. Used by redo replay.
    pub fn restore_change(&mut self, item: UndoItem) {
        self.last_change_number = self.last_change_number.max(item.change_number);
        self.push(item);
    }

    pub fn add_group_break(&mut self) {
        if self.last_change_reason() != ChangeReason::GroupBreak && !self.items.is_empty() {
            self.add_change(
                ChangeReason::GroupBreak,
                BufferCoord::default(),
                BufferCoord::default(),
                Vec::new(),
                SelectionMode::Normal,
            );
        }
    }

    fn push(&mut self, item: UndoItem) {
        if self.items.back().is_none_or(|last| last.change_number != item.change_number) {
            self.step_count += 1;
        }
        self.memory_usage += item.memory_usage;
        self.items.push_back(item);
        self.ensure_max_entries();
    }

    fn over_budget(&self) -> bool {
        (self.max_undo_actions > 0 && self.step_count > self.max_undo_actions)
            || (self.max_memory_usage > 0 && self.memory_usage > self.max_memory_usage)
    }

    /// Drop whole oldest steps until both budgets hold. A single step larger
    /// than the memory budget is dropped too, leaving the list empty.
    fn ensure_max_entries(&mut self) {
        while self.over_budget() {
            let Some(oldest) = self.items.front().map(|item| item.change_number) else {
                break;
            };
            let mut evicted = 0;
            while self.items.front().is_some_and(|item| item.change_number == oldest) {
                if let Some(item) = self.items.pop_front() {
                    self.memory_usage -= item.memory_usage;
                    evicted += 1;
                }
            }
            self.step_count -= 1;
            self.full_undo_impossible = true;
            tracing::debug!(change_number = oldest, items = evicted, "evicted undo step");
        }
    }

    pub fn begin_block(&mut self) {
        self.block_lock += 1;
        if self.block_lock == 1 {
            self.block_change_number = self.next_change_number();
            self.block_count += 1;
        }
    }

    pub fn end_block(&mut self) {
        if self.block_lock > 0 {
            self.block_lock -= 1;
            if self.block_lock == 0 {
                self.block_change_number = 0;
            }
        }
    }

    pub fn in_block(&self) -> bool {
        self.block_lock > 0
    }

    /// Number of top-level blocks opened so far.
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    pub fn pop_item(&mut self) -> Option<UndoItem> {
        let item = self.items.pop_back()?;
        self.memory_usage -= item.memory_usage;
        if self.items.back().is_none_or(|last| last.change_number != item.change_number) {
            self.step_count -= 1;
        }
        Some(item)
    }

    pub fn peek_item(&self) -> Option<&UndoItem> {
        self.items.back()
    }

    pub fn can_undo(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of logical steps held.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    pub fn last_change_reason(&self) -> ChangeReason {
        self.items.back().map_or(ChangeReason::Nothing, |item| item.reason)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.step_count = 0;
        self.memory_usage = 0;
        self.block_lock = 0;
        self.block_change_number = 0;
        self.full_undo_impossible = false;
    }

    pub fn set_initial_state(&mut self) {
        self.initial_change_number = self.items.back().map_or(0, |item| item.change_number);
    }

    /// True when the journal is back at the point recorded by
    /// [`set_initial_state`](Self::set_initial_state).
    pub fn initial_state(&self) -> bool {
        match self.items.back() {
            Some(item) => item.change_number == self.initial_change_number,
            None => self.initial_change_number == 0,
        }
    }

    pub fn inside_redo(&self) -> bool {
        self.inside_redo
    }

    pub fn set_inside_redo(&mut self, inside_redo: bool) {
        self.inside_redo = inside_redo;
    }

    pub fn full_undo_impossible(&self) -> bool {
        self.full_undo_impossible
    }

    pub fn max_undo_actions(&self) -> usize {
        self.max_undo_actions
    }

    /// Zero means unlimited.
    pub fn set_max_undo_actions(&mut self, max_undo_actions: usize) {
        self.max_undo_actions = max_undo_actions;
        self.ensure_max_entries();
    }

    pub fn max_memory_usage(&self) -> usize {
        self.max_memory_usage
    }

    /// Zero means unlimited.
    pub fn set_max_memory_usage(&mut self, max_memory_usage: usize) {
        self.max_memory_usage = max_memory_usage;
        self.ensure_max_entries();
    }
}

impl Default for UndoList {
    fn default() -> Self {
        Self::new()
    }
}

/// Redo journal. Unbounded; cleared by any new edit.
#[derive(Debug, Clone, Default)]
pub struct RedoList {
    items: Vec<UndoItem>,
}

impl RedoList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_redo(
        &mut self,
        reason: ChangeReason,
        start: BufferCoord,
        end: BufferCoord,
        text: Vec<String>,
        sel_mode: SelectionMode,
        change_number: usize,
    ) {
        self.items.push(UndoItem::new(reason, start, end, text, sel_mode, change_number));
    }

    pub(crate) fn push(&mut self, item: UndoItem) {
        self.items.push(item);
    }

    pub fn pop_item(&mut self) -> Option<UndoItem> {
        self.items.pop()
    }

    pub fn peek_item(&self) -> Option<&UndoItem> {
        self.items.last()
    }

    pub fn can_redo(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn last_change_reason(&self) -> ChangeReason {
        self.items.last().map_or(ChangeReason::Nothing, |item| item.reason)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(list: &mut UndoList, line: usize, text: &str) {
        let end = BufferCoord::new(line, text.chars().count());
        list.add_change(
            ChangeReason::Insert,
            BufferCoord::new(line, 0),
            end,
            vec![text.to_string()],
            SelectionMode::Normal,
        );
    }

    #[test]
    fn test_change_numbers_start_at_one() {
        let mut list = UndoList::new();
        insert(&mut list, 0, "a");
        insert(&mut list, 0, "b");
        assert_eq!(list.peek_item().unwrap().change_number(), 2);
        assert_eq!(list.step_count(), 2);
        assert_eq!(list.last_change_reason(), ChangeReason::Insert);
    }

    #[test]
    fn test_block_shares_change_number() {
        let mut list = UndoList::new();
        list.begin_block();
        insert(&mut list, 0, "a");
        list.begin_block();
        insert(&mut list, 1, "b");
        list.end_block();
        insert(&mut list, 2, "c");
        list.end_block();
        insert(&mut list, 3, "d");

        assert_eq!(list.item_count(), 4);
        assert_eq!(list.step_count(), 2);
        assert_eq!(list.block_count(), 1);
        assert!(!list.in_block());

        assert_eq!(list.pop_item().unwrap().change_number(), 2);
        let numbers: Vec<_> = std::iter::from_fn(|| list.pop_item())
            .map(|item| item.change_number())
            .collect();
        assert_eq!(numbers, vec![1, 1, 1]);
        assert_eq!(list.step_count(), 0);
    }

    #[test]
    fn test_group_break_not_duplicated() {
        let mut list = UndoList::new();
        list.add_group_break();
        assert!(!list.can_undo());

        insert(&mut list, 0, "a");
        list.add_group_break();
        list.add_group_break();
        assert_eq!(list.item_count(), 2);
        assert_eq!(list.last_change_reason(), ChangeReason::GroupBreak);
    }

    #[test]
    fn test_step_budget_evicts_oldest_whole_step() {
        let mut list = UndoList::new();
        list.set_max_undo_actions(2);
        list.begin_block();
        insert(&mut list, 0, "a");
        insert(&mut list, 1, "b");
        list.end_block();
        insert(&mut list, 2, "c");
        assert!(!list.full_undo_impossible());

        insert(&mut list, 3, "d");
        assert!(list.full_undo_impossible());
        assert_eq!(list.item_count(), 2);
        assert_eq!(list.step_count(), 2);
    }

    #[test]
    fn test_memory_budget_evicts() {
        let mut list = UndoList::new();
        list.set_max_undo_actions(0);
        let item_size = mem::size_of::<UndoItem>() + 10;
        list.set_max_memory_usage(item_size * 3);
        for line in 0..5 {
            insert(&mut list, line, "0123456789");
        }
        assert_eq!(list.item_count(), 3);
        assert!(list.memory_usage() <= item_size * 3);
        assert!(list.full_undo_impossible());

        list.clear();
        assert!(!list.full_undo_impossible());
        assert_eq!(list.memory_usage(), 0);
    }

    #[test]
    fn test_oversized_step_is_evicted() {
        let mut list = UndoList::new();
        list.set_max_memory_usage(200);
        insert(&mut list, 0, &"x".repeat(500));
        assert!(!list.can_undo());
        assert_eq!(list.step_count(), 0);
        assert_eq!(list.memory_usage(), 0);
        assert!(list.full_undo_impossible());

        insert(&mut list, 0, "small");
        assert_eq!(list.step_count(), 1);
        assert!(list.memory_usage() <= 200);
    }

    #[test]
    fn test_initial_state_marker() {
        let mut list = UndoList::new();
        assert!(list.initial_state());

        insert(&mut list, 0, "a");
        assert!(!list.initial_state());
        list.set_initial_state();
        assert!(list.initial_state());

        insert(&mut list, 0, "b");
        assert!(!list.initial_state());
        let item = list.pop_item().unwrap();
        assert!(list.initial_state());

        list.restore_change(item);
        assert!(!list.initial_state());
        assert_eq!(list.peek_item().unwrap().change_number(), 2);
    }

    #[test]
    fn test_restore_change_keeps_numbering_monotonic() {
        let mut list = UndoList::new();
        list.restore_change(UndoItem::new(
            ChangeReason::Delete,
            BufferCoord::new(0, 0),
            BufferCoord::new(0, 1),
            vec!["x".into()],
            SelectionMode::Normal,
            7,
        ));
        insert(&mut list, 0, "y");
        assert_eq!(list.peek_item().unwrap().change_number(), 8);
    }

    #[test]
    fn test_redo_list_is_lifo() {
        let mut redo = RedoList::new();
        assert!(!redo.can_redo());
        redo.add_redo(
            ChangeReason::Insert,
            BufferCoord::new(0, 0),
            BufferCoord::new(0, 1),
            vec!["a".into()],
            SelectionMode::Normal,
            1,
        );
        redo.push(UndoItem::new(
            ChangeReason::Insert,
            BufferCoord::new(0, 1),
            BufferCoord::new(0, 2),
            vec!["b".into()],
            SelectionMode::Normal,
            2,
        ));
        assert_eq!(redo.item_count(), 2);
        assert_eq!(redo.last_change_reason(), ChangeReason::Insert);
        assert_eq!(redo.pop_item().unwrap().change_number(), 2);
        redo.clear();
        assert_eq!(redo.last_change_reason(), ChangeReason::Nothing);
    }
}
