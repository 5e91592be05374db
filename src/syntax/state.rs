/// Construct a tokenizer is inside when a line ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RangeState {
    #[default]
    Default,
    /// `/* ... */`
    BlockComment,
    /// `/** ... */`
    DocComment,
    /// `// ...` continued by a trailing backslash.
    LineComment,
    String,
    /// The next token is an escape sequence inside a string.
    StringEscapeSeq,
    /// String continued by a trailing backslash.
    StringNextLine,
    /// String left open at the end of a line without a continuation.
    StringUnfinished,
    Char,
    CharEscaping,
    /// Raw string; the delimiter lives in [`SyntaxState::extra_data`].
    RawString,
    Directive,
    /// Directive continued by a trailing backslash.
    MultiLineDirective,
    /// Block comment opened inside a directive.
    DirectiveComment,
    /// After `#define`, before the macro name.
    DefineIdentifier,
    /// Body of a `#define`.
    DefineRemaining,
}

/// Resumable tokenizer state captured at the end of a line.
///
/// Feeding line N's exit state as the start state of line N+1 must give the
/// same tokens as scanning from line 0, so everything that influences
/// tokenization lives here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SyntaxState {
    pub range: RangeState,
    pub parenthesis_level: usize,
    pub bracket_level: usize,
    pub brace_level: usize,
    /// Brace nesting used for folding.
    pub block_level: usize,
    /// Blocks opened on this line and not closed on it.
    pub block_started: usize,
    /// Blocks closed on this line that were opened on an earlier one.
    pub block_ended: usize,
    pub block_ended_last_line: usize,
    pub has_trailing_spaces: bool,
    pub extra_data: String,
}

impl SyntaxState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no multi-line construct is open.
    pub fn is_default_range(&self) -> bool {
        self.range == RangeState::Default
    }

    /// Reset the per-line counters before scanning a new line.
    pub(crate) fn start_line(&mut self) {
        self.block_ended_last_line = self.block_ended;
        self.block_started = 0;
        self.block_ended = 0;
        self.has_trailing_spaces = false;
    }

    pub(crate) fn open_block(&mut self) {
        self.brace_level += 1;
        self.block_level += 1;
        self.block_started += 1;
    }

    pub(crate) fn close_block(&mut self) {
        self.brace_level = self.brace_level.saturating_sub(1);
        self.block_level = self.block_level.saturating_sub(1);
        if self.block_started > 0 {
            self.block_started -= 1;
        } else {
            self.block_ended += 1;
        }
    }
}
