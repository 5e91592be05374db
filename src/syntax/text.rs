use std::collections::HashSet;

use super::state::SyntaxState;
use super::syntaxer::{Language, Syntaxer};
use super::token::{AttributeId, AttributeTable, TokenKind, TokenStyle, TokenType};

/// Plain text: words, spaces and punctuation, no state across lines.
#[derive(Debug)]
pub struct TextSyntaxer {
    keywords: HashSet<&'static str>,
    table: AttributeTable,
    word: AttributeId,
    space: AttributeId,
    symbol: AttributeId,
    line: Vec<char>,
    run: usize,
    token_pos: usize,
    token_kind: TokenKind,
}

impl TextSyntaxer {
    pub fn new() -> Self {
        let mut table = AttributeTable::new();
        let word = table.add("text", TokenType::Default, TokenStyle::default());
        let space = table.add("space", TokenType::Space, TokenStyle::default());
        let symbol = table.add("symbol", TokenType::Operator, TokenStyle::default());
        Self {
            keywords: HashSet::new(),
            table,
            word,
            space,
            symbol,
            line: Vec::new(),
            run: 0,
            token_pos: 0,
            token_kind: TokenKind::Null,
        }
    }
}

impl Default for TextSyntaxer {
    fn default() -> Self {
        Self::new()
    }
}

impl Syntaxer for TextSyntaxer {
    fn language(&self) -> Language {
        Language::Text
    }

    fn language_name(&self) -> &'static str {
        "Text"
    }

    fn keywords(&self) -> &HashSet<&'static str> {
        &self.keywords
    }

    fn comment_symbol(&self) -> &'static str {
        ""
    }

    fn block_comment_begin_symbol(&self) -> &'static str {
        ""
    }

    fn block_comment_end_symbol(&self) -> &'static str {
        ""
    }

    fn reset_state(&mut self) {}

    fn set_state(&mut self, _state: &SyntaxState) {}

    fn set_line(&mut self, line: &str, _line_number: usize) {
        self.line = line.chars().collect();
        self.run = 0;
        self.next();
    }

    fn next(&mut self) {
        self.token_pos = self.run;
        let Some(&first) = self.line.get(self.run) else {
            self.token_kind = TokenKind::Null;
            return;
        };
        let same_class = |c: char| {
            if first.is_whitespace() {
                c.is_whitespace()
            } else if first.is_alphanumeric() {
                c.is_alphanumeric() || c == '_'
            } else {
                false
            }
        };
        self.token_kind = if first.is_whitespace() {
            TokenKind::Space
        } else if first.is_alphanumeric() {
            TokenKind::Identifier
        } else {
            TokenKind::Symbol
        };
        self.run += 1;
        while self.line.get(self.run).is_some_and(|&c| same_class(c)) {
            self.run += 1;
        }
    }

    fn eol(&self) -> bool {
        self.token_kind == TokenKind::Null
    }

    fn get_token(&self) -> String {
        self.line[self.token_pos..self.run].iter().collect()
    }

    fn get_token_pos(&self) -> usize {
        self.token_pos
    }

    fn get_token_kind(&self) -> TokenKind {
        self.token_kind
    }

    fn get_token_attribute(&self) -> AttributeId {
        match self.token_kind {
            TokenKind::Space | TokenKind::Null => self.space,
            TokenKind::Symbol => self.symbol,
            _ => self.word,
        }
    }

    fn attributes(&self) -> &AttributeTable {
        &self.table
    }

    fn get_state(&self) -> SyntaxState {
        SyntaxState::new()
    }

    fn is_comment_not_finished(&self, _state: &SyntaxState) -> bool {
        false
    }

    fn is_string_not_finished(&self, _state: &SyntaxState) -> bool {
        false
    }

    fn needs_line_state(&self) -> bool {
        false
    }
}
