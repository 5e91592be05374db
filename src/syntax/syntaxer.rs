use std::collections::HashSet;
use std::fmt;

use super::state::SyntaxState;
use super::token::{AttributeId, AttributeTable, Token, TokenAttribute, TokenKind};

/// Language identity used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Cpp,
    Text,
}

impl Language {
    pub fn name(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Text => "text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "cpp" | "c++" | "c" => Some(Language::Cpp),
            "text" | "plain" | "txt" => Some(Language::Text),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resumable, per-language line tokenizer.
///
/// Usage is cursor style: seed the state with [`reset_state`](Self::reset_state)
/// or [`set_state`](Self::set_state), call [`set_line`](Self::set_line) (which
/// positions on the first token), then read the current token and call
/// [`next`](Self::next) until [`eol`](Self::eol). [`get_state`](Self::get_state)
/// afterwards is the exit state of the line.
///
/// An instance is stateful; give each concurrent task its own.
pub trait Syntaxer: Send {
    fn language(&self) -> Language;

    fn language_name(&self) -> &'static str;

    fn keywords(&self) -> &HashSet<&'static str>;

    fn is_keyword(&self, word: &str) -> bool {
        self.keywords().contains(word)
    }

    fn comment_symbol(&self) -> &'static str;

    fn block_comment_begin_symbol(&self) -> &'static str;

    fn block_comment_end_symbol(&self) -> &'static str;

    /// State for line 0.
    fn reset_state(&mut self);

    fn set_state(&mut self, state: &SyntaxState);

    fn set_line(&mut self, line: &str, line_number: usize);

    /// Advance to the next token. Always consumes at least one code point
    /// unless already at the end of the line.
    fn next(&mut self);

    fn eol(&self) -> bool;

    fn get_token(&self) -> String;

    /// Char offset of the current token.
    fn get_token_pos(&self) -> usize;

    fn get_token_kind(&self) -> TokenKind;

    fn get_token_attribute(&self) -> AttributeId;

    fn attributes(&self) -> &AttributeTable;

    fn get_state(&self) -> SyntaxState;

    fn is_comment_not_finished(&self, state: &SyntaxState) -> bool;

    fn is_string_not_finished(&self, state: &SyntaxState) -> bool;

    fn is_docstring_not_finished(&self, _state: &SyntaxState) -> bool {
        false
    }

    fn supports_folding(&self) -> bool {
        false
    }

    /// Placeholder shown for a collapsed fold starting on `start_line`.
    fn fold_string(&self, _start_line: &str) -> String {
        String::new()
    }

    /// Whether consumers need to cache exit states per line at all.
    fn needs_line_state(&self) -> bool {
        true
    }

    fn supports_brace_level(&self) -> bool {
        false
    }

    fn is_ident_char(&self, ch: char) -> bool {
        ch == '_' || ch.is_alphanumeric()
    }

    fn is_ident_start_char(&self, ch: char) -> bool {
        ch == '_' || ch.is_alphabetic()
    }

    fn attribute(&self, id: AttributeId) -> &TokenAttribute {
        self.attributes().get(id)
    }

    fn current_token(&self) -> Option<Token> {
        if self.eol() {
            return None;
        }
        let start = self.get_token_pos();
        Some(Token {
            start,
            end: start + self.get_token().chars().count(),
            kind: self.get_token_kind(),
            attribute: self.get_token_attribute(),
        })
    }

    /// Lazy iterator over the remaining tokens of the current line.
    fn tokens(&mut self) -> TokenIter<'_, Self>
    where
        Self: Sized,
    {
        TokenIter { syntaxer: self }
    }
}

/// Iterator returned by [`Syntaxer::tokens`].
pub struct TokenIter<'a, S: Syntaxer + ?Sized> {
    syntaxer: &'a mut S,
}

impl<'a, S: Syntaxer + ?Sized> TokenIter<'a, S> {
    pub fn new(syntaxer: &'a mut S) -> Self {
        Self { syntaxer }
    }
}

impl<S: Syntaxer + ?Sized> Iterator for TokenIter<'_, S> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.syntaxer.current_token()?;
        self.syntaxer.next();
        Some(token)
    }
}

impl<S: Syntaxer + ?Sized> fmt::Debug for TokenIter<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIter")
            .field("language", &self.syntaxer.language())
            .field("pos", &self.syntaxer.get_token_pos())
            .finish()
    }
}
