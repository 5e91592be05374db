use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::state::{RangeState, SyntaxState};
use super::syntaxer::{Language, Syntaxer};
use super::token::{AttributeId, AttributeTable, TokenKind, TokenStyle, TokenType};

const KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break",
    "case", "catch", "char", "char8_t", "char16_t", "char32_t", "class", "compl", "concept",
    "const", "consteval", "constexpr", "constinit", "const_cast", "continue", "co_await",
    "co_return", "co_yield", "decltype", "default", "delete", "do", "double", "dynamic_cast",
    "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto",
    "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "not_eq",
    "nullptr", "operator", "or", "or_eq", "private", "protected", "public", "register",
    "reinterpret_cast", "requires", "restrict", "return", "short", "signed", "sizeof", "static",
    "static_assert", "static_cast", "struct", "switch", "template", "this", "thread_local",
    "throw", "true", "try", "typedef", "typeid", "typename", "union", "unsigned", "using",
    "virtual", "void", "volatile", "wchar_t", "while", "xor", "xor_eq", "_Bool", "_Complex",
];

const STRING_PREFIXES: &[&str] = &["L", "u", "U", "u8"];
const RAW_STRING_PREFIXES: &[&str] = &["R", "LR", "uR", "UR", "u8R"];

const OPERATORS: &[&str] = &[
    "<<=", ">>=", "->*", "...", "<=>", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=",
    "&&", "||", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "::", ".*",
];
const OPERATOR_CHARS: &str = "+-*/%<>=!&|^~?:;,.";

static INTEGER_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[uU](?:ll|LL|[lLzZ])?|(?:ll|LL|[lLzZ])[uU]?)?$")
        .expect("integer suffix pattern")
});
static FLOAT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[fFlL]|[fF](?:16|32|64|128)|bf16|BF16)?$").expect("float suffix pattern")
});

#[derive(Debug, Clone, Copy)]
struct CppAttributes {
    comment: AttributeId,
    preprocessor: AttributeId,
    identifier: AttributeId,
    keyword: AttributeId,
    number: AttributeId,
    float: AttributeId,
    hex: AttributeId,
    octal: AttributeId,
    space: AttributeId,
    string: AttributeId,
    string_escape: AttributeId,
    character: AttributeId,
    symbol: AttributeId,
    invalid: AttributeId,
    macro_name: AttributeId,
    custom_type: AttributeId,
}

/// Tokenizer for C and C++ sources.
#[derive(Debug)]
pub struct CppSyntaxer {
    keywords: HashSet<&'static str>,
    custom_type_keywords: HashSet<String>,
    table: AttributeTable,
    attrs: CppAttributes,
    state: SyntaxState,
    line: Vec<char>,
    line_number: usize,
    run: usize,
    token_pos: usize,
    token_kind: TokenKind,
    token_attribute_override: Option<AttributeId>,
}

impl CppSyntaxer {
    pub fn new() -> Self {
        let mut table = AttributeTable::new();
        let attrs = CppAttributes {
            comment: table.add(
                "comment",
                TokenType::Comment,
                TokenStyle::fg(106, 153, 85).italic(),
            ),
            preprocessor: table.add(
                "preprocessor",
                TokenType::Preprocessor,
                TokenStyle::fg(197, 134, 192),
            ),
            identifier: table.add("identifier", TokenType::Identifier, TokenStyle::default()),
            keyword: table.add("keyword", TokenType::Keyword, TokenStyle::fg(86, 156, 214).bold()),
            number: table.add("number", TokenType::Number, TokenStyle::fg(181, 206, 168)),
            float: table.add("float", TokenType::Number, TokenStyle::fg(181, 206, 168)),
            hex: table.add("hex", TokenType::Number, TokenStyle::fg(181, 206, 168)),
            octal: table.add("octal", TokenType::Number, TokenStyle::fg(181, 206, 168)),
            space: table.add("space", TokenType::Space, TokenStyle::default()),
            string: table.add("string", TokenType::String, TokenStyle::fg(206, 145, 120)),
            string_escape: table.add(
                "string escape",
                TokenType::String,
                TokenStyle::fg(215, 186, 125),
            ),
            character: table.add("character", TokenType::Character, TokenStyle::fg(206, 145, 120)),
            symbol: table.add("symbol", TokenType::Operator, TokenStyle::default()),
            invalid: table.add("invalid", TokenType::Error, TokenStyle::fg(244, 71, 71)),
            macro_name: table.add("macro", TokenType::Preprocessor, TokenStyle::fg(78, 201, 176)),
            custom_type: table.add("type", TokenType::Identifier, TokenStyle::fg(78, 201, 176)),
        };

        Self {
            keywords: KEYWORDS.iter().copied().collect(),
            custom_type_keywords: HashSet::new(),
            table,
            attrs,
            state: SyntaxState::new(),
            line: Vec::new(),
            line_number: 0,
            run: 0,
            token_pos: 0,
            token_kind: TokenKind::Null,
            token_attribute_override: None,
        }
    }

    pub fn custom_type_keywords(&self) -> &HashSet<String> {
        &self.custom_type_keywords
    }

    /// Extra identifiers highlighted as type names.
    pub fn set_custom_type_keywords(&mut self, keywords: HashSet<String>) {
        self.custom_type_keywords = keywords;
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn is_string_to_next_line(&self, state: &SyntaxState) -> bool {
        state.range == RangeState::StringNextLine
    }

    pub fn is_raw_string_not_finished(&self, state: &SyntaxState) -> bool {
        state.range == RangeState::RawString
    }

    fn attribute_for(&self, kind: TokenKind) -> AttributeId {
        match kind {
            TokenKind::Comment => self.attrs.comment,
            TokenKind::Directive => self.attrs.preprocessor,
            TokenKind::Identifier => self.attrs.identifier,
            TokenKind::Keyword => self.attrs.keyword,
            TokenKind::Number | TokenKind::Binary => self.attrs.number,
            TokenKind::Float => self.attrs.float,
            TokenKind::Hex | TokenKind::HexFloat => self.attrs.hex,
            TokenKind::Octal => self.attrs.octal,
            TokenKind::Space | TokenKind::Null => self.attrs.space,
            TokenKind::String | TokenKind::RawString => self.attrs.string,
            TokenKind::StringEscapeSeq => self.attrs.string_escape,
            TokenKind::Char => self.attrs.character,
            TokenKind::Symbol => self.attrs.symbol,
            TokenKind::Unknown => self.attrs.invalid,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.line.get(self.run + offset).copied()
    }

    fn starts_with_at(&self, pos: usize, pattern: &str) -> bool {
        let mut index = pos;
        for expected in pattern.chars() {
            if self.line.get(index) != Some(&expected) {
                return false;
            }
            index += 1;
        }
        true
    }

    fn ends_with_backslash(&self) -> bool {
        self.line.last() == Some(&'\\')
    }

    fn scan_token(&mut self) {
        if self.run >= self.line.len() {
            self.proc_end_of_line();
            return;
        }
        match self.state.range {
            RangeState::BlockComment | RangeState::DocComment | RangeState::DirectiveComment => {
                self.proc_block_comment()
            }
            RangeState::LineComment => self.proc_line_comment(),
            RangeState::String | RangeState::StringNextLine => {
                self.state.range = RangeState::String;
                self.proc_string();
            }
            RangeState::StringEscapeSeq => self.proc_escape_seq(RangeState::String),
            RangeState::Char => self.proc_char(),
            RangeState::CharEscaping => self.proc_escape_seq(RangeState::Char),
            RangeState::RawString => self.proc_raw_string(),
            RangeState::Directive
            | RangeState::MultiLineDirective
            | RangeState::DefineRemaining => self.proc_directive_body(),
            RangeState::DefineIdentifier => self.proc_define_identifier(),
            RangeState::StringUnfinished | RangeState::Default => {
                self.state.range = RangeState::Default;
                self.process_char();
            }
        }
    }

    fn proc_end_of_line(&mut self) {
        self.token_kind = TokenKind::Null;
        self.state.range = match self.state.range {
            RangeState::String | RangeState::StringEscapeSeq => RangeState::StringUnfinished,
            RangeState::Char
            | RangeState::CharEscaping
            | RangeState::Directive
            | RangeState::DefineIdentifier
            | RangeState::DefineRemaining => RangeState::Default,
            other => other,
        };
    }

    fn process_char(&mut self) {
        let ch = self.line[self.run];
        match ch {
            c if c.is_whitespace() => self.proc_space(),
            '/' => self.proc_slash(),
            '"' => {
                self.run += 1;
                self.proc_string_start();
            }
            '\'' => {
                self.run += 1;
                self.proc_char_start();
            }
            '#' if self.line[..self.run].iter().all(|c| c.is_whitespace()) => {
                self.proc_directive_start()
            }
            '0'..='9' => self.proc_number(),
            '.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.proc_number(),
            '(' | ')' | '[' | ']' | '{' | '}' => self.proc_bracket(ch),
            c if self.is_ident_start_char(c) => self.proc_identifier(),
            c if OPERATOR_CHARS.contains(c) => self.proc_operator(),
            _ => self.proc_unknown(),
        }
    }

    fn proc_space(&mut self) {
        self.token_kind = TokenKind::Space;
        while self.peek(0).is_some_and(char::is_whitespace) {
            self.run += 1;
        }
        if self.run >= self.line.len() {
            self.state.has_trailing_spaces = true;
        }
    }

    fn proc_unknown(&mut self) {
        self.token_kind = TokenKind::Unknown;
        self.run += 1;
    }

    fn proc_bracket(&mut self, ch: char) {
        self.token_kind = TokenKind::Symbol;
        self.run += 1;
        let state = &mut self.state;
        match ch {
            '(' => state.parenthesis_level += 1,
            ')' => state.parenthesis_level = state.parenthesis_level.saturating_sub(1),
            '[' => state.bracket_level += 1,
            ']' => state.bracket_level = state.bracket_level.saturating_sub(1),
            '{' => state.open_block(),
            _ => state.close_block(),
        }
    }

    fn proc_operator(&mut self) {
        self.token_kind = TokenKind::Symbol;
        let width = OPERATORS
            .iter()
            .find(|op| self.starts_with_at(self.run, op))
            .map_or(1, |op| op.len());
        self.run += width;
    }

    fn proc_slash(&mut self) {
        match self.peek(1) {
            Some('/') => {
                self.token_kind = TokenKind::Comment;
                self.run = self.line.len();
                if self.ends_with_backslash() {
                    self.state.range = RangeState::LineComment;
                }
            }
            Some('*') => {
                let doc = self.peek(2) == Some('*') && self.peek(3) != Some('/');
                self.state.range = if doc {
                    RangeState::DocComment
                } else {
                    RangeState::BlockComment
                };
                self.run += 2;
                self.proc_block_comment();
            }
            _ => self.proc_operator(),
        }
    }

    fn proc_block_comment(&mut self) {
        self.token_kind = TokenKind::Comment;
        while self.run < self.line.len() {
            if self.starts_with_at(self.run, "*/") {
                self.run += 2;
                self.state.range = if self.state.range == RangeState::DirectiveComment {
                    RangeState::Directive
                } else {
                    RangeState::Default
                };
                return;
            }
            self.run += 1;
        }
    }

    fn proc_line_comment(&mut self) {
        self.token_kind = TokenKind::Comment;
        self.run = self.line.len();
        if !self.ends_with_backslash() {
            self.state.range = RangeState::Default;
        }
    }

    fn proc_string_start(&mut self) {
        self.state.range = RangeState::String;
        self.proc_string();
    }

    fn proc_string(&mut self) {
        self.token_kind = TokenKind::String;
        while let Some(ch) = self.peek(0) {
            match ch {
                '"' => {
                    self.run += 1;
                    self.state.range = RangeState::Default;
                    return;
                }
                '\\' if self.run + 1 >= self.line.len() => {
                    self.run += 1;
                    self.state.range = RangeState::StringNextLine;
                    return;
                }
                '\\' => {
                    self.state.range = RangeState::StringEscapeSeq;
                    return;
                }
                _ => self.run += 1,
            }
        }
    }

    fn proc_char_start(&mut self) {
        self.state.range = RangeState::Char;
        self.proc_char();
    }

    fn proc_char(&mut self) {
        self.token_kind = TokenKind::Char;
        while let Some(ch) = self.peek(0) {
            match ch {
                '\'' => {
                    self.run += 1;
                    self.state.range = RangeState::Default;
                    return;
                }
                '\\' if self.run + 1 < self.line.len() => {
                    self.state.range = RangeState::CharEscaping;
                    return;
                }
                _ => self.run += 1,
            }
        }
    }

    /// Escape sequence starting at a backslash; returns to `resume` after.
    fn proc_escape_seq(&mut self, resume: RangeState) {
        self.token_kind = TokenKind::StringEscapeSeq;
        self.run += 1;
        let Some(ch) = self.peek(0) else {
            self.state.range = resume;
            return;
        };
        self.run += 1;
        let (radix, max_digits) = match ch {
            'x' => (16, usize::MAX),
            'u' => (16, 4),
            'U' => (16, 8),
            '0'..='7' => {
                // the first octal digit is already consumed
                (8, 2)
            }
            _ => (10, 0),
        };
        let mut digits = 0;
        while digits < max_digits && self.peek(0).is_some_and(|c| c.is_digit(radix)) {
            self.run += 1;
            digits += 1;
        }
        self.state.range = resume;
    }

    fn proc_raw_string_start(&mut self) {
        // positioned just after the opening quote
        let mut delimiter = String::new();
        let mut pos = self.run;
        while let Some(&ch) = self.line.get(pos) {
            if ch == '(' {
                break;
            }
            if ch == ')' || ch == '\\' || ch.is_whitespace() || delimiter.len() >= 16 {
                self.proc_string_start();
                return;
            }
            delimiter.push(ch);
            pos += 1;
        }
        if pos >= self.line.len() {
            self.proc_string_start();
            return;
        }
        self.run = pos + 1;
        self.state.extra_data = delimiter;
        self.state.range = RangeState::RawString;
        self.proc_raw_string();
    }

    fn proc_raw_string(&mut self) {
        self.token_kind = TokenKind::RawString;
        let terminator = format!("){}\"", self.state.extra_data);
        while self.run < self.line.len() {
            if self.starts_with_at(self.run, &terminator) {
                self.run += terminator.chars().count();
                self.state.range = RangeState::Default;
                self.state.extra_data.clear();
                return;
            }
            self.run += 1;
        }
    }

    fn proc_directive_start(&mut self) {
        self.token_kind = TokenKind::Directive;
        self.run += 1;
        while self.peek(0).is_some_and(|c| c == ' ' || c == '\t') {
            self.run += 1;
        }
        let name_start = self.run;
        while self.peek(0).is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.run += 1;
        }
        let name: String = self.line[name_start..self.run].iter().collect();
        self.state.range = if name == "define" {
            RangeState::DefineIdentifier
        } else {
            RangeState::Directive
        };
        if self.run == self.line.len() && self.ends_with_backslash() {
            self.state.range = RangeState::MultiLineDirective;
        }
    }

    fn proc_define_identifier(&mut self) {
        match self.peek(0) {
            Some(c) if c == ' ' || c == '\t' => self.proc_space(),
            Some(c) if self.is_ident_start_char(c) => {
                self.token_kind = TokenKind::Identifier;
                while self.peek(0).is_some_and(|c| self.is_ident_char(c)) {
                    self.run += 1;
                }
                self.token_attribute_override = Some(self.attrs.macro_name);
                self.state.range = RangeState::DefineRemaining;
            }
            _ => self.state.range = RangeState::DefineRemaining,
        }
    }

    fn proc_directive_body(&mut self) {
        self.token_kind = TokenKind::Directive;
        while self.run < self.line.len() {
            if self.starts_with_at(self.run, "/*") {
                if self.run > self.token_pos {
                    return;
                }
                self.run += 2;
                self.state.range = RangeState::DirectiveComment;
                self.proc_block_comment();
                return;
            }
            if self.starts_with_at(self.run, "//") {
                if self.run > self.token_pos {
                    return;
                }
                self.token_kind = TokenKind::Comment;
                self.run = self.line.len();
                self.state.range = if self.ends_with_backslash() {
                    RangeState::LineComment
                } else {
                    RangeState::Default
                };
                return;
            }
            if self.line[self.run] == '\\' && self.run + 1 == self.line.len() {
                self.run += 1;
                self.state.range = RangeState::MultiLineDirective;
                return;
            }
            self.run += 1;
        }
    }

    fn proc_identifier(&mut self) {
        let start = self.run;
        while self.peek(0).is_some_and(|c| self.is_ident_char(c)) {
            self.run += 1;
        }
        let word: String = self.line[start..self.run].iter().collect();
        match self.peek(0) {
            Some('"') if RAW_STRING_PREFIXES.contains(&word.as_str()) => {
                self.run += 1;
                self.proc_raw_string_start();
                return;
            }
            Some('"') if STRING_PREFIXES.contains(&word.as_str()) => {
                self.run += 1;
                self.proc_string_start();
                return;
            }
            Some('\'') if STRING_PREFIXES.contains(&word.as_str()) => {
                self.run += 1;
                self.proc_char_start();
                return;
            }
            _ => {}
        }
        if self.is_keyword(&word) {
            self.token_kind = TokenKind::Keyword;
        } else {
            self.token_kind = TokenKind::Identifier;
            if self.custom_type_keywords.contains(&word) {
                self.token_attribute_override = Some(self.attrs.custom_type);
            }
        }
    }

    fn consume_digits(&mut self, radix: u32) -> (usize, bool) {
        let mut count = 0;
        let mut out_of_radix = false;
        loop {
            match self.peek(0) {
                Some(c) if c.is_digit(radix) => {}
                // 8 and 9 in an octal literal are consumed but flagged
                Some('8' | '9') if radix == 8 => out_of_radix = true,
                Some('\'')
                    if count > 0 && self.peek(1).is_some_and(|c| c.is_digit(radix.max(10))) => {}
                _ => return (count, out_of_radix),
            }
            self.run += 1;
            count += 1;
        }
    }

    fn consume_exponent(&mut self, markers: [char; 2]) -> bool {
        if !self.peek(0).is_some_and(|c| markers.contains(&c)) {
            return false;
        }
        self.run += 1;
        if matches!(self.peek(0), Some('+' | '-')) {
            self.run += 1;
        }
        true
    }

    fn proc_number(&mut self) {
        let mut kind = TokenKind::Number;
        let mut valid = true;
        let first = self.line[self.run];
        let second = self.peek(1);

        if first == '0' && matches!(second, Some('x' | 'X')) {
            kind = TokenKind::Hex;
            self.run += 2;
            let (mut digits, _) = self.consume_digits(16);
            if self.peek(0) == Some('.') {
                kind = TokenKind::HexFloat;
                self.run += 1;
                digits += self.consume_digits(16).0;
            }
            if self.consume_exponent(['p', 'P']) {
                kind = TokenKind::HexFloat;
                valid &= self.consume_digits(10).0 > 0;
            } else if kind == TokenKind::HexFloat {
                valid = false;
            }
            valid &= digits > 0;
        } else if first == '0' && matches!(second, Some('b' | 'B')) {
            kind = TokenKind::Binary;
            self.run += 2;
            let (digits, _) = self.consume_digits(2);
            valid &= digits > 0;
            if self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                self.consume_digits(10);
                valid = false;
            }
        } else {
            let octal = first == '0' && second.is_some_and(|c| c.is_ascii_digit());
            let (_, out_of_radix) = self.consume_digits(if octal { 8 } else { 10 });
            if self.peek(0) == Some('.') && self.peek(1) != Some('.') {
                kind = TokenKind::Float;
                self.run += 1;
                self.consume_digits(10);
            }
            if self.consume_exponent(['e', 'E']) {
                kind = TokenKind::Float;
                valid &= self.consume_digits(10).0 > 0;
            }
            if kind != TokenKind::Float && octal {
                kind = TokenKind::Octal;
                valid &= !out_of_radix;
            }
        }

        let suffix_start = self.run;
        while self.peek(0).is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.run += 1;
        }
        let suffix: String = self.line[suffix_start..self.run].iter().collect();
        if !suffix.starts_with('_') {
            valid &= match kind {
                TokenKind::Float | TokenKind::HexFloat => FLOAT_SUFFIX.is_match(&suffix),
                _ => INTEGER_SUFFIX.is_match(&suffix),
            };
        }
        self.token_kind = if valid { kind } else { TokenKind::Unknown };
    }
}

impl Default for CppSyntaxer {
    fn default() -> Self {
        Self::new()
    }
}

impl Syntaxer for CppSyntaxer {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn language_name(&self) -> &'static str {
        "C++"
    }

    fn keywords(&self) -> &HashSet<&'static str> {
        &self.keywords
    }

    fn comment_symbol(&self) -> &'static str {
        "//"
    }

    fn block_comment_begin_symbol(&self) -> &'static str {
        "/*"
    }

    fn block_comment_end_symbol(&self) -> &'static str {
        "*/"
    }

    fn reset_state(&mut self) {
        self.state = SyntaxState::new();
    }

    fn set_state(&mut self, state: &SyntaxState) {
        self.state = state.clone();
    }

    fn set_line(&mut self, line: &str, line_number: usize) {
        self.line = line.chars().collect();
        self.line_number = line_number;
        self.run = 0;
        self.state.start_line();
        self.state.range = match self.state.range {
            RangeState::StringUnfinished => RangeState::Default,
            RangeState::StringNextLine => RangeState::String,
            RangeState::MultiLineDirective => RangeState::Directive,
            other => other,
        };
        self.next();
    }

    fn next(&mut self) {
        self.token_pos = self.run;
        self.token_attribute_override = None;
        let mut stalled = 0;
        loop {
            self.scan_token();
            if self.token_kind == TokenKind::Null || self.run > self.token_pos {
                break;
            }
            stalled += 1;
            if stalled > 3 {
                // no state made progress; consume the char rather than stall
                self.state.range = RangeState::Default;
                self.proc_unknown();
                break;
            }
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
        self.token_attribute_override
            .unwrap_or_else(|| self.attribute_for(self.token_kind))
    }

    fn attributes(&self) -> &AttributeTable {
        &self.table
    }

    fn get_state(&self) -> SyntaxState {
        self.state.clone()
    }

    fn is_comment_not_finished(&self, state: &SyntaxState) -> bool {
        matches!(
            state.range,
            RangeState::BlockComment | RangeState::DirectiveComment | RangeState::LineComment
        )
    }

    fn is_string_not_finished(&self, state: &SyntaxState) -> bool {
        matches!(
            state.range,
            RangeState::String
                | RangeState::StringEscapeSeq
                | RangeState::StringNextLine
                | RangeState::StringUnfinished
                | RangeState::RawString
        )
    }

    fn is_docstring_not_finished(&self, state: &SyntaxState) -> bool {
        state.range == RangeState::DocComment
    }

    fn supports_folding(&self) -> bool {
        true
    }

    fn fold_string(&self, start_line: &str) -> String {
        if start_line.trim_end().ends_with('{') {
            " ... }".to_string()
        } else {
            " ... ".to_string()
        }
    }

    fn supports_brace_level(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Token;

    fn scan(syntaxer: &mut CppSyntaxer, line: &str) -> Vec<(String, TokenKind)> {
        syntaxer.set_line(line, 0);
        let tokens: Vec<Token> = syntaxer.tokens().collect();
        let chars: Vec<char> = line.chars().collect();
        tokens
            .into_iter()
            .map(|t| (chars[t.range()].iter().collect(), t.kind))
            .collect()
    }

    fn kinds(line: &str) -> Vec<TokenKind> {
        let mut syntaxer = CppSyntaxer::new();
        scan(&mut syntaxer, line).into_iter().map(|(_, kind)| kind).collect()
    }

    #[test]
    fn test_simple_statement() {
        let mut syntaxer = CppSyntaxer::new();
        let tokens = scan(&mut syntaxer, "int x = 42;");
        assert_eq!(
            tokens,
            vec![
                ("int".to_string(), TokenKind::Keyword),
                (" ".to_string(), TokenKind::Space),
                ("x".to_string(), TokenKind::Identifier),
                (" ".to_string(), TokenKind::Space),
                ("=".to_string(), TokenKind::Symbol),
                (" ".to_string(), TokenKind::Space),
                ("42".to_string(), TokenKind::Number),
                (";".to_string(), TokenKind::Symbol),
            ]
        );
        assert!(syntaxer.get_state().is_default_range());
    }

    #[test]
    fn test_block_comment_across_lines() {
        let mut syntaxer = CppSyntaxer::new();
        let first = scan(&mut syntaxer, "/* a");
        assert_eq!(first, vec![("/* a".to_string(), TokenKind::Comment)]);
        let state = syntaxer.get_state();
        assert_eq!(state.range, RangeState::BlockComment);
        assert!(syntaxer.is_comment_not_finished(&state));

        let second = scan(&mut syntaxer, "b */");
        assert_eq!(second, vec![("b */".to_string(), TokenKind::Comment)]);
        assert_eq!(syntaxer.get_state().range, RangeState::Default);
    }

    #[test]
    fn test_doc_comment_state() {
        let mut syntaxer = CppSyntaxer::new();
        scan(&mut syntaxer, "/** docs");
        let state = syntaxer.get_state();
        assert_eq!(state.range, RangeState::DocComment);
        assert!(syntaxer.is_docstring_not_finished(&state));

        // "/**/" is an empty plain comment
        scan(&mut syntaxer, "*/ /**/ x");
        assert!(syntaxer.get_state().is_default_range());
    }

    #[test]
    fn test_line_comment_continuation() {
        let mut syntaxer = CppSyntaxer::new();
        scan(&mut syntaxer, "// note \\");
        assert_eq!(syntaxer.get_state().range, RangeState::LineComment);
        let tokens = scan(&mut syntaxer, "still comment");
        assert_eq!(tokens, vec![("still comment".to_string(), TokenKind::Comment)]);
        assert!(syntaxer.get_state().is_default_range());
    }

    #[test]
    fn test_string_with_escape() {
        let mut syntaxer = CppSyntaxer::new();
        let tokens = scan(&mut syntaxer, r#""a\nb" x"#);
        assert_eq!(
            tokens,
            vec![
                ("\"a".to_string(), TokenKind::String),
                ("\\n".to_string(), TokenKind::StringEscapeSeq),
                ("b\"".to_string(), TokenKind::String),
                (" ".to_string(), TokenKind::Space),
                ("x".to_string(), TokenKind::Identifier),
            ]
        );
    }

    #[test]
    fn test_string_continues_next_line() {
        let mut syntaxer = CppSyntaxer::new();
        scan(&mut syntaxer, "s = \"abc\\");
        let state = syntaxer.get_state();
        assert_eq!(state.range, RangeState::StringNextLine);
        assert!(syntaxer.is_string_to_next_line(&state));

        let tokens = scan(&mut syntaxer, "def\";");
        assert_eq!(tokens[0], ("def\"".to_string(), TokenKind::String));
        assert!(syntaxer.get_state().is_default_range());
    }

    #[test]
    fn test_unfinished_string_is_flagged_not_carried() {
        let mut syntaxer = CppSyntaxer::new();
        scan(&mut syntaxer, "\"open");
        let state = syntaxer.get_state();
        assert_eq!(state.range, RangeState::StringUnfinished);
        assert!(syntaxer.is_string_not_finished(&state));

        let tokens = scan(&mut syntaxer, "x");
        assert_eq!(tokens, vec![("x".to_string(), TokenKind::Identifier)]);
    }

    #[test]
    fn test_raw_string_spans_lines() {
        let mut syntaxer = CppSyntaxer::new();
        let tokens = scan(&mut syntaxer, r#"auto s = R"xy(one"#);
        assert_eq!(tokens.last().unwrap().1, TokenKind::RawString);
        let state = syntaxer.get_state();
        assert_eq!(state.range, RangeState::RawString);
        assert_eq!(state.extra_data, "xy");

        let tokens = scan(&mut syntaxer, r#"two)" still)xy";"#);
        assert_eq!(tokens[0], (r#"two)" still)xy""#.to_string(), TokenKind::RawString));
        assert_eq!(tokens[1], (";".to_string(), TokenKind::Symbol));
        assert!(syntaxer.get_state().extra_data.is_empty());
    }

    #[test]
    fn test_define_macro_name_and_body() {
        let mut syntaxer = CppSyntaxer::new();
        syntaxer.set_line("#define MAX(a) \\", 0);
        assert_eq!(syntaxer.get_token(), "#define");
        assert_eq!(syntaxer.get_token_kind(), TokenKind::Directive);
        syntaxer.next();
        assert_eq!(syntaxer.get_token_kind(), TokenKind::Space);
        syntaxer.next();
        assert_eq!(syntaxer.get_token(), "MAX");
        assert_eq!(syntaxer.get_token_attribute(), syntaxer.attributes().find("macro").unwrap());
        while !syntaxer.eol() {
            syntaxer.next();
        }
        assert_eq!(syntaxer.get_state().range, RangeState::MultiLineDirective);

        let tokens = scan(&mut syntaxer, "  ((a) + 1)");
        assert_eq!(tokens, vec![("  ((a) + 1)".to_string(), TokenKind::Directive)]);
        assert!(syntaxer.get_state().is_default_range());
    }

    #[test]
    fn test_directive_with_comment() {
        let mut syntaxer = CppSyntaxer::new();
        let tokens = scan(&mut syntaxer, "#include <x.h> /* why");
        assert_eq!(tokens[0], ("#include".to_string(), TokenKind::Directive));
        assert_eq!(tokens[1], (" <x.h> ".to_string(), TokenKind::Directive));
        assert_eq!(tokens[2], ("/* why".to_string(), TokenKind::Comment));
        assert_eq!(syntaxer.get_state().range, RangeState::DirectiveComment);

        scan(&mut syntaxer, "*/");
        assert!(syntaxer.get_state().is_default_range());
    }

    #[test]
    fn test_hash_not_at_line_start_is_unknown() {
        assert_eq!(kinds("a # b")[2], TokenKind::Unknown);
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(kinds("0x1F"), vec![TokenKind::Hex]);
        assert_eq!(kinds("0x1.8p3"), vec![TokenKind::HexFloat]);
        assert_eq!(kinds("0x1.8"), vec![TokenKind::Unknown]);
        assert_eq!(kinds("0b1010u"), vec![TokenKind::Binary]);
        assert_eq!(kinds("0b102"), vec![TokenKind::Unknown]);
        assert_eq!(kinds("0755"), vec![TokenKind::Octal]);
        assert_eq!(kinds("0789"), vec![TokenKind::Unknown]);
        assert_eq!(kinds("1'000'000ULL"), vec![TokenKind::Number]);
        assert_eq!(kinds("3.14f"), vec![TokenKind::Float]);
        assert_eq!(kinds(".5e-3"), vec![TokenKind::Float]);
        assert_eq!(kinds("1e"), vec![TokenKind::Unknown]);
        assert_eq!(kinds("12lul"), vec![TokenKind::Unknown]);
        assert_eq!(kinds("12_km"), vec![TokenKind::Number]);
    }

    #[test]
    fn test_brace_levels_thread_through_state() {
        let mut syntaxer = CppSyntaxer::new();
        scan(&mut syntaxer, "void f() {");
        let state = syntaxer.get_state();
        assert_eq!(state.brace_level, 1);
        assert_eq!(state.block_started, 1);
        assert_eq!(state.parenthesis_level, 0);

        scan(&mut syntaxer, "  if (a[0] {");
        let state = syntaxer.get_state();
        assert_eq!(state.brace_level, 2);
        assert_eq!(state.parenthesis_level, 1);
        assert_eq!(state.bracket_level, 0);

        scan(&mut syntaxer, "}}");
        let state = syntaxer.get_state();
        assert_eq!(state.brace_level, 0);
        assert_eq!(state.block_ended, 2);
    }

    #[test]
    fn test_unknown_input_always_advances() {
        let mut syntaxer = CppSyntaxer::new();
        let tokens = scan(&mut syntaxer, "@`$§");
        assert_eq!(tokens.len(), 4);
        assert!(
            tokens
                .iter()
                .all(|(text, kind)| *kind == TokenKind::Unknown && text.chars().count() == 1)
        );
    }

    #[test]
    fn test_string_prefixes_and_char_literals() {
        assert_eq!(kinds(r#"u8"x""#), vec![TokenKind::String]);
        assert_eq!(kinds(r"'a'"), vec![TokenKind::Char]);
        assert_eq!(
            kinds(r"'\n'"),
            vec![TokenKind::Char, TokenKind::StringEscapeSeq, TokenKind::Char]
        );
        assert_eq!(
            kinds(r"L'\x41'"),
            vec![TokenKind::Char, TokenKind::StringEscapeSeq, TokenKind::Char]
        );
    }

    #[test]
    fn test_trailing_spaces_flag() {
        let mut syntaxer = CppSyntaxer::new();
        scan(&mut syntaxer, "x;  ");
        assert!(syntaxer.get_state().has_trailing_spaces);
        scan(&mut syntaxer, "y;");
        assert!(!syntaxer.get_state().has_trailing_spaces);
    }

    #[test]
    fn test_custom_type_keywords() {
        let mut syntaxer = CppSyntaxer::new();
        syntaxer.set_custom_type_keywords(["Widget".to_string()].into_iter().collect());
        syntaxer.set_line("Widget w;", 0);
        assert_eq!(syntaxer.get_token_kind(), TokenKind::Identifier);
        assert_eq!(syntaxer.get_token_attribute(), syntaxer.attributes().find("type").unwrap());
    }

    #[test]
    fn test_fold_string() {
        let syntaxer = CppSyntaxer::new();
        assert!(syntaxer.supports_folding());
        assert_eq!(syntaxer.fold_string("int main() {"), " ... }");
        assert_eq!(syntaxer.fold_string("/*"), " ... ");
    }
}
