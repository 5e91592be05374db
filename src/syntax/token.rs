use std::ops::Range;

/// Classification of a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Comment,
    Directive,
    Identifier,
    Keyword,
    /// End of line; never part of a token stream.
    Null,
    Number,
    Space,
    String,
    StringEscapeSeq,
    Symbol,
    Unknown,
    Char,
    Float,
    Hex,
    HexFloat,
    Octal,
    Binary,
    RawString,
}

/// Coarse grouping used by consumers that style by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Default,
    Comment,
    Identifier,
    Keyword,
    Number,
    Operator,
    Preprocessor,
    Space,
    String,
    Character,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TokenStyle {
    pub foreground: Option<(u8, u8, u8)>,
    pub bold: bool,
    pub italic: bool,
}

impl TokenStyle {
    pub const fn fg(r: u8, g: u8, b: u8) -> Self {
        Self {
            foreground: Some((r, g, b)),
            bold: false,
            italic: false,
        }
    }

    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub const fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAttribute {
    pub name: &'static str,
    pub token_type: TokenType,
    pub style: TokenStyle,
}

/// Index into a language's [`AttributeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeId(pub usize);

/// Per-language table of style attributes.
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    attributes: Vec<TokenAttribute>,
}

impl AttributeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: &'static str,
        token_type: TokenType,
        style: TokenStyle,
    ) -> AttributeId {
        self.attributes.push(TokenAttribute {
            name,
            token_type,
            style,
        });
        AttributeId(self.attributes.len() - 1)
    }

    pub fn get(&self, id: AttributeId) -> &TokenAttribute {
        &self.attributes[id.0]
    }

    pub fn find(&self, name: &str) -> Option<AttributeId> {
        self.attributes
            .iter()
            .position(|attribute| attribute.name == name)
            .map(AttributeId)
    }

    pub fn set_style(&mut self, id: AttributeId, style: TokenStyle) {
        self.attributes[id.0].style = style;
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeId, &TokenAttribute)> + '_ {
        self.attributes
            .iter()
            .enumerate()
            .map(|(index, attribute)| (AttributeId(index), attribute))
    }
}

/// A classified half-open range of code points within one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub end: usize,
    pub kind: TokenKind,
    pub attribute: AttributeId,
}

impl Token {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_table_lookup() {
        let mut table = AttributeTable::new();
        let comment = table.add("comment", TokenType::Comment, TokenStyle::fg(0, 128, 0).italic());
        let keyword = table.add("keyword", TokenType::Keyword, TokenStyle::default().bold());

        assert_eq!(table.len(), 2);
        assert_eq!(table.find("keyword"), Some(keyword));
        assert_eq!(table.get(comment).token_type, TokenType::Comment);
        assert!(table.get(comment).style.italic);

        table.set_style(keyword, TokenStyle::fg(0, 0, 255));
        assert_eq!(table.get(keyword).style.foreground, Some((0, 0, 255)));
        assert!(table.find("missing").is_none());
    }
}
