//! Resumable line tokenizers and the driver that caches their exit states
//! in a [`Document`](crate::document_model::Document).

pub mod cpp;
pub mod highlight;
pub mod registry;
pub mod state;
pub mod syntaxer;
pub mod text;
pub mod token;

pub use cpp::CppSyntaxer;
pub use highlight::{highlight_line, scan_all, scan_from};
pub use registry::{SyntaxerFactory, SyntaxerRegistry};
pub use state::{RangeState, SyntaxState};
pub use syntaxer::{Language, Syntaxer, TokenIter};
pub use text::TextSyntaxer;
pub use token::{
    AttributeId, AttributeTable, Token, TokenAttribute, TokenKind, TokenStyle, TokenType,
};
