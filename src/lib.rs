//! Text-buffer document engine: glyph-aware line storage with column
//! mapping, resumable syntax tokenizers and an undo/redo journal.

pub mod config;
pub mod document_model;
pub mod error;
pub mod syntax;
pub mod view;

pub use document_model::{Document, DocumentEditor, Encoding, LineEnding};
pub use error::{DocumentError, Result};
pub use syntax::{Language, Syntaxer, SyntaxerRegistry};
