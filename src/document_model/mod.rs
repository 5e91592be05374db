/// Document model subsystem - line storage, layout and editing
///
/// This module contains the glyph-aware line store, encoding detection,
/// font metrics, the undo/redo journal and the editor that records changes.

pub mod document;
pub mod editor;
pub mod encoding;
pub mod line;
pub mod metrics;
pub mod undo;

// Re-export main types for convenience
pub use document::{Document, DocumentEvent, LineEnding, split_lines};
pub use editor::{DocumentEditor, Selection};
pub use encoding::Encoding;
pub use line::DocumentLine;
pub use metrics::{CellMetrics, FontMetrics};
pub use undo::{BufferCoord, ChangeReason, RedoList, SelectionMode, UndoItem, UndoList};
