/// View subsystem - terminal rendering of highlighted documents
///
/// This module turns documents and their token streams into styled terminal
/// output, reading layout only through the document's column mapping.

pub mod renderer;

// Re-export public interface
pub use renderer::View;
