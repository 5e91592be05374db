/// Configuration subsystem - rc file settings for documents and editors
///
/// This module handles loading configuration from .synbufrc files and
/// applying it to documents and their undo journals.

pub mod rc;

// Re-export public interface
pub use rc::{RcConfig, RcLoader};
