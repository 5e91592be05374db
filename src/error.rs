use std::path::PathBuf;
use thiserror::Error;

use crate::document_model::Encoding;

/// Errors surfaced by document load/save.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} could not be decoded (tried {})", .path.display(), format_tried(.tried))]
    Format { path: PathBuf, tried: Vec<Encoding> },

    #[error("{} looks like a binary file", .path.display())]
    Binary { path: PathBuf },
}

fn format_tried(tried: &[Encoding]) -> String {
    tried
        .iter()
        .map(|encoding| encoding.name())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, DocumentError>;
