use super::state::SyntaxState;
use super::syntaxer::{Syntaxer, TokenIter};
use super::token::Token;
use crate::document_model::Document;

/// Tokenize one line starting from `start_state`; returns the tokens and the
/// line's exit state.
pub fn highlight_line(
    syntaxer: &mut dyn Syntaxer,
    start_state: &SyntaxState,
    text: &str,
    line_number: usize,
) -> (Vec<Token>, SyntaxState) {
    syntaxer.set_state(start_state);
    syntaxer.set_line(text, line_number);
    let tokens = TokenIter::new(&mut *syntaxer).collect();
    (tokens, syntaxer.get_state())
}

fn seed(document: &Document, syntaxer: &mut dyn Syntaxer, line: usize) {
    if line == 0 {
        syntaxer.reset_state();
    } else {
        syntaxer.set_state(&document.get_syntax_state(line - 1));
    }
}

fn scan_line(syntaxer: &mut dyn Syntaxer, text: &str, line_number: usize) -> SyntaxState {
    syntaxer.set_line(text, line_number);
    while !syntaxer.eol() {
        syntaxer.next();
    }
    syntaxer.get_state()
}

/// Rescan after an edit that replaced or inserted `changed` lines starting at
/// `line`, storing exit states in the document.
///
/// The changed lines are always rescanned, since freshly inserted lines carry
/// no meaningful cached state. Past them the scan stops at the first line
/// whose new exit state equals the cached one, and returns the last line
/// scanned. Lines below that point are assumed to hold states from an
/// earlier scan. After deletions pass the index of the first line that
/// moved up, with `changed` of 1.
pub fn scan_from(
    document: &Document,
    syntaxer: &mut dyn Syntaxer,
    line: usize,
    changed: usize,
) -> usize {
    if line >= document.count() {
        return line;
    }
    let can_stop_at = line + changed.max(1);
    seed(document, syntaxer, line);
    let mut current = line;
    loop {
        let state = scan_line(syntaxer, &document.get_line(current), current);
        let settled = current >= can_stop_at && document.get_syntax_state(current) == state;
        document.set_syntax_state(current, state);
        if settled || current + 1 >= document.count() {
            break;
        }
        current += 1;
    }
    tracing::debug!(from = line, to = current, "rescanned syntax states");
    current
}

/// Scan every line from the top.
pub fn scan_all(document: &Document, syntaxer: &mut dyn Syntaxer) {
    syntaxer.reset_state();
    let mut line = 0;
    while line < document.count() {
        let state = scan_line(syntaxer, &document.get_line(line), line);
        document.set_syntax_state(line, state);
        line += 1;
    }
    tracing::debug!(lines = line, language = %syntaxer.language(), "scanned document");
}
