use crossterm::{
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};
use std::io::{self, Write};

use crate::document_model::Document;
use crate::syntax::{Syntaxer, Token, TokenStyle, highlight_line};

/// Writes documents as token-colored terminal text.
#[derive(Debug, Clone)]
pub struct View {
    show_line_numbers: bool,
    show_whitespace: bool,
    use_color: bool,
}

impl View {
    pub fn new() -> Self {
        Self {
            show_line_numbers: false,
            show_whitespace: false,
            use_color: true,
        }
    }

    pub fn set_line_numbers(&mut self, show: bool) {
        self.show_line_numbers = show;
    }

    pub fn set_show_whitespace(&mut self, show: bool) {
        self.show_whitespace = show;
    }

    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    /// Highlight every line from the top, caching exit states in `document`,
    /// and write the result to `out`.
    pub fn render<W: Write>(
        &self,
        out: &mut W,
        document: &Document,
        syntaxer: &mut dyn Syntaxer,
    ) -> io::Result<()> {
        let count = document.count();
        let line_num_width = count.to_string().len();
        syntaxer.reset_state();
        let mut state = syntaxer.get_state();
        for line in 0..count {
            let text = document.get_line(line);
            let (tokens, exit) = highlight_line(syntaxer, &state, &text, line);
            document.set_syntax_state(line, exit.clone());
            state = exit;

            if self.show_line_numbers {
                queue!(out, Print(format!("{:>line_num_width$} ", line + 1)))?;
            }
            for token in &tokens {
                let style = syntaxer.attribute(token.attribute).style;
                let segment = self.expand_token(document, line, &text, token);
                self.write_styled(out, &segment, style)?;
            }
            queue!(out, Print("\n"))?;
        }
        out.flush()
    }

    /// Token text with tabs expanded to the columns the document assigns them.
    fn expand_token(&self, document: &Document, line: usize, text: &str, token: &Token) -> String {
        let mut segment = String::new();
        for (offset, ch) in text.chars().skip(token.start).take(token.len()).enumerate() {
            match ch {
                '\t' => {
                    let pos = token.start + offset;
                    let width =
                        document.char_to_column(line, pos + 1) - document.char_to_column(line, pos);
                    if self.show_whitespace {
                        segment.push('>');
                        segment.push_str(&"-".repeat(width - 1));
                    } else {
                        segment.push_str(&" ".repeat(width));
                    }
                }
                ' ' if self.show_whitespace => segment.push('·'),
                _ => segment.push(ch),
            }
        }
        segment
    }

    fn write_styled<W: Write>(
        &self,
        out: &mut W,
        segment: &str,
        style: TokenStyle,
    ) -> io::Result<()> {
        if !self.use_color {
            return queue!(out, Print(segment));
        }
        if let Some((r, g, b)) = style.foreground {
            queue!(out, SetForegroundColor(Color::Rgb { r, g, b }))?;
        }
        if style.bold {
            queue!(out, SetAttribute(Attribute::Bold))?;
        }
        if style.italic {
            queue!(out, SetAttribute(Attribute::Italic))?;
        }
        queue!(out, Print(segment))?;
        if style.bold || style.italic {
            queue!(out, SetAttribute(Attribute::Reset))?;
        }
        if style.foreground.is_some() {
            queue!(out, ResetColor)?;
        }
        Ok(())
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}
