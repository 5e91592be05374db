use std::collections::HashMap;
use std::path::Path;

use regex::Regex;

use super::cpp::CppSyntaxer;
use super::syntaxer::{Language, Syntaxer};
use super::text::TextSyntaxer;

pub type SyntaxerFactory = fn() -> Box<dyn Syntaxer>;

#[derive(Debug)]
struct Entry {
    factory: SyntaxerFactory,
    patterns: Vec<Regex>,
}

/// Creates syntaxers by language and maps file names to languages.
///
/// Constructed explicitly and handed to whoever needs it; there is no global
/// instance.
#[derive(Debug, Default)]
pub struct SyntaxerRegistry {
    entries: HashMap<Language, Entry>,
    /// Registration order, used when matching file names.
    order: Vec<Language>,
}

impl SyntaxerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            Language::Cpp,
            || Box::new(CppSyntaxer::new()),
            &[r"(?i)\.(c|h|cc|cpp|cxx|c\+\+|hh|hpp|hxx|h\+\+|inl|ipp)$"],
        );
        registry.register(Language::Text, || Box::new(TextSyntaxer::new()), &[r"(?i)\.txt$"]);
        registry
    }

    /// Register (or replace) a language. Patterns that fail to compile are
    /// skipped with a warning.
    pub fn register(&mut self, language: Language, factory: SyntaxerFactory, patterns: &[&str]) {
        let patterns = patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    tracing::warn!(%language, pattern, %err, "ignoring invalid filename pattern");
                    None
                }
            })
            .collect();
        if !self.order.contains(&language) {
            self.order.push(language);
        }
        self.entries.insert(language, Entry { factory, patterns });
    }

    pub fn languages(&self) -> &[Language] {
        &self.order
    }

    pub fn create(&self, language: Language) -> Option<Box<dyn Syntaxer>> {
        self.entries.get(&language).map(|entry| (entry.factory)())
    }

    pub fn language_for_path(&self, path: &Path) -> Option<Language> {
        let name = path.file_name()?.to_string_lossy();
        self.order.iter().copied().find(|language| {
            self.entries[language]
                .patterns
                .iter()
                .any(|pattern| pattern.is_match(&name))
        })
    }

    /// Syntaxer for `path`, falling back to plain text when registered.
    pub fn create_for_path(&self, path: &Path) -> Option<Box<dyn Syntaxer>> {
        let language = self.language_for_path(path).unwrap_or(Language::Text);
        self.create(language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_language_detection() {
        let registry = SyntaxerRegistry::with_builtins();
        assert_eq!(registry.language_for_path(Path::new("src/main.CPP")), Some(Language::Cpp));
        assert_eq!(registry.language_for_path(Path::new("x.h")), Some(Language::Cpp));
        assert_eq!(registry.language_for_path(Path::new("notes.txt")), Some(Language::Text));
        assert_eq!(registry.language_for_path(Path::new("Makefile")), None);
        assert_eq!(registry.language_for_path(&PathBuf::from("/")), None);
    }

    #[test]
    fn test_create_falls_back_to_text() {
        let registry = SyntaxerRegistry::with_builtins();
        let syntaxer = registry.create_for_path(Path::new("README")).unwrap();
        assert_eq!(syntaxer.language(), Language::Text);

        let syntaxer = registry.create(Language::Cpp).unwrap();
        assert_eq!(syntaxer.language_name(), "C++");
        assert_eq!(registry.languages(), &[Language::Cpp, Language::Text]);
    }

    #[test]
    fn test_empty_registry_creates_nothing() {
        let registry = SyntaxerRegistry::new();
        assert!(registry.create(Language::Cpp).is_none());
        assert!(registry.create_for_path(Path::new("a.c")).is_none());
    }

    #[test]
    fn test_each_create_is_a_fresh_instance() {
        let registry = SyntaxerRegistry::with_builtins();
        let mut first = registry.create(Language::Cpp).unwrap();
        let second = registry.create(Language::Cpp).unwrap();
        first.set_line("/* open", 0);
        while !first.eol() {
            first.next();
        }
        assert!(first.is_comment_not_finished(&first.get_state()));
        assert!(second.get_state().is_default_range());
    }
}
