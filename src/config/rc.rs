use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::document_model::{Document, Encoding, LineEnding};

const RC_FILE_NAME: &str = ".synbufrc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcConfig {
    pub tab_stop: usize,
    pub line_ending: LineEnding,
    pub append_newline_at_eof: bool,
    pub default_encoding: Encoding,
    /// Undo steps kept; 0 means unlimited.
    pub max_undo_actions: usize,
    /// Undo memory budget in bytes; 0 means unlimited.
    pub max_undo_memory: usize,
    pub group_undo: bool,
}

impl Default for RcConfig {
    fn default() -> Self {
        Self {
            tab_stop: 4,
            line_ending: LineEnding::system_default(),
            append_newline_at_eof: true,
            default_encoding: Encoding::Utf8,
            max_undo_actions: 1024,
            max_undo_memory: 50 * 1024 * 1024,
            group_undo: true,
        }
    }
}

impl RcConfig {
    /// Push the document-level settings into `document`.
    pub fn apply_to_document(&self, document: &Document) {
        document.set_tab_width(self.tab_stop);
        document.set_newline_type(self.line_ending);
        document.set_append_newline_at_eof(self.append_newline_at_eof);
        document.set_default_encoding(self.default_encoding);
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub struct RcLoader;

impl RcLoader {
    /// Get the path to the RC file
    /// Looks for .synbufrc in:
    /// 1. Current directory
    /// 2. Home directory (~/.synbufrc)
    pub fn get_rc_path() -> Option<PathBuf> {
        let current_rc = Path::new(RC_FILE_NAME);
        if current_rc.exists() {
            return Some(current_rc.to_path_buf());
        }

        if let Ok(home) = env::var("HOME") {
            let home_rc = Path::new(&home).join(RC_FILE_NAME);
            if home_rc.exists() {
                return Some(home_rc);
            }
        }

        None
    }

    /// Load and parse the RC file, falling back to defaults
    pub fn load_config() -> RcConfig {
        match Self::get_rc_path() {
            Some(rc_path) => Self::load_from(&rc_path),
            None => RcConfig::default(),
        }
    }

    pub fn load_from(path: &Path) -> RcConfig {
        let mut config = RcConfig::default();
        match fs::read_to_string(path) {
            Ok(content) => {
                Self::parse_config_content(&content, &mut config);
                tracing::debug!(path = %path.display(), "loaded rc file");
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    %err,
                    "could not read rc file, using defaults"
                );
            }
        }
        config
    }

    /// Parse the content of an RC file
    pub fn parse_config_content(content: &str, config: &mut RcConfig) {
        for line in content.lines() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') || line.starts_with('"') {
                continue;
            }

            Self::parse_config_line(line, config);
        }
    }

    fn parse_config_line(line: &str, config: &mut RcConfig) {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        }
        .trim();
        let setting = line.strip_prefix("set ").map(str::trim).unwrap_or(line);

        match setting.split_once('=') {
            Some((key, value)) => Self::apply_value(key.trim(), value.trim(), config),
            None => Self::apply_flag(setting, config),
        }
    }

    fn apply_flag(flag: &str, config: &mut RcConfig) {
        match flag {
            "eol" | "fixeol" => config.append_newline_at_eof = true,
            "noeol" | "nofixeol" => config.append_newline_at_eof = false,
            "groupundo" => config.group_undo = true,
            "nogroupundo" => config.group_undo = false,
            _ => tracing::debug!(flag, "ignoring unknown rc flag"),
        }
    }

    fn apply_value(key: &str, value: &str, config: &mut RcConfig) {
        match key {
            "tabstop" | "ts" | "tab_stop" => {
                if let Ok(tab_stop) = value.parse::<usize>() {
                    if tab_stop > 0 && tab_stop <= 16 {
                        config.tab_stop = tab_stop;
                    }
                }
            }
            "fileformat" | "ff" | "line_ending" => {
                if let Some(line_ending) = LineEnding::from_name(value) {
                    config.line_ending = line_ending;
                }
            }
            "eol" | "append_newline" => {
                if let Some(append) = parse_bool(value) {
                    config.append_newline_at_eof = append;
                }
            }
            "encoding" | "enc" => {
                if let Some(encoding) = Encoding::from_name(value) {
                    if encoding != Encoding::Auto {
                        config.default_encoding = encoding;
                    }
                }
            }
            "undolevels" | "ul" => {
                if let Ok(levels) = value.parse::<usize>() {
                    config.max_undo_actions = levels;
                }
            }
            "undomemory" => {
                if let Ok(bytes) = value.parse::<usize>() {
                    config.max_undo_memory = bytes;
                }
            }
            "groupundo" | "group_undo" => {
                if let Some(group) = parse_bool(value) {
                    config.group_undo = group;
                }
            }
            _ => tracing::debug!(key, "ignoring unknown rc setting"),
        }
    }

    /// Generate a sample RC file content
    pub fn generate_sample_rc() -> String {
        r#"# synbuf configuration file (.synbufrc)
# Lines starting with # or " are comments

# Layout
set tabstop=4          # Tab width in columns

# Files
set fileformat=unix    # Line endings: unix, dos, or mac
set eol                # End the file with a line break (or set noeol)
set encoding=utf-8     # Fallback when a file is not valid UTF-8

# Undo
set undolevels=1024    # Steps kept, 0 for unlimited
set undomemory=52428800
set groupundo          # Undo typing runs together (or set nogroupundo)

# Alternative key=value syntax:
# tab_stop=4
# line_ending=dos
# group_undo=false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vim_style_config() {
        let mut config = RcConfig::default();
        let content = r#"
            set tabstop=8
            set fileformat=dos
            set noeol
            set encoding=latin1
            set undolevels=0
            set nogroupundo
        "#;

        RcLoader::parse_config_content(content, &mut config);

        assert_eq!(config.tab_stop, 8);
        assert_eq!(config.line_ending, LineEnding::Windows);
        assert!(!config.append_newline_at_eof);
        assert_eq!(config.default_encoding, Encoding::Latin1);
        assert_eq!(config.max_undo_actions, 0);
        assert!(!config.group_undo);
    }

    #[test]
    fn test_parse_key_value_config() {
        let mut config = RcConfig::default();
        let content = r#"
            tabstop=2
            line_ending=mac
            eol=no
            undomemory=4096
            group_undo=false
        "#;

        RcLoader::parse_config_content(content, &mut config);

        assert_eq!(config.tab_stop, 2);
        assert_eq!(config.line_ending, LineEnding::Mac);
        assert!(!config.append_newline_at_eof);
        assert_eq!(config.max_undo_memory, 4096);
        assert!(!config.group_undo);
    }

    #[test]
    fn test_parse_mixed_config_with_comments() {
        let mut config = RcConfig::default();
        let content = r#"
            # This is a comment
            set noeol              # Keep files without a final newline
            " This is also a comment

            tabstop=6              # Custom tab stop
            # set nogroupundo      # This is commented out
        "#;

        RcLoader::parse_config_content(content, &mut config);

        assert!(!config.append_newline_at_eof);
        assert_eq!(config.tab_stop, 6);
        assert!(config.group_undo);
    }

    #[test]
    fn test_invalid_values_ignored() {
        let mut config = RcConfig::default();
        let content = r#"
            set tabstop=0          # Invalid: too small
            set tabstop=20         # Invalid: too large
            tabstop=invalid        # Invalid: not a number
            line_ending=invalid    # Invalid: unknown format
            encoding=ebcdic        # Invalid: unsupported
            undolevels=-1          # Invalid: negative
            unknown_setting=value  # Unknown setting
            set unknownflag
        "#;

        RcLoader::parse_config_content(content, &mut config);

        assert_eq!(config, RcConfig::default());
    }

    #[test]
    fn test_sample_rc_parses() {
        let mut config = RcConfig::default();
        RcLoader::parse_config_content(&RcLoader::generate_sample_rc(), &mut config);
        assert_eq!(config.line_ending, LineEnding::Unix);
        assert_eq!(config.tab_stop, 4);
        assert!(config.append_newline_at_eof);
    }

    #[test]
    fn test_load_from_file_and_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RC_FILE_NAME);
        fs::write(&path, "set tabstop=2\nset ff=unix\n").unwrap();

        let config = RcLoader::load_from(&path);
        let document = Document::from_lines(&["\tx"]);
        config.apply_to_document(&document);
        assert_eq!(document.tab_width(), 2);
        assert_eq!(document.newline_type(), LineEnding::Unix);
        assert_eq!(document.line_columns(0), 3);

        let missing = RcLoader::load_from(&dir.path().join("absent"));
        assert_eq!(missing, RcConfig::default());
    }
}
