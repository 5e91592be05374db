use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use synbuf::config::{RcConfig, RcLoader};
use synbuf::document_model::{Document, Encoding, LineEnding};
use synbuf::syntax::{Language, Syntaxer, SyntaxerRegistry, scan_all};
use synbuf::view::View;

#[derive(Parser, Debug)]
#[command(name = "synbuf")]
#[command(about = "Inspect, highlight and convert text documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a file with syntax colors
    Highlight {
        file: PathBuf,

        /// Language to use instead of guessing from the file name
        #[arg(long, short = 'l')]
        language: Option<String>,

        /// Encoding to try first (auto, utf-8, utf-16le, latin1, ...)
        #[arg(long, short = 'e', default_value = "auto")]
        encoding: String,

        /// Prefix lines with their numbers
        #[arg(long, short = 'n')]
        number: bool,

        /// Make tabs and spaces visible
        #[arg(long)]
        list: bool,

        /// Never emit color codes
        #[arg(long)]
        no_color: bool,
    },
    /// Show encoding, line endings and layout facts about a file
    Info {
        file: PathBuf,

        #[arg(long, short = 'e', default_value = "auto")]
        encoding: String,
    },
    /// Save a file again with another encoding or line ending
    Convert {
        file: PathBuf,
        output: PathBuf,

        /// Target encoding (defaults to the detected one)
        #[arg(long, short = 'e')]
        encoding: Option<String>,

        /// Target line ending: unix, dos or mac
        #[arg(long)]
        line_ending: Option<String>,
    },
}

fn parse_encoding(name: &str) -> Result<Encoding, Box<dyn std::error::Error>> {
    Encoding::from_name(name).ok_or_else(|| format!("unknown encoding: {name}").into())
}

fn open(
    path: &Path,
    encoding: &str,
    config: &RcConfig,
) -> Result<(Document, Encoding), Box<dyn std::error::Error>> {
    let document = Document::new();
    config.apply_to_document(&document);
    let used = document.load_from_file(path, parse_encoding(encoding)?)?;
    Ok((document, used))
}

fn syntaxer_for(
    registry: &SyntaxerRegistry,
    path: &Path,
    language: Option<&str>,
) -> Result<Box<dyn Syntaxer>, Box<dyn std::error::Error>> {
    let syntaxer = match language {
        Some(name) => {
            let language =
                Language::from_name(name).ok_or_else(|| format!("unknown language: {name}"))?;
            registry.create(language)
        }
        None => registry.create_for_path(path),
    };
    syntaxer.ok_or_else(|| "no syntaxer registered".into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RcLoader::load_config();
    let registry = SyntaxerRegistry::with_builtins();

    match cli.command {
        Command::Highlight {
            file,
            language,
            encoding,
            number,
            list,
            no_color,
        } => {
            let (document, _) = open(&file, &encoding, &config)?;
            let mut syntaxer = syntaxer_for(&registry, &file, language.as_deref())?;
            let mut view = View::new();
            view.set_line_numbers(number);
            view.set_show_whitespace(list);
            view.set_color(!no_color && io::stdout().is_terminal());
            view.render(&mut io::stdout().lock(), &document, syntaxer.as_mut())?;
        }
        Command::Info { file, encoding } => {
            let (document, used) = open(&file, &encoding, &config)?;
            let mut syntaxer = syntaxer_for(&registry, &file, None)?;
            scan_all(&document, syntaxer.as_mut());

            println!("file:          {}", file.display());
            println!("language:      {}", syntaxer.language_name());
            println!("encoding:      {used}");
            println!("line ending:   {:?}", document.newline_type());
            println!("final newline: {}", document.append_newline_at_eof());
            println!("lines:         {}", document.count());
            println!("longest line:  {} columns", document.longest_line_columns());
            if let Some(last) = document.count().checked_sub(1) {
                let state = document.get_syntax_state(last);
                if syntaxer.is_comment_not_finished(&state) {
                    println!("warning:       unterminated comment at end of file");
                }
                if syntaxer.is_string_not_finished(&state) {
                    println!("warning:       unterminated string at end of file");
                }
                if state.brace_level > 0 {
                    println!("warning:       {} unclosed brace(s)", state.brace_level);
                }
            }
        }
        Command::Convert {
            file,
            output,
            encoding,
            line_ending,
        } => {
            let (document, used) = open(&file, "auto", &config)?;
            if let Some(name) = line_ending {
                let line_ending = LineEnding::from_name(&name)
                    .ok_or_else(|| format!("unknown line ending: {name}"))?;
                document.set_newline_type(line_ending);
            }
            let target = match encoding {
                Some(name) => parse_encoding(&name)?,
                None => used,
            };
            let written = document.save_to_file(&output, target)?;
            if written != target {
                eprintln!("{target} cannot hold this text, wrote {written} instead");
            }
            println!(
                "{} -> {} ({written}, {:?})",
                file.display(),
                output.display(),
                document.newline_type()
            );
        }
    }

    Ok(())
}
