//! CLI interface for verdant-tools

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use verdant::Language;
use verdant::language::LanguageDescriptor;
use verdant::testing::grammars;

#[derive(Parser)]
#[command(name = "verdant-tools")]
#[command(about = "Parse files and inspect languages with verdant")]
#[command(version)]
pub struct Cli {
    /// Log filter, overriding `RUST_LOG`
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a file and print its tree
    Parse {
        /// Input file
        input: PathBuf,

        /// Bundled grammar to parse with
        #[arg(short, long, default_value = "toy")]
        grammar: GrammarChoice,

        /// JSON language descriptor to use instead of a bundled grammar
        #[arg(short, long)]
        descriptor: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "sexp")]
        format: OutputFormat,

        /// Print parse statistics to stderr
        #[arg(short, long)]
        stats: bool,

        /// Stop after this many parser operations
        #[arg(long)]
        max_operations: Option<u64>,
    },
    /// Print the symbols, fields and table size of a grammar
    Describe {
        #[arg(short, long, default_value = "toy")]
        grammar: GrammarChoice,

        /// JSON language descriptor to use instead of a bundled grammar
        #[arg(short, long)]
        descriptor: Option<PathBuf>,

        /// Output format (`tree` prints a text table)
        #[arg(short, long, default_value = "tree")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrammarChoice {
    Toy,
    Ambiguous,
    Labels,
}

impl GrammarChoice {
    #[must_use]
    pub fn load(self) -> Language {
        match self {
            Self::Toy => grammars::toy(),
            Self::Ambiguous => grammars::ambiguous(),
            Self::Labels => grammars::labels(),
        }
    }
}

/// Load `descriptor` when given, otherwise the bundled `grammar`.
///
/// Descriptors loaded from JSON have no external scanner, so grammars that
/// declare external tokens fail to load this way.
pub fn load_language(grammar: GrammarChoice, descriptor: Option<&Path>) -> Result<Language, Box<dyn std::error::Error>> {
    let Some(path) = descriptor else {
        return Ok(grammar.load());
    };
    let json = std::fs::read_to_string(path)?;
    Ok(Language::load(LanguageDescriptor::from_json(&json)?)?)
}

impl std::str::FromStr for GrammarChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "toy" => Ok(Self::Toy),
            "ambiguous" => Ok(Self::Ambiguous),
            "labels" => Ok(Self::Labels),
            _ => Err(format!("Unknown grammar: {s}. Supported: toy, ambiguous, labels")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Sexp,
    Tree,
    Dot,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sexp" => Ok(Self::Sexp),
            "tree" | "text" => Ok(Self::Tree),
            "dot" | "graphviz" => Ok(Self::Dot),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Supported: sexp, tree, dot, json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let cli = Cli::try_parse_from([
            "verdant-tools",
            "parse",
            "input.toy",
            "-g",
            "ambiguous",
            "-f",
            "dot",
            "--stats",
        ])
        .unwrap();
        match cli.command {
            Commands::Parse {
                input,
                grammar,
                descriptor,
                format,
                stats,
                max_operations,
            } => {
                assert_eq!(input, PathBuf::from("input.toy"));
                assert_eq!(descriptor, None);
                assert_eq!(grammar, GrammarChoice::Ambiguous);
                assert_eq!(format, OutputFormat::Dot);
                assert!(stats);
                assert_eq!(max_operations, None);
            }
            Commands::Describe { .. } => panic!("expected parse"),
        }
    }

    #[test]
    fn test_unknown_grammar_is_rejected() {
        assert!("python".parse::<GrammarChoice>().is_err());
        assert!(Cli::try_parse_from(["verdant-tools", "describe", "-g", "python"]).is_err());
    }

    #[test]
    fn test_load_language_from_descriptor_file() {
        let descriptor = verdant::LanguageBuilder::new("words")
            .token("word", verdant::lexer::Pattern::identifier())
            .rule("text", verdant::language::Rule::repeat(verdant::language::Rule::sym("word")))
            .build()
            .unwrap();
        let path = std::env::temp_dir().join(format!("verdant-tools-{}.json", std::process::id()));
        std::fs::write(&path, descriptor.to_json().unwrap()).unwrap();

        let language = load_language(GrammarChoice::Toy, Some(&path)).unwrap();
        assert_eq!(language.name(), "words");
        assert!(load_language(GrammarChoice::Toy, Some(Path::new("/nonexistent/verdant.json"))).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
