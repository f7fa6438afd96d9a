//! Verdant Tools CLI
//!
//! Command-line tools for parsing files with the bundled verdant grammars.

use clap::Parser as _;
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use verdant::testing::format_tree;
use verdant::{ParseOptions, Parser};
use verdant_tools::cli::{Cli, Commands, OutputFormat, load_language};
use verdant_tools::visualize::{describe_language, describe_language_json, generate_dot, tree_json};

fn init_tracing(filter: Option<&str>) {
    let filter = filter
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    match cli.command {
        Commands::Parse {
            input,
            grammar,
            descriptor,
            format,
            stats,
            max_operations,
        } => {
            let source = fs::read_to_string(&input)?;
            let mut parser = Parser::new();
            parser.set_language(load_language(grammar, descriptor.as_deref())?)?;
            let options = ParseOptions {
                max_operations,
                ..ParseOptions::default()
            };

            let started = Instant::now();
            let tree = parser.parse(&source, None, &options)?;
            let elapsed = started.elapsed();
            tracing::info!(path = %input.display(), bytes = source.len(), ?elapsed, "parsed");

            let content = match format {
                OutputFormat::Sexp => format!("{}\n", tree.to_sexp()),
                OutputFormat::Tree => format_tree(&tree),
                OutputFormat::Dot => generate_dot(&tree, Some(source.as_bytes())),
                OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&tree_json(&tree))?),
            };
            print!("{content}");

            if stats {
                eprintln!("{:#?}", parser.last_stats());
                eprintln!("parsed {} bytes in {elapsed:?}", source.len());
            }
            if tree.has_error() {
                std::process::exit(1);
            }
        }
        Commands::Describe {
            grammar,
            descriptor,
            format,
        } => {
            let language = load_language(grammar, descriptor.as_deref())?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&describe_language_json(&language))?);
                }
                OutputFormat::Sexp | OutputFormat::Tree | OutputFormat::Dot => {
                    print!("{}", describe_language(&language));
                }
            }
        }
    }

    Ok(())
}
