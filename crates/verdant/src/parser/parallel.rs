//! Parsing many independent documents on the rayon pool.

use crate::error::{LoadError, ParseError};
use crate::language::Language;
use crate::parser::{GlrConfig, ParseOptions, ParseStats, Parser};
use crate::tree::Tree;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Outcome of parsing one document of a batch.
#[derive(Debug)]
pub struct BatchResult {
    /// Position of the document in the input slice.
    pub index: usize,
    pub tree: Result<Tree, ParseError>,
    pub stats: ParseStats,
    pub duration: Duration,
}

/// Parse every text in `texts` with its own parser. Results come back in
/// input order. The options, including a shared cancel flag, apply to each
/// document separately.
///
/// # Errors
///
/// Fails before parsing anything when `language` cannot be used by a
/// [`Parser`].
pub fn parse_batch<T>(
    language: &Language,
    config: &GlrConfig,
    texts: &[T],
    options: &ParseOptions,
) -> Result<Vec<BatchResult>, LoadError>
where
    T: AsRef<[u8]> + Sync,
{
    let mut template = Parser::with_config(config.clone());
    template.set_language(language.clone())?;
    tracing::debug!(documents = texts.len(), "parsing batch");

    let results = texts
        .par_iter()
        .enumerate()
        .map_init(
            || Parser {
                language: template.language.clone(),
                config: template.config.clone(),
                stats: ParseStats::default(),
            },
            |parser, (index, text)| {
                let start = Instant::now();
                let tree = parser.parse(text, None, options);
                BatchResult {
                    index,
                    tree,
                    stats: parser.last_stats().clone(),
                    duration: start.elapsed(),
                }
            },
        )
        .collect();
    Ok(results)
}
