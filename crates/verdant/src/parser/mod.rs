//! # GLR Parser
//!
//! Incremental GLR parsing over a loaded [`Language`].
//!
//! ## Overview
//!
//! The parser keeps a frontier of stack heads. A head advances by lexing a
//! token in the lex mode of its state and applying the table's actions:
//!
//! 1. **Fork** when the table lists several actions; every action gets its
//!    own head
//! 2. **Merge** heads that reach the same position with the same state
//!    sequence and scanner state; the cheaper head survives
//! 3. **Prune** the frontier when it grows past [`GlrConfig::max_stacks`]
//! 4. **Recover** when every head fails, by inserting a missing token,
//!    skipping input into an `ERROR` node, or wrapping the rest of the input
//!
//! Given an edited old tree, unchanged subtrees are shifted whole instead of
//! being reparsed.
//!
//! ## Example
//!
//! ```rust
//! use verdant::syntax::TextRange;
//! use verdant::testing::grammars;
//! use verdant::tree::InputEdit;
//! use verdant::{ParseOptions, Parser};
//!
//! let mut parser = Parser::new();
//! parser.set_language(grammars::toy())?;
//! let options = ParseOptions::default();
//!
//! let text = "fn a() { 1 }\nfn b() { 2 }";
//! let tree = parser.parse(text, None, &options)?;
//!
//! let edit = InputEdit::for_replacement(text.as_bytes(), TextRange::new(9, 10), b"3");
//! let edited = tree.edit(&edit)?;
//! let tree = parser.parse("fn a() { 3 }\nfn b() { 2 }", Some(&edited), &options)?;
//! assert!(!tree.has_error());
//! assert!(parser.last_stats().reused_nodes > 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod engine;
mod head;
#[cfg(feature = "parallel")]
mod parallel;
mod recovery;
mod reuse;
mod stack;

#[cfg(feature = "parallel")]
pub use parallel::{BatchResult, parse_batch};

use crate::error::{LoadError, ParseError};
use crate::language::{Language, LANGUAGE_VERSION, MIN_COMPATIBLE_LANGUAGE_VERSION};
use crate::lexer::{InputSource, SourceBuffer};
use crate::tree::Tree;
use engine::Engine;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

/// Tuning knobs for the GLR engine.
#[derive(Debug, Clone)]
pub struct GlrConfig {
    /// Largest frontier kept after a round; more heads are pruned.
    pub max_stacks: usize,
    /// Strategy used when pruning heads beyond `max_stacks`.
    pub pruning_strategy: StackPruningStrategy,
    /// Beam width used during pruning (upper bound on retained heads).
    pub pruning_beam_width: usize,
    /// Tokens error recovery may skip before giving up.
    pub max_skip_tokens: usize,
    /// Stack entries error recovery may pop before giving up.
    pub max_pop_depth: usize,
    /// Recoveries a head may attempt without moving forward.
    pub max_recoveries_per_position: usize,
    /// Reductions a head may perform on one lookahead token.
    pub max_reductions_per_token: usize,
    /// Entries in the token cache; zero disables it.
    pub token_cache_capacity: usize,
}

impl Default for GlrConfig {
    fn default() -> Self {
        Self {
            max_stacks: 1000,
            pruning_strategy: StackPruningStrategy::QualityWeighted,
            pruning_beam_width: 512,
            max_skip_tokens: 32,
            max_pop_depth: 8,
            max_recoveries_per_position: 3,
            max_reductions_per_token: 10_000,
            token_cache_capacity: 256,
        }
    }
}

/// Strategy used to rank heads when pruning the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackPruningStrategy {
    /// Rank by stack depth only.
    None,
    /// Prefer heads with deeper stacks and more reductions.
    PreferDeeper,
    /// Prefer heads that have consumed more tokens.
    PreferProgress,
    /// Combine depth, progress and error counts into a weighted score.
    #[default]
    QualityWeighted,
}

/// Budget for one parse call. The parse is cancelled when any limit is hit.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Maximum number of parser operations (lexed tokens and table actions).
    pub max_operations: Option<u64>,
    pub deadline: Option<Instant>,
    /// Raised by another thread to stop the parse.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

/// Counters from the most recent parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub tokens_lexed: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub forks: usize,
    pub merges: usize,
    pub pruned: usize,
    pub recoveries: usize,
    pub missing_inserted: usize,
    pub skipped_tokens: usize,
    pub reused_nodes: usize,
    pub reused_bytes: usize,
    pub max_heads: usize,
    pub operations: u64,
}

/// Incremental GLR parser.
///
/// A parser holds no per-document state between calls; reuse comes from the
/// old tree passed to [`parse`](Self::parse).
#[derive(Debug, Default)]
pub struct Parser {
    language: Option<Language>,
    config: GlrConfig,
    stats: ParseStats,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: GlrConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Use `language` for subsequent parses.
    ///
    /// # Errors
    ///
    /// [`LoadError::VersionTooOld`] or [`LoadError::VersionTooNew`] when the
    /// language targets an ABI this parser cannot run.
    pub fn set_language(&mut self, language: Language) -> Result<(), LoadError> {
        let version = language.version();
        if version < MIN_COMPATIBLE_LANGUAGE_VERSION {
            return Err(LoadError::VersionTooOld {
                name: language.name().into(),
                version,
                min: MIN_COMPATIBLE_LANGUAGE_VERSION,
                current: LANGUAGE_VERSION,
            });
        }
        if version > LANGUAGE_VERSION {
            return Err(LoadError::VersionTooNew {
                name: language.name().into(),
                version,
                current: LANGUAGE_VERSION,
            });
        }
        self.language = Some(language);
        Ok(())
    }

    #[must_use]
    pub const fn language(&self) -> Option<&Language> {
        self.language.as_ref()
    }

    #[must_use]
    pub const fn config(&self) -> &GlrConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GlrConfig) {
        self.config = config;
    }

    /// Counters from the last call to [`parse`](Self::parse) or
    /// [`parse_with`](Self::parse_with).
    #[must_use]
    pub const fn last_stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Parse `text`. Pass the previous tree, after applying every edit to
    /// it with [`Tree::edit`], to reuse its unchanged subtrees.
    ///
    /// Syntax errors never fail the call: they are recorded in the tree.
    ///
    /// # Errors
    ///
    /// - [`ParseError::NoLanguage`] when no language is set
    /// - [`ParseError::LanguageMismatch`] when `old_tree` comes from another
    ///   language
    /// - [`ParseError::Cancelled`] when a limit in `options` is reached
    pub fn parse(
        &mut self,
        text: impl AsRef<[u8]>,
        old_tree: Option<&Tree>,
        options: &ParseOptions,
    ) -> Result<Tree, ParseError> {
        let text = text.as_ref();
        self.run(SourceBuffer::from_bytes(text), text.len(), old_tree, options)
    }

    /// Parse text pulled from `input` in chunks.
    ///
    /// # Errors
    ///
    /// Same as [`parse`](Self::parse).
    pub fn parse_with(
        &mut self,
        input: &mut impl InputSource,
        old_tree: Option<&Tree>,
        options: &ParseOptions,
    ) -> Result<Tree, ParseError> {
        self.run(SourceBuffer::streaming(input), 0, old_tree, options)
    }

    fn run(
        &mut self,
        source: SourceBuffer<'_>,
        known_len: usize,
        old_tree: Option<&Tree>,
        options: &ParseOptions,
    ) -> Result<Tree, ParseError> {
        let language = self.language.clone().ok_or(ParseError::NoLanguage)?;
        if let Some(old) = old_tree
            && old.language() != &language
        {
            return Err(ParseError::LanguageMismatch {
                tree: old.language().name().into(),
                parser: language.name().into(),
            });
        }

        let span = tracing::debug_span!(
            "parse",
            language = language.name(),
            bytes = known_len,
            incremental = old_tree.is_some()
        );
        let _guard = span.enter();

        let mut engine = Engine::new(language.clone(), &self.config, options, source, old_tree);
        let result = engine.run();
        self.stats = engine.into_stats();
        let root = result?;
        tracing::debug!(
            forks = self.stats.forks,
            merges = self.stats.merges,
            recoveries = self.stats.recoveries,
            reused = self.stats.reused_nodes,
            "parse finished"
        );
        Ok(Tree::new(root, language))
    }
}
