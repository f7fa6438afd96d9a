//! # Error Types
//!
//! Errors reported by language loading, tree editing and parsing.
//!
//! ## Overview
//!
//! Syntax problems in the parsed text are never reported through these types.
//! They are recovered locally and encoded in the tree as `ERROR` nodes and
//! missing leaves (see [`Node::has_error`](crate::tree::Node::has_error)).
//! The errors here describe misuse of the API or a malformed grammar:
//!
//! - [`LoadError`]: a language descriptor was rejected
//! - [`GrammarError`]: a [`LanguageBuilder`](crate::language::LanguageBuilder) grammar is invalid
//! - [`EditError`]: an edit could not be applied to a tree
//! - [`ParseError`]: a parse produced no tree at all
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with [`miette`]
//! and carry stable diagnostic codes.

use compact_str::CompactString;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// A compiled language descriptor could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum LoadError {
    #[error(
        "Language {name} (v{version}) is old. Minimum supported ABI: v{min}. Current ABI: v{current}."
    )]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(language::version_too_old),
            help("regenerate the parse tables with a newer generator")
        )
    )]
    VersionTooOld {
        name: CompactString,
        version: u32,
        min: u32,
        current: u32,
    },

    #[error("Language {name} (v{version}) is newer than the current ABI: v{current}.")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::version_too_new)))]
    VersionTooNew {
        name: CompactString,
        version: u32,
        current: u32,
    },

    #[error("Language {name} declares {count} external tokens but no external scanner was supplied")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::missing_external_scanner)))]
    MissingExternalScanner { name: CompactString, count: u16 },

    #[error("Unknown symbol {symbol} referenced by {context}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::unknown_symbol)))]
    UnknownSymbol { symbol: u16, context: CompactString },

    #[error("Unknown parse state {state} referenced by {context}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::unknown_state)))]
    UnknownState { state: u16, context: CompactString },

    #[error("Unknown production {production} referenced by state {state}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::unknown_production)))]
    UnknownProduction { production: u16, state: u16 },

    #[error("Unknown field {field} referenced by production {production}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::unknown_field)))]
    UnknownField { field: u16, production: u16 },

    #[error("Malformed language descriptor: {reason}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(language::malformed)))]
    Malformed { reason: CompactString },

    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Grammar(#[from] GrammarError),
}

impl LoadError {
    pub(crate) fn malformed(reason: impl Into<CompactString>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// A grammar handed to the language builder is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("Grammar has no rules")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::no_rules)))]
    NoRules,

    #[error("Symbol `{0}` is used but never defined")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::undefined_symbol)))]
    UndefinedSymbol(CompactString),

    #[error("Symbol `{0}` is defined more than once")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::duplicate_symbol)))]
    DuplicateSymbol(CompactString),

    #[error("Word token `{0}` must be a declared lexical token")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::invalid_word_token)))]
    InvalidWordToken(CompactString),

    #[error("Extra `{0}` must be a declared lexical token")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::invalid_extra)))]
    InvalidExtra(CompactString),

    #[error("Grammar needs {0} symbols, more than the table format supports")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::too_many_symbols)))]
    TooManySymbols(usize),

    #[error("Grammar produced {0} parse states, more than the table format supports")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::too_many_states)))]
    TooManyStates(usize),
}

/// An [`InputEdit`](crate::tree::InputEdit) was rejected by [`Tree::edit`](crate::tree::Tree::edit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum EditError {
    #[error("Edit at byte {start} precedes the previous edit at byte {previous}; edits must be applied in order")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(edit::out_of_order)))]
    OutOfOrder { previous: u32, start: u32 },

    #[error("Edit range is inverted: start {start}, old end {old_end}, new end {new_end}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(edit::invalid_range)))]
    InvalidRange { start: u32, old_end: u32, new_end: u32 },

    #[error("Edit ends at byte {old_end}, past the end of the tree at byte {len}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(edit::out_of_bounds)))]
    OutOfBounds { old_end: u32, len: u32 },
}

/// Why a parse was abandoned before producing a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation flag was raised.
    Flag,
    /// The operation budget was exhausted.
    OperationLimit,
    /// The deadline passed.
    Deadline,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flag => f.write_str("cancellation flag raised"),
            Self::OperationLimit => f.write_str("operation limit reached"),
            Self::Deadline => f.write_str("deadline passed"),
        }
    }
}

/// A parse call returned no tree.
///
/// Invalid input is not an error: it still yields a tree whose error nodes
/// describe the problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseError {
    #[error("Parse cancelled: {reason}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::cancelled)))]
    Cancelled { reason: CancelReason },

    #[error("No language has been assigned to the parser")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(parser::no_language), help("call `Parser::set_language` first"))
    )]
    NoLanguage,

    #[error("The old tree was produced by language {tree} but the parser uses {parser}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::language_mismatch)))]
    LanguageMismatch {
        tree: CompactString,
        parser: CompactString,
    },
}

/// Internal lexing failure. Never escapes the lexer: it turns into a
/// one-character `ERROR` leaf that error recovery skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No token matches at byte {position}")]
pub(crate) struct LexError {
    pub position: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_message_names_all_versions() {
        let err = LoadError::VersionTooOld {
            name: "toy".into(),
            version: 9,
            min: 13,
            current: 14,
        };
        assert_eq!(
            err.to_string(),
            "Language toy (v9) is old. Minimum supported ABI: v13. Current ABI: v14."
        );
    }

    #[test]
    fn test_grammar_error_is_transparent() {
        let err = LoadError::from(GrammarError::UndefinedSymbol("block".into()));
        assert_eq!(err.to_string(), "Symbol `block` is used but never defined");
    }

    #[test]
    fn test_cancel_reason_display() {
        let err = ParseError::Cancelled {
            reason: CancelReason::Deadline,
        };
        assert_eq!(err.to_string(), "Parse cancelled: deadline passed");
    }

    #[test]
    fn test_lex_error_display() {
        assert_eq!(
            LexError { position: 7 }.to_string(),
            "No token matches at byte 7"
        );
    }
}
