//! # Verdant
//!
//! An incremental GLR parsing engine with error recovery and persistent
//! syntax trees.
//!
//! ## Overview
//!
//! - **Languages**: grammars are compiled into parse tables, either in
//!   process with [`LanguageBuilder`] or loaded from a serialized
//!   [`LanguageDescriptor`](language::LanguageDescriptor)
//! - **GLR parsing**: conflicts left in the table are explored in parallel
//!   stacks that fork, merge and are pruned
//! - **Error recovery**: every input produces a tree; syntax errors become
//!   `ERROR` nodes and zero-width missing tokens
//! - **Incremental reparsing**: an edited tree hands unchanged subtrees back
//!   to the parser, and [`Tree::changed_ranges`] reports what moved
//! - **External scanners**: context-sensitive tokens come from user code
//!   whose state is stored in the tree
//!
//! ## Quick Start
//!
//! ```rust
//! use verdant::language::{LanguageBuilder, Rule};
//! use verdant::lexer::{CharSet, Pattern};
//! use verdant::{ParseOptions, Parser};
//!
//! let language = LanguageBuilder::new("sums")
//!     .token("number", Pattern::repeat1(Pattern::chars(CharSet::digits())))
//!     .extra("_space", Pattern::repeat1(Pattern::chars(CharSet::whitespace())))
//!     .rule(
//!         "sum",
//!         Rule::choice([
//!             Rule::prec_left(1, Rule::seq([Rule::sym("sum"), Rule::lit("+"), Rule::sym("sum")])),
//!             Rule::sym("number"),
//!         ]),
//!     )
//!     .load()?;
//!
//! let mut parser = Parser::new();
//! parser.set_language(language)?;
//! let tree = parser.parse("1 + 2 + 3", None, &ParseOptions::default())?;
//! assert_eq!(
//!     tree.to_sexp(),
//!     "(sum (sum (sum (number)) (sum (number))) (sum (number)))"
//! );
//!
//! let broken = parser.parse("1 + + 3", None, &ParseOptions::default())?;
//! assert!(broken.has_error());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `diagnostics`: [`miette`] diagnostics for every error type
//! - `serialize`: serde support for descriptors, positions and edits
//! - `parallel`: [`parse_batch`](parser::parse_batch) on the rayon pool

pub mod error;
pub mod language;
pub mod lexer;
pub mod parser;
pub mod syntax;
pub mod testing;
pub mod tree;

// Re-export commonly used types
pub use error::{CancelReason, EditError, GrammarError, LoadError, ParseError};
pub use language::{Language, LanguageBuilder, Symbol};
pub use parser::{GlrConfig, ParseOptions, ParseStats, Parser, StackPruningStrategy};
pub use syntax::{Length, Point, TextRange};
pub use tree::{InputEdit, Node, Tree, TreeCursor};
