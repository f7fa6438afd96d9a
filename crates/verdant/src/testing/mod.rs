//! # Testing Utilities
//!
//! Helpers for testing the parser and code built on it.
//!
//! - [`grammars`]: small ready-made languages, one with an external scanner
//! - [`generators`]: deterministic random programs and edits for property
//!   tests and fuzzing
//! - [`snapshot`]: parse tree snapshots stored next to the tests

pub mod generators;
pub mod grammars;
pub mod snapshot;

pub use generators::*;
pub use snapshot::*;
