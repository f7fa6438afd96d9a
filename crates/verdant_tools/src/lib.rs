//! Verdant Tools - developer utilities for working with verdant languages
//!
//! Parses files with the bundled grammars and renders trees and language
//! tables as text, Graphviz or JSON.

pub mod cli;
pub mod visualize;

pub use visualize::*;
