//! # Snapshot Testing Utilities
//!
//! Compare parse trees against files checked into the repository.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use verdant::testing::SnapshotTester;
//!
//! let tester = SnapshotTester::new("tests/snapshots");
//! tester.assert_snapshot("function", &tree);
//! ```
//!
//! Run with `UPDATE_SNAPSHOTS=1` to write the current output instead of
//! comparing.

use crate::tree::{Node, Tree};
use std::fmt::Write;
use std::path::PathBuf;

/// Snapshot tester for parse trees
pub struct SnapshotTester {
    snapshot_dir: PathBuf,
    update_mode: bool,
}

impl SnapshotTester {
    #[must_use]
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        let update_mode = std::env::var("UPDATE_SNAPSHOTS").is_ok()
            || std::env::var("VERDANT_UPDATE_SNAPSHOTS").is_ok();
        Self {
            snapshot_dir: snapshot_dir.into(),
            update_mode,
        }
    }

    #[must_use]
    pub const fn with_update_mode(mut self, update: bool) -> Self {
        self.update_mode = update;
        self
    }

    /// Assert that `tree` renders to the stored snapshot.
    ///
    /// # Panics
    /// Panics if the snapshot doesn't match (and update mode is disabled)
    pub fn assert_snapshot(&self, name: &str, tree: &Tree) {
        self.check_snapshot(name, &format_tree(tree));
    }

    fn check_snapshot(&self, name: &str, actual: &str) {
        let path = self.snapshot_dir.join(format!("{name}.snap"));

        if self.update_mode {
            std::fs::create_dir_all(&self.snapshot_dir).ok();
            std::fs::write(&path, actual).expect("Failed to write snapshot");
            return;
        }

        if path.exists() {
            let expected = std::fs::read_to_string(&path).expect("Failed to read snapshot");
            assert!(
                actual == expected,
                "Snapshot mismatch for '{name}':\n\
                --- Expected ---\n{expected}\n\
                --- Actual ---\n{actual}\n\
                \n\
                To update snapshots, run with UPDATE_SNAPSHOTS=1"
            );
        } else {
            panic!(
                "Snapshot '{name}' not found at {}.\n\
                To create it, run with UPDATE_SNAPSHOTS=1",
                path.display()
            );
        }
    }
}

/// The s-expression on the first line, then one line per visible node with
/// its field, kind and range.
#[must_use]
pub fn format_tree(tree: &Tree) -> String {
    let mut out = tree.to_sexp();
    out.push('\n');
    format_node(&mut out, tree.root_node(), 0);
    out
}

fn format_node(out: &mut String, node: Node<'_>, indent: usize) {
    let _ = write!(out, "{}", "  ".repeat(indent));
    if let Some(field) = node.field_name() {
        let _ = write!(out, "{field}: ");
    }
    let mut flags = String::new();
    if node.is_missing() {
        flags.push_str(" missing");
    }
    if node.is_extra() {
        flags.push_str(" extra");
    }
    let start = node.start_point();
    let end = node.end_point();
    let _ = writeln!(
        out,
        "{:?} [{}, {}] - [{}, {}]{flags}",
        node.kind(),
        start.row,
        start.column,
        end.row,
        end.column,
    );
    for child in node.children() {
        format_node(out, child, indent + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParseOptions, Parser};
    use crate::testing::grammars;

    #[test]
    fn test_format_tree() {
        let mut parser = Parser::new();
        parser.set_language(grammars::toy()).unwrap();
        let tree = parser.parse("fn f() {\n  1 }", None, &ParseOptions::default()).unwrap();
        let formatted = format_tree(&tree);
        let mut lines = formatted.lines();
        assert_eq!(
            lines.next(),
            Some("(source_file (function_definition name: (identifier) parameters: (parameter_list) body: (block (number))))")
        );
        assert_eq!(lines.next(), Some("\"source_file\" [0, 0] - [1, 5]"));
        assert_eq!(lines.next(), Some("  \"function_definition\" [0, 0] - [1, 5]"));
        assert_eq!(lines.next(), Some("    \"fn\" [0, 0] - [0, 2]"));
        assert_eq!(lines.next(), Some("    name: \"identifier\" [0, 3] - [0, 4]"));
    }

    #[test]
    fn test_update_mode_writes_snapshot() {
        let dir = std::env::temp_dir().join(format!("verdant-snapshots-{}", std::process::id()));
        let mut parser = Parser::new();
        parser.set_language(grammars::toy()).unwrap();
        let tree = parser.parse("fn f() {}", None, &ParseOptions::default()).unwrap();

        SnapshotTester::new(&dir)
            .with_update_mode(true)
            .assert_snapshot("empty_function", &tree);
        SnapshotTester::new(&dir)
            .with_update_mode(false)
            .assert_snapshot("empty_function", &tree);
        std::fs::remove_dir_all(&dir).ok();
    }
}
