//! External scanner hook for context-sensitive tokens.

use crate::language::{Symbol, SymbolSet};
use crate::lexer::SourceBuffer;
use crate::syntax::Length;
use std::sync::Arc;

/// Grammar-supplied tokenizer consulted before the built-in lexer.
///
/// A scanner is created per parse. Its state is serialized after every
/// external token and restored before each scan, so the same scanner can
/// serve every parse head.
pub trait ExternalScanner: Send {
    /// Try to produce one of the `valid` external tokens at the cursor.
    /// Returning `None` defers to the built-in lexer.
    fn scan(&mut self, cursor: &mut ScanCursor<'_, '_>, valid: &SymbolSet) -> Option<Symbol>;

    /// Append the scanner state to `buf`.
    fn serialize(&self, buf: &mut Vec<u8>);

    /// Restore the state written by [`serialize`](Self::serialize). An empty
    /// slice means the initial state.
    fn deserialize(&mut self, state: &[u8]);
}

/// Creates a fresh scanner for each parse.
pub type ScannerFactory = Arc<dyn Fn() -> Box<dyn ExternalScanner> + Send + Sync>;

/// Character-level view of the input handed to an [`ExternalScanner`].
pub struct ScanCursor<'s, 'a> {
    source: &'s mut SourceBuffer<'a>,
    start: u32,
    position: u32,
    column: u32,
    marked_end: Option<u32>,
    examined: u32,
}

impl<'s, 'a> ScanCursor<'s, 'a> {
    pub(crate) fn new(source: &'s mut SourceBuffer<'a>, start: Length) -> Self {
        Self {
            source,
            start: start.bytes,
            position: start.bytes,
            column: start.extent.column,
            marked_end: None,
            examined: start.bytes,
        }
    }

    /// Character at the cursor, or `None` at end of input.
    pub fn lookahead(&mut self) -> Option<char> {
        self.examined = self.examined.max(self.position + 1);
        self.source.char_at(self.position).map(|(c, _)| c)
    }

    /// Move past the character at the cursor.
    pub fn advance(&mut self) {
        self.examined = self.examined.max(self.position + 1);
        if let Some((c, width)) = self.source.char_at(self.position) {
            self.position += width;
            self.examined = self.examined.max(self.position);
            if c == '\n' {
                self.column = 0;
            } else {
                self.column += width;
            }
        }
    }

    /// Fix the token end at the current position. Without a mark the token
    /// ends wherever the cursor stops.
    pub fn mark_end(&mut self) {
        self.marked_end = Some(self.position);
    }

    /// Byte offset of the cursor.
    #[must_use]
    pub const fn position(&self) -> u32 {
        self.position
    }

    /// Byte column of the cursor.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    pub fn is_at_eof(&mut self) -> bool {
        self.examined = self.examined.max(self.position + 1);
        self.source.is_eof(self.position)
    }

    pub(crate) fn token_end(&self) -> u32 {
        self.marked_end.unwrap_or(self.position).max(self.start)
    }

    pub(crate) const fn examined(&self) -> u32 {
        self.examined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Point;

    #[test]
    fn test_cursor_tracks_column_and_end() {
        let mut buffer = SourceBuffer::from_bytes(b"ab\ncd");
        let mut cursor = ScanCursor::new(&mut buffer, Length::new(0, Point::new(0, 0)));
        assert_eq!(cursor.lookahead(), Some('a'));
        cursor.advance();
        cursor.advance();
        cursor.mark_end();
        cursor.advance();
        assert_eq!(cursor.column(), 0);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.token_end(), 2);
        assert_eq!(cursor.examined(), 3);
        assert!(!cursor.is_at_eof());
    }

    #[test]
    fn test_advance_at_eof_is_noop() {
        let mut buffer = SourceBuffer::from_bytes(b"x");
        let mut cursor = ScanCursor::new(&mut buffer, Length::of(b"x"));
        assert!(cursor.is_at_eof());
        cursor.advance();
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.examined(), 2);
        assert_eq!(cursor.token_end(), 1);
    }
}
