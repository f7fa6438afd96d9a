//! Byte offset to [`Point`] conversion.
//!
//! Rows advance on `\n` only, matching how the lexer measures token extents.

use crate::syntax::Point;

/// Line start table for repeated offset to point conversion.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets of line starts; the first entry is always 0.
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    /// Scan `text` once for line breaks.
    ///
    /// # Example
    ///
    /// ```rust
    /// use verdant::syntax::{LineIndex, Point};
    ///
    /// let index = LineIndex::new(b"fn a() {}\nfn b() {}");
    /// assert_eq!(index.point(13), Point::new(1, 3));
    /// ```
    #[must_use]
    pub fn new(text: &[u8]) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            memchr::memchr_iter(b'\n', text)
                .map(|newline| u32::try_from(newline + 1).unwrap_or(u32::MAX)),
        );
        Self {
            line_starts,
            len: u32::try_from(text.len()).unwrap_or(u32::MAX),
        }
    }

    /// Point of `offset`. Offsets past the end clamp to the end of the text.
    #[must_use]
    pub fn point(&self, offset: u32) -> Point {
        let offset = offset.min(self.len);
        let row = match self.line_starts.binary_search(&offset) {
            Ok(row) => row,
            Err(row) => row.saturating_sub(1),
        };
        Point {
            row: u32::try_from(row).unwrap_or(u32::MAX),
            column: offset - self.line_starts[row],
        }
    }

    /// Byte offset of `point`, if the row exists. Columns past the line end clamp.
    #[must_use]
    pub fn offset(&self, point: Point) -> Option<u32> {
        let start = *self.line_starts.get(point.row as usize)?;
        let line_end = self
            .line_starts
            .get(point.row as usize + 1)
            .map_or(self.len, |next| next - 1);
        Some((start + point.column).min(line_end))
    }

    #[must_use]
    pub fn line_count(&self) -> u32 {
        u32::try_from(self.line_starts.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub const fn len(&self) -> u32 {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_across_lines() {
        let index = LineIndex::new(b"line 1\nline 2\nline 3");
        assert_eq!(index.point(0), Point::new(0, 0));
        assert_eq!(index.point(6), Point::new(0, 6));
        assert_eq!(index.point(7), Point::new(1, 0));
        assert_eq!(index.point(13), Point::new(1, 6));
        assert_eq!(index.point(14), Point::new(2, 0));
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_carriage_return_stays_in_column() {
        let index = LineIndex::new(b"a\r\nb");
        assert_eq!(index.point(1), Point::new(0, 1));
        assert_eq!(index.point(3), Point::new(1, 0));
    }

    #[test]
    fn test_offset_round_trips_point() {
        let text = "café\nbar\n\nbaz";
        let index = LineIndex::new(text.as_bytes());
        for offset in 0..=u32::try_from(text.len()).unwrap() {
            let point = index.point(offset);
            assert_eq!(index.offset(point), Some(offset));
        }
        assert_eq!(index.offset(Point::new(9, 0)), None);
    }

    #[test]
    fn test_empty_text() {
        let index = LineIndex::new(b"");
        assert!(index.is_empty());
        assert_eq!(index.point(10), Point::zero());
        assert_eq!(index.line_count(), 1);
    }
}
