#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open byte range `start..end` in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TextRange {
    start: u32,
    end: u32,
}

impl TextRange {
    /// Create a range. `end` is clamped so that it never precedes `start`.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        let end = if end < start { start } else { end };
        Self { start, end }
    }

    #[must_use]
    pub const fn at(start: u32, len: u32) -> Self {
        Self::new(start, start.saturating_add(len))
    }

    #[must_use]
    pub const fn empty(offset: u32) -> Self {
        Self::new(offset, offset)
    }

    #[inline]
    #[must_use]
    pub const fn start(self) -> u32 {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end(self) -> u32 {
        self.end
    }

    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.end - self.start
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` lies inside the half-open range.
    #[must_use]
    pub const fn contains(self, offset: u32) -> bool {
        offset >= self.start && offset < self.end
    }

    #[must_use]
    pub const fn contains_range(self, other: Self) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Overlapping part of two ranges, if it is non-empty.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Self { start, end })
    }

    /// Whether the ranges overlap or share an endpoint.
    #[must_use]
    pub const fn touches(self, other: Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Smallest range covering both.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    #[must_use]
    pub const fn to_usize(self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl From<TextRange> for std::ops::Range<usize> {
    fn from(range: TextRange) -> Self {
        range.to_usize()
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(feature = "diagnostics")]
impl From<TextRange> for miette::SourceSpan {
    fn from(range: TextRange) -> Self {
        Self::new(
            miette::SourceOffset::from(range.start() as usize),
            range.len() as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_inverted_end() {
        let range = TextRange::new(10, 4);
        assert_eq!(range.start(), 10);
        assert_eq!(range.end(), 10);
        assert!(range.is_empty());
    }

    #[test]
    fn test_contains_is_half_open() {
        let range = TextRange::new(10, 20);
        assert!(!range.contains(9));
        assert!(range.contains(10));
        assert!(range.contains(19));
        assert!(!range.contains(20));
        assert!(!TextRange::empty(5).contains(5));
    }

    #[test]
    fn test_intersect_and_touch() {
        let a = TextRange::new(10, 20);
        let b = TextRange::new(15, 25);
        let c = TextRange::new(20, 30);

        assert_eq!(a.intersect(b), Some(TextRange::new(15, 20)));
        assert_eq!(a.intersect(c), None);
        assert!(a.touches(c));
        assert!(!a.touches(TextRange::new(21, 22)));
    }

    #[test]
    fn test_cover_and_display() {
        let a = TextRange::at(3, 4);
        let b = TextRange::new(10, 12);
        assert_eq!(a.cover(b), TextRange::new(3, 12));
        assert_eq!(format!("{}", a.cover(b)), "3..12");
        assert_eq!(std::ops::Range::<usize>::from(b), 10..12);
    }
}
