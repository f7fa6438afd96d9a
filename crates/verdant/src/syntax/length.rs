//! Row/column points and relative lengths.
//!
//! Green nodes store only their [`Length`]; absolute positions are derived
//! while walking down from the root. Lengths add with line semantics: when
//! the right operand spans rows, its column replaces the left column.

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Zero-based row and byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self { row: 0, column: 0 }
    }

    /// Point reached after advancing over `text` from the origin.
    #[must_use]
    pub fn extent_of(text: &[u8]) -> Self {
        let mut rows = 0u32;
        let mut line_start = 0usize;
        for newline in memchr::memchr_iter(b'\n', text) {
            rows += 1;
            line_start = newline + 1;
        }
        Self {
            row: rows,
            column: u32::try_from(text.len() - line_start).unwrap_or(u32::MAX),
        }
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        if rhs.row > 0 {
            Self::new(self.row + rhs.row, rhs.column)
        } else {
            Self::new(self.row, self.column + rhs.column)
        }
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        if self.row > rhs.row {
            Self::new(self.row - rhs.row, self.column)
        } else {
            Self::new(0, self.column.saturating_sub(rhs.column))
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// A span of text measured both in bytes and as a row/column extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Length {
    pub bytes: u32,
    pub extent: Point,
}

impl Length {
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            bytes: 0,
            extent: Point::zero(),
        }
    }

    #[must_use]
    pub const fn new(bytes: u32, extent: Point) -> Self {
        Self { bytes, extent }
    }

    /// Length of `text`.
    #[must_use]
    pub fn of(text: &[u8]) -> Self {
        Self {
            bytes: u32::try_from(text.len()).unwrap_or(u32::MAX),
            extent: Point::extent_of(text),
        }
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.bytes == 0
    }

    /// `self - rhs`, clamped at zero when `rhs` is larger.
    #[must_use]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        if self.bytes <= rhs.bytes {
            return Self::zero();
        }
        self - rhs
    }
}

impl Add for Length {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            bytes: self.bytes + rhs.bytes,
            extent: self.extent + rhs.extent,
        }
    }
}

impl AddAssign for Length {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Length {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            bytes: self.bytes.saturating_sub(rhs.bytes),
            extent: self.extent - rhs.extent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_add_follows_lines() {
        assert_eq!(Point::new(1, 4) + Point::new(0, 3), Point::new(1, 7));
        assert_eq!(Point::new(1, 4) + Point::new(2, 1), Point::new(3, 1));
    }

    #[test]
    fn test_point_sub_inverts_add() {
        let a = Point::new(2, 5);
        let b = Point::new(0, 3);
        assert_eq!((a + b) - a, b);
        let c = Point::new(1, 0);
        assert_eq!((a + c) - a, c);
    }

    #[test]
    fn test_extent_of_text() {
        assert_eq!(Point::extent_of(b"abc"), Point::new(0, 3));
        assert_eq!(Point::extent_of(b"ab\ncd"), Point::new(1, 2));
        assert_eq!(Point::extent_of(b"ab\n"), Point::new(1, 0));
        assert_eq!(Point::extent_of(b""), Point::zero());
    }

    #[test]
    fn test_length_arithmetic() {
        let a = Length::of(b"fn f()\n");
        let b = Length::of(b"{ 1 }");
        let sum = a + b;
        assert_eq!(sum, Length::of(b"fn f()\n{ 1 }"));
        assert_eq!(sum - a, b);
        assert_eq!(a.saturating_sub(sum), Length::zero());
    }
}
