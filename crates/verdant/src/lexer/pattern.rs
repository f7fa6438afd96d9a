//! Token patterns.
//!
//! Patterns are matched directly against the source buffer by computing the
//! set of positions where a match can end. The lexer keeps the furthest one.

use crate::lexer::SourceBuffer;
use compact_str::CompactString;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// End positions of a partial match.
pub(crate) type Ends = SmallVec<[u32; 8]>;

/// Description of the text a token may match.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "snake_case"))]
pub enum Pattern {
    /// Exact text.
    Literal(CompactString),
    /// One character from a set.
    CharClass(CharSet),
    /// `min` to `max` repetitions of a pattern; `None` means unbounded.
    Repeat {
        pattern: Box<Pattern>,
        min: u32,
        max: Option<u32>,
    },
    Seq(Vec<Pattern>),
    Choice(Vec<Pattern>),
    Optional(Box<Pattern>),
    /// Unicode identifier: XID start or `_`, then XID continue. Greedy.
    Identifier,
    /// Any single character.
    Any,
}

impl Pattern {
    #[must_use]
    pub fn literal(text: &str) -> Self {
        Self::Literal(CompactString::from(text))
    }

    #[must_use]
    pub const fn chars(set: CharSet) -> Self {
        Self::CharClass(set)
    }

    /// Zero or more repetitions.
    #[must_use]
    pub fn repeat(pattern: Self) -> Self {
        Self::Repeat {
            pattern: Box::new(pattern),
            min: 0,
            max: None,
        }
    }

    /// One or more repetitions.
    #[must_use]
    pub fn repeat1(pattern: Self) -> Self {
        Self::Repeat {
            pattern: Box::new(pattern),
            min: 1,
            max: None,
        }
    }

    #[must_use]
    pub fn seq(parts: impl IntoIterator<Item = Self>) -> Self {
        Self::Seq(parts.into_iter().collect())
    }

    #[must_use]
    pub fn choice(options: impl IntoIterator<Item = Self>) -> Self {
        Self::Choice(options.into_iter().collect())
    }

    #[must_use]
    pub fn optional(pattern: Self) -> Self {
        Self::Optional(Box::new(pattern))
    }

    #[must_use]
    pub const fn identifier() -> Self {
        Self::Identifier
    }

    /// Literal text, if this is a literal pattern.
    #[must_use]
    pub fn literal_text(&self) -> Option<&str> {
        match self {
            Self::Literal(text) => Some(text),
            _ => None,
        }
    }

    /// Whether this pattern matches `text` exactly and entirely.
    #[must_use]
    pub fn matches_exactly(&self, text: &str) -> bool {
        let mut buffer = SourceBuffer::from_bytes(text.as_bytes());
        let mut examined = 0;
        let mut ends = Ends::new();
        self.ends(&mut buffer, 0, &mut examined, &mut ends);
        let len = u32::try_from(text.len()).unwrap_or(u32::MAX);
        ends.contains(&len)
    }

    /// Longest match starting at `start`, if it consumes at least one byte.
    /// `examined` is raised to one past the furthest byte inspected.
    pub(crate) fn longest_match(
        &self,
        source: &mut SourceBuffer<'_>,
        start: u32,
        examined: &mut u32,
    ) -> Option<u32> {
        let mut ends = Ends::new();
        self.ends(source, start, examined, &mut ends);
        ends.into_iter().max().filter(|end| *end > start)
    }

    /// Append every position where a match starting at `start` can end.
    fn ends(&self, source: &mut SourceBuffer<'_>, start: u32, examined: &mut u32, out: &mut Ends) {
        match self {
            Self::Literal(text) => {
                for (offset, expected) in (0u32..).zip(text.bytes()) {
                    let position = start + offset;
                    *examined = (*examined).max(position + 1);
                    if source.byte_at(position) != Some(expected) {
                        return;
                    }
                }
                push_end(out, start + u32::try_from(text.len()).unwrap_or(u32::MAX));
            }
            Self::CharClass(set) => {
                *examined = (*examined).max(start + 1);
                if let Some((c, width)) = source.char_at(start)
                    && set.contains(c)
                {
                    *examined = (*examined).max(start + width);
                    push_end(out, start + width);
                }
            }
            Self::Any => {
                *examined = (*examined).max(start + 1);
                if let Some((_, width)) = source.char_at(start) {
                    *examined = (*examined).max(start + width);
                    push_end(out, start + width);
                }
            }
            Self::Identifier => {
                let mut position = start;
                loop {
                    *examined = (*examined).max(position + 1);
                    let Some((c, width)) = source.char_at(position) else {
                        break;
                    };
                    let accepted = if position == start {
                        c == '_' || unicode_ident::is_xid_start(c)
                    } else {
                        unicode_ident::is_xid_continue(c)
                    };
                    if !accepted {
                        break;
                    }
                    position += width;
                    *examined = (*examined).max(position);
                }
                if position > start {
                    push_end(out, position);
                }
            }
            Self::Seq(parts) => {
                let mut current: Ends = smallvec::smallvec![start];
                for part in parts {
                    let mut next = Ends::new();
                    for &position in &current {
                        part.ends(source, position, examined, &mut next);
                    }
                    if next.is_empty() {
                        return;
                    }
                    current = next;
                }
                for end in current {
                    push_end(out, end);
                }
            }
            Self::Choice(options) => {
                for option in options {
                    option.ends(source, start, examined, out);
                }
            }
            Self::Optional(inner) => {
                push_end(out, start);
                inner.ends(source, start, examined, out);
            }
            Self::Repeat { pattern, min, max } => {
                if *min == 0 {
                    push_end(out, start);
                }
                let mut current: Ends = smallvec::smallvec![start];
                let mut count = 0u32;
                while !current.is_empty() && max.is_none_or(|max| count < max) {
                    let mut next = Ends::new();
                    for &position in &current {
                        let mut step = Ends::new();
                        pattern.ends(source, position, examined, &mut step);
                        for end in step {
                            // Only advancing steps count as repetitions.
                            if end > position {
                                push_end(&mut next, end);
                            }
                        }
                    }
                    count += 1;
                    if count >= *min {
                        for &end in &next {
                            push_end(out, end);
                        }
                    }
                    current = next;
                }
            }
        }
    }
}

fn push_end(out: &mut Ends, end: u32) {
    if !out.contains(&end) {
        out.push(end);
    }
}

/// A set of characters described by inclusive ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct CharSet {
    ranges: SmallVec<[(char, char); 4]>,
    #[cfg_attr(feature = "serialize", serde(default))]
    negated: bool,
}

impl CharSet {
    /// Set of characters within any of the inclusive `ranges`.
    #[must_use]
    pub fn new(ranges: impl IntoIterator<Item = (char, char)>) -> Self {
        Self {
            ranges: ranges.into_iter().collect(),
            negated: false,
        }
    }

    #[must_use]
    pub fn single(c: char) -> Self {
        Self::new([(c, c)])
    }

    /// `[0-9]`
    #[must_use]
    pub fn digits() -> Self {
        Self::new([('0', '9')])
    }

    /// Space, tab, line feed, vertical tab, form feed and carriage return.
    #[must_use]
    pub fn whitespace() -> Self {
        Self::new([(' ', ' '), ('\t', '\r')])
    }

    /// Everything outside this set.
    #[must_use]
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    #[must_use]
    pub fn contains(&self, c: char) -> bool {
        let inside = self
            .ranges
            .iter()
            .any(|(start, end)| *start <= c && c <= *end);
        inside != self.negated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn longest(pattern: &Pattern, text: &str) -> (Option<u32>, u32) {
        let mut buffer = SourceBuffer::from_bytes(text.as_bytes());
        let mut examined = 0;
        let end = pattern.longest_match(&mut buffer, 0, &mut examined);
        (end, examined)
    }

    #[test]
    fn test_literal() {
        let pattern = Pattern::literal("fn");
        assert_eq!(longest(&pattern, "fn x"), (Some(2), 2));
        assert_eq!(longest(&pattern, "fx"), (None, 2));
        assert_eq!(longest(&pattern, "f"), (None, 2));
    }

    #[test]
    fn test_identifier_is_greedy() {
        let (end, examined) = longest(&Pattern::identifier(), "héllo_1 + x");
        assert_eq!(end, Some(8));
        assert_eq!(examined, 9);
        assert_eq!(longest(&Pattern::identifier(), "1abc").0, None);
        assert_eq!(longest(&Pattern::identifier(), "_x").0, Some(2));
    }

    #[test]
    fn test_number_and_eof_lookahead() {
        let number = Pattern::repeat1(Pattern::chars(CharSet::digits()));
        assert_eq!(longest(&number, "123"), (Some(3), 4));
        assert_eq!(longest(&number, "12a"), (Some(2), 3));
    }

    #[test]
    fn test_line_comment() {
        let comment = Pattern::seq([
            Pattern::literal("//"),
            Pattern::repeat(Pattern::chars(CharSet::single('\n').negate())),
        ]);
        assert_eq!(longest(&comment, "// hi\nfn").0, Some(5));
        assert_eq!(longest(&comment, "/ hi").0, None);
        assert_eq!(longest(&comment, "//").0, Some(2));
    }

    #[test]
    fn test_choice_optional_and_bounded_repeat() {
        let pattern = Pattern::seq([
            Pattern::choice([Pattern::literal("0x"), Pattern::literal("0")]),
            Pattern::Repeat {
                pattern: Box::new(Pattern::chars(CharSet::new([('a', 'f')]))),
                min: 0,
                max: Some(2),
            },
            Pattern::optional(Pattern::literal("!")),
        ]);
        assert_eq!(longest(&pattern, "0xabc").0, Some(4));
        assert_eq!(longest(&pattern, "0ab!").0, Some(4));
        assert_eq!(longest(&pattern, "0").0, Some(1));
    }

    #[test]
    fn test_empty_match_is_rejected() {
        let pattern = Pattern::repeat(Pattern::chars(CharSet::digits()));
        assert_eq!(longest(&pattern, "abc").0, None);
    }

    #[test]
    fn test_matches_exactly() {
        assert!(Pattern::identifier().matches_exactly("while"));
        assert!(!Pattern::identifier().matches_exactly("+"));
        assert!(!Pattern::identifier().matches_exactly("a b"));
    }

    #[test]
    fn test_whitespace_set() {
        let set = CharSet::whitespace();
        assert!(set.contains(' '));
        assert!(set.contains('\n'));
        assert!(!set.contains('x'));
        assert!(set.clone().negate().contains('x'));
    }
}
