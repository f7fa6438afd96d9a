//! Source text access for the lexer.
//!
//! Text is either an in-memory buffer or pulled in chunks from an
//! [`InputSource`]. Chunks are requested only when the lexer needs bytes
//! past what has been loaded.

use crate::syntax::{Length, Point};
use std::borrow::Cow;

/// Pull callback for streaming input.
///
/// `read_chunk` appends the bytes starting at `byte_offset` (whose position is
/// `point`) to `buf`. Appending nothing signals end of input.
pub trait InputSource {
    fn read_chunk(&mut self, byte_offset: u32, point: Point, buf: &mut Vec<u8>);
}

impl<F> InputSource for F
where
    F: FnMut(u32, Point, &mut Vec<u8>),
{
    fn read_chunk(&mut self, byte_offset: u32, point: Point, buf: &mut Vec<u8>) {
        self(byte_offset, point, buf);
    }
}

/// Lazily loaded view of the text being parsed.
pub struct SourceBuffer<'a> {
    bytes: Cow<'a, [u8]>,
    source: Option<&'a mut dyn InputSource>,
    loaded: Length,
    chunk: Vec<u8>,
}

impl<'a> SourceBuffer<'a> {
    /// Complete in-memory text.
    #[must_use]
    pub fn from_bytes(text: &'a [u8]) -> Self {
        Self {
            bytes: Cow::Borrowed(text),
            source: None,
            loaded: Length::zero(),
            chunk: Vec::new(),
        }
    }

    /// Text pulled from `source` on demand.
    pub fn streaming(source: &'a mut dyn InputSource) -> Self {
        Self {
            bytes: Cow::Owned(Vec::new()),
            source: Some(source),
            loaded: Length::zero(),
            chunk: Vec::new(),
        }
    }

    /// Load until at least `end` bytes are available or input is exhausted.
    fn ensure(&mut self, end: usize) -> bool {
        while self.bytes.len() < end {
            let Some(source) = self.source.as_mut() else {
                return false;
            };
            self.chunk.clear();
            source.read_chunk(self.loaded.bytes, self.loaded.extent, &mut self.chunk);
            if self.chunk.is_empty() {
                self.source = None;
                return false;
            }
            self.loaded += Length::of(&self.chunk);
            self.bytes.to_mut().extend_from_slice(&self.chunk);
        }
        true
    }

    /// Byte at `position`, or `None` at end of input.
    pub fn byte_at(&mut self, position: u32) -> Option<u8> {
        let index = position as usize;
        if !self.ensure(index + 1) {
            return None;
        }
        self.bytes.get(index).copied()
    }

    /// Character starting at `position` and its UTF-8 width. Invalid bytes
    /// decode as U+FFFD one byte wide.
    pub fn char_at(&mut self, position: u32) -> Option<(char, u32)> {
        let first = self.byte_at(position)?;
        if first.is_ascii() {
            return Some((char::from(first), 1));
        }
        let width = match first {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Some((char::REPLACEMENT_CHARACTER, 1)),
        };
        let start = position as usize;
        self.ensure(start + width);
        let end = (start + width).min(self.bytes.len());
        match std::str::from_utf8(&self.bytes[start..end])
            .ok()
            .and_then(|text| text.chars().next())
        {
            Some(c) => Some((c, u32::try_from(width).unwrap_or(1))),
            None => Some((char::REPLACEMENT_CHARACTER, 1)),
        }
    }

    /// Bytes in `start..end`, loading them first. Truncated at end of input.
    pub fn slice(&mut self, start: u32, end: u32) -> &[u8] {
        self.ensure(end as usize);
        let end = (end as usize).min(self.bytes.len());
        let start = (start as usize).min(end);
        &self.bytes[start..end]
    }

    /// Whether `position` is at or past the end of input.
    pub fn is_eof(&mut self, position: u32) -> bool {
        self.byte_at(position).is_none()
    }

    /// Load everything and return the full text.
    pub fn into_text(mut self) -> Cow<'a, [u8]> {
        self.ensure(usize::MAX);
        self.bytes
    }
}

impl std::fmt::Debug for SourceBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceBuffer")
            .field("loaded", &self.bytes.len())
            .field("streaming", &self.source.is_some())
            .finish()
    }
}
