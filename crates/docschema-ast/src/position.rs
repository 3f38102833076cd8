//! Line/character positions for reporting
#![allow(clippy::must_use_candidate)] // Constructor helpers are clear at call sites without #[must_use].

use crate::node::TextRange;
use serde::{Deserialize, Serialize};

/// Zero-based line and character position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (0-indexed)
    pub line: usize,

    /// Character on the line (0-indexed, counted in chars)
    pub character: usize,
}

/// Start/end pair of positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Position {
    /// Create a new position
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

impl Range {
    /// Create a new range
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Precomputed line starts for offset/position conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Index the given text
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Number of lines
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Line containing `offset`. Offsets past the end clamp to the last line.
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.len);
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    /// Byte offset where `line` starts
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Byte range of `line`, excluding its line break
    pub fn line_range(&self, text: &str, line: usize) -> Option<TextRange> {
        let start = self.line_start(line)?;
        let mut end = self.line_start(line + 1).unwrap_or(self.len);
        let bytes = text.as_bytes();
        while end > start && matches!(bytes.get(end - 1), Some(b'\n' | b'\r')) {
            end -= 1;
        }
        Some(TextRange::from_bounds(start, end))
    }

    /// Convert a byte offset to a position
    pub fn position(&self, text: &str, offset: usize) -> Position {
        let offset = floor_char_boundary(text, offset.min(self.len));
        let line = self.line_of(offset);
        let start = self.line_starts[line];
        let character = text[start..offset].chars().count();
        Position { line, character }
    }

    /// Convert a byte range to a position range
    pub fn range(&self, text: &str, range: TextRange) -> Range {
        Range {
            start: self.position(text, range.offset),
            end: self.position(text, range.end()),
        }
    }

    /// Convert a position back to a byte offset, clamping to the line end
    pub fn offset(&self, text: &str, position: Position) -> usize {
        let Some(line) = self.line_range(text, position.line) else {
            return self.len;
        };
        let line_text = &text[line.offset..line.end()];
        let within = line_text
            .char_indices()
            .nth(position.character)
            .map_or(line_text.len(), |(offset, _)| offset);
        line.offset + within
    }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_across_lines() {
        let text = "a: 1\nbb: 2\n\nc";
        let index = LineIndex::new(text);

        assert_eq!(index.line_count(), 4);
        assert_eq!(index.position(text, 0), Position::new(0, 0));
        assert_eq!(index.position(text, 5), Position::new(1, 0));
        assert_eq!(index.position(text, 8), Position::new(1, 3));
        assert_eq!(index.position(text, 11), Position::new(2, 0));
        assert_eq!(index.position(text, 12), Position::new(3, 0));
    }

    #[test]
    fn test_offset_round_trip_clamps() {
        let text = "key: value\nnext";
        let index = LineIndex::new(text);

        assert_eq!(index.offset(text, Position::new(1, 2)), 13);
        assert_eq!(index.offset(text, Position::new(0, 99)), 10);
        assert_eq!(index.offset(text, Position::new(9, 0)), text.len());
    }

    #[test]
    fn test_line_range_strips_crlf() {
        let text = "one\r\ntwo";
        let index = LineIndex::new(text);
        let line = index.line_range(text, 0).unwrap();
        assert_eq!(&text[line.offset..line.end()], "one");
    }

    #[test]
    fn test_multibyte_characters_counted_once() {
        let text = "név: é";
        let index = LineIndex::new(text);
        assert_eq!(index.position(text, text.len()), Position::new(0, 6));
    }
}
