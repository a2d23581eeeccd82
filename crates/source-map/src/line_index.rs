//! Line table for offset ↔ line/column conversion.

use crate::ByteOffset;
use text_size::TextSize;

/// A line and column position (0-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LineCol {
    /// 0-indexed line number.
    pub line: u32,
    /// 0-indexed column (byte offset within the line).
    pub col: u32,
}

impl LineCol {
    /// Creates a new line/column position.
    #[inline]
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// An index for converting byte offsets to line/column positions.
///
/// The index stores the byte offset *after* each line terminator (`\r\n`,
/// `\r`, or `\n`) plus one final entry at end-of-input, so `line_ends[i]`
/// is the exclusive end of line `i`. Lookups are O(log n).
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_ends: Vec<ByteOffset>,
}

impl LineIndex {
    /// Creates a new line index from source text.
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut line_ends = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    i += 1;
                    line_ends.push(TextSize::from(i as u32));
                }
                b'\r' => {
                    i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                    line_ends.push(TextSize::from(i as u32));
                }
                _ => i += 1,
            }
        }

        // End-of-input closes the final line, even when it is empty.
        line_ends.push(TextSize::from(text.len() as u32));

        Self { line_ends }
    }

    /// Returns the number of lines in the source.
    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_ends.len()
    }

    /// Converts a byte offset to a line/column position.
    ///
    /// The line is the first whose exclusive end lies beyond `offset`;
    /// offsets at or past end-of-input clamp to the final line.
    pub fn line_col(&self, offset: ByteOffset) -> LineCol {
        let pos = u32::from(offset);
        let line = self.line_ends.partition_point(|&end| u32::from(end) <= pos);
        let line = line.min(self.line_ends.len() - 1);
        let line_start = if line == 0 {
            0
        } else {
            u32::from(self.line_ends[line - 1])
        };

        LineCol {
            line: line as u32,
            col: pos.saturating_sub(line_start),
        }
    }

    /// Converts a line/column position to a byte offset.
    ///
    /// Returns `None` if the line is out of bounds.
    pub fn offset(&self, line_col: LineCol) -> Option<ByteOffset> {
        let line = line_col.line as usize;
        if line >= self.line_ends.len() {
            return None;
        }

        let line_start = if line == 0 {
            0
        } else {
            u32::from(self.line_ends[line - 1])
        };
        Some(TextSize::from(line_start + line_col.col))
    }
}
