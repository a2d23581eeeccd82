//! Resolved mapping segments.
//!
//! A segment anchors one generated column on one line of transpiled
//! output. In the resolved (in-memory) form the generated column stays a
//! within-line delta while source line and column are absolute; only the
//! wire form carries source deltas.

/// One anchor in a mapping line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// A span of generated output with no source correspondence.
    Unmapped {
        /// Generated-column delta from the previous segment on this line.
        gen_col_delta: u32,
    },
    /// A generated column mapped to an absolute source position.
    Mapped {
        /// Generated-column delta from the previous segment on this line.
        gen_col_delta: u32,
        /// Source file index, carried verbatim from the wire form.
        src_file: i64,
        /// Absolute 0-indexed source line.
        src_line: u32,
        /// Absolute 0-indexed source column.
        src_col: u32,
        /// Interned symbol-name index, carried verbatim when present.
        name: Option<i64>,
    },
}

/// The resolved form of a whole map: one `Vec<Segment>` per generated line,
/// segments ordered by increasing generated column.
pub type MapLines = Vec<Vec<Segment>>;

impl Segment {
    /// The generated-column delta this segment contributes to its line.
    #[inline]
    pub fn gen_col_delta(&self) -> u32 {
        match *self {
            Segment::Unmapped { gen_col_delta } | Segment::Mapped { gen_col_delta, .. } => {
                gen_col_delta
            }
        }
    }

    /// Whether this segment carries a source position.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self, Segment::Mapped { .. })
    }

    /// The absolute source position, if mapped.
    #[inline]
    pub fn source_position(&self) -> Option<(u32, u32)> {
        match *self {
            Segment::Mapped {
                src_line, src_col, ..
            } => Some((src_line, src_col)),
            Segment::Unmapped { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let unmapped = Segment::Unmapped { gen_col_delta: 3 };
        assert_eq!(unmapped.gen_col_delta(), 3);
        assert!(!unmapped.is_mapped());
        assert_eq!(unmapped.source_position(), None);

        let mapped = Segment::Mapped {
            gen_col_delta: 0,
            src_file: 0,
            src_line: 4,
            src_col: 7,
            name: None,
        };
        assert!(mapped.is_mapped());
        assert_eq!(mapped.source_position(), Some((4, 7)));
    }
}
