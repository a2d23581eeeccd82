//! Standard version-3 source maps for the transpilation pipeline.
//!
//! This crate generates mappings while transpiled output is emitted,
//! serializes them to the standard `;`/`,`-separated base64-VLQ wire form,
//! and composes maps across transpilation stages so diagnostics against
//! final output can be projected back to original source positions.

mod builder;
mod error;
mod line_index;
mod remap;
mod segment;
pub mod vlq;

pub use builder::{encode_mappings, SourceMap, SourceMapJson};
pub use error::MapError;
pub use line_index::{LineCol, LineIndex};
pub use remap::{
    compose_lines, decode_base64_map, decode_mappings, forward_map_position, remap_position,
    rewrite_inline_map, DecodedMap,
};
pub use segment::{MapLines, Segment};

/// A byte offset into a source string.
pub type ByteOffset = text_size::TextSize;
