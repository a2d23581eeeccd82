//! Incremental source-map builder driven by the transpiler's emit loop.

use crate::{ByteOffset, LineIndex, MapError, MapLines, Segment};
use base64::prelude::*;
use serde::{Deserialize, Serialize};

/// The version-3 JSON envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapJson {
    /// Always 3.
    pub version: u32,
    /// The generated file name.
    pub file: String,
    /// Source file names referenced by the mappings.
    pub sources: Vec<String>,
    /// Embedded source texts, parallel to `sources`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    /// Interned symbol names.
    #[serde(default)]
    pub names: Vec<String>,
    /// The `;`/`,`-separated base64-VLQ mapping stream.
    pub mappings: String,
}

/// A source map under construction for a single transpiled file.
///
/// The builder accumulates resolved-form lines as output is emitted:
/// `update` appends one segment per emitted sub-line, `render` serializes
/// the wire form, and `inline_comment` packages the whole document as a
/// trailing data-URL comment.
///
/// Once handed off to the host, a map's lines are conceptually frozen; the
/// one sanctioned later mutation is [`rewrite_inline_map`] composing a
/// downstream map into them in place.
///
/// [`rewrite_inline_map`]: crate::rewrite_inline_map
#[derive(Debug, Clone)]
pub struct SourceMap {
    lines: MapLines,
    /// Current generated line index.
    line: usize,
    /// Generated columns consumed since the last appended segment.
    col_offset: u32,
    /// Current absolute source line.
    src_line: u32,
    /// Current absolute source column.
    src_col: u32,
    source: String,
    line_index: LineIndex,
}

impl SourceMap {
    /// Creates a builder over the given source text.
    pub fn new(source: &str) -> Self {
        Self {
            lines: vec![Vec::new()],
            line: 0,
            col_offset: 0,
            src_line: 0,
            src_col: 0,
            source: source.to_owned(),
            line_index: LineIndex::new(source),
        }
    }

    /// The resolved mapping lines accumulated so far.
    #[inline]
    pub fn lines(&self) -> &MapLines {
        &self.lines
    }

    /// Replaces the mapping lines wholesale.
    ///
    /// Only [`rewrite_inline_map`](crate::rewrite_inline_map) should reach
    /// for this after the map has been handed off.
    #[inline]
    pub fn set_lines(&mut self, lines: MapLines) {
        self.lines = lines;
    }

    /// Consumes the builder, yielding its resolved lines.
    #[inline]
    pub fn into_lines(self) -> MapLines {
        self.lines
    }

    /// The source text this map was built over.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Records one emitted output fragment.
    ///
    /// `input_pos` is the byte offset in the source the fragment was
    /// emitted for; when absent the fragment is synthetic and only widens
    /// the unmapped span. `col_offset` shifts the resolved source column
    /// (and becomes the source column of continuation lines).
    ///
    /// Multi-line fragments advance the generated line per terminator,
    /// advancing the source line in lockstep. No empty segment is ever
    /// appended, and an unmapped segment is never appended at column zero
    /// of a line.
    pub fn update(&mut self, chunk: &str, input_pos: Option<ByteOffset>, col_offset: u32) {
        if let Some(pos) = input_pos {
            let lc = self.line_index.line_col(pos);
            self.src_line = lc.line;
            self.src_col = lc.col + col_offset;
        }

        for (i, part) in split_output_lines(chunk).into_iter().enumerate() {
            if i > 0 {
                self.lines.push(Vec::new());
                self.line += 1;
                self.col_offset = 0;
                self.src_line += 1;
                self.src_col = col_offset;
            }

            let gen_col_delta = self.col_offset;
            if input_pos.is_some() {
                self.lines[self.line].push(Segment::Mapped {
                    gen_col_delta,
                    src_file: 0,
                    src_line: self.src_line,
                    src_col: self.src_col,
                    name: None,
                });
                self.col_offset = 0;
            } else if gen_col_delta != 0 {
                self.lines[self.line].push(Segment::Unmapped { gen_col_delta });
                self.col_offset = 0;
            }

            self.col_offset += part.len() as u32;
            self.src_col += part.len() as u32;
        }
    }

    /// Serializes the accumulated lines to the wire form.
    ///
    /// Source line/column deltas run across the entire mapping; the
    /// generated-column delta resets per line by construction.
    pub fn render(&self) -> String {
        encode_mappings(&self.lines)
    }

    /// Assembles the version-3 envelope.
    pub fn to_json(&self, src_name: &str, out_name: &str) -> SourceMapJson {
        SourceMapJson {
            version: 3,
            file: out_name.to_owned(),
            sources: vec![src_name.to_owned()],
            sources_content: Some(vec![Some(self.source.clone())]),
            names: Vec::new(),
            mappings: self.render(),
        }
    }

    /// Renders the trailing inline-map comment for the generated file.
    pub fn inline_comment(&self, src_name: &str, out_name: &str) -> Result<String, MapError> {
        let json = serde_json::to_string(&self.to_json(src_name, out_name))?;
        let payload = BASE64_STANDARD.encode(json);
        // The "//#" prefix is assembled from two fragments so this source
        // file itself never contains a recognizable map comment.
        Ok(format!(
            "{}{} sourceMappingURL=data:application/json;base64,{}",
            "//", "#", payload
        ))
    }
}

/// Serializes resolved lines to the `;`/`,`-separated wire form.
///
/// The counterpart of [`decode_mappings`](crate::decode_mappings): source
/// line/column come in absolute and leave as stream-wide deltas, while
/// generated-column deltas and the source-file and name fields are emitted
/// as stored.
pub fn encode_mappings(lines: &MapLines) -> String {
    let mut out = String::new();
    let mut last_src_line: i64 = 0;
    let mut last_src_col: i64 = 0;

    for (li, line) in lines.iter().enumerate() {
        if li > 0 {
            out.push(';');
        }
        for (si, segment) in line.iter().enumerate() {
            if si > 0 {
                out.push(',');
            }
            match *segment {
                Segment::Unmapped { gen_col_delta } => {
                    crate::vlq::encode(i64::from(gen_col_delta), &mut out);
                }
                Segment::Mapped {
                    gen_col_delta,
                    src_file,
                    src_line,
                    src_col,
                    name,
                } => {
                    crate::vlq::encode(i64::from(gen_col_delta), &mut out);
                    crate::vlq::encode(src_file, &mut out);
                    crate::vlq::encode(i64::from(src_line) - last_src_line, &mut out);
                    crate::vlq::encode(i64::from(src_col) - last_src_col, &mut out);
                    last_src_line = i64::from(src_line);
                    last_src_col = i64::from(src_col);
                    if let Some(name) = name {
                        crate::vlq::encode(name, &mut out);
                    }
                }
            }
        }
    }

    out
}

/// Splits an output chunk on `\r\n`, `\r`, or `\n`.
///
/// Always yields at least one (possibly empty) part; a trailing terminator
/// yields a trailing empty part, which is how a fragment opens the next
/// generated line.
fn split_output_lines(chunk: &str) -> Vec<&str> {
    let bytes = chunk.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                parts.push(&chunk[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                parts.push(&chunk[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    parts.push(&chunk[start..]);
    parts
}
