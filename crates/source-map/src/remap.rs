//! Map composition and position remapping.
//!
//! These are free functions over explicit [`MapLines`]; the only stateful
//! map object in this crate is the incremental [`SourceMap`] builder.

use crate::{MapError, MapLines, Segment, SourceMap, SourceMapJson};
use base64::prelude::*;
use regex::Regex;
use std::sync::OnceLock;

/// A source map decoded from its serialized envelope.
#[derive(Debug, Clone)]
pub struct DecodedMap {
    /// The envelope as parsed (its `mappings` field is the original wire
    /// text, not kept in sync with `lines`).
    pub document: SourceMapJson,
    /// The mappings in resolved form.
    pub lines: MapLines,
}

/// Decodes a base64-encoded version-3 map document into resolved lines.
///
/// Source line/column deltas persist across `;`-separated generated lines,
/// so resolution carries running absolutes over the whole stream. Segments
/// of arity 1 pass through; any other arity outside {4, 5} is fatal.
pub fn decode_base64_map(payload: &str) -> Result<DecodedMap, MapError> {
    let bytes = BASE64_STANDARD.decode(payload)?;
    let text = String::from_utf8(bytes)?;
    let document: SourceMapJson = serde_json::from_str(&text)?;
    if document.version != 3 {
        return Err(MapError::UnsupportedVersion(document.version));
    }
    let lines = decode_mappings(&document.mappings)?;
    Ok(DecodedMap { document, lines })
}

/// Decodes a wire-form `mappings` string into resolved lines.
pub fn decode_mappings(mappings: &str) -> Result<MapLines, MapError> {
    let mut lines = Vec::new();
    let mut src_line: i64 = 0;
    let mut src_col: i64 = 0;

    for line_text in mappings.split(';') {
        let mut line = Vec::new();
        if !line_text.is_empty() {
            for segment_text in line_text.split(',') {
                let raw = crate::vlq::decode(segment_text)?;
                match raw.len() {
                    1 => line.push(Segment::Unmapped {
                        gen_col_delta: non_negative(raw[0])?,
                    }),
                    4 | 5 => {
                        src_line += raw[2];
                        src_col += raw[3];
                        line.push(Segment::Mapped {
                            gen_col_delta: non_negative(raw[0])?,
                            src_file: raw[1],
                            src_line: non_negative(src_line)?,
                            src_col: non_negative(src_col)?,
                            name: raw.get(4).copied(),
                        });
                    }
                    arity => return Err(MapError::BadSegmentArity(arity)),
                }
            }
        }
        lines.push(line);
    }

    Ok(lines)
}

fn non_negative(value: i64) -> Result<u32, MapError> {
    u32::try_from(value).map_err(|_| MapError::OutOfRange(value))
}

/// Looks up a generated position in a resolved map.
///
/// Returns the source position of the mapped anchor that lands *exactly*
/// on `col`; positions between anchors return `None` rather than an
/// approximate match, since an inexact remap would silently corrupt
/// whatever diagnostic it feeds.
pub fn remap_position(position: (u32, u32), lines: &MapLines) -> Option<(u32, u32)> {
    let (line, col) = position;
    let segments = lines.get(line as usize)?;
    if segments.is_empty() {
        return None;
    }

    let mut generated_col: u32 = 0;
    let mut last_mapped: Option<(u32, u32)> = None;
    let mut last_mapped_col: u32 = 0;

    for segment in segments {
        generated_col += segment.gen_col_delta();
        if let Some(source) = segment.source_position() {
            last_mapped = Some(source);
            last_mapped_col = generated_col;
        }
        if generated_col >= col {
            break;
        }
    }

    if last_mapped_col != col {
        return None;
    }
    last_mapped
}

/// Projects a *source* position forward to generated coordinates.
///
/// The inverse direction of [`remap_position`], used when editor requests
/// travel toward the service. Exactness is not required here: the position
/// snaps to the nearest anchor at or before it on the same source line,
/// offset by the remaining columns. Returns the input position unchanged
/// when the map has no anchor for that source line.
pub fn forward_map_position(position: (u32, u32), lines: &MapLines) -> (u32, u32) {
    let (src_line, src_col) = position;
    let mut best: Option<(u32, u32, u32)> = None; // (anchor src_col, gen line, gen col)

    for (gen_line, segments) in lines.iter().enumerate() {
        let mut generated_col: u32 = 0;
        for segment in segments {
            generated_col += segment.gen_col_delta();
            if let Some((line, col)) = segment.source_position() {
                if line == src_line
                    && col <= src_col
                    && best.map(|(c, _, _)| col >= c).unwrap_or(true)
                {
                    best = Some((col, gen_line as u32, generated_col));
                }
            }
        }
    }

    match best {
        Some((anchor_col, gen_line, gen_col)) => (gen_line, gen_col + (src_col - anchor_col)),
        None => position,
    }
}

/// Composes a downstream map with the upstream map it was generated over.
///
/// Unmapped segments pass through. Mapped segments have their source
/// position replayed through `upstream`; when the replay is inexact the
/// segment downgrades to unmapped with its column delta preserved, so
/// later segments keep their generated columns. Names survive successful
/// remaps verbatim.
pub fn compose_lines(upstream: &MapLines, downstream: &MapLines) -> MapLines {
    downstream
        .iter()
        .map(|line| {
            line.iter()
                .map(|segment| match *segment {
                    Segment::Unmapped { .. } => *segment,
                    Segment::Mapped {
                        gen_col_delta,
                        src_file,
                        src_line,
                        src_col,
                        name,
                    } => match remap_position((src_line, src_col), upstream) {
                        Some((line, col)) => Segment::Mapped {
                            gen_col_delta,
                            src_file,
                            src_line: line,
                            src_col: col,
                            name,
                        },
                        None => Segment::Unmapped { gen_col_delta },
                    },
                })
                .collect()
        })
        .collect()
}

/// Matches a trailing inline-map comment, tolerating an optional
/// `charset=…;` parameter and trailing whitespace.
fn map_comment_regex() -> &'static Regex {
    static MAP_COMMENT: OnceLock<Regex> = OnceLock::new();
    MAP_COMMENT.get_or_init(|| {
        let pattern = format!(
            "(?:\r?\n|^){}{} sourceMappingURL=data:application/json;(?:charset=[^;]+;)?base64,([+A-Za-z0-9/]*=?=?)\\s*$",
            "//", "#",
        );
        Regex::new(&pattern).expect("inline-map comment pattern is valid")
    })
}

/// Rewrites the inline map trailer of a second-stage output file.
///
/// Strips a trailing inline-map comment from `code` if present, composes
/// the embedded (downstream) map through `upstream`'s lines, and appends a
/// fresh comment derived from `upstream`. The composition *mutates
/// `upstream`'s lines in place* — this is the one sanctioned mutation of a
/// map that has already been handed off.
pub fn rewrite_inline_map(
    code: &str,
    upstream: &mut SourceMap,
    src_path: &str,
    out_path: &str,
) -> Result<String, MapError> {
    let mut stripped = code;

    if let Some(caps) = map_comment_regex().captures(code) {
        if let (Some(whole), Some(payload)) = (caps.get(0), caps.get(1)) {
            let downstream = decode_base64_map(payload.as_str())?;
            let composed = compose_lines(upstream.lines(), &downstream.lines);
            upstream.set_lines(composed);
            stripped = &code[..whole.start()];
        }
    }

    let comment = upstream.inline_comment(src_path, out_path)?;
    Ok(format!("{stripped}\n{comment}\n"))
}
