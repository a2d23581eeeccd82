//! Property tests for the mapping round-trip laws.
//!
//! The wire format's single most bug-prone rule is that source line/column
//! deltas persist across generated lines while the generated column resets
//! per line; these properties pin that down from three directions: the VLQ
//! codec, the encode/decode pair, and the builder against an independent
//! model of its emission loop.

use proptest::prelude::*;
use source_map::{
    decode_mappings, encode_mappings, remap_position, vlq, ByteOffset, LineIndex, MapLines,
    Segment, SourceMap,
};
use std::collections::{HashMap, HashSet};

fn encoded(value: i64) -> String {
    let mut out = String::new();
    vlq::encode(value, &mut out);
    out
}

fn segment_strategy() -> impl Strategy<Value = Segment> {
    prop_oneof![
        (1u32..16).prop_map(|gen_col_delta| Segment::Unmapped { gen_col_delta }),
        (0u32..16, 0i64..3, 0u32..64, 0u32..64, proptest::option::of(0i64..8)).prop_map(
            |(gen_col_delta, src_file, src_line, src_col, name)| Segment::Mapped {
                gen_col_delta,
                src_file,
                src_line,
                src_col,
                name,
            }
        ),
    ]
}

fn lines_strategy() -> impl Strategy<Value = MapLines> {
    prop::collection::vec(prop::collection::vec(segment_strategy(), 0..6), 1..6)
}

/// One call to `SourceMap::update`, as the transpiler's emit loop makes them.
#[derive(Debug, Clone)]
enum Update {
    Mapped {
        chunk: String,
        pos: u32,
        col_offset: u32,
    },
    Unmapped {
        chunk: String,
    },
}

const SOURCE: &str = "alpha\nbravo\ncharlie\ndelta";

fn chunk_strategy() -> impl Strategy<Value = String> {
    ("[ab]{1,4}", any::<bool>(), "[ab]{0,3}").prop_map(|(head, newline, tail)| {
        if newline {
            format!("{head}\n{tail}")
        } else {
            head
        }
    })
}

fn update_strategy() -> impl Strategy<Value = Update> {
    prop_oneof![
        (chunk_strategy(), 0..SOURCE.len() as u32, 0u32..3).prop_map(|(chunk, pos, col_offset)| {
            Update::Mapped {
                chunk,
                pos,
                col_offset,
            }
        }),
        chunk_strategy().prop_map(|chunk| Update::Unmapped { chunk }),
    ]
}

fn split_parts(chunk: &str) -> Vec<&str> {
    chunk.split('\n').collect()
}

proptest! {
    #[test]
    fn vlq_round_trips_all_i32(value in any::<i32>()) {
        let text = encoded(i64::from(value));
        prop_assert_eq!(vlq::decode(&text).unwrap(), vec![i64::from(value)]);
    }

    #[test]
    fn mappings_encode_decode_round_trip(lines in lines_strategy()) {
        let rendered = encode_mappings(&lines);
        prop_assert_eq!(decode_mappings(&rendered).unwrap(), lines);
    }

    #[test]
    fn builder_agrees_with_emission_model(updates in prop::collection::vec(update_strategy(), 1..20)) {
        let index = LineIndex::new(SOURCE);
        let mut map = SourceMap::new(SOURCE);

        // Independent model of the emission loop: where every mapped anchor
        // should land in generated coordinates, and what source position it
        // should carry.
        let mut model_line: u32 = 0;
        let mut model_col: u32 = 0;
        let mut anchors: Vec<((u32, u32), (u32, u32))> = Vec::new();

        for update in &updates {
            match update {
                Update::Mapped { chunk, pos, col_offset } => {
                    let lc = index.line_col(ByteOffset::from(*pos));
                    for (i, part) in split_parts(chunk).into_iter().enumerate() {
                        if i > 0 {
                            model_line += 1;
                            model_col = 0;
                        }
                        let src = if i == 0 {
                            (lc.line, lc.col + col_offset)
                        } else {
                            (lc.line + i as u32, *col_offset)
                        };
                        anchors.push(((model_line, model_col), src));
                        model_col += part.len() as u32;
                    }
                    map.update(chunk, Some(ByteOffset::from(*pos)), *col_offset);
                }
                Update::Unmapped { chunk } => {
                    for (i, part) in split_parts(chunk).into_iter().enumerate() {
                        if i > 0 {
                            model_line += 1;
                            model_col = 0;
                        }
                        model_col += part.len() as u32;
                    }
                    map.update(chunk, None, 0);
                }
            }
        }

        // Builder–serializer consistency: the wire form decodes back to the
        // builder's resolved lines exactly.
        let reparsed = decode_mappings(&map.render()).unwrap();
        prop_assert_eq!(&reparsed, map.lines());

        // Exact-anchor law: the first anchor recorded at each generated
        // position is what remapping returns.
        let mut first_at: HashMap<(u32, u32), (u32, u32)> = HashMap::new();
        for (gen, src) in &anchors {
            first_at.entry(*gen).or_insert(*src);
        }
        for (gen, src) in &first_at {
            prop_assert_eq!(remap_position(*gen, map.lines()), Some(*src), "anchor at {:?}", gen);
        }

        // Inexact positions never remap: any column that is not an anchor
        // column on its line returns none.
        let anchor_cols: HashSet<(u32, u32)> = anchors.iter().map(|(gen, _)| *gen).collect();
        for line in 0..map.lines().len() as u32 {
            let max_col: u32 = map.lines()[line as usize]
                .iter()
                .map(Segment::gen_col_delta)
                .sum();
            for col in 0..=max_col + 1 {
                if !anchor_cols.contains(&(line, col)) {
                    prop_assert_eq!(remap_position((line, col), map.lines()), None);
                }
            }
        }
    }
}
