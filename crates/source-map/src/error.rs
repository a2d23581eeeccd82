//! Error type for map decoding and composition.

use thiserror::Error;

/// Errors produced while decoding or rewriting source maps.
///
/// Malformed map data is always fatal; nothing in this crate attempts to
/// silently repair a bad mapping stream.
#[derive(Debug, Error)]
pub enum MapError {
    /// A character outside the base64-VLQ alphabet (or outside ASCII).
    #[error("invalid VLQ character {0:?}")]
    InvalidVlqChar(char),

    /// A VLQ group whose final atom still has the continuation bit set.
    #[error("unterminated VLQ sequence")]
    UnterminatedVlq,

    /// A VLQ group encoding more than 32 bits of magnitude.
    #[error("VLQ value exceeds 32 bits")]
    VlqOverflow,

    /// A segment with an arity other than 1, 4, or 5.
    #[error("segment has {0} fields, expected 1, 4, or 5")]
    BadSegmentArity(usize),

    /// A segment field that must be non-negative was not, or an absolute
    /// source position ran below zero.
    #[error("segment value out of range: {0}")]
    OutOfRange(i64),

    /// The envelope's `version` field was not 3.
    #[error("unsupported source map version {0}")]
    UnsupportedVersion(u32),

    /// The inline payload was not valid base64.
    #[error("malformed base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded payload was not UTF-8.
    #[error("map payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The envelope was not valid JSON (or could not be serialized).
    #[error("map JSON: {0}")]
    Json(#[from] serde_json::Error),
}
