//! The transpiler seam the host drives.

use camino::Utf8Path;
use source_map::SourceMap;
use thiserror::Error;

/// An error reported by a transpiler for one file.
///
/// Doubles as the recoverable per-file diagnostic type and the fatal
/// error a `compile` call returns when it cannot produce output at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TranspileError {
    /// Human-readable message.
    pub message: String,
    /// Byte offset in the source, when the transpiler knows one.
    pub offset: Option<u32>,
}

impl TranspileError {
    /// Creates an error without a source position.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: None,
        }
    }

    /// Creates an error anchored at a byte offset.
    pub fn at(message: impl Into<String>, offset: u32) -> Self {
        Self {
            message: message.into(),
            offset: Some(offset),
        }
    }
}

/// Successful transpiler output.
#[derive(Debug)]
pub struct Transpilation {
    /// The generated TGT code.
    pub code: String,
    /// The map built while emitting `code`, when mapping was enabled.
    pub source_map: Option<SourceMap>,
    /// Recoverable diagnostics from this transpile.
    pub errors: Vec<TranspileError>,
}

/// A source-language transpiler registered with the host.
///
/// Extensions are dotted suffixes (`".src"`, `".ts"`); the host derives a
/// file's mirror path as `source path + target_ext()`, so the mirror keeps
/// the source extension embedded (`app.src` → `app.src.ts`). Registration
/// order matters for directory `index` resolution.
pub trait Transpiler {
    /// The source extension this transpiler claims.
    fn source_ext(&self) -> &str;

    /// The extension appended to form the mirror path.
    fn target_ext(&self) -> &str;

    /// Transpiles one file.
    ///
    /// Must run synchronously: the host calls this while servicing a
    /// snapshot request from the TGT service, which is itself synchronous.
    fn compile(&self, path: &Utf8Path, source: &str) -> Result<Transpilation, TranspileError>;
}
