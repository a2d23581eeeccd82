//! Virtual-file host for transpiled languages.
//!
//! This crate keeps an in-memory document registry in sync with editor
//! change notifications and exposes it to a TypeScript-style language
//! service through the service's host contract: script names, versioned
//! snapshots, a project-version counter, and module resolution. Files in
//! registered source languages are transpiled on demand into phantom
//! mirror documents (`app.src` → `app.src.ts`), whose source maps the
//! service's diagnostics are later projected back through.

mod document;
mod fs;
mod host;
mod resolve;
mod snapshot;
mod transpiler;

pub use document::{canonical_path, Document};
pub use fs::{FileStore, MemoryFileStore, OsFileStore};
pub use host::{FileMeta, ServiceHost};
pub use resolve::{CompilerOptions, NativeResolver, ResolvedModule};
pub use snapshot::{ScriptSnapshot, TextChangeRange, TextSpan};
pub use transpiler::{Transpilation, TranspileError, Transpiler};
