//! Filesystem seam.

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;

/// Filesystem access the host and module resolver depend on.
///
/// A missing file reads as `None`, which the host turns into empty text;
/// nothing in the host propagates filesystem errors to the service.
pub trait FileStore {
    /// Reads a file as UTF-8 text, if it exists and is readable.
    fn read(&self, path: &Utf8Path) -> Option<String>;

    /// Whether a file exists at `path`.
    fn file_exists(&self, path: &Utf8Path) -> bool;

    /// Whether a directory exists at `path`.
    fn directory_exists(&self, path: &Utf8Path) -> bool;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileStore;

impl FileStore for OsFileStore {
    fn read(&self, path: &Utf8Path) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }

    fn file_exists(&self, path: &Utf8Path) -> bool {
        path.is_file()
    }

    fn directory_exists(&self, path: &Utf8Path) -> bool {
        path.is_dir()
    }
}

/// An in-memory file tree for tests and embedding.
///
/// Directories exist implicitly: any proper prefix of an inserted file
/// path is a directory.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: FxHashMap<Utf8PathBuf, String>,
}

impl MemoryFileStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a file.
    pub fn insert(&mut self, path: impl Into<Utf8PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }
}

impl FileStore for MemoryFileStore {
    fn read(&self, path: &Utf8Path) -> Option<String> {
        self.files.get(path).cloned()
    }

    fn file_exists(&self, path: &Utf8Path) -> bool {
        self.files.contains_key(path)
    }

    fn directory_exists(&self, path: &Utf8Path) -> bool {
        let prefix = format!("{}/", path);
        self.files.keys().any(|p| p.as_str().starts_with(&prefix))
    }
}
