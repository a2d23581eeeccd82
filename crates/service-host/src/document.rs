//! Versioned documents and path canonicalisation.

use camino::Utf8PathBuf;

/// A versioned text document.
///
/// Editor documents carry the editor's own monotonic version. Mirror
/// documents are host-synthesised and record the source version their text
/// was transpiled at, starting at −1 so any real source version is newer.
#[derive(Debug, Clone)]
pub struct Document {
    path: Utf8PathBuf,
    text: String,
    version: i64,
}

impl Document {
    /// Creates a document keyed by a canonicalised path.
    pub fn new(path: impl AsRef<str>, text: impl Into<String>, version: i64) -> Self {
        Self {
            path: canonical_path(path.as_ref()),
            text: text.into(),
            version,
        }
    }

    /// Creates a document from an editor URI (`file://` prefix tolerated).
    pub fn from_uri(uri: &str, text: impl Into<String>, version: i64) -> Self {
        let path = uri.strip_prefix("file://").unwrap_or(uri);
        Self::new(path, text, version)
    }

    /// The canonical path this document is keyed by.
    #[inline]
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }

    /// The document's current text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The document's version.
    #[inline]
    pub fn version(&self) -> i64 {
        self.version
    }
}

/// Canonicalises a path for use as a registry key.
///
/// The TGT service hands back paths in whatever slash convention it likes,
/// so every boundary operation funnels through here: backslashes become
/// slashes, `.` and resolvable `..` components collapse, and repeated
/// separators disappear.
pub fn canonical_path(path: &str) -> Utf8PathBuf {
    let normalized = path.replace('\\', "/");
    let absolute = normalized.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            _ => parts.push(part),
        }
    }

    let mut out = String::with_capacity(path.len());
    if absolute {
        out.push('/');
    }
    out.push_str(&parts.join("/"));
    Utf8PathBuf::from(out)
}
