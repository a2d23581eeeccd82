//! Compiler options and module-resolution emulation.
//!
//! The host's resolver only handles what the TGT service's native resolver
//! declined: specifiers whose extension belongs to a registered transpiler
//! (or extensionless directory requests). For those it emulates the
//! service's own path-mapping and base-URL rules before probing the
//! filesystem.

use crate::document::canonical_path;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Compiler options the host reports to the service and the resolver
/// consults for non-relative specifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Base directory for non-relative module names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Path mappings: exact patterns or single-`*` prefix wildcards.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub paths: HashMap<String, Vec<String>>,

    /// Directory `paths` entries resolve against when `baseUrl` is unset
    /// (the directory of the config file that declared them).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths_base_path: Option<String>,

    /// Remaining settings, passed through to the service untouched.
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl CompilerOptions {
    /// Parses options from JSON with comments (the tsconfig dialect).
    pub fn parse(jsonc: &str) -> Option<Self> {
        serde_json::from_str(&strip_json_comments(jsonc)).ok()
    }
}

/// A resolution reported back to the TGT service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// The (virtual) file the service should load — for transpiled files,
    /// the mirror path `candidate + target_ext`.
    pub resolved_file_name: Utf8PathBuf,
    /// The extension the service should treat the file as having.
    pub extension: String,
}

/// The TGT service's own module resolver, consulted before any transpiler
/// bridging.
pub trait NativeResolver {
    /// Resolves `name` as imported from `containing_file`, if the service
    /// can do so natively.
    fn resolve_module_name(&self, name: &str, containing_file: &Utf8Path)
        -> Option<ResolvedModule>;
}

/// Produces filesystem candidates for a non-relative specifier, in
/// priority order.
///
/// Path mappings are tried first: among matching patterns the exact match
/// wins, then the wildcard with the longest literal prefix; the winning
/// pattern's substituted replacements are resolved against
/// `baseUrl ?? pathsBasePath ?? cwd`. A plain base-URL resolution comes
/// last.
pub(crate) fn non_relative_candidates(
    options: &CompilerOptions,
    name: &str,
    cwd: &Utf8Path,
) -> Vec<Utf8PathBuf> {
    let base = options
        .base_url
        .as_deref()
        .or(options.paths_base_path.as_deref());
    let base = match base {
        Some(dir) => {
            let dir = canonical_path(dir);
            if dir.as_str().starts_with('/') {
                dir
            } else {
                canonical_path(cwd.join(dir).as_str())
            }
        }
        None => cwd.to_owned(),
    };

    // (exactness, literal prefix length, pattern) ordering, deterministic
    // across the hash map by sorting on the pattern text last.
    let mut matches: Vec<(bool, usize, &str, &Vec<String>, &str)> = Vec::new();
    for (pattern, replacements) in &options.paths {
        if let Some(star) = pattern.find('*') {
            let (prefix, suffix) = (&pattern[..star], &pattern[star + 1..]);
            if name.len() >= prefix.len() + suffix.len()
                && name.starts_with(prefix)
                && name.ends_with(suffix)
            {
                let tail = &name[prefix.len()..name.len() - suffix.len()];
                matches.push((false, prefix.len(), pattern, replacements, tail));
            }
        } else if pattern == name {
            matches.push((true, pattern.len(), pattern, replacements, ""));
        }
    }
    matches.sort_by(|a, b| {
        (b.0, b.1, a.2).cmp(&(a.0, a.1, b.2)) // exact first, longest prefix, stable by pattern
    });

    let mut candidates = Vec::new();
    if let Some((_, _, _, replacements, tail)) = matches.first() {
        for replacement in *replacements {
            let substituted = replacement.replace('*', tail);
            candidates.push(canonical_path(base.join(substituted).as_str()));
        }
    }

    if options.base_url.is_some() {
        candidates.push(canonical_path(base.join(name).as_str()));
    }

    candidates
}

/// Removes `//` and `/* */` comments from a JSON text, preserving strings.
///
/// Scans byte-wise and copies whole runs: every boundary byte (`"`, `/`,
/// `\`, `*`, `\n`) is ASCII, so slice edges always land on UTF-8 char
/// boundaries.
fn strip_json_comments(json: &str) -> String {
    let bytes = json.as_bytes();
    let mut out = String::with_capacity(json.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                // String literals pass through wholesale, escapes included.
                let start = i;
                i += 1;
                while i < bytes.len() {
                    match bytes[i] {
                        b'\\' => i += 2,
                        b'"' => {
                            i += 1;
                            break;
                        }
                        _ => i += 1,
                    }
                }
                out.push_str(&json[start..i.min(bytes.len())]);
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() {
                    if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            _ => {
                // Plain run (or a lone `/`): consume at least one byte,
                // then copy up to the next boundary.
                let start = i;
                i += 1;
                while i < bytes.len() && !matches!(bytes[i], b'"' | b'/') {
                    i += 1;
                }
                out.push_str(&json[start..i]);
            }
        }
    }

    out
}
