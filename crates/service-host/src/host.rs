//! The virtual-file host.
//!
//! Bridges the editor's document store to a TGT-aware language service:
//! editor updates land here, mirror documents expose transpiled text under
//! phantom `src + target_ext` paths, and snapshots are produced lazily and
//! cached until the underlying source moves past them.

use crate::document::{canonical_path, Document};
use crate::fs::{FileStore, OsFileStore};
use crate::resolve::{non_relative_candidates, CompilerOptions, NativeResolver, ResolvedModule};
use crate::snapshot::ScriptSnapshot;
use crate::transpiler::{TranspileError, Transpiler};
use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use source_map::{MapLines, SourceMap};
use std::rc::Rc;

/// Per-source-file transpilation state.
#[derive(Debug, Default)]
pub struct FileMeta {
    /// Resolved map lines from the latest successful transpile.
    pub sourcemap_lines: Option<MapLines>,
    /// Errors from the most recent transpile attempt.
    pub parse_errors: Vec<TranspileError>,
    /// Whether the last transpile attempt threw. The previous mirror text
    /// stays in place so the service never sees a disappearing file.
    pub fatal: bool,
    /// The mirror document's path.
    pub transpiled_path: Utf8PathBuf,
}

/// The virtual-file host backing the TGT language service.
///
/// Single-threaded by design: every mutating operation runs to completion
/// before the next begins, and a snapshot request observes the effects of
/// every document update that completed before it. The `project_version`
/// counter is the service's signal to drop cross-file derived state.
pub struct ServiceHost {
    /// Paths reported to the service. Source paths of transpiled files are
    /// deliberately absent; only their mirrors appear.
    script_file_names: Vec<Utf8PathBuf>,
    file_meta: FxHashMap<Utf8PathBuf, FileMeta>,
    /// Editor-owned documents and host-synthesised mirror documents.
    path_map: FxHashMap<Utf8PathBuf, Document>,
    snapshots: FxHashMap<Utf8PathBuf, Rc<ScriptSnapshot>>,
    project_version: u64,
    /// Registration order matters: directory `index` probing scans in order.
    transpilers: Vec<Box<dyn Transpiler>>,
    /// Memoised resolutions keyed by (containing directory, specifier);
    /// cleared on every document update.
    resolution_cache: FxHashMap<(Utf8PathBuf, String), Option<ResolvedModule>>,
    compilation_settings: CompilerOptions,
    default_lib: Utf8PathBuf,
    cwd: Utf8PathBuf,
    store: Box<dyn FileStore>,
    native_resolver: Option<Box<dyn NativeResolver>>,
    emitted_files: Vec<(Utf8PathBuf, String)>,
}

impl ServiceHost {
    /// Creates a host rooted at `cwd`, reading from the real filesystem.
    pub fn new(cwd: impl AsRef<str>) -> Self {
        Self {
            script_file_names: Vec::new(),
            file_meta: FxHashMap::default(),
            path_map: FxHashMap::default(),
            snapshots: FxHashMap::default(),
            project_version: 0,
            transpilers: Vec::new(),
            resolution_cache: FxHashMap::default(),
            compilation_settings: CompilerOptions::default(),
            default_lib: Utf8PathBuf::from("lib.d.ts"),
            cwd: canonical_path(cwd.as_ref()),
            store: Box::new(OsFileStore),
            native_resolver: None,
            emitted_files: Vec::new(),
        }
    }

    /// Replaces the filesystem backing.
    pub fn with_file_store(mut self, store: Box<dyn FileStore>) -> Self {
        self.store = store;
        self
    }

    /// Installs the service's native module resolver, consulted before any
    /// transpiler bridging.
    pub fn with_native_resolver(mut self, resolver: Box<dyn NativeResolver>) -> Self {
        self.native_resolver = Some(resolver);
        self
    }

    /// Sets the compilation settings reported to the service.
    pub fn with_compilation_settings(mut self, settings: CompilerOptions) -> Self {
        self.compilation_settings = settings;
        self
    }

    /// Sets the default-library path reported to the service.
    pub fn with_default_lib_file_name(mut self, path: impl AsRef<str>) -> Self {
        self.default_lib = canonical_path(path.as_ref());
        self
    }

    /// Registers a transpiler. Order is significant for directory `index`
    /// resolution.
    pub fn register_transpiler(&mut self, transpiler: Box<dyn Transpiler>) {
        self.transpilers.push(transpiler);
    }

    /// Applies an editor document update.
    ///
    /// Purges the path's cached snapshot and bumps the project version.
    /// For transpilable sources this also synthesises the mirror document
    /// (empty, version −1) on first sight, purges the mirror's snapshot,
    /// and keeps the source path out of `script_file_names`.
    pub fn add_or_update_document(&mut self, doc: Document) {
        let path = doc.path().clone();
        tracing::debug!(path = %path, version = doc.version(), "document update; purging snapshot");

        self.snapshots.remove(&path);
        self.resolution_cache.clear();
        self.project_version += 1;

        if let Some(idx) = self.transpiler_for_source(&path) {
            let mirror = mirror_path(&path, self.transpilers[idx].target_ext());
            if !self.path_map.contains_key(&mirror) {
                self.path_map
                    .insert(mirror.clone(), Document::new(&mirror, String::new(), -1));
            }
            self.snapshots.remove(&mirror);
            if !self.script_file_names.contains(&mirror) {
                self.script_file_names.push(mirror.clone());
            }
            self.file_meta.entry(path.clone()).or_default().transpiled_path = mirror;
            self.path_map.insert(path, doc);
        } else {
            let is_new = !self.path_map.contains_key(&path);
            self.path_map.insert(path.clone(), doc);
            if is_new && !self.script_file_names.contains(&path) {
                self.script_file_names.push(path);
            }
        }
    }

    /// The paths visible to the TGT service.
    pub fn get_script_file_names(&self) -> &[Utf8PathBuf] {
        &self.script_file_names
    }

    /// The version of the document at `path`, or `"0"` for disk-only files.
    pub fn get_script_version(&self, path: &str) -> String {
        let path = canonical_path(path);
        self.path_map
            .get(&path)
            .map(|doc| doc.version().to_string())
            .unwrap_or_else(|| "0".to_string())
    }

    /// The monotonically increasing project version.
    pub fn get_project_version(&self) -> String {
        self.project_version.to_string()
    }

    /// The compilation settings reported to the service.
    pub fn get_compilation_settings(&self) -> &CompilerOptions {
        &self.compilation_settings
    }

    /// The default-library path for the given settings.
    pub fn get_default_lib_file_name(&self) -> &Utf8Path {
        &self.default_lib
    }

    /// Returns the (possibly freshly transpiled) snapshot for `path`.
    ///
    /// A transpile failure never escapes: the error is recorded in the
    /// source file's metadata and the previous mirror text is served.
    pub fn get_script_snapshot(&mut self, path: &str) -> Rc<ScriptSnapshot> {
        let path = canonical_path(path);
        self.get_or_create_snapshot(path)
    }

    /// Forces any pending transpile for `path`, then returns its metadata.
    pub fn get_meta(&mut self, path: &str) -> Option<&FileMeta> {
        let path = canonical_path(path);
        if let Some(idx) = self.transpiler_for_source(&path) {
            let mirror = mirror_path(&path, self.transpilers[idx].target_ext());
            let _snapshot = self.get_or_create_snapshot(mirror);
        }
        self.file_meta.get(&path)
    }

    /// Records an output the service asked to write.
    ///
    /// The host never touches the real filesystem for emitted files; the
    /// outputs are inspectable via [`emitted_files`](Self::emitted_files).
    pub fn write_file(&mut self, name: &str, content: impl Into<String>) {
        let path = canonical_path(name);
        tracing::debug!(path = %path, "service write");
        self.emitted_files.push((path, content.into()));
    }

    /// Outputs recorded by [`write_file`](Self::write_file), oldest first.
    pub fn emitted_files(&self) -> &[(Utf8PathBuf, String)] {
        &self.emitted_files
    }

    /// Resolves import specifiers on the service's behalf.
    ///
    /// The native resolver is tried first; specifiers it declines are
    /// bridged to registered transpilers when their extension (or absence
    /// of one, treated as a directory request) matches.
    pub fn resolve_module_names(
        &mut self,
        names: &[String],
        containing_file: &str,
    ) -> Vec<Option<ResolvedModule>> {
        let containing = canonical_path(containing_file);
        names
            .iter()
            .map(|name| self.resolve_module_name(name, &containing))
            .collect()
    }

    fn resolve_module_name(&mut self, name: &str, containing: &Utf8Path) -> Option<ResolvedModule> {
        let dir = containing
            .parent()
            .unwrap_or(Utf8Path::new(""))
            .to_owned();
        let key = (dir.clone(), name.to_owned());
        if let Some(cached) = self.resolution_cache.get(&key) {
            return cached.clone();
        }

        let resolved = self.resolve_module_name_uncached(name, containing, &dir);
        self.resolution_cache.insert(key, resolved.clone());
        resolved
    }

    fn resolve_module_name_uncached(
        &self,
        name: &str,
        containing: &Utf8Path,
        dir: &Utf8Path,
    ) -> Option<ResolvedModule> {
        if let Some(native) = self
            .native_resolver
            .as_ref()
            .and_then(|resolver| resolver.resolve_module_name(name, containing))
        {
            return Some(native);
        }

        let ext = specifier_extension(name);
        let matched = ext.and_then(|e| {
            self.transpilers
                .iter()
                .position(|transpiler| transpiler.source_ext() == e)
        });
        if ext.is_some() && matched.is_none() {
            // The extension belongs to someone else's file type.
            return None;
        }

        let candidates: Vec<Utf8PathBuf> = if is_relative_specifier(name) {
            vec![canonical_path(dir.join(name).as_str())]
        } else {
            non_relative_candidates(&self.compilation_settings, name, &self.cwd)
        };

        for candidate in candidates {
            match matched {
                Some(idx) => {
                    if self.store.file_exists(&candidate) {
                        let target_ext = self.transpilers[idx].target_ext();
                        return Some(ResolvedModule {
                            resolved_file_name: mirror_path(&candidate, target_ext),
                            extension: target_ext.to_owned(),
                        });
                    }
                }
                None => {
                    if self.store.directory_exists(&candidate) {
                        for transpiler in &self.transpilers {
                            let index_file =
                                candidate.join(format!("index{}", transpiler.source_ext()));
                            if self.store.file_exists(&index_file) {
                                let target_ext = transpiler.target_ext();
                                return Some(ResolvedModule {
                                    resolved_file_name: mirror_path(&index_file, target_ext),
                                    extension: target_ext.to_owned(),
                                });
                            }
                        }
                    }
                }
            }
        }

        None
    }

    fn get_or_create_snapshot(&mut self, path: Utf8PathBuf) -> Rc<ScriptSnapshot> {
        if let Some(snapshot) = self.snapshots.get(&path) {
            return Rc::clone(snapshot);
        }

        if let Some((idx, src_path)) = self.match_mirror(&path) {
            self.ensure_transpiled(idx, &src_path, &path);
            let text = self
                .path_map
                .get(&path)
                .map(|doc| doc.text().to_owned())
                .unwrap_or_default();
            let snapshot = Rc::new(ScriptSnapshot::new(text));
            self.snapshots.insert(path, Rc::clone(&snapshot));
            return snapshot;
        }

        let text = self
            .path_map
            .get(&path)
            .map(|doc| doc.text().to_owned())
            .or_else(|| self.store.read(&path))
            .unwrap_or_default();
        let snapshot = Rc::new(ScriptSnapshot::new(text));
        self.snapshots.insert(path, Rc::clone(&snapshot));
        snapshot
    }

    /// Transpiles `src_path` into its mirror document if the source has
    /// moved past the mirror's recorded version.
    fn ensure_transpiled(&mut self, idx: usize, src_path: &Utf8Path, mirror: &Utf8Path) {
        let (source_text, source_version) = match self.path_map.get(src_path) {
            Some(doc) => (doc.text().to_owned(), doc.version()),
            None => (self.store.read(src_path).unwrap_or_default(), 0),
        };
        let mirror_version = self
            .path_map
            .get(mirror)
            .map(|doc| doc.version())
            .unwrap_or(-1);
        if source_version <= mirror_version {
            return;
        }

        match self.transpilers[idx].compile(src_path, &source_text) {
            Ok(output) => {
                let lines = output.source_map.map(SourceMap::into_lines);
                self.path_map.insert(
                    mirror.to_owned(),
                    Document::new(mirror, output.code, source_version),
                );
                let meta = self.file_meta.entry(src_path.to_owned()).or_default();
                meta.transpiled_path = mirror.to_owned();
                meta.sourcemap_lines = lines;
                meta.parse_errors = output.errors;
                meta.fatal = false;
            }
            Err(error) => {
                tracing::warn!(path = %src_path, %error, "transpile failed; keeping last good output");
                let meta = self.file_meta.entry(src_path.to_owned()).or_default();
                meta.transpiled_path = mirror.to_owned();
                meta.parse_errors = vec![error];
                meta.fatal = true;
            }
        }
    }

    /// The registered transpiler claiming `path`'s extension, if any.
    fn transpiler_for_source(&self, path: &Utf8Path) -> Option<usize> {
        self.transpilers
            .iter()
            .position(|transpiler| path.as_str().ends_with(transpiler.source_ext()))
    }

    /// Recognises `…<source_ext><target_ext>` mirror paths, yielding the
    /// matching transpiler and the stripped source path.
    fn match_mirror(&self, path: &Utf8Path) -> Option<(usize, Utf8PathBuf)> {
        self.transpilers.iter().enumerate().find_map(|(idx, t)| {
            let suffix = format!("{}{}", t.source_ext(), t.target_ext());
            if path.as_str().ends_with(&suffix) {
                let src = &path.as_str()[..path.as_str().len() - t.target_ext().len()];
                Some((idx, Utf8PathBuf::from(src)))
            } else {
                None
            }
        })
    }
}

fn mirror_path(path: &Utf8Path, target_ext: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{path}{target_ext}"))
}

/// The last extension of a specifier's final component; dotfiles, `..`,
/// and extensionless components yield `None`.
fn specifier_extension(name: &str) -> Option<&str> {
    let component = name.rsplit('/').next().unwrap_or(name);
    if component == ".." {
        return None;
    }
    component
        .rfind('.')
        .filter(|&i| i > 0)
        .map(|i| &component[i..])
}

fn is_relative_specifier(name: &str) -> bool {
    name == "." || name == ".." || name.starts_with("./") || name.starts_with("../")
}
