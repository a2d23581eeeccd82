//! Integration tests for custom module resolution.
//!
//! The host's resolver runs after the service's native resolver and
//! bridges transpiler-owned extensions (and extensionless directory
//! requests) to virtual mirror paths.

use camino::Utf8Path;
use service_host::{
    CompilerOptions, Document, MemoryFileStore, NativeResolver, ResolvedModule, ServiceHost,
    Transpilation, TranspileError, Transpiler,
};
use std::cell::Cell;
use std::rc::Rc;

// ============================================================================
// TEST INFRASTRUCTURE
// ============================================================================

struct ExtTranspiler {
    source_ext: &'static str,
    target_ext: &'static str,
}

impl Transpiler for ExtTranspiler {
    fn source_ext(&self) -> &str {
        self.source_ext
    }

    fn target_ext(&self) -> &str {
        self.target_ext
    }

    fn compile(&self, _path: &Utf8Path, source: &str) -> Result<Transpilation, TranspileError> {
        Ok(Transpilation {
            code: source.to_owned(),
            source_map: None,
            errors: Vec::new(),
        })
    }
}

/// A native resolver that claims one specifier and counts its calls.
struct CountingResolver {
    claims: &'static str,
    calls: Rc<Cell<usize>>,
}

impl NativeResolver for CountingResolver {
    fn resolve_module_name(
        &self,
        name: &str,
        _containing_file: &Utf8Path,
    ) -> Option<ResolvedModule> {
        self.calls.set(self.calls.get() + 1);
        (name == self.claims).then(|| ResolvedModule {
            resolved_file_name: "/native/resolved.ts".into(),
            extension: ".ts".to_owned(),
        })
    }
}

fn project_store() -> MemoryFileStore {
    let mut store = MemoryFileStore::new();
    store.insert("/proj/src/lib/util.src", "util");
    store.insert("/proj/src/widgets/index.src", "widget");
    store.insert("/proj/src/app.src", "app");
    store
}

fn project_host() -> ServiceHost {
    let options = CompilerOptions::parse(
        r#"{
            "baseUrl": "/proj",
            "paths": { "$lib/*": ["src/lib/*"] }
        }"#,
    )
    .unwrap();

    let mut host = ServiceHost::new("/proj")
        .with_file_store(Box::new(project_store()))
        .with_compilation_settings(options);
    host.register_transpiler(Box::new(ExtTranspiler {
        source_ext: ".src",
        target_ext: ".ts",
    }));
    host
}

fn resolve_one(host: &mut ServiceHost, name: &str, containing: &str) -> Option<ResolvedModule> {
    host.resolve_module_names(&[name.to_owned()], containing)
        .remove(0)
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn relative_specifier_resolves_to_mirror_path() {
    let mut host = project_host();
    let resolved = resolve_one(&mut host, "./lib/util.src", "/proj/src/app.src.ts").unwrap();

    assert_eq!(resolved.resolved_file_name.as_str(), "/proj/src/lib/util.src.ts");
    assert_eq!(resolved.extension, ".ts");
}

#[test]
fn path_mapping_resolves_wildcard_specifier() {
    let mut host = project_host();
    let resolved = resolve_one(&mut host, "$lib/util.src", "/proj/src/app.src.ts").unwrap();

    assert_eq!(resolved.resolved_file_name.as_str(), "/proj/src/lib/util.src.ts");
}

#[test]
fn base_url_fallback_resolves_bare_specifier() {
    let mut host = project_host();
    let resolved = resolve_one(&mut host, "src/app.src", "/proj/other.src.ts").unwrap();

    assert_eq!(resolved.resolved_file_name.as_str(), "/proj/src/app.src.ts");
}

#[test]
fn extensionless_specifier_scans_directory_index() {
    let mut host = project_host();
    let resolved = resolve_one(&mut host, "./widgets", "/proj/src/app.src.ts").unwrap();

    assert_eq!(
        resolved.resolved_file_name.as_str(),
        "/proj/src/widgets/index.src.ts"
    );
    assert_eq!(resolved.extension, ".ts");
}

#[test]
fn index_scan_respects_registration_order() {
    let mut store = project_store();
    store.insert("/proj/src/widgets/index.alt", "alt widget");

    let mut host = ServiceHost::new("/proj").with_file_store(Box::new(store));
    host.register_transpiler(Box::new(ExtTranspiler {
        source_ext: ".alt",
        target_ext: ".tsx",
    }));
    host.register_transpiler(Box::new(ExtTranspiler {
        source_ext: ".src",
        target_ext: ".ts",
    }));

    let resolved = resolve_one(&mut host, "./widgets", "/proj/src/app.alt.tsx").unwrap();
    assert_eq!(
        resolved.resolved_file_name.as_str(),
        "/proj/src/widgets/index.alt.tsx"
    );
}

#[test]
fn foreign_extension_is_declined() {
    let mut host = project_host();
    assert_eq!(resolve_one(&mut host, "./theme.css", "/proj/src/app.src.ts"), None);
}

#[test]
fn missing_candidate_is_declined() {
    let mut host = project_host();
    assert_eq!(resolve_one(&mut host, "./nope.src", "/proj/src/app.src.ts"), None);
    assert_eq!(resolve_one(&mut host, "./nowhere", "/proj/src/app.src.ts"), None);
}

#[test]
fn native_resolver_takes_precedence() {
    let calls = Rc::new(Cell::new(0));
    let mut host = ServiceHost::new("/proj")
        .with_file_store(Box::new(project_store()))
        .with_native_resolver(Box::new(CountingResolver {
            claims: "native-lib",
            calls: Rc::clone(&calls),
        }));
    host.register_transpiler(Box::new(ExtTranspiler {
        source_ext: ".src",
        target_ext: ".ts",
    }));

    let resolved = resolve_one(&mut host, "native-lib", "/proj/src/app.src.ts").unwrap();
    assert_eq!(resolved.resolved_file_name.as_str(), "/native/resolved.ts");

    // Declined names fall through to the transpiler bridge.
    let bridged = resolve_one(&mut host, "./lib/util.src", "/proj/src/app.src.ts");
    assert!(bridged.is_some());
    assert_eq!(calls.get(), 2);
}

#[test]
fn resolutions_are_cached_per_directory_until_update() {
    let calls = Rc::new(Cell::new(0));
    let mut host = ServiceHost::new("/proj")
        .with_file_store(Box::new(project_store()))
        .with_native_resolver(Box::new(CountingResolver {
            claims: "native-lib",
            calls: Rc::clone(&calls),
        }));
    host.register_transpiler(Box::new(ExtTranspiler {
        source_ext: ".src",
        target_ext: ".ts",
    }));

    let _ = resolve_one(&mut host, "native-lib", "/proj/src/app.src.ts");
    let _ = resolve_one(&mut host, "native-lib", "/proj/src/app.src.ts");
    assert_eq!(calls.get(), 1);

    // Sibling files in the same directory share the memo.
    let _ = resolve_one(&mut host, "native-lib", "/proj/src/other.src.ts");
    assert_eq!(calls.get(), 1);

    // A document update invalidates every memoised resolution.
    host.add_or_update_document(Document::new("/proj/src/app.src", "changed", 2));
    let _ = resolve_one(&mut host, "native-lib", "/proj/src/app.src.ts");
    assert_eq!(calls.get(), 2);
}

#[test]
fn mixed_slash_containing_file_resolves() {
    let mut host = project_host();
    let resolved = resolve_one(&mut host, "./lib/util.src", "/proj\\src\\app.src.ts").unwrap();
    assert_eq!(resolved.resolved_file_name.as_str(), "/proj/src/lib/util.src.ts");
}

#[test]
fn resolution_triggers_transpile_on_snapshot_request() {
    let mut host = project_host();
    let resolved = resolve_one(&mut host, "$lib/util.src", "/proj/src/app.src.ts").unwrap();

    // The service follows the resolution by requesting the mirror snapshot,
    // which transpiles the underlying disk file on demand.
    let snapshot = host.get_script_snapshot(resolved.resolved_file_name.as_str());
    assert_eq!(snapshot.text(), "util");
}
