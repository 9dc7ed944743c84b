use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use sdsl_diagnostic::{ErrorCode, Phase};
use sdsl_preprocess::IncludedFile;

use super::*;
use crate::sources::{LoadedSource, MemorySources, SourceError};

const BASE: &str =
    "shader Base { cbuffer PerMaterial { float3 Color; }; float4 Shade() { return float4(Color, SCALE); } }";
const CHILD: &str = "shader Child : Base { float4 PSMain() : SV_Target { return Shade(); } }";
const MATERIAL: &str = "effect Material { mixin Child; macro SCALE = Scale; }";

fn memory() -> MemorySources {
    MemorySources::new()
        .with_shader("Base", BASE)
        .with_shader("Child", CHILD)
        .with_shader("Material", MATERIAL)
}

fn compiler(sources: MemorySources) -> EffectCompiler {
    EffectCompiler::new(CompilerConfig::new(), Arc::new(sources))
}

fn material() -> CompileRequest {
    CompileRequest::new("Material").with_parameter("Scale", 1)
}

fn compile_ok(compiler: &EffectCompiler, request: &CompileRequest) -> CompilerResult {
    let result = compiler.compile(request, &CancellationToken::new());
    assert!(result.is_success(), "compilation failed: {:#?}", result.diagnostics);
    result
}

#[test]
fn test_second_request_is_served_from_cache() {
    let compiler = compiler(memory());
    let first = compile_ok(&compiler, &material());
    let second = compile_ok(&compiler, &material());
    assert_eq!(first.origin, Some(CompilationOrigin::FreshlyCompiled));
    assert_eq!(second.origin, Some(CompilationOrigin::LoadedFromCache));
    assert!(Arc::ptr_eq(
        first.bytecode.as_ref().unwrap(),
        second.bytecode.as_ref().unwrap()
    ));
}

#[test]
fn test_separate_compilers_agree() {
    let a = compile_ok(&compiler(memory()), &material());
    let b = compile_ok(&compiler(memory()), &material());
    assert_eq!(a.bytecode.unwrap().words, b.bytecode.unwrap().words);
}

#[test]
fn test_effect_macros_reach_mixin_sources() {
    // `SCALE` only exists as an effect macro.
    let compiler = compiler(memory());
    let result = compile_ok(&compiler, &material());
    let bytecode = result.bytecode.unwrap();
    let names: Vec<&str> = bytecode.used_sources.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["Base", "Child", "Material"]);

    let bare = compiler.compile(&CompileRequest::new("Child"), &CancellationToken::new());
    assert!(!bare.is_success());
    assert_eq!(bare.codes(), vec![ErrorCode::E3003]);
}

#[test]
fn test_request_macros_override_globals() {
    let config = CompilerConfig::new().with_macro("SCALE", "0.5");
    let compiler = EffectCompiler::new(config, Arc::new(memory()));
    compile_ok(&compiler, &CompileRequest::new("Child"));
    compile_ok(&compiler, &CompileRequest::new("Child").with_macro("SCALE", "2"));
}

#[test]
fn test_diagnostics_carry_original_locations() {
    let sources = MemorySources::new().with_shader(
        "Broken",
        "#define UNUSED 1\nshader Broken {\n    float4 f() { return Missing; }\n}",
    );
    let result = compiler(sources).compile(&CompileRequest::new("Broken"), &CancellationToken::new());
    assert_eq!(result.codes(), vec![ErrorCode::E3003]);
    let location = result.diagnostics[0].location.as_ref().unwrap();
    assert_eq!(location.file, "Broken.sdsl");
    assert_eq!((location.line, location.column), (3, 25));
}

#[test]
fn test_lex_errors_stop_before_parsing() {
    let sources = MemorySources::new().with_shader("Broken", "shader Broken { float x = \"é; }");
    let result = compiler(sources).compile(&CompileRequest::new("Broken"), &CancellationToken::new());
    assert_eq!(result.codes(), vec![ErrorCode::E0001]);
    assert!(result.codes().iter().all(|code| code.phase() == Phase::Lex));
}

#[test]
fn test_inheritance_cycle_is_reported() {
    let sources = MemorySources::new()
        .with_shader("A", "shader A : B { }")
        .with_shader("B", "shader B : A { }");
    let result = compiler(sources).compile(&CompileRequest::new("A"), &CancellationToken::new());
    assert!(result.bytecode.is_none());
    assert!(result.codes().contains(&ErrorCode::E3007), "{:#?}", result.diagnostics);
}

#[test]
fn test_unknown_effect() {
    let result =
        compiler(memory()).compile(&CompileRequest::new("Nowhere"), &CancellationToken::new());
    assert_eq!(result.codes(), vec![ErrorCode::E4004]);
}

#[test]
fn test_cancelled_request_is_not_cached() {
    let compiler = compiler(memory());
    let token = CancellationToken::new();
    token.cancel();
    let cancelled = compiler.compile(&material(), &token);
    assert_eq!(cancelled.codes(), vec![ErrorCode::E9001]);
    assert!(compiler.cache.is_empty());

    let retried = compile_ok(&compiler, &material());
    assert_eq!(retried.origin, Some(CompilationOrigin::FreshlyCompiled));
}

#[test]
fn test_failures_are_not_cached() {
    let compiler = compiler(memory());
    let request = CompileRequest::new("Child");
    assert!(!compiler.compile(&request, &CancellationToken::new()).is_success());
    assert!(compiler.cache.is_empty());
}

#[test]
fn test_compile_many_keeps_order() {
    let compiler = compiler(memory());
    let requests = vec![
        material(),
        CompileRequest::new("Child"),
        material().with_parameter("Scale", 2),
        material(),
    ];
    let results = compiler.compile_many(&requests);
    assert_eq!(results.len(), 4);
    assert!(results[0].is_success());
    assert!(!results[1].is_success());
    assert!(results[2].is_success());
    assert!(Arc::ptr_eq(
        results[0].bytecode.as_ref().unwrap(),
        results[3].bytecode.as_ref().unwrap()
    ));
    assert_ne!(
        results[0].bytecode.as_ref().unwrap().words,
        results[2].bytecode.as_ref().unwrap().words
    );
    assert_eq!(compiler.cache.len(), 2);
}

fn write_sources(dir: &std::path::Path, base: &str) {
    std::fs::write(dir.join("Base.sdsl"), base).unwrap();
    std::fs::write(dir.join("Child.sdsl"), CHILD).unwrap();
    std::fs::write(dir.join("Material.sdsl"), MATERIAL).unwrap();
}

#[test]
fn test_invalidation_recompiles_dependents_only() {
    let dir = tempfile::tempdir().unwrap();
    write_sources(dir.path(), BASE);
    std::fs::write(
        dir.path().join("Other.sdsl"),
        "shader Other { float4 PSMain() : SV_Target { return float4(0, 0, 0, 1); } }",
    )
    .unwrap();
    let compiler = EffectCompiler::from_file_system(CompilerConfig::new().with_include_dir(dir.path()));
    let before = compile_ok(&compiler, &material());
    compile_ok(&compiler, &CompileRequest::new("Other"));

    write_sources(dir.path(), &BASE.replace("float3 Color;", "float3 Color; float Gloss;"));
    assert_eq!(compiler.invalidate_sources(&["Base"]), 1);
    assert_eq!(compiler.cache.len(), 1);

    let after = compile_ok(&compiler, &material());
    assert_eq!(after.origin, Some(CompilationOrigin::FreshlyCompiled));
    let buffer = |r: &CompilerResult| {
        r.bytecode.as_ref().unwrap().reflection.constant_buffer("PerMaterial").unwrap().members.len()
    };
    assert_eq!(buffer(&before), 1);
    assert_eq!(buffer(&after), 2);
}

#[test]
fn test_disk_cache_survives_restart_until_sources_change() {
    let sources = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    write_sources(sources.path(), BASE);
    let config = CompilerConfig::new()
        .with_include_dir(sources.path())
        .with_cache_dir(cache.path());

    let first = compile_ok(&EffectCompiler::from_file_system(config.clone()), &material());
    assert_eq!(first.origin, Some(CompilationOrigin::FreshlyCompiled));

    let restarted = compile_ok(&EffectCompiler::from_file_system(config.clone()), &material());
    assert_eq!(restarted.origin, Some(CompilationOrigin::LoadedFromDisk));
    assert_eq!(
        first.bytecode.unwrap().words,
        restarted.bytecode.unwrap().words
    );

    write_sources(sources.path(), &BASE.replace("SCALE", "SCALE * 2"));
    let edited = compile_ok(&EffectCompiler::from_file_system(config), &material());
    assert_eq!(edited.origin, Some(CompilationOrigin::FreshlyCompiled));
}

/// Editable sources whose first load of `Base` pauses until released.
struct Paused {
    sources: Mutex<MemorySources>,
    armed: AtomicBool,
    entered: Barrier,
    release: Barrier,
}

impl SourceProvider for Paused {
    fn load(&self, name: &str) -> Result<LoadedSource, SourceError> {
        let loaded = self.sources.lock().load(name);
        if name == "Base" && self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.release.wait();
        }
        loaded
    }

    fn include(&self, path: &str, from: &str) -> Option<IncludedFile> {
        self.sources.lock().include(path, from)
    }
}

#[test]
fn test_edit_during_compilation_is_not_served_stale() {
    let provider = Arc::new(Paused {
        sources: Mutex::new(memory()),
        armed: AtomicBool::new(true),
        entered: Barrier::new(2),
        release: Barrier::new(2),
    });
    let compiler = EffectCompiler::new(CompilerConfig::new(), provider.clone());
    let members = |r: &CompilerResult| {
        r.bytecode.as_ref().unwrap().reflection.constant_buffer("PerMaterial").unwrap().members.len()
    };

    let during = std::thread::scope(|scope| {
        let flight = scope.spawn(|| compile_ok(&compiler, &material()));
        provider.entered.wait();
        provider
            .sources
            .lock()
            .insert_shader("Base", BASE.replace("float3 Color;", "float3 Color; float Gloss;"));
        assert_eq!(compiler.invalidate_sources(&["Base"]), 0);
        provider.release.wait();
        flight.join().unwrap()
    });
    assert_eq!(during.origin, Some(CompilationOrigin::FreshlyCompiled));
    assert_eq!(members(&during), 1);
    assert!(compiler.cache.is_empty());

    let after = compile_ok(&compiler, &material());
    assert_eq!(after.origin, Some(CompilationOrigin::FreshlyCompiled));
    assert_eq!(members(&after), 2);
}
