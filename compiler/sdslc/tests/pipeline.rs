//! End-to-end tests through the public compiler API.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sdsl_diagnostic::ErrorCode;
use sdsl_preprocess::{preprocess, IncludedFile, MacroTable, NoIncludes};
use sdsl_spirv::{disassemble, BindingClass, ShaderStage};
use sdslc::{
    CancellationToken, CompilationOrigin, CompileRequest, CompilerConfig, CompilerResult,
    EffectCompiler, LoadedSource, MemorySources, SourceError, SourceProvider,
};

const BASE: &str = "shader Base {
    cbuffer PerMaterial { float3 Color; };
    float4 Shade() { return float4(Color, 1); }
}";
const CHILD: &str = "shader Child : Base {
    float4 PSMain() : SV_Target { return Shade(); }
}";

fn base_child() -> MemorySources {
    MemorySources::new()
        .with_shader("Base", BASE)
        .with_shader("Child", CHILD)
}

fn compile(sources: MemorySources, request: &CompileRequest) -> CompilerResult {
    EffectCompiler::new(CompilerConfig::new(), Arc::new(sources))
        .compile(request, &CancellationToken::new())
}

#[test]
fn test_child_inherits_constant_buffer_and_method() {
    let result = compile(base_child(), &CompileRequest::new("Child"));
    assert!(result.is_success(), "{:#?}", result.diagnostics);
    let bytecode = result.bytecode.unwrap();

    let buffer = bytecode.reflection.constant_buffer("PerMaterial").unwrap();
    assert_eq!(buffer.members.len(), 1);
    assert_eq!(buffer.members[0].name, "Color");
    assert_eq!(buffer.members[0].type_name, "float3");
    assert_eq!(buffer.members[0].offset, 0);
    let binding = bytecode.reflection.binding("PerMaterial").unwrap();
    assert_eq!(binding.class, BindingClass::ConstantBuffer);
    assert_eq!(binding.stages, vec![ShaderStage::Pixel]);

    let text = disassemble(&bytecode.words).unwrap();
    assert!(text.contains("\"Base.Shade\""), "{text}");
    assert!(text.contains("\"PSMain\""), "{text}");
}

#[test]
fn test_compiling_twice_gives_identical_modules() {
    let request = CompileRequest::new("Child");
    let first = compile(base_child(), &request).bytecode.unwrap();
    let second = compile(base_child(), &request).bytecode.unwrap();
    assert_eq!(first.words, second.words);
    assert_eq!(first.reflection, second.reflection);
}

#[test]
fn test_composition_order_is_deterministic() {
    let sources = || {
        MemorySources::new()
            .with_shader("A", "shader A { float4 Color() { return float4(1, 0, 0, 1); } }")
            .with_shader("B", "shader B : A { override float4 Color() { return base.Color() * 0.5; } }")
            .with_shader(
                "C",
                "shader C : A { cbuffer Extra { float Gain; }; float4 Boost(float4 c) { return c * Gain; } }",
            )
            .with_shader(
                "D",
                "shader D : B, C { float4 PSMain() : SV_Target { return Boost(Color()); } }",
            )
    };
    let words: Vec<Vec<u32>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| compile(sources(), &CompileRequest::new("D"))))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().bytecode.unwrap().words.clone())
            .collect()
    });
    assert!(words.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn test_inheritance_cycle() {
    let sources = MemorySources::new()
        .with_shader("A", "shader A : B { }")
        .with_shader("B", "shader B : A { }");
    let result = compile(sources, &CompileRequest::new("A"));
    assert!(result.bytecode.is_none());
    let cycle = result
        .diagnostics
        .iter()
        .find(|d| d.code == ErrorCode::E3007)
        .unwrap();
    assert!(cycle.message.contains("A -> B -> A"), "{}", cycle.message);
}

const BLUR: &str = "#define N 3
shader Blur {
    cbuffer Taps { float Weights[N]; };
    float4 PSMain() : SV_Target { return float4(Weights[0], Weights[1], Weights[N - 1], 1); }
}";

#[test]
fn test_define_sets_array_length_and_keeps_lines() {
    let processed = preprocess("Blur.sdsl", BLUR, &MacroTable::new(), &NoIncludes).unwrap();
    assert_eq!(processed.text.lines().count(), BLUR.lines().count());
    assert!(processed.text.contains("float Weights[3];"), "{}", processed.text);

    let result = compile(
        MemorySources::new().with_shader("Blur", BLUR),
        &CompileRequest::new("Blur"),
    );
    assert!(result.is_success(), "{:#?}", result.diagnostics);
    let bytecode = result.bytecode.unwrap();
    let taps = bytecode.reflection.constant_buffer("Taps").unwrap();
    assert_eq!(taps.members[0].type_name, "float[3]");
    assert_eq!(taps.members[0].size, 36);
}

#[test]
fn test_errors_point_past_expanded_macros() {
    let broken = BLUR.replace("Weights[N - 1], 1", "Weights[N - 1], Missing");
    let result = compile(
        MemorySources::new().with_shader("Blur", broken),
        &CompileRequest::new("Blur"),
    );
    assert_eq!(
        result.diagnostics.iter().map(|d| d.code).collect::<Vec<_>>(),
        vec![ErrorCode::E3003]
    );
    let location = result.diagnostics[0].location.as_ref().unwrap();
    assert_eq!(location.file, "Blur.sdsl");
    assert_eq!(location.line, 4);
}

#[test]
fn test_preprocessing_is_idempotent() {
    let once = preprocess("Blur.sdsl", BLUR, &MacroTable::new(), &NoIncludes).unwrap();
    let twice = preprocess("Blur.sdsl", &once.text, &MacroTable::new(), &NoIncludes).unwrap();
    assert_eq!(once.text, twice.text);
}

/// Counts how often each source is read.
struct Counting {
    inner: MemorySources,
    loads: AtomicUsize,
}

impl SourceProvider for Counting {
    fn load(&self, name: &str) -> Result<LoadedSource, SourceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(name)
    }

    fn include(&self, path: &str, from: &str) -> Option<IncludedFile> {
        self.inner.include(path, from)
    }
}

#[test]
fn test_concurrent_requests_compile_once() {
    let provider = Arc::new(Counting {
        inner: base_child(),
        loads: AtomicUsize::new(0),
    });
    let compiler = EffectCompiler::new(CompilerConfig::new(), provider.clone());
    let request = CompileRequest::new("Child");

    let results: Vec<CompilerResult> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| compiler.compile(&request, &CancellationToken::new())))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let fresh = results
        .iter()
        .filter(|r| r.origin == Some(CompilationOrigin::FreshlyCompiled))
        .count();
    assert_eq!(fresh, 1);
    let first = results[0].bytecode.as_ref().unwrap();
    assert!(results
        .iter()
        .all(|r| Arc::ptr_eq(first, r.bytecode.as_ref().unwrap())));
    // One pipeline run reads Child and Base once each.
    assert_eq!(provider.loads.load(Ordering::SeqCst), 2);
}

#[test]
fn test_includes_resolve_through_the_provider() {
    let sources = MemorySources::new()
        .with_include("common.sdsli", "#define TINT float4(0.5, 0.5, 0.5, 1)\n")
        .with_shader(
            "Tinted",
            "#include \"common.sdsli\"\nshader Tinted { float4 PSMain() : SV_Target { return TINT; } }",
        );
    let result = compile(sources, &CompileRequest::new("Tinted"));
    assert!(result.is_success(), "{:#?}", result.diagnostics);
}
