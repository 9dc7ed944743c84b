use pretty_assertions::assert_eq;
use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::StringInterner;
use sdsl_types::{Intrinsic, ScalarType, TextureMethod, Type};

use super::*;
use crate::test_support::TestLoader;

struct Resolved {
    interner: StringInterner,
    result: Result<ResolvedProgram, Vec<Diagnostic>>,
}

impl Resolved {
    fn program(&self) -> &ResolvedProgram {
        match &self.result {
            Ok(program) => program,
            Err(errors) => panic!("resolution failed: {errors:#?}"),
        }
    }

    fn mixin(&self, name: &str) -> &ResolvedMixin {
        self.program().mixin(self.interner.intern(name)).unwrap()
    }

    fn codes(&self) -> Vec<ErrorCode> {
        match &self.result {
            Ok(_) => Vec::new(),
            Err(errors) => errors.iter().map(|d| d.code).collect(),
        }
    }

    fn messages(&self) -> Vec<&str> {
        match &self.result {
            Ok(_) => Vec::new(),
            Err(errors) => errors.iter().map(|d| d.message.as_str()).collect(),
        }
    }
}

fn run(sources: &[&str], roots: &[&str]) -> Resolved {
    let interner = StringInterner::new();
    let loader = TestLoader::new(&interner, sources);
    let roots: Vec<MixinRef> = roots
        .iter()
        .map(|r| MixinRef::root(interner.intern(r)))
        .collect();
    let result = resolve(&roots, &loader, &interner);
    Resolved { interner, result }
}

fn run_one(source: &str) -> Resolved {
    run(&[source], &["S"])
}

#[test]
fn test_base_child_constant_buffer() {
    let resolved = run(
        &[
            "shader Base { cbuffer PerDraw { float3 Color; }; }",
            "shader Child : Base { float4 Shade() { return float4(Color, 1); } }",
        ],
        &["Child"],
    );
    let program = resolved.program();
    let names: Vec<_> = program
        .mixins
        .iter()
        .map(|m| resolved.interner.lookup(m.name))
        .collect();
    assert_eq!(names, vec!["Base", "Child"]);

    let base = resolved.mixin("Base");
    let color = base.field(resolved.interner.intern("Color")).unwrap();
    assert_eq!(color.ty, Type::Vector(ScalarType::Float, 3));
    assert_eq!(
        color.storage,
        FieldStorage::Uniform {
            buffer: resolved.interner.intern("PerDraw")
        }
    );

    let child = resolved.mixin("Child");
    let shade = child.method(resolved.interner.intern("Shade")).unwrap();
    assert_eq!(shade.return_ty, Type::Vector(ScalarType::Float, 4));
    assert!(child
        .info
        .calls
        .values()
        .any(|c| *c == Callee::Constructor(Type::Vector(ScalarType::Float, 4))));
    assert!(child
        .info
        .bindings
        .values()
        .any(|b| *b == Binding::Field(resolved.interner.intern("Color"))));
}

#[test]
fn test_field_storage_classes() {
    let resolved = run_one(
        "shader S {
            float Scale;
            static float Counter;
            static const int Count = 4;
            stream float4 Position : SV_Position;
            Texture2D Albedo;
            SamplerState Linear;
            rgroup Maps { Texture2D Normal; };
        }",
    );
    let s = resolved.mixin("S");
    let storage = |name: &str| s.field(resolved.interner.intern(name)).unwrap().storage;
    let globals = resolved.interner.intern("Globals");
    assert_eq!(storage("Scale"), FieldStorage::Uniform { buffer: globals });
    assert_eq!(storage("Counter"), FieldStorage::Static);
    assert_eq!(storage("Count"), FieldStorage::Constant);
    assert_eq!(storage("Position"), FieldStorage::Stream);
    assert_eq!(storage("Albedo"), FieldStorage::Resource);
    assert_eq!(storage("Linear"), FieldStorage::Resource);
    assert_eq!(storage("Normal"), FieldStorage::Resource);

    let position = s.field(resolved.interner.intern("Position")).unwrap();
    assert_eq!(position.semantic.map(|n| resolved.interner.lookup(n)), Some("SV_Position"));
}

#[test]
fn test_array_size_from_constant() {
    let resolved = run(
        &[
            "shader Sizes { static const int Count = 3; }",
            "shader S : Sizes { float Weights[Count * 2]; float Local[Count]; }",
        ],
        &["S"],
    );
    let s = resolved.mixin("S");
    let weights = s.field(resolved.interner.intern("Weights")).unwrap();
    assert_eq!(weights.ty, Type::Array(Box::new(Type::FLOAT), 6));
    let local = s.field(resolved.interner.intern("Local")).unwrap();
    assert_eq!(local.ty, Type::Array(Box::new(Type::FLOAT), 3));
}

#[test]
fn test_invalid_array_sizes() {
    let resolved = run_one("shader S { float Zero[0]; float Scale; float Bad[Scale]; }");
    assert_eq!(resolved.codes(), vec![ErrorCode::E3010, ErrorCode::E3010]);
}

#[test]
fn test_texture_sampling_and_streams() {
    let resolved = run_one(
        "shader S {
            Texture2D Albedo;
            SamplerState Linear;
            stream float2 TexCoord : TEXCOORD0;
            float4 Main() { return Albedo.Sample(Linear, streams.TexCoord); }
        }",
    );
    let s = resolved.mixin("S");
    assert!(s
        .info
        .calls
        .values()
        .any(|c| *c == Callee::Texture(TextureMethod::Sample)));
    assert!(s
        .info
        .members
        .values()
        .any(|m| *m == MemberAccess::Method));
}

#[test]
fn test_locals_swizzles_and_intrinsics() {
    let resolved = run_one(
        "shader S {
            float Main() {
                float3 n = normalize(float3(1, 2, 3));
                float2 xy = n.xy;
                for (int i = 0; i < 3; i++) { xy += 1; }
                return dot(n, n) + xy.x;
            }
        }",
    );
    let s = resolved.mixin("S");
    let main = s.method(resolved.interner.intern("Main")).unwrap();
    let locals: Vec<_> = main
        .locals
        .iter()
        .map(|l| (resolved.interner.lookup(l.name), l.ty.clone()))
        .collect();
    assert_eq!(
        locals,
        vec![
            ("n", Type::Vector(ScalarType::Float, 3)),
            ("xy", Type::Vector(ScalarType::Float, 2)),
            ("i", Type::INT),
        ]
    );
    assert_eq!(main.declarators.len(), 3);
    assert!(s
        .info
        .calls
        .values()
        .any(|c| *c == Callee::Intrinsic(Intrinsic::Normalize)));
    assert!(s
        .info
        .members
        .values()
        .any(|m| *m == MemberAccess::Swizzle(vec![0, 1])));
}

#[test]
fn test_struct_fields() {
    let resolved = run_one(
        "shader S {
            struct Light { float3 Direction; float Intensity; };
            Light Sun;
            float Main() { return Sun.Intensity; }
        }",
    );
    let program = resolved.program();
    let light = program.structs.get(resolved.interner.intern("Light")).unwrap();
    assert_eq!(light.members.len(), 2);
    let s = resolved.mixin("S");
    assert!(s
        .info
        .members
        .values()
        .any(|m| *m == MemberAccess::StructField(1)));
}

#[test]
fn test_base_call_resolves_to_composed_method() {
    let resolved = run(
        &[
            "shader A { float4 Shade() { return 1; } }",
            "shader B : A { override float4 Shade() { return base.Shade() * 0.5; } }",
        ],
        &["B"],
    );
    let b = resolved.mixin("B");
    let shade = resolved.interner.intern("Shade");
    assert!(b.info.calls.values().any(|c| *c == Callee::Base(shade)));
}

#[test]
fn test_type_mismatch() {
    let resolved = run_one("shader S { void Main() { float4 v = float3(1, 2, 3); } }");
    assert_eq!(resolved.codes(), vec![ErrorCode::E3001]);
}

#[test]
fn test_unknown_type() {
    let resolved = run_one("shader S { Material M; }");
    assert_eq!(resolved.codes(), vec![ErrorCode::E3002]);
    assert_eq!(resolved.messages(), vec!["unknown type `Material`"]);
}

#[test]
fn test_unknown_identifier() {
    let resolved = run_one("shader S { float Main() { return missing; } }");
    assert_eq!(resolved.codes(), vec![ErrorCode::E3003]);
}

#[test]
fn test_fields_of_uncomposed_mixins_are_invisible() {
    let resolved = run(
        &[
            "shader A { float Value; }",
            "shader B { float Main() { return Value; } }",
        ],
        &["A", "B"],
    );
    assert_eq!(resolved.codes(), vec![ErrorCode::E3003]);
}

#[test]
fn test_argument_count() {
    let resolved = run_one(
        "shader S {
            float Helper(float x) { return x; }
            float Main() { return Helper(1, 2); }
        }",
    );
    assert_eq!(resolved.codes(), vec![ErrorCode::E3004]);
}

#[test]
fn test_duplicate_local() {
    let resolved = run_one("shader S { void Main() { float a = 1; float a = 2; } }");
    assert_eq!(resolved.codes(), vec![ErrorCode::E3005]);
}

#[test]
fn test_shadowing_in_nested_block_is_allowed() {
    let resolved = run_one("shader S { void Main() { float a = 1; { float a = 2; } } }");
    assert_eq!(resolved.codes(), vec![]);
}

#[test]
fn test_use_before_declaration() {
    let resolved = run_one("shader S { float Main() { float a = b; float b = 1; return a; } }");
    assert_eq!(resolved.codes(), vec![ErrorCode::E3006]);
}

#[test]
fn test_compose_cycle() {
    let resolved = run(&["shader A : B { }", "shader B : A { }"], &["A"]);
    assert_eq!(resolved.codes(), vec![ErrorCode::E3007]);
    assert_eq!(resolved.messages(), vec!["compose cycle: A -> B -> A"]);
}

#[test]
fn test_unknown_mixin() {
    let resolved = run(&["shader A : Missing { }"], &["A"]);
    assert_eq!(resolved.codes(), vec![ErrorCode::E3008]);
}

#[test]
fn test_invalid_assignment_targets() {
    let resolved = run_one(
        "shader S {
            float Scale;
            void Main() {
                const float k = 1;
                k = 2;
                Scale = 3;
                1 = 2;
            }
        }",
    );
    assert_eq!(
        resolved.codes(),
        vec![ErrorCode::E3009, ErrorCode::E3009, ErrorCode::E3009]
    );
}

#[test]
fn test_writable_fields() {
    let resolved = run_one(
        "shader S {
            static float Counter;
            stream float4 Color;
            void Main() { Counter += 1; streams.Color.rgb = 0; }
        }",
    );
    assert_eq!(resolved.codes(), vec![]);
}

#[test]
fn test_unknown_member() {
    let resolved = run_one("shader S { float Main() { float3 v = 0; return v.q; } }");
    assert_eq!(resolved.codes(), vec![ErrorCode::E3011]);
}

#[test]
fn test_unknown_stream() {
    let resolved = run_one("shader S { float Scale; float Main() { return streams.Scale; } }");
    assert_eq!(resolved.codes(), vec![ErrorCode::E3011]);
}

#[test]
fn test_no_overload() {
    let resolved = run_one(
        "shader S { float Main() { float3 a = 0; float2 b = 0; return dot(a, b); } }",
    );
    assert_eq!(resolved.codes(), vec![ErrorCode::E3012]);
}

#[test]
fn test_break_outside_loop() {
    let resolved = run_one("shader S { void Main() { break; } }");
    assert_eq!(resolved.codes(), vec![ErrorCode::E3013]);
}

#[test]
fn test_base_without_base_method() {
    let resolved = run_one("shader S { float4 Shade() { return base.Shade(); } }");
    assert_eq!(resolved.codes(), vec![ErrorCode::E3014]);
}

#[test]
fn test_invalid_operand() {
    let resolved = run_one("shader S { Texture2D Tex; float Main() { return Tex + 1; } }");
    assert_eq!(resolved.codes(), vec![ErrorCode::E3015]);
}

#[test]
fn test_errors_from_independent_mixins_are_all_reported() {
    let resolved = run(
        &[
            "shader A { float Main() { return missing; } }",
            "shader B { Unknown U; }",
        ],
        &["A", "B"],
    );
    assert_eq!(resolved.codes(), vec![ErrorCode::E3003, ErrorCode::E3002]);
}

#[test]
fn test_resolve_mixin() {
    let interner = StringInterner::new();
    let loader = TestLoader::new(&interner, &["shader A { float X; }"]);
    let mixin = resolve_mixin(interner.intern("A"), &loader, &interner).unwrap();
    assert_eq!(mixin.fields.len(), 1);
}
