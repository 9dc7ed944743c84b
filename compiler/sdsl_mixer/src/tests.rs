use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::StringInterner;

use super::*;
use crate::test_support::resolve_roots;

struct Composed {
    interner: StringInterner,
    result: Result<ComposedProgram, Vec<Diagnostic>>,
}

impl Composed {
    fn program(&self) -> &ComposedProgram {
        match &self.result {
            Ok(program) => program,
            Err(errors) => panic!("composition failed: {errors:#?}"),
        }
    }

    fn order(&self) -> Vec<&str> {
        self.program()
            .order
            .iter()
            .map(|m| self.interner.lookup(m.name))
            .collect()
    }

    /// Reachable methods as `Mixin.Method`.
    fn reachable(&self) -> Vec<String> {
        let program = self.program();
        program
            .reachable
            .iter()
            .map(|m| {
                format!(
                    "{}.{}",
                    self.interner.lookup(program.mixin(m.mixin).name),
                    self.interner.lookup(program.method(*m).name())
                )
            })
            .collect()
    }

    fn codes(&self) -> Vec<ErrorCode> {
        match &self.result {
            Ok(_) => Vec::new(),
            Err(errors) => errors.iter().map(|d| d.code).collect(),
        }
    }
}

fn compose_with(
    sources: &[&str],
    roots: &[&str],
    parameters: &ParameterBag,
    macros: &BTreeMap<String, String>,
) -> Composed {
    let interner = StringInterner::new();
    let program = resolve_roots(&interner, sources, roots);
    let result = compose(program, parameters, macros, &interner);
    Composed { interner, result }
}

fn run(sources: &[&str], roots: &[&str]) -> Composed {
    compose_with(sources, roots, &ParameterBag::new(), &BTreeMap::new())
}

const INDEPENDENT: [&str; 3] = [
    "shader Lighting { float Intensity; float4 Light() { return float4(Intensity, Intensity, Intensity, 1.0); } }",
    "shader Fog { float Density; float FogFactor() { return Density; } }",
    "shader Root : Fog, Lighting { float4 PSMain() { return Light() * FogFactor(); } }",
];

#[test]
fn test_independent_mixins_order_by_name() {
    let forward = run(&INDEPENDENT, &["Lighting", "Fog", "Root"]);
    let backward = run(&INDEPENDENT, &["Root", "Fog", "Lighting"]);
    assert_eq!(forward.order(), vec!["Fog", "Lighting", "Root"]);
    assert_eq!(forward.order(), backward.order());
    assert_eq!(
        forward.program().program_hash,
        backward.program().program_hash
    );
    assert_eq!(forward.reachable(), backward.reachable());
}

#[test]
fn test_program_hash_covers_parameters_and_macros() {
    let plain = run(&INDEPENDENT, &["Root"]);
    let with_parameter = compose_with(
        &INDEPENDENT,
        &["Root"],
        &ParameterBag::new().with("Fast", true),
        &BTreeMap::new(),
    );
    let mut macros = BTreeMap::new();
    macros.insert("MAX_LIGHTS".to_string(), "4".to_string());
    let with_macro = compose_with(&INDEPENDENT, &["Root"], &ParameterBag::new(), &macros);

    let plain = plain.program().program_hash;
    assert_ne!(plain, with_parameter.program().program_hash);
    assert_ne!(plain, with_macro.program().program_hash);
}

#[test]
fn test_constant_buffers() {
    let composed = run(
        &["shader S { cbuffer PerDraw { float3 Color; }; float Time; float4x4 World; }"],
        &["S"],
    );
    let program = composed.program();
    let buffers: Vec<(&str, Vec<&str>)> = program
        .buffers
        .iter()
        .map(|b| {
            let members = b
                .members
                .iter()
                .map(|&i| composed.interner.lookup(program.fields[i].field.name))
                .collect();
            (composed.interner.lookup(b.name), members)
        })
        .collect();
    assert_eq!(
        buffers,
        vec![
            ("Globals", vec!["Time", "World"]),
            ("PerDraw", vec!["Color"]),
        ]
    );
}

#[test]
fn test_identical_fields_merge() {
    let composed = run(
        &["shader A { float Time; }", "shader B { float Time; }"],
        &["A", "B"],
    );
    let program = composed.program();
    assert_eq!(program.fields.len(), 1);
    assert_eq!(program.fields[0].owner, 0);
}

#[test]
fn test_conflicting_field_types() {
    let composed = run(
        &["shader A { float Time; }", "shader B { int Time; }"],
        &["A", "B"],
    );
    assert_eq!(composed.codes(), vec![ErrorCode::E4001]);
}

#[test]
fn test_unrelated_method_needs_override() {
    let sources = [
        "shader A { float Weight() { return 1.0; } }",
        "shader B { float Weight() { return 2.0; } }",
    ];
    assert_eq!(run(&sources, &["A", "B"]).codes(), vec![ErrorCode::E4002]);

    let sources = [
        "shader A { float Weight() { return 1.0; } }",
        "shader B { override float Weight() { return 2.0; } }",
    ];
    let composed = run(&sources, &["A", "B"]);
    let program = composed.program();
    let weight = program
        .final_impl(composed.interner.intern("Weight"))
        .unwrap();
    assert_eq!(weight.mixin, 1);
}

#[test]
fn test_override_signature_mismatch() {
    let sources = [
        "shader Base { float Weight() { return 1.0; } }",
        "shader Child : Base { float Weight(float scale) { return scale; } }",
    ];
    assert_eq!(run(&sources, &["Child"]).codes(), vec![ErrorCode::E4002]);
}

#[test]
fn test_calls_dispatch_to_final_override() {
    let sources = [
        "shader Base {
            float4 Color() { return float4(0.0, 0.0, 0.0, 1.0); }
            float4 PSMain() { return Color(); }
        }",
        "shader Red : Base { float4 Color() { return float4(1.0, 0.0, 0.0, 1.0); } }",
    ];
    let composed = run(&sources, &["Red"]);
    assert_eq!(composed.reachable(), vec!["Base.PSMain", "Red.Color"]);
    let program = composed.program();
    assert_eq!(program.entry_points.len(), 1);
    assert_eq!(program.entry_points[0].stage, Stage::Pixel);
}

#[test]
fn test_base_call_reaches_replaced_method() {
    let sources = [
        "shader Base { float4 Shade() { return float4(1.0, 1.0, 1.0, 1.0); } }",
        "shader Child : Base {
            override float4 Shade() { return base.Shade() * 0.5; }
            float4 PSMain() { return Shade(); }
        }",
    ];
    let composed = run(&sources, &["Child"]);
    assert_eq!(
        composed.reachable(),
        vec!["Child.PSMain", "Child.Shade", "Base.Shade"]
    );
}

#[test]
fn test_abstract_method_without_implementation() {
    let source = "shader S {
        abstract float3 Normal();
        float4 PSMain() { return float4(Normal(), 1.0); }
    }";
    assert_eq!(run(&[source], &["S"]).codes(), vec![ErrorCode::E4003]);
}

#[test]
fn test_abstract_method_implemented_by_later_mixin() {
    let sources = [
        "shader Base {
            abstract float3 Normal();
            float4 PSMain() { return float4(Normal(), 1.0); }
        }",
        "shader Impl { float3 Normal() { return float3(0.0, 0.0, 1.0); } }",
    ];
    let composed = run(&sources, &["Impl", "Base"]);
    assert_eq!(composed.reachable(), vec!["Base.PSMain", "Impl.Normal"]);
}

#[test]
fn test_recursion_is_rejected() {
    let source = "shader S {
        float Down(float x) { return Down(x - 1.0); }
        float4 PSMain() { return float4(Down(1.0), 0.0, 0.0, 1.0); }
    }";
    assert_eq!(run(&[source], &["S"]).codes(), vec![ErrorCode::E5003]);
}

#[test]
fn test_entry_point_attributes() {
    let source = "shader S {
        [shader(\"vertex\")]
        float4 Transform() { return float4(0.0, 0.0, 0.0, 1.0); }
        [numthreads(8, 4, 1)]
        void CSMain() { }
        float4 PSMain() { return float4(1.0, 1.0, 1.0, 1.0); }
    }";
    let composed = run(&[source], &["S"]);
    let entries: Vec<(Stage, &str, [u32; 3])> = composed
        .program()
        .entry_points
        .iter()
        .map(|e| (e.stage, composed.interner.lookup(e.name), e.workgroup))
        .collect();
    assert_eq!(
        entries,
        vec![
            (Stage::Vertex, "Transform", [1, 1, 1]),
            (Stage::Pixel, "PSMain", [1, 1, 1]),
            (Stage::Compute, "CSMain", [8, 4, 1]),
        ]
    );
}

#[test]
fn test_invalid_entry_points() {
    let duplicate = "shader S {
        float4 VSMain() { return float4(0.0, 0.0, 0.0, 1.0); }
        [shader(\"vertex\")]
        float4 Other() { return float4(0.0, 0.0, 0.0, 1.0); }
    }";
    assert_eq!(run(&[duplicate], &["S"]).codes(), vec![ErrorCode::E5004]);

    let unknown = "shader S { [shader(\"geometry\")] void Main() { } }";
    assert_eq!(run(&[unknown], &["S"]).codes(), vec![ErrorCode::E5004]);
}

#[test]
fn test_library_exports_every_implementation() {
    let sources = [
        "shader Noise { float Hash(float x) { return x * 43758.5; } abstract float Sample(); }",
        "shader Blur : Noise { float Weight() { return Hash(0.5); } }",
    ];
    let composed = run(&sources, &["Noise", "Blur"]);
    assert!(composed.program().is_library());
    assert_eq!(composed.reachable(), vec!["Noise.Hash", "Blur.Weight"]);
}
