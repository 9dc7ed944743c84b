use pretty_assertions::assert_eq;
use sdsl_diagnostic::ErrorCode;
use sdsl_ir::StringInterner;

use super::*;
use crate::test_support::TestLoader;

const LIGHTING: &str = "
    effect Lighting {
        mixin ShadingBase;
        if (UseNormalMap)
            mixin NormalFromMap;
        else
            mixin NormalFromMesh;
        if (LightCount > 2 && !Simple)
            mixin ManyLights;
        macro MAX_LIGHTS = LightCount;
    }";

struct Evaluated {
    interner: StringInterner,
    result: Result<EffectPlan, Vec<Diagnostic>>,
}

impl Evaluated {
    fn mixins(&self) -> Vec<&'static str> {
        match &self.result {
            Ok(plan) => plan.mixins.iter().map(|m| self.interner.lookup(m.name)).collect(),
            Err(errors) => panic!("evaluation failed: {errors:#?}"),
        }
    }

    fn macros(&self) -> Vec<(&str, &str)> {
        match &self.result {
            Ok(plan) => plan
                .macros
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            Err(errors) => panic!("evaluation failed: {errors:#?}"),
        }
    }

    fn codes(&self) -> Vec<ErrorCode> {
        match &self.result {
            Ok(_) => Vec::new(),
            Err(errors) => errors.iter().map(|d| d.code).collect(),
        }
    }
}

fn evaluate(sources: &[&str], effect: &str, parameters: &ParameterBag) -> Evaluated {
    let interner = StringInterner::new();
    let loader = TestLoader::new(&interner, sources);
    let result = evaluate_effect(interner.intern(effect), parameters, &loader, &interner);
    Evaluated { interner, result }
}

#[test]
fn test_conditions_select_mixins() {
    let parameters = ParameterBag::new()
        .with("UseNormalMap", true)
        .with("LightCount", 4);
    let evaluated = evaluate(&[LIGHTING], "Lighting", &parameters);
    assert_eq!(
        evaluated.mixins(),
        vec!["ShadingBase", "NormalFromMap", "ManyLights"]
    );
    assert_eq!(evaluated.macros(), vec![("MAX_LIGHTS", "4")]);
}

#[test]
fn test_missing_parameters_read_as_defaults() {
    let evaluated = evaluate(&[LIGHTING], "Lighting", &ParameterBag::new());
    assert_eq!(evaluated.mixins(), vec!["ShadingBase", "NormalFromMesh"]);
    assert_eq!(evaluated.macros(), vec![("MAX_LIGHTS", "0")]);
}

#[test]
fn test_mixin_named_by_parameter() {
    let source = "effect E { mixin Base; mixin (Material); }";
    let parameters = ParameterBag::new().with("Material", "Metal");
    let evaluated = evaluate(&[source], "E", &parameters);
    assert_eq!(evaluated.mixins(), vec!["Base", "Metal"]);
}

#[test]
fn test_mixin_parameter_must_be_a_string() {
    let source = "effect E { mixin (Material); }";
    let parameters = ParameterBag::new().with("Material", 3);
    let evaluated = evaluate(&[source], "E", &parameters);
    assert_eq!(evaluated.codes(), vec![ErrorCode::E4005]);

    let evaluated = evaluate(&[source], "E", &ParameterBag::new());
    assert_eq!(evaluated.codes(), vec![ErrorCode::E4005]);
}

#[test]
fn test_comparison_type_mismatch() {
    let source = "effect E { if (Quality == \"high\") mixin Fancy; }";
    let parameters = ParameterBag::new().with("Quality", 2);
    let evaluated = evaluate(&[source], "E", &parameters);
    assert_eq!(evaluated.codes(), vec![ErrorCode::E4005]);
}

#[test]
fn test_string_comparison() {
    let source = "effect E { if (Quality == \"high\") mixin Fancy; else mixin Plain; }";
    let parameters = ParameterBag::new().with("Quality", "high");
    assert_eq!(evaluate(&[source], "E", &parameters).mixins(), vec!["Fancy"]);
    assert_eq!(
        evaluate(&[source], "E", &ParameterBag::new()).mixins(),
        vec!["Plain"]
    );
}

#[test]
fn test_nested_effects_and_duplicates() {
    let sources = [
        "effect Outer { mixin A; mixin Inner; mixin B; }",
        "effect Inner { mixin C; mixin A; macro INNER = 1; }",
        "shader A { } shader B { } shader C { }",
    ];
    let evaluated = evaluate(&sources, "Outer", &ParameterBag::new());
    assert_eq!(evaluated.mixins(), vec!["A", "C", "B"]);
    assert_eq!(evaluated.macros(), vec![("INNER", "1")]);
    let Ok(plan) = &evaluated.result else {
        panic!("evaluation failed");
    };
    let effects: Vec<_> = plan
        .sources
        .iter()
        .map(|(n, _)| evaluated.interner.lookup(*n))
        .collect();
    assert_eq!(effects, vec!["Outer", "Inner"]);
}

#[test]
fn test_effect_cycle() {
    let sources = ["effect A { mixin B; }", "effect B { mixin A; }"];
    let evaluated = evaluate(&sources, "A", &ParameterBag::new());
    assert_eq!(evaluated.codes(), vec![ErrorCode::E4006]);
    let Err(errors) = &evaluated.result else {
        panic!("expected an error");
    };
    assert_eq!(errors[0].message, "effect `A` includes itself: A -> B -> A");
}

#[test]
fn test_unknown_effect() {
    let evaluated = evaluate(&["shader A { }"], "Missing", &ParameterBag::new());
    assert_eq!(evaluated.codes(), vec![ErrorCode::E4004]);
}

#[test]
fn test_shader_requested_as_effect() {
    let evaluated = evaluate(&["shader Solo { }"], "Solo", &ParameterBag::new());
    assert_eq!(evaluated.mixins(), vec!["Solo"]);
}

#[test]
fn test_float_macro_keeps_decimal_point() {
    let source = "effect E { macro SCALE = Scale * 2; }";
    let parameters = ParameterBag::new().with("Scale", 0.5);
    assert_eq!(
        evaluate(&[source], "E", &parameters).macros(),
        vec![("SCALE", "1.0")]
    );
}
