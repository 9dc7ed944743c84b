use pretty_assertions::assert_eq;
use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{
    AssignOp, BinaryOp, ControlHint, Decl, EffectStmtKind, ExprId, ExprKind, Literal, Member,
    MethodDecl, MixinTarget, Modifiers, ShaderDecl, SourceId, StmtId, StmtKind, StringInterner,
    UnaryOp,
};

use super::*;

struct Parsed {
    output: ParseOutput,
    interner: StringInterner,
}

impl Parsed {
    fn name(&self, name: sdsl_ir::Name) -> &'static str {
        self.interner.lookup(name)
    }

    fn shader(&self, index: usize) -> &ShaderDecl {
        match &self.output.module.decls[index] {
            Decl::Shader(shader) => shader,
            Decl::Effect(_) => panic!("decl {index} is an effect"),
        }
    }

    fn method(&self, shader: usize, name: &str) -> &MethodDecl {
        self.shader(shader)
            .members
            .iter()
            .find_map(|m| match m {
                Member::Method(method) if self.name(method.name) == name => Some(method),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no method {name}"))
    }

    fn body(&self, method: &MethodDecl) -> Vec<StmtId> {
        let Some(body) = method.body else {
            panic!("method has no body");
        };
        match &self.output.arena.stmt(body).kind {
            StmtKind::Block(stmts) => stmts.clone(),
            other => panic!("body is not a block: {other:?}"),
        }
    }

    fn expr(&self, id: ExprId) -> &ExprKind {
        &self.output.arena.expr(id).kind
    }

    fn stmt(&self, id: StmtId) -> &StmtKind {
        &self.output.arena.stmt(id).kind
    }

    fn error_codes(&self) -> Vec<ErrorCode> {
        self.output.errors.iter().map(|e| e.code).collect()
    }
}

fn parse_source(source: &str) -> Parsed {
    let interner = StringInterner::new();
    let lexed = sdsl_lexer::lex(source, SourceId::new(0), &interner);
    assert!(lexed.errors.is_empty(), "lex errors: {:?}", lexed.errors);
    let output = parse(&lexed.tokens, &interner);
    Parsed { output, interner }
}

fn parse_ok(source: &str) -> Parsed {
    let parsed = parse_source(source);
    assert!(
        !parsed.output.has_errors(),
        "unexpected errors: {:?}",
        parsed.output.errors
    );
    parsed
}

/// The expression of `return <expr>;` as the only statement of `Main`.
fn return_expr(parsed: &Parsed) -> ExprId {
    let method = parsed.method(0, "Main");
    let body = parsed.body(method);
    match parsed.stmt(body[0]) {
        StmtKind::Return(Some(e)) => *e,
        other => panic!("expected return, got {other:?}"),
    }
}

fn parse_return(expr: &str) -> (Parsed, ExprId) {
    let parsed = parse_ok(&format!("shader S {{ float Main() {{ return {expr}; }} }}"));
    let id = return_expr(&parsed);
    (parsed, id)
}

#[test]
fn test_base_and_child_shaders() {
    let parsed = parse_ok(
        "shader Base {
            cbuffer PerMaterial { float3 Color; };
            float4 Shade() { return float4(Color, 1); }
        }
        shader Child : Base {
            override float4 Shade() { return base.Shade(); }
        }",
    );
    assert_eq!(parsed.output.module.decls.len(), 2);

    let base = parsed.shader(0);
    assert_eq!(parsed.name(base.name), "Base");
    let Member::CBuffer(cbuffer) = &base.members[0] else {
        panic!("expected cbuffer");
    };
    assert_eq!(parsed.name(cbuffer.name), "PerMaterial");
    assert_eq!(parsed.name(cbuffer.fields[0].name), "Color");
    assert_eq!(parsed.name(cbuffer.fields[0].ty.name), "float3");

    let child = parsed.shader(1);
    assert_eq!(parsed.name(child.bases[0].name), "Base");
    let shade = parsed.method(1, "Shade");
    assert!(shade.modifiers.contains(Modifiers::OVERRIDE));
    let body = parsed.body(shade);
    let StmtKind::Return(Some(value)) = parsed.stmt(body[0]) else {
        panic!("expected return");
    };
    let ExprKind::Call { callee, args } = parsed.expr(*value) else {
        panic!("expected call");
    };
    assert!(args.is_empty());
    assert!(matches!(parsed.expr(*callee), ExprKind::Base(n) if parsed.name(*n) == "Shade"));
}

#[test]
fn test_shader_spans() {
    let parsed = parse_ok("shader Lit { }");
    let shader = parsed.shader(0);
    assert_eq!(shader.name_span, sdsl_ir::Span::new(7, 10));
    assert_eq!(shader.span, sdsl_ir::Span::new(0, 14));
}

#[test]
fn test_compose_members_and_header() {
    let parsed = parse_ok("shader A : B, compose C { compose D; }");
    let names: Vec<&str> = parsed
        .shader(0)
        .composed()
        .map(|b| parsed.name(b.name))
        .collect();
    assert_eq!(names, vec!["B", "C", "D"]);
}

#[test]
fn test_fields_with_modifiers_semantics_and_arrays() {
    let parsed = parse_ok(
        "shader S {
            stage stream float4 Position : SV_Position;
            static const int Count = 4;
            float Weights[Count], Bias;
            Texture2D<float4> Albedo;
            SamplerState Linear;
        }",
    );
    let fields: Vec<_> = parsed
        .shader(0)
        .members
        .iter()
        .filter_map(|m| match m {
            Member::Field(f) => Some(f),
            _ => None,
        })
        .collect();
    assert_eq!(fields.len(), 6);
    assert!(fields[0]
        .modifiers
        .contains(Modifiers::STAGE | Modifiers::STREAM));
    assert_eq!(
        fields[0].semantic.map(|s| parsed.name(s.name)),
        Some("SV_Position")
    );
    assert!(fields[1].init.is_some());
    assert!(fields[2].array.is_some());
    assert_eq!(parsed.name(fields[3].name), "Bias");
    assert!(fields[3].array.is_none());
    assert_eq!(fields[4].ty.arg.map(|a| parsed.name(a)), Some("float4"));
}

#[test]
fn test_struct_and_rgroup() {
    let parsed = parse_ok(
        "shader S {
            struct Light { float3 Direction; float Intensity[2]; };
            rgroup Textures { Texture2D Diffuse; };
        }",
    );
    let shader = parsed.shader(0);
    let Member::Struct(light) = &shader.members[0] else {
        panic!("expected struct");
    };
    assert_eq!(light.fields.len(), 2);
    assert!(light.fields[1].array.is_some());
    let Member::CBuffer(group) = &shader.members[1] else {
        panic!("expected rgroup");
    };
    assert!(group.is_rgroup);
}

#[test]
fn test_method_attributes_params_and_semantic() {
    let parsed = parse_ok(
        "shader S {
            [numthreads(8, 8, 1)]
            void CSMain(uint3 id : SV_DispatchThreadID) { }
            float4 PSMain(float4 pos : SV_Position) : SV_Target { return pos; }
            abstract float3 Normal();
        }",
    );
    let cs = parsed.method(0, "CSMain");
    assert_eq!(parsed.name(cs.attributes[0].name), "numthreads");
    assert_eq!(cs.attributes[0].args.len(), 3);
    assert_eq!(
        cs.params[0].semantic.map(|s| parsed.name(s.name)),
        Some("SV_DispatchThreadID")
    );
    let ps = parsed.method(0, "PSMain");
    assert_eq!(ps.semantic.map(|s| parsed.name(s.name)), Some("SV_Target"));
    let normal = parsed.method(0, "Normal");
    assert!(normal.body.is_none());
}

#[test]
fn test_keyword_named_attribute() {
    let parsed = parse_ok(
        r#"shader S {
            [shader("pixel")]
            float4 Main() : SV_Target { return 1; }
        }"#,
    );
    let main = parsed.method(0, "Main");
    assert_eq!(parsed.name(main.attributes[0].name), "shader");
    assert!(matches!(
        parsed.expr(main.attributes[0].args[0]),
        ExprKind::Literal(Literal::Str(s)) if parsed.name(*s) == "pixel"
    ));
}

#[test]
fn test_bodyless_method_must_be_abstract() {
    let parsed = parse_source("shader S { float3 Normal(); }");
    assert_eq!(parsed.error_codes(), vec![ErrorCode::E2006]);
}

#[test]
fn test_effect_statements() {
    let parsed = parse_ok(
        "effect Lighting {
            mixin ShadingBase;
            if (UseNormalMap)
                mixin NormalFromMap;
            else {
                mixin NormalFromMesh;
            }
            mixin (MaterialMixin);
            compose Extra;
            macro MAX_LIGHTS = LightCount;
        }",
    );
    let Decl::Effect(effect) = &parsed.output.module.decls[0] else {
        panic!("expected effect");
    };
    assert_eq!(effect.body.len(), 5);
    assert!(matches!(
        effect.body[0].kind,
        EffectStmtKind::Mixin(MixinTarget::Named(n, _)) if parsed.name(n) == "ShadingBase"
    ));
    let EffectStmtKind::If { otherwise, .. } = &effect.body[1].kind else {
        panic!("expected if");
    };
    assert!(matches!(
        otherwise.as_deref().map(|s| &s.kind),
        Some(EffectStmtKind::Block(stmts)) if stmts.len() == 1
    ));
    assert!(matches!(
        effect.body[2].kind,
        EffectStmtKind::Mixin(MixinTarget::Parameter(n, _)) if parsed.name(n) == "MaterialMixin"
    ));
    assert!(matches!(effect.body[3].kind, EffectStmtKind::Mixin(MixinTarget::Named(..))));
    assert!(matches!(effect.body[4].kind, EffectStmtKind::Macro { .. }));
}

#[test]
fn test_binary_precedence() {
    let (parsed, id) = parse_return("a + b * c");
    let ExprKind::Binary { op, rhs, .. } = parsed.expr(id) else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(
        parsed.expr(*rhs),
        ExprKind::Binary { op: BinaryOp::Mul, .. }
    ));
}

#[test]
fn test_left_associativity() {
    let (parsed, id) = parse_return("a - b - c");
    let ExprKind::Binary { op, lhs, .. } = parsed.expr(id) else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Sub);
    assert!(matches!(
        parsed.expr(*lhs),
        ExprKind::Binary { op: BinaryOp::Sub, .. }
    ));
}

#[test]
fn test_logical_and_comparison_precedence() {
    let (parsed, id) = parse_return("a < b && c == d || e");
    let ExprKind::Binary { op, lhs, .. } = parsed.expr(id) else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinaryOp::Or);
    let ExprKind::Binary { op, lhs, rhs } = parsed.expr(*lhs) else {
        panic!("expected &&");
    };
    assert_eq!(*op, BinaryOp::And);
    assert!(matches!(parsed.expr(*lhs), ExprKind::Binary { op: BinaryOp::Lt, .. }));
    assert!(matches!(parsed.expr(*rhs), ExprKind::Binary { op: BinaryOp::Eq, .. }));
}

#[test]
fn test_ternary_and_unary() {
    let (parsed, id) = parse_return("!a ? -b : c++");
    let ExprKind::Ternary {
        cond,
        then,
        otherwise,
    } = parsed.expr(id)
    else {
        panic!("expected ternary");
    };
    assert!(matches!(parsed.expr(*cond), ExprKind::Unary { op: UnaryOp::Not, .. }));
    assert!(matches!(parsed.expr(*then), ExprKind::Unary { op: UnaryOp::Neg, .. }));
    assert!(matches!(
        parsed.expr(*otherwise),
        ExprKind::Unary { op: UnaryOp::PostInc, .. }
    ));
}

#[test]
fn test_cast_only_for_builtin_types() {
    let (parsed, id) = parse_return("(float)count");
    assert!(matches!(parsed.expr(id), ExprKind::Cast { .. }));

    let (parsed, id) = parse_return("(count)");
    assert!(matches!(parsed.expr(id), ExprKind::Ident(_)));
}

#[test]
fn test_postfix_chain() {
    let (parsed, id) = parse_return("Lights[i].Color.rgb");
    let ExprKind::Member { object, member, .. } = parsed.expr(id) else {
        panic!("expected member");
    };
    assert_eq!(parsed.name(*member), "rgb");
    let ExprKind::Member { object, .. } = parsed.expr(*object) else {
        panic!("expected member");
    };
    assert!(matches!(parsed.expr(*object), ExprKind::Index { .. }));
}

#[test]
fn test_literals() {
    let (parsed, id) = parse_return("float3(1, 2u, 0.5)");
    let ExprKind::Call { args, .. } = parsed.expr(id) else {
        panic!("expected call");
    };
    assert!(matches!(parsed.expr(args[0]), ExprKind::Literal(Literal::Int(1))));
    assert!(matches!(parsed.expr(args[1]), ExprKind::Literal(Literal::UInt(2))));
    assert!(matches!(
        parsed.expr(args[2]),
        ExprKind::Literal(l) if l.as_f64() == Some(0.5)
    ));
}

#[test]
fn test_streams_and_this() {
    let (parsed, id) = parse_return("streams.Position.x + this.Scale");
    let ExprKind::Binary { lhs, rhs, .. } = parsed.expr(id) else {
        panic!("expected binary");
    };
    let ExprKind::Member { object, .. } = parsed.expr(*lhs) else {
        panic!("expected member");
    };
    assert!(matches!(parsed.expr(*object), ExprKind::Stream(n) if parsed.name(*n) == "Position"));
    assert!(matches!(parsed.expr(*rhs), ExprKind::Ident(n) if parsed.name(*n) == "Scale"));
}

#[test]
fn test_statements() {
    let parsed = parse_ok(
        "shader S {
            float Main() {
                float total = 0, scale = 2;
                Texture2D<float4> t;
                [unroll] for (int i = 0; i < 4; i++) { total += i; }
                while (total > 1) total /= 2;
                do { total -= 1; } while (total > 0);
                if (total < 0) discard; else total = 1;
                ;
                return total;
            }
        }",
    );
    let method = parsed.method(0, "Main");
    let body = parsed.body(method);
    assert_eq!(body.len(), 8);

    assert!(matches!(parsed.stmt(body[0]), StmtKind::Var(decls) if decls.len() == 2));
    assert!(matches!(parsed.stmt(body[1]), StmtKind::Var(decls) if decls[0].ty.arg.is_some()));

    let for_stmt = parsed.output.arena.stmt(body[2]);
    assert_eq!(for_stmt.hint, ControlHint::Unroll);
    let StmtKind::For { init, cond, step, .. } = &for_stmt.kind else {
        panic!("expected for");
    };
    assert!(init.is_some() && cond.is_some() && step.is_some());

    let StmtKind::While { body: while_body, .. } = parsed.stmt(body[3]) else {
        panic!("expected while");
    };
    let StmtKind::Expr(assign) = parsed.stmt(*while_body) else {
        panic!("expected expression statement");
    };
    assert!(matches!(
        parsed.expr(*assign),
        ExprKind::Assign { op: AssignOp::Compound(BinaryOp::Div), .. }
    ));

    assert!(matches!(parsed.stmt(body[4]), StmtKind::DoWhile { .. }));
    assert!(matches!(
        parsed.stmt(body[5]),
        StmtKind::If { otherwise: Some(_), .. }
    ));
    assert!(matches!(parsed.stmt(body[6]), StmtKind::Empty));
    assert!(matches!(parsed.stmt(body[7]), StmtKind::Return(Some(_))));
}

#[test]
fn test_assignment_is_right_associative() {
    let parsed = parse_ok("shader S { void Main() { a = b = c; } }");
    let method = parsed.method(0, "Main");
    let body = parsed.body(method);
    let StmtKind::Expr(id) = parsed.stmt(body[0]) else {
        panic!("expected expression statement");
    };
    let ExprKind::Assign { value, .. } = parsed.expr(*id) else {
        panic!("expected assign");
    };
    assert!(matches!(parsed.expr(*value), ExprKind::Assign { .. }));
}

#[test]
fn test_recovery_reports_each_broken_member() {
    let parsed = parse_source(
        "shader S {
            float a = ;
            float b;
            float4 Main() { return ; }
            int c d;
            float e;
        }",
    );
    assert_eq!(parsed.output.errors.len(), 2);
    let shader = parsed.shader(0);
    let names: Vec<&str> = shader
        .members
        .iter()
        .filter_map(|m| match m {
            Member::Field(f) => Some(parsed.name(f.name)),
            Member::Method(m) => Some(parsed.name(m.name)),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["b", "Main", "e"]);
}

#[test]
fn test_recovery_inside_method_body() {
    let parsed = parse_source(
        "shader S {
            void Main() {
                float x = (1 + ;
                float y = 2;
            }
            float after;
        }",
    );
    assert_eq!(parsed.error_codes(), vec![ErrorCode::E2002]);
    let body = parsed.body(parsed.method(0, "Main"));
    assert_eq!(body.len(), 1);
    assert_eq!(parsed.shader(0).members.len(), 2);
}

#[test]
fn test_unclosed_brace_at_end_of_input() {
    let parsed = parse_source("shader S { float a;");
    assert_eq!(parsed.error_codes(), vec![ErrorCode::E2003]);
}

#[test]
fn test_garbage_at_top_level() {
    let parsed = parse_source("float x; shader S { }");
    assert_eq!(parsed.error_codes(), vec![ErrorCode::E2006]);
    assert_eq!(parsed.output.module.decls.len(), 1);
}

#[test]
fn test_error_context_names_the_declaration() {
    let parsed = parse_source("shader { }");
    let error = &parsed.output.errors[0];
    assert_eq!(error.code, ErrorCode::E2004);
    assert_eq!(
        error.context.as_deref(),
        Some("while parsing shader declaration")
    );
}

#[test]
fn test_deeply_nested_expression() {
    let depth = 2_000;
    let expr = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    let (parsed, id) = parse_return(&expr);
    assert!(matches!(parsed.expr(id), ExprKind::Literal(Literal::Int(1))));
}
