//! Entry point discovery.

use std::fmt;

use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::{ExprId, ExprKind, Literal, Name, SourceId, Span, StringInterner};
use sdsl_resolve::ResolvedMixin;

use super::{ComposedProgram, MethodRef};

/// Pipeline stage of an entry point.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum Stage {
    Vertex,
    Pixel,
    Compute,
}

impl Stage {
    /// Parse the argument of `[shader("...")]`.
    pub fn from_attribute(text: &str) -> Option<Self> {
        match text {
            "vertex" => Some(Stage::Vertex),
            "pixel" | "fragment" => Some(Stage::Pixel),
            "compute" => Some(Stage::Compute),
            _ => None,
        }
    }

    /// Stage implied by a conventional entry point name.
    pub fn from_method_name(text: &str) -> Option<Self> {
        match text {
            "VSMain" => Some(Stage::Vertex),
            "PSMain" => Some(Stage::Pixel),
            "CSMain" => Some(Stage::Compute),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Vertex => "vertex",
            Stage::Pixel => "pixel",
            Stage::Compute => "compute",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPoint {
    pub stage: Stage,
    pub method: MethodRef,
    pub name: Name,
    /// `[numthreads(x, y, z)]`; `[1, 1, 1]` outside compute.
    pub workgroup: [u32; 3],
}

/// Find the entry points among the final implementations, ordered by stage.
pub(super) fn find_entry_points(
    program: &ComposedProgram,
    interner: &StringInterner,
) -> Result<Vec<EntryPoint>, Vec<Diagnostic>> {
    let shader = interner.intern("shader");
    let numthreads = interner.intern("numthreads");
    let mut entries: Vec<EntryPoint> = Vec::new();
    let mut errors = Vec::new();

    for chain in &program.chains {
        let Some(method_ref) = program.final_impl(chain.name) else {
            continue;
        };
        let mixin = program.mixin(method_ref.mixin);
        let method = program.method(method_ref);
        let source = mixin.unit.id;

        let stage = match method.attribute(shader) {
            Some(attribute) => {
                let text = attribute
                    .args
                    .first()
                    .and_then(|arg| string_argument(mixin, *arg, interner));
                match text.and_then(Stage::from_attribute) {
                    Some(stage) => stage,
                    None => {
                        errors.push(entry_error(
                            source,
                            attribute.span,
                            "`shader` expects \"vertex\", \"pixel\", \"fragment\" or \"compute\"",
                        ));
                        continue;
                    }
                }
            }
            None => match Stage::from_method_name(interner.lookup(chain.name)) {
                Some(stage) => stage,
                None => continue,
            },
        };

        let mut workgroup = [1, 1, 1];
        if let Some(attribute) = method.attribute(numthreads) {
            match workgroup_size(mixin, &attribute.args) {
                Some(size) if stage == Stage::Compute => workgroup = size,
                Some(_) => errors.push(entry_error(
                    source,
                    attribute.span,
                    "`numthreads` only applies to compute entry points",
                )),
                None => errors.push(entry_error(
                    source,
                    attribute.span,
                    "`numthreads` expects three positive integer literals",
                )),
            }
        }

        if let Some(other) = entries.iter().find(|e| e.stage == stage) {
            let message = format!(
                "`{}` and `{}` are both {stage} entry points",
                interner.lookup(other.name),
                interner.lookup(chain.name)
            );
            errors.push(
                Diagnostic::error(ErrorCode::E5004)
                    .with_message(message)
                    .with_source(source)
                    .with_label(method.decl.name_span, "second entry point"),
            );
            continue;
        }
        entries.push(EntryPoint {
            stage,
            method: method_ref,
            name: chain.name,
            workgroup,
        });
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    entries.sort_by_key(|e| e.stage);
    Ok(entries)
}

fn entry_error(source: SourceId, span: Span, message: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E5004)
        .with_message(message.to_string())
        .with_source(source)
        .with_label(span, "invalid attribute")
}

fn string_argument(
    mixin: &ResolvedMixin,
    arg: ExprId,
    interner: &StringInterner,
) -> Option<&'static str> {
    match mixin.unit.arena.expr(arg).kind {
        ExprKind::Literal(Literal::Str(text)) => Some(interner.lookup(text)),
        _ => None,
    }
}

fn workgroup_size(mixin: &ResolvedMixin, args: &[ExprId]) -> Option<[u32; 3]> {
    let [x, y, z] = args else {
        return None;
    };
    let dimension = |id: &ExprId| match mixin.unit.arena.expr(*id).kind {
        ExprKind::Literal(Literal::Int(v) | Literal::UInt(v)) if v > 0 => u32::try_from(v).ok(),
        _ => None,
    };
    Some([dimension(x)?, dimension(y)?, dimension(z)?])
}
