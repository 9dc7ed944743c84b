//! Call graph reachability.

use rustc_hash::FxHashMap;
use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::visitor::{walk_expr, Visitor};
use sdsl_ir::{ExprArena, ExprId, ExprKind, StringInterner};
use sdsl_resolve::Callee;

use super::{ComposedProgram, MethodRef};

/// Call expressions of a method body, in source order.
struct CallCollector {
    calls: Vec<ExprId>,
}

impl<'ast> Visitor<'ast> for CallCollector {
    fn visit_expr(&mut self, id: ExprId, arena: &'ast ExprArena) {
        if matches!(arena.expr(id).kind, ExprKind::Call { .. }) {
            self.calls.push(id);
        }
        walk_expr(self, id, arena);
    }
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Visit {
    OnStack,
    Done,
}

/// Every method the entry points call, directly or transitively; every
/// implemented method for a library. Callers come before their callees.
pub(super) fn reachable_methods(
    program: &ComposedProgram,
    interner: &StringInterner,
) -> Result<Vec<MethodRef>, Vec<Diagnostic>> {
    let seeds: Vec<MethodRef> = if program.is_library() {
        let mut names: Vec<_> = program.chains.iter().map(|c| c.name).collect();
        names.sort_by_key(|n| interner.lookup(*n));
        names.into_iter().filter_map(|n| program.final_impl(n)).collect()
    } else {
        program.entry_points.iter().map(|e| e.method).collect()
    };

    let mut walk = Walk {
        program,
        interner,
        visit: FxHashMap::default(),
        order: Vec::new(),
        errors: Vec::new(),
    };
    for seed in seeds {
        walk.method(seed);
    }
    if walk.errors.is_empty() {
        Ok(walk.order)
    } else {
        Err(walk.errors)
    }
}

struct Walk<'a> {
    program: &'a ComposedProgram,
    interner: &'a StringInterner,
    visit: FxHashMap<MethodRef, Visit>,
    order: Vec<MethodRef>,
    errors: Vec<Diagnostic>,
}

impl Walk<'_> {
    fn method(&mut self, method_ref: MethodRef) {
        if self.visit.contains_key(&method_ref) {
            return;
        }
        self.visit.insert(method_ref, Visit::OnStack);
        self.order.push(method_ref);

        let mixin = self.program.mixin(method_ref.mixin);
        let method = self.program.method(method_ref);
        let Some(body) = method.decl.body else {
            self.visit.insert(method_ref, Visit::Done);
            return;
        };
        let mut collector = CallCollector { calls: Vec::new() };
        collector.visit_stmt(body, &mixin.unit.arena);

        for call in collector.calls {
            let Some(callee) = mixin.info.calls.get(&call) else {
                continue;
            };
            let (Callee::Method(name) | Callee::Base(name)) = callee else {
                continue;
            };
            let span = mixin.unit.arena.expr(call).span;
            match self.program.resolve_call(method_ref.mixin, callee) {
                Some(target) if self.visit.get(&target) == Some(&Visit::OnStack) => {
                    self.errors.push(
                        Diagnostic::error(ErrorCode::E5003)
                            .with_message(format!(
                                "recursive call to `{}` is not supported",
                                self.interner.lookup(*name)
                            ))
                            .with_source(mixin.unit.id)
                            .with_label(span, "recursive call"),
                    );
                }
                Some(target) => self.method(target),
                None => {
                    let what = if matches!(callee, Callee::Base(_)) {
                        "base method"
                    } else {
                        "method"
                    };
                    self.errors.push(
                        Diagnostic::error(ErrorCode::E4003)
                            .with_message(format!(
                                "{what} `{}` is abstract and never implemented",
                                self.interner.lookup(*name)
                            ))
                            .with_source(mixin.unit.id)
                            .with_label(span, "called here"),
                    );
                }
            }
        }
        self.visit.insert(method_ref, Visit::Done);
    }
}
