//! Name resolution and type checking for SDSL mixins.
//!
//! Resolution starts from the mixins a compile request names:
//! - the compose graph is loaded and ordered, bases first (cycles are fatal)
//! - each mixin is checked against everything it composes, directly or
//!   transitively; nothing else is visible to it
//! - every expression gets a type, every identifier a [`Binding`] and every
//!   call a [`Callee`], stored in per-mixin side tables
//!
//! The result is a [`ResolvedProgram`] ready for composition. Errors from
//! all mixins are collected; a mixin that fails still resolves as far as it
//! can so mixins composing it report their own problems, not cascades.

mod check;
mod consts;
mod graph;
mod loader;
mod program;
mod scope;

#[cfg(test)]
mod test_support;
#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

pub use graph::{ComposeGraph, GraphNode, MixinRef};
pub use loader::{LoadError, MixinLoader, SourceUnit};
pub use program::{
    Binding, CBufferInfo, Callee, ExprInfo, FieldStorage, LocalId, LocalInfo, MemberAccess,
    ResolvedField, ResolvedMethod, ResolvedMixin, ResolvedParam, ResolvedProgram,
};

use std::sync::Arc;

use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::{Name, StringInterner};
use sdsl_types::StructTable;

/// Resolve `roots` and everything they compose.
#[tracing::instrument(level = "debug", skip_all, fields(roots = roots.len()))]
pub fn resolve(
    roots: &[MixinRef],
    loader: &dyn MixinLoader,
    interner: &StringInterner,
) -> Result<ResolvedProgram, Vec<Diagnostic>> {
    let graph = ComposeGraph::build(roots, loader, interner)?;

    let mut structs = StructTable::new();
    let mut mixins: Vec<Arc<ResolvedMixin>> = Vec::with_capacity(graph.nodes().len());
    let mut errors = Vec::new();
    for node in graph.nodes() {
        let Some(decl) = node.unit.shader(node.name) else {
            continue;
        };
        let closure = graph.closure(node.name);
        let visible: Vec<Arc<ResolvedMixin>> = mixins
            .iter()
            .filter(|m| closure.contains(&m.name))
            .cloned()
            .collect();
        let (mixin, diagnostics) =
            check::check_mixin(node, decl, &visible, &mut structs, interner);
        tracing::debug!(
            mixin = interner.lookup(node.name),
            errors = diagnostics.len(),
            "resolved mixin"
        );
        errors.extend(diagnostics);
        mixins.push(Arc::new(mixin));
    }

    if errors.is_empty() {
        Ok(ResolvedProgram::new(mixins, structs))
    } else {
        Err(errors)
    }
}

/// Resolve a single mixin and what it composes.
pub fn resolve_mixin(
    name: Name,
    loader: &dyn MixinLoader,
    interner: &StringInterner,
) -> Result<Arc<ResolvedMixin>, Vec<Diagnostic>> {
    let program = resolve(&[MixinRef::root(name)], loader, interner)?;
    program.mixin(name).cloned().ok_or_else(|| {
        vec![Diagnostic::error(ErrorCode::E3008)
            .with_message(format!("unknown mixin `{}`", interner.lookup(name)))]
    })
}
