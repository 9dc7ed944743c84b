//! The compose graph: which mixins compose which.
//!
//! Built by depth-first search from the requested roots, loading every
//! mixin on first sight. An explicit recursion stack detects compose
//! cycles, which are always fatal and reported with their full path
//! (`A -> B -> A`). The finishing order of the search is a topological
//! order with bases before the mixins composing them.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::{BaseRef, Name, SourceId, Span, StringInterner};
use sdsl_stack::ensure_sufficient_stack;

use crate::{LoadError, MixinLoader, SourceUnit};

/// A mixin requested by name, with where the request came from.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct MixinRef {
    pub name: Name,
    /// Unit and span of the reference, for diagnostics. `None` for roots
    /// named directly by a compile request.
    pub origin: Option<(SourceId, Span)>,
}

impl MixinRef {
    pub fn root(name: Name) -> Self {
        MixinRef { name, origin: None }
    }
}

/// One loaded mixin and its direct compose edges.
#[derive(Debug)]
pub struct GraphNode {
    pub name: Name,
    pub unit: Arc<SourceUnit>,
    /// Header bases followed by in-body `compose` directives.
    pub bases: Vec<BaseRef>,
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Visit {
    OnStack,
    Done,
}

#[derive(Debug)]
pub struct ComposeGraph {
    nodes: Vec<GraphNode>,
    index: FxHashMap<Name, usize>,
}

impl ComposeGraph {
    /// Load the closure of `roots` and order it.
    #[tracing::instrument(level = "debug", skip_all, fields(roots = roots.len()))]
    pub fn build(
        roots: &[MixinRef],
        loader: &dyn MixinLoader,
        interner: &StringInterner,
    ) -> Result<Self, Vec<Diagnostic>> {
        let mut builder = GraphBuilder {
            loader,
            interner,
            nodes: Vec::new(),
            index: FxHashMap::default(),
            visit: FxHashMap::default(),
            stack: Vec::new(),
            errors: Vec::new(),
        };
        for root in roots {
            if builder.visit(*root).is_err() {
                return Err(builder.errors);
            }
        }
        if !builder.errors.is_empty() {
            return Err(builder.errors);
        }
        tracing::debug!(mixins = builder.nodes.len(), "compose graph built");
        Ok(ComposeGraph {
            nodes: builder.nodes,
            index: builder.index,
        })
    }

    /// Nodes in topological order: every mixin after everything it composes.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, name: Name) -> Option<&GraphNode> {
        self.index.get(&name).map(|&i| &self.nodes[i])
    }

    /// Every mixin `name` composes, directly or transitively.
    pub fn closure(&self, name: Name) -> FxHashSet<Name> {
        let mut seen = FxHashSet::default();
        let mut work = vec![name];
        while let Some(next) = work.pop() {
            let Some(node) = self.node(next) else {
                continue;
            };
            for base in &node.bases {
                if seen.insert(base.name) {
                    work.push(base.name);
                }
            }
        }
        seen
    }
}

/// Marker for a cycle found during the search; the diagnostic is already
/// recorded.
struct CycleFound;

struct GraphBuilder<'a> {
    loader: &'a dyn MixinLoader,
    interner: &'a StringInterner,
    nodes: Vec<GraphNode>,
    index: FxHashMap<Name, usize>,
    visit: FxHashMap<Name, Visit>,
    /// Current search path, with the span of the edge leading to each entry.
    stack: Vec<MixinRef>,
    errors: Vec<Diagnostic>,
}

impl GraphBuilder<'_> {
    fn visit(&mut self, target: MixinRef) -> Result<(), CycleFound> {
        ensure_sufficient_stack(|| self.visit_inner(target))
    }

    fn visit_inner(&mut self, target: MixinRef) -> Result<(), CycleFound> {
        match self.visit.get(&target.name) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::OnStack) => {
                self.report_cycle(target);
                return Err(CycleFound);
            }
            None => {}
        }

        let Some(unit) = self.load(target) else {
            // Mark as done so the failure is reported once.
            self.visit.insert(target.name, Visit::Done);
            return Ok(());
        };
        let Some(decl) = unit.shader(target.name) else {
            self.visit.insert(target.name, Visit::Done);
            return Ok(());
        };

        let mut bases: Vec<BaseRef> = Vec::new();
        for base in decl.composed() {
            if bases.iter().any(|b| b.name == base.name) {
                self.errors.push(
                    Diagnostic::error(ErrorCode::E3005)
                        .with_message(format!(
                            "mixin `{}` is composed more than once",
                            self.interner.lookup(base.name)
                        ))
                        .with_source(unit.id)
                        .with_label(base.span, "composed again here"),
                );
                continue;
            }
            bases.push(*base);
        }

        self.visit.insert(target.name, Visit::OnStack);
        self.stack.push(target);
        for base in &bases {
            self.visit(MixinRef {
                name: base.name,
                origin: Some((unit.id, base.span)),
            })?;
        }
        self.stack.pop();
        self.visit.insert(target.name, Visit::Done);

        self.index.insert(target.name, self.nodes.len());
        self.nodes.push(GraphNode {
            name: target.name,
            unit,
            bases,
        });
        Ok(())
    }

    fn load(&mut self, target: MixinRef) -> Option<Arc<SourceUnit>> {
        let text = self.interner.lookup(target.name);
        let unit = match self.loader.load(target.name) {
            Ok(unit) => unit,
            Err(LoadError::NotFound) => {
                self.errors.push(unknown_mixin(target, format!("unknown mixin `{text}`")));
                return None;
            }
            Err(LoadError::Invalid(diagnostics)) => {
                self.errors.extend(diagnostics);
                return None;
            }
        };
        if unit.shader(target.name).is_none() {
            let message = if unit.effect(target.name).is_some() {
                format!("`{text}` is an effect and cannot be composed as a mixin")
            } else {
                format!("`{}` does not declare shader `{text}`", unit.file)
            };
            self.errors.push(unknown_mixin(target, message));
            return None;
        }
        Some(unit)
    }

    fn report_cycle(&mut self, closing: MixinRef) {
        let start = self
            .stack
            .iter()
            .position(|r| r.name == closing.name)
            .unwrap_or(0);
        let mut path: Vec<&str> = self.stack[start..]
            .iter()
            .map(|r| self.interner.lookup(r.name))
            .collect();
        path.push(self.interner.lookup(closing.name));
        let path = path.join(" -> ");

        let mut diagnostic = Diagnostic::error(ErrorCode::E3007)
            .with_message(format!("compose cycle: {path}"));
        if let Some((source, span)) = closing.origin {
            diagnostic = diagnostic
                .with_source(source)
                .with_label(span, "this compose closes the cycle");
        }
        self.errors.push(diagnostic.with_note(format!("cycle path: {path}")));
    }
}

fn unknown_mixin(target: MixinRef, message: String) -> Diagnostic {
    let diagnostic = Diagnostic::error(ErrorCode::E3008).with_message(message);
    match target.origin {
        Some((source, span)) => diagnostic
            .with_source(source)
            .with_label(span, "referenced here"),
        None => diagnostic,
    }
}
