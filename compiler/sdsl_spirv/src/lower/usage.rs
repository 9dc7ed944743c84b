//! Which fields each entry point reads and writes.
//!
//! Used to pick the stream variables that form a stage interface and the
//! stages a resource binding is visible to. A method's usage includes
//! everything its callees use; the composer has already rejected recursion.

use rustc_hash::{FxHashMap, FxHashSet};
use sdsl_ir::visitor::{walk_expr, Visitor};
use sdsl_ir::{AssignOp, ExprArena, ExprId, ExprKind, Name, UnaryOp};
use sdsl_mixer::{ComposedProgram, MethodRef};
use sdsl_resolve::{Binding, FieldStorage, ResolvedMixin};

/// Fields touched by one method and its callees.
#[derive(Clone, Default, Debug)]
pub(crate) struct FieldUsage {
    pub reads: FxHashSet<Name>,
    pub writes: FxHashSet<Name>,
}

impl FieldUsage {
    pub(crate) fn uses(&self, name: Name) -> bool {
        self.reads.contains(&name) || self.writes.contains(&name)
    }

    fn extend(&mut self, other: &FieldUsage) {
        self.reads.extend(other.reads.iter().copied());
        self.writes.extend(other.writes.iter().copied());
    }
}

pub(crate) struct ProgramUsage {
    entries: FxHashMap<MethodRef, FieldUsage>,
    empty: FieldUsage,
}

impl ProgramUsage {
    /// Usage of every entry point. Initializers of `static` and `stream`
    /// fields run in every entry wrapper, so their reads count for all.
    pub(crate) fn collect(program: &ComposedProgram) -> Self {
        let mut initializers = FieldUsage::default();
        for composed in &program.fields {
            if !matches!(
                composed.field.storage,
                FieldStorage::Static | FieldStorage::Stream
            ) {
                continue;
            }
            if let Some(init) = composed.field.init {
                let mut collector = Collector::new(program, program.mixin(composed.owner));
                collector.visit_expr(init, &program.mixin(composed.owner).unit.arena);
                initializers.extend(&collector.usage);
            }
        }

        let mut closure = Closure {
            program,
            direct: FxHashMap::default(),
            total: FxHashMap::default(),
        };
        let mut entries = FxHashMap::default();
        for entry in &program.entry_points {
            let mut usage = closure.usage(entry.method, &mut FxHashSet::default());
            usage.extend(&initializers);
            entries.insert(entry.method, usage);
        }
        ProgramUsage {
            entries,
            empty: FieldUsage::default(),
        }
    }

    pub(crate) fn entry(&self, method: MethodRef) -> &FieldUsage {
        self.entries.get(&method).unwrap_or(&self.empty)
    }
}

/// A method body's direct field accesses and calls.
struct Direct {
    usage: FieldUsage,
    callees: Vec<MethodRef>,
}

struct Closure<'a> {
    program: &'a ComposedProgram,
    direct: FxHashMap<MethodRef, Direct>,
    total: FxHashMap<MethodRef, FieldUsage>,
}

impl Closure<'_> {
    fn usage(&mut self, method: MethodRef, active: &mut FxHashSet<MethodRef>) -> FieldUsage {
        if let Some(done) = self.total.get(&method) {
            return done.clone();
        }
        if !active.insert(method) {
            return FieldUsage::default();
        }
        let direct = self.direct(method);
        let mut usage = direct.usage.clone();
        for callee in direct.callees.clone() {
            let inner = self.usage(callee, active);
            usage.extend(&inner);
        }
        active.remove(&method);
        self.total.insert(method, usage.clone());
        usage
    }

    fn direct(&mut self, method_ref: MethodRef) -> &Direct {
        let program = self.program;
        self.direct.entry(method_ref).or_insert_with(|| {
            let mixin = program.mixin(method_ref.mixin);
            let mut collector = Collector::new(program, mixin);
            if let Some(body) = program.method(method_ref).decl.body {
                collector.visit_stmt(body, &mixin.unit.arena);
            }
            let callees = collector
                .calls
                .iter()
                .filter_map(|call| mixin.info.calls.get(call))
                .filter_map(|callee| program.resolve_call(method_ref.mixin, callee))
                .collect();
            Direct {
                usage: collector.usage,
                callees,
            }
        })
    }
}

struct Collector<'a> {
    program: &'a ComposedProgram,
    mixin: &'a ResolvedMixin,
    usage: FieldUsage,
    calls: Vec<ExprId>,
    /// Constants whose initializers are being walked.
    constants: Vec<usize>,
}

impl<'a> Collector<'a> {
    fn new(program: &'a ComposedProgram, mixin: &'a ResolvedMixin) -> Self {
        Collector {
            program,
            mixin,
            usage: FieldUsage::default(),
            calls: Vec::new(),
            constants: Vec::new(),
        }
    }

    fn field(&self, id: ExprId) -> Option<Name> {
        match self.mixin.info.bindings.get(&id)? {
            Binding::Field(name) => Some(*name),
            Binding::Local(_) | Binding::Param(_) => None,
        }
    }

    fn read(&mut self, name: Name) {
        self.usage.reads.insert(name);
        // A constant's value is inlined, so whatever it reads is read here.
        let Some(index) = self.program.field_index(name) else {
            return;
        };
        let composed = &self.program.fields[index];
        if composed.field.storage != FieldStorage::Constant || self.constants.contains(&index) {
            return;
        }
        let Some(init) = composed.field.init else {
            return;
        };
        let owner = self.program.mixin(composed.owner);
        let saved = std::mem::replace(&mut self.mixin, owner);
        self.constants.push(index);
        self.visit_expr(init, &owner.unit.arena);
        self.constants.pop();
        self.mixin = saved;
    }

    /// The root variable of an assignment target is written; index
    /// expressions along the way are read.
    fn target(&mut self, id: ExprId, arena: &'a ExprArena, read_too: bool) {
        match &arena.expr(id).kind {
            ExprKind::Ident(_) | ExprKind::Stream(_) => {
                if let Some(name) = self.field(id) {
                    self.usage.writes.insert(name);
                    if read_too {
                        self.read(name);
                    }
                }
            }
            ExprKind::Member { object, .. } => self.target(*object, arena, read_too),
            ExprKind::Index { object, index } => {
                self.target(*object, arena, read_too);
                self.visit_expr(*index, arena);
            }
            _ => self.visit_expr(id, arena),
        }
    }
}

impl<'a> Visitor<'a> for Collector<'a> {
    fn visit_expr(&mut self, id: ExprId, arena: &'a ExprArena) {
        match &arena.expr(id).kind {
            ExprKind::Ident(_) | ExprKind::Stream(_) => {
                if let Some(name) = self.field(id) {
                    self.read(name);
                }
            }
            ExprKind::Assign { op, target, value } => {
                let compound = !matches!(op, AssignOp::Assign);
                self.target(*target, arena, compound);
                self.visit_expr(*value, arena);
            }
            ExprKind::Unary { op, operand }
                if matches!(
                    op,
                    UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
                ) =>
            {
                self.target(*operand, arena, true);
            }
            ExprKind::Call { .. } => {
                self.calls.push(id);
                walk_expr(self, id, arena);
            }
            _ => walk_expr(self, id, arena),
        }
    }
}
