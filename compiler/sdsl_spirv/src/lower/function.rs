//! Per-function lowering state and block management.

use rustc_hash::{FxHashMap, FxHashSet};
use sdsl_diagnostic::ErrorCode;
use sdsl_ir::{ExprArena, SourceId, Span};
use sdsl_mixer::MethodRef;
use sdsl_resolve::{LocalId, ResolvedMethod, ResolvedMixin};
use sdsl_types::Type;

use super::Emitter;
use crate::instruction::{operands, Id, Instruction, Operand, Operands};
use crate::module::{Block, Function};
use crate::op::{self, Op, StorageClass};

/// Jump targets of the innermost enclosing loop.
#[derive(Copy, Clone, Debug)]
pub(super) struct LoopTargets {
    pub merge: Id,
    pub continue_target: Id,
}

/// Lowers one function body. The current block is the last one in
/// `blocks`; once it is terminated `open` is false until the next block
/// starts.
pub(crate) struct FunctionLowerer<'e, 'a> {
    pub(super) em: &'e mut Emitter<'a>,
    /// Mixin whose arena and side tables expressions are looked up in.
    pub(super) mixin: usize,
    pub(super) method: Option<&'a ResolvedMethod>,
    def: Instruction,
    params: Vec<Instruction>,
    blocks: Vec<Block>,
    open: bool,
    reachable: FxHashSet<Id>,
    pub(super) locals: FxHashMap<LocalId, Id>,
    pub(super) param_vars: Vec<Id>,
    pub(super) loops: Vec<LoopTargets>,
    pub(super) return_ty: Type,
    /// `static const` fields whose initializers are being lowered.
    pub(super) constants: Vec<usize>,
}

impl<'e, 'a> FunctionLowerer<'e, 'a> {
    pub(super) fn new(
        em: &'e mut Emitter<'a>,
        mixin: usize,
        method: Option<&'a ResolvedMethod>,
        id: Id,
        fn_ty: Id,
        return_ty: Type,
    ) -> Self {
        let ret = em.lower_type(&return_ty);
        let def = Instruction::new(
            Op::Function,
            Some(ret),
            Some(id),
            operands![lit op::FUNCTION_CONTROL_NONE, id fn_ty],
        );
        let entry = em.builder.fresh();
        let mut reachable = FxHashSet::default();
        reachable.insert(entry);
        FunctionLowerer {
            em,
            mixin,
            method,
            def,
            params: Vec::new(),
            blocks: vec![Block::new(entry)],
            open: true,
            reachable,
            locals: FxHashMap::default(),
            param_vars: Vec::new(),
            loops: Vec::new(),
            return_ty,
            constants: Vec::new(),
        }
    }

    /// Lower a reachable method into a function.
    pub(super) fn lower_method(em: &mut Emitter<'a>, method_ref: MethodRef) -> Option<Function> {
        let program = em.program;
        let method = program.method(method_ref);
        let Some(decl) = em.function(method_ref).cloned() else {
            let source = program.mixin(method_ref.mixin).unit.id;
            em.error(
                ErrorCode::E9002,
                source,
                method.decl.name_span,
                "method was not declared before lowering",
                "here",
            );
            return None;
        };
        let mut lowerer = FunctionLowerer::new(
            em,
            method_ref.mixin,
            Some(method),
            decl.id,
            decl.ty,
            method.return_ty.clone(),
        );
        for param in &method.params {
            let value = lowerer.parameter(&param.ty);
            let name = lowerer.em.name(param.name);
            let var = lowerer.variable(&param.ty, Some(name));
            lowerer.store_pointer(var, value);
            lowerer.param_vars.push(var);
        }
        if let Some(body) = method.decl.body {
            lowerer.lower_stmt(body);
        }
        Some(lowerer.finish(method.decl.name_span))
    }

    #[inline]
    pub(super) fn mixin(&self) -> &'a ResolvedMixin {
        let program = self.em.program;
        program.mixin(self.mixin)
    }

    #[inline]
    pub(super) fn arena(&self) -> &'a ExprArena {
        &self.mixin().unit.arena
    }

    #[inline]
    pub(super) fn source(&self) -> SourceId {
        self.mixin().unit.id
    }

    pub(super) fn error(&mut self, code: ErrorCode, span: Span, message: impl Into<String>, label: &str) {
        let source = self.source();
        self.em.error(code, source, span, message, label);
    }

    /// Add an `OpFunctionParameter` and return its id.
    pub(super) fn parameter(&mut self, ty: &Type) -> Id {
        let ty = self.em.lower_type(ty);
        let id = self.em.builder.fresh();
        self.params.push(Instruction::new(
            Op::FunctionParameter,
            Some(ty),
            Some(id),
            operands![],
        ));
        id
    }

    /// A `Function` variable, emitted in place; hoisting moves it to the
    /// entry block later.
    pub(super) fn variable(&mut self, ty: &Type, name: Option<&str>) -> Id {
        let pointer = self.em.pointer_type(StorageClass::Function, ty, false);
        let id = self.em.builder.fresh();
        self.push(Instruction::new(
            Op::Variable,
            Some(pointer),
            Some(id),
            operands![lit StorageClass::Function as u32],
        ));
        if let Some(name) = name {
            self.em.builder.name(id, name);
        }
        id
    }

    pub(super) fn store_pointer(&mut self, pointer: Id, value: Id) {
        self.emit_void(Op::Store, operands![id pointer, id value]);
    }

    fn push(&mut self, inst: Instruction) {
        if !self.open {
            // Code after a terminator; it lands in a block nothing reaches.
            let label = self.em.builder.fresh();
            self.start_block(label);
        }
        if let Some(block) = self.blocks.last_mut() {
            block.instructions.push(inst);
        }
    }

    /// Emit an instruction with a result and return the result id.
    pub(super) fn emit(&mut self, op: Op, ty: Id, operands: Operands) -> Id {
        let id = self.em.builder.fresh();
        self.push(Instruction::new(op, Some(ty), Some(id), operands));
        id
    }

    pub(super) fn emit_void(&mut self, op: Op, operands: Operands) {
        self.push(Instruction::plain(op, operands));
    }

    /// A `GLSL.std.450` instruction.
    pub(super) fn ext(&mut self, ty: Id, instruction: u32, args: &[Id]) -> Id {
        let mut list = operands![id self.em.builder.glsl(), lit instruction];
        list.extend(args.iter().map(|a| Operand::Id(*a)));
        self.emit(Op::ExtInst, ty, list)
    }

    pub(super) fn new_label(&mut self) -> Id {
        self.em.builder.fresh()
    }

    pub(super) fn start_block(&mut self, label: Id) {
        self.blocks.push(Block::new(label));
        self.open = true;
    }

    #[inline]
    pub(super) fn is_open(&self) -> bool {
        self.open
    }

    /// Whether any branch from the entry block leads to the current block.
    pub(super) fn is_reachable(&self) -> bool {
        self.blocks
            .last()
            .is_some_and(|b| self.reachable.contains(&b.label))
    }

    /// End the current block. Targets of a reachable block become
    /// reachable.
    fn terminate(&mut self, inst: Instruction, targets: &[Id]) {
        if !self.open {
            let label = self.em.builder.fresh();
            self.start_block(label);
        }
        if self.is_reachable() {
            self.reachable.extend(targets.iter().copied());
        }
        self.push(inst);
        self.open = false;
    }

    pub(super) fn branch(&mut self, target: Id) {
        self.terminate(Instruction::plain(Op::Branch, operands![id target]), &[target]);
    }

    pub(super) fn branch_conditional(&mut self, cond: Id, then: Id, otherwise: Id) {
        self.terminate(
            Instruction::plain(
                Op::BranchConditional,
                operands![id cond, id then, id otherwise],
            ),
            &[then, otherwise],
        );
    }

    pub(super) fn return_value(&mut self, value: Option<Id>) {
        let inst = match value {
            Some(value) => Instruction::plain(Op::ReturnValue, operands![id value]),
            None => Instruction::plain(Op::Return, operands![]),
        };
        self.terminate(inst, &[]);
    }

    pub(super) fn kill(&mut self) {
        self.terminate(Instruction::plain(Op::Kill, operands![]), &[]);
    }

    /// Close the function. Falling off the end of a non-void function is an
    /// error when the end is reachable.
    pub(super) fn finish(mut self, span: Span) -> Function {
        if self.open {
            if self.return_ty == Type::Void {
                self.return_value(None);
            } else {
                if self.is_reachable() {
                    self.error(
                        ErrorCode::E5001,
                        span,
                        "not all code paths return a value",
                        "function can reach its end without returning",
                    );
                }
                self.terminate(Instruction::plain(Op::Unreachable, operands![]), &[]);
            }
        }
        debug_assert!(self.blocks.iter().all(Block::is_terminated));
        Function {
            def: self.def,
            params: self.params,
            blocks: self.blocks,
        }
    }
}
