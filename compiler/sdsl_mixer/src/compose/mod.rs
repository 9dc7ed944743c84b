//! Mixin composition.
//!
//! Flattens a resolved program into one shader:
//! - mixins are linearized bases first, ties broken by name so the order
//!   never depends on how the request listed independent mixins
//! - fields are unioned by name, methods form override chains
//! - calls are dispatched to the final override, `base` calls to the
//!   version the caller replaced
//! - only methods reachable from the entry points are kept
//!
//! The program hash identifies the composition: mixin names and source
//! hashes in order, the parameters and the effective macros.

mod entry;
mod reach;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::{ContentHash, Modifiers, Name, StringInterner};
use sdsl_resolve::{
    Callee, FieldStorage, ResolvedField, ResolvedMethod, ResolvedMixin, ResolvedProgram,
};
use sdsl_types::StructTable;

use crate::ParameterBag;

pub use entry::{EntryPoint, Stage};

/// Name of the constant buffer holding loose uniform fields.
pub const GLOBALS: &str = "Globals";

/// A method of a composed mixin: indices into [`ComposedProgram::order`] and
/// that mixin's methods.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct MethodRef {
    pub mixin: usize,
    pub method: usize,
}

/// A field of the composed shader and the first mixin declaring it.
#[derive(Clone, Debug)]
pub struct ComposedField {
    pub owner: usize,
    pub field: ResolvedField,
}

/// A constant buffer and its members, in declaration order.
#[derive(Clone, Debug)]
pub struct ComposedBuffer {
    pub name: Name,
    /// Indices into [`ComposedProgram::fields`].
    pub members: Vec<usize>,
}

/// Every definition of one method name, in composition order. Later entries
/// replace earlier ones.
#[derive(Clone, Debug)]
pub struct MethodChain {
    pub name: Name,
    pub entries: Vec<MethodRef>,
}

/// A composed shader, ready for emission.
#[derive(Debug)]
pub struct ComposedProgram {
    /// Mixins in composition order.
    pub order: Vec<Arc<ResolvedMixin>>,
    pub structs: StructTable,
    pub fields: Vec<ComposedField>,
    /// `Globals` first when it has members, then named buffers in order of
    /// first declaration.
    pub buffers: Vec<ComposedBuffer>,
    pub chains: Vec<MethodChain>,
    pub entry_points: Vec<EntryPoint>,
    /// Methods to emit, callers before callees.
    pub reachable: Vec<MethodRef>,
    pub program_hash: ContentHash,
    chain_index: FxHashMap<Name, usize>,
    field_index: FxHashMap<Name, usize>,
    /// Transitive bases of each mixin, by order index.
    closures: Vec<FxHashSet<usize>>,
}

impl ComposedProgram {
    pub fn mixin(&self, index: usize) -> &ResolvedMixin {
        &self.order[index]
    }

    pub fn method(&self, method: MethodRef) -> &ResolvedMethod {
        &self.order[method.mixin].methods[method.method]
    }

    pub fn field(&self, name: Name) -> Option<&ComposedField> {
        self.field_index.get(&name).map(|&i| &self.fields[i])
    }

    pub fn field_index(&self, name: Name) -> Option<usize> {
        self.field_index.get(&name).copied()
    }

    /// A library has no entry points; every implemented method is exported.
    pub fn is_library(&self) -> bool {
        self.entry_points.is_empty()
    }

    /// The implementation every call to `name` dispatches to.
    pub fn final_impl(&self, name: Name) -> Option<MethodRef> {
        let chain = &self.chains[*self.chain_index.get(&name)?];
        chain
            .entries
            .iter()
            .rev()
            .copied()
            .find(|m| !self.method(*m).is_abstract())
    }

    /// The implementation `base.name(...)` in mixin `caller` reaches: the
    /// last one among the mixins `caller` composes.
    pub fn base_impl(&self, caller: usize, name: Name) -> Option<MethodRef> {
        let chain = &self.chains[*self.chain_index.get(&name)?];
        let closure = &self.closures[caller];
        chain
            .entries
            .iter()
            .rev()
            .copied()
            .find(|m| closure.contains(&m.mixin) && !self.method(*m).is_abstract())
    }

    /// The shader method a call in mixin `caller` invokes, if any.
    pub fn resolve_call(&self, caller: usize, callee: &Callee) -> Option<MethodRef> {
        match callee {
            Callee::Method(name) => self.final_impl(*name),
            Callee::Base(name) => self.base_impl(caller, *name),
            Callee::Intrinsic(_) | Callee::Constructor(_) | Callee::Texture(_) => None,
        }
    }

    /// Source hashes of every composed mixin, in order.
    pub fn sources(&self) -> impl Iterator<Item = (Name, ContentHash)> + '_ {
        self.order.iter().map(|m| (m.name, m.source_hash()))
    }
}

/// Compose a resolved program.
#[tracing::instrument(level = "debug", skip_all, fields(mixins = program.mixins.len()))]
pub fn compose(
    program: ResolvedProgram,
    parameters: &ParameterBag,
    macros: &BTreeMap<String, String>,
    interner: &StringInterner,
) -> Result<ComposedProgram, Vec<Diagnostic>> {
    let order = linearize(&program.mixins, interner);
    let closures = closures(&order);

    let mut composer = Composer {
        interner,
        order: &order,
        closures: &closures,
        fields: Vec::new(),
        field_index: FxHashMap::default(),
        buffers: Vec::new(),
        chains: Vec::new(),
        chain_index: FxHashMap::default(),
        errors: Vec::new(),
    };
    composer.merge_fields();
    composer.merge_methods();
    let Composer {
        fields,
        field_index,
        buffers,
        chains,
        chain_index,
        errors,
        ..
    } = composer;
    if !errors.is_empty() {
        return Err(errors);
    }

    let program_hash = program_hash(&order, parameters, macros, interner);
    let mut composed = ComposedProgram {
        order,
        structs: program.structs,
        fields,
        buffers,
        chains,
        entry_points: Vec::new(),
        reachable: Vec::new(),
        program_hash,
        chain_index,
        field_index,
        closures,
    };
    composed.entry_points = entry::find_entry_points(&composed, interner)?;
    composed.reachable = reach::reachable_methods(&composed, interner)?;
    tracing::debug!(
        fields = composed.fields.len(),
        methods = composed.reachable.len(),
        entry_points = composed.entry_points.len(),
        "program composed"
    );
    Ok(composed)
}

/// Topological order with bases first; among ready mixins the smallest name
/// goes next.
fn linearize(mixins: &[Arc<ResolvedMixin>], interner: &StringInterner) -> Vec<Arc<ResolvedMixin>> {
    let by_name: FxHashMap<Name, usize> =
        mixins.iter().enumerate().map(|(i, m)| (m.name, i)).collect();
    let mut pending = vec![0usize; mixins.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); mixins.len()];
    for (i, mixin) in mixins.iter().enumerate() {
        let bases: FxHashSet<usize> = mixin
            .bases
            .iter()
            .filter_map(|b| by_name.get(b).copied())
            .collect();
        pending[i] = bases.len();
        for base in bases {
            dependents[base].push(i);
        }
    }

    let key = |i: usize| (interner.lookup(mixins[i].name), i);
    let mut ready: BTreeSet<(&str, usize)> = (0..mixins.len())
        .filter(|&i| pending[i] == 0)
        .map(key)
        .collect();
    let mut order = Vec::with_capacity(mixins.len());
    while let Some((_, next)) = ready.pop_first() {
        order.push(Arc::clone(&mixins[next]));
        for &dependent in &dependents[next] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(key(dependent));
            }
        }
    }
    order
}

fn closures(order: &[Arc<ResolvedMixin>]) -> Vec<FxHashSet<usize>> {
    let index: FxHashMap<Name, usize> =
        order.iter().enumerate().map(|(i, m)| (m.name, i)).collect();
    let mut closures: Vec<FxHashSet<usize>> = Vec::with_capacity(order.len());
    for mixin in order {
        let mut closure = FxHashSet::default();
        for base in mixin.bases.iter().filter_map(|b| index.get(b).copied()) {
            closure.insert(base);
            closure.extend(closures[base].iter().copied());
        }
        closures.push(closure);
    }
    closures
}

fn program_hash(
    order: &[Arc<ResolvedMixin>],
    parameters: &ParameterBag,
    macros: &BTreeMap<String, String>,
    interner: &StringInterner,
) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(order.len() as u64).to_le_bytes());
    for mixin in order {
        // Interned ids vary between runs; hash the text.
        let name = interner.lookup(mixin.name).as_bytes();
        hasher.update(&(name.len() as u64).to_le_bytes());
        hasher.update(name);
        hasher.update(mixin.source_hash().as_bytes());
    }
    parameters.hash_into(&mut hasher);
    hasher.update(&(macros.len() as u64).to_le_bytes());
    for (name, value) in macros {
        hasher.update(&(name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update(&(value.len() as u64).to_le_bytes());
        hasher.update(value.as_bytes());
    }
    ContentHash::from_bytes(*hasher.finalize().as_bytes())
}

struct Composer<'a> {
    interner: &'a StringInterner,
    order: &'a [Arc<ResolvedMixin>],
    closures: &'a [FxHashSet<usize>],
    fields: Vec<ComposedField>,
    field_index: FxHashMap<Name, usize>,
    buffers: Vec<ComposedBuffer>,
    chains: Vec<MethodChain>,
    chain_index: FxHashMap<Name, usize>,
    errors: Vec<Diagnostic>,
}

impl Composer<'_> {
    fn name(&self, name: Name) -> &str {
        self.interner.lookup(name)
    }

    fn merge_fields(&mut self) {
        let globals = self.interner.intern(GLOBALS);
        let order = self.order;
        for (owner, mixin) in order.iter().enumerate() {
            for field in &mixin.fields {
                if let Some(&existing) = self.field_index.get(&field.name) {
                    let first = &self.fields[existing];
                    if first.field.ty != field.ty || first.field.storage != field.storage {
                        let message = format!(
                            "field `{}` of `{}` conflicts with the declaration in `{}`",
                            self.name(field.name),
                            self.name(mixin.name),
                            self.name(self.order[first.owner].name)
                        );
                        let note = format!(
                            "first declared as `{}`",
                            first.field.ty.display(self.interner)
                        );
                        self.errors.push(
                            Diagnostic::error(ErrorCode::E4001)
                                .with_message(message)
                                .with_source(mixin.unit.id)
                                .with_label(field.span, "conflicting declaration")
                                .with_note(note),
                        );
                    }
                    continue;
                }

                let index = self.fields.len();
                self.field_index.insert(field.name, index);
                self.fields.push(ComposedField {
                    owner,
                    field: field.clone(),
                });
                if let FieldStorage::Uniform { buffer } = field.storage {
                    self.buffer_member(buffer, index, buffer == globals);
                }
            }
        }
    }

    fn buffer_member(&mut self, name: Name, field: usize, is_globals: bool) {
        if let Some(buffer) = self.buffers.iter_mut().find(|b| b.name == name) {
            buffer.members.push(field);
            return;
        }
        let buffer = ComposedBuffer {
            name,
            members: vec![field],
        };
        if is_globals {
            self.buffers.insert(0, buffer);
        } else {
            self.buffers.push(buffer);
        }
    }

    fn merge_methods(&mut self) {
        let order = self.order;
        for (index, mixin) in order.iter().enumerate() {
            for (position, method) in mixin.methods.iter().enumerate() {
                let entry = MethodRef {
                    mixin: index,
                    method: position,
                };
                let Some(&chain) = self.chain_index.get(&method.name()) else {
                    self.chain_index.insert(method.name(), self.chains.len());
                    self.chains.push(MethodChain {
                        name: method.name(),
                        entries: vec![entry],
                    });
                    continue;
                };
                if let Err(diagnostic) = self.extend_chain(chain, entry, method) {
                    self.errors.push(diagnostic);
                }
            }
        }
    }

    fn extend_chain(
        &mut self,
        chain: usize,
        entry: MethodRef,
        method: &ResolvedMethod,
    ) -> Result<(), Diagnostic> {
        let mixin = &self.order[entry.mixin];
        let entries = &self.chains[chain].entries;
        let previous = entries
            .last()
            .map(|m| &self.order[m.mixin].methods[m.method]);
        let conflict = |message: String, previous_owner: usize| {
            Diagnostic::error(ErrorCode::E4002)
                .with_message(message)
                .with_source(mixin.unit.id)
                .with_label(method.decl.name_span, "conflicting definition")
                .with_note(format!(
                    "previously defined in `{}`",
                    self.name(self.order[previous_owner].name)
                ))
        };

        if let (Some(previous), Some(last)) = (previous, entries.last()) {
            if previous.signature() != method.signature() {
                let message = format!(
                    "method `{}` of `{}` does not match the signature it replaces",
                    self.name(method.name()),
                    self.name(mixin.name)
                );
                return Err(conflict(message, last.mixin));
            }
        }
        if method.is_abstract() {
            return Ok(());
        }

        let definer = entries
            .iter()
            .rev()
            .find(|m| !self.order[m.mixin].methods[m.method].is_abstract())
            .map(|m| m.mixin);
        if let Some(definer) = definer {
            let replaces = self.closures[entry.mixin].contains(&definer)
                || method.decl.modifiers.contains(Modifiers::OVERRIDE);
            if !replaces {
                let message = format!(
                    "method `{}` of `{}` replaces an unrelated definition; mark it `override`",
                    self.name(method.name()),
                    self.name(mixin.name)
                );
                return Err(conflict(message, definer));
            }
        }
        self.chains[chain].entries.push(entry);
        Ok(())
    }
}
