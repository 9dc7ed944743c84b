//! Struct definitions visible to a composed program.

use rustc_hash::FxHashMap;
use sdsl_ir::Name;

use crate::Type;

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StructMember {
    pub name: Name,
    pub ty: Type,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StructDef {
    pub name: Name,
    pub members: Vec<StructMember>,
}

impl StructDef {
    pub fn member(&self, name: Name) -> Option<(usize, &StructMember)> {
        self.members.iter().enumerate().find(|(_, m)| m.name == name)
    }
}

/// Struct definitions in declaration order, indexed by name.
#[derive(Clone, Debug, Default)]
pub struct StructTable {
    defs: Vec<StructDef>,
    by_name: FxHashMap<Name, usize>,
}

impl StructTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition. Returns the existing one if the name is taken.
    pub fn insert(&mut self, def: StructDef) -> Result<(), &StructDef> {
        if let Some(&index) = self.by_name.get(&def.name) {
            return Err(&self.defs[index]);
        }
        self.by_name.insert(def.name, self.defs.len());
        self.defs.push(def);
        Ok(())
    }

    pub fn get(&self, name: Name) -> Option<&StructDef> {
        self.by_name.get(&name).map(|&index| &self.defs[index])
    }

    pub fn contains(&self, name: Name) -> bool {
        self.by_name.contains_key(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StructDef> {
        self.defs.iter()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
