//! Lexical scopes inside a method body.

use rustc_hash::FxHashMap;
use sdsl_ir::Name;

use crate::Binding;

/// Stack of block scopes. The outermost frame holds the parameters.
#[derive(Default)]
pub(crate) struct Scopes {
    frames: Vec<FxHashMap<Name, Binding>>,
}

impl Scopes {
    pub(crate) fn new() -> Self {
        Scopes {
            frames: vec![FxHashMap::default()],
        }
    }

    pub(crate) fn push(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    pub(crate) fn pop(&mut self) {
        debug_assert!(self.frames.len() > 1, "popped the parameter scope");
        self.frames.pop();
    }

    /// Declare in the innermost frame. Returns `false` if the name is
    /// already declared in that frame.
    pub(crate) fn declare(&mut self, name: Name, binding: Binding) -> bool {
        match self.frames.last_mut() {
            Some(frame) => frame.insert(name, binding).is_none(),
            None => false,
        }
    }

    /// Innermost binding of `name`.
    pub(crate) fn lookup(&self, name: Name) -> Option<Binding> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(&name).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalId;
    use sdsl_ir::StringInterner;

    #[test]
    fn test_shadowing_and_pop() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let mut scopes = Scopes::new();
        assert!(scopes.declare(x, Binding::Param(0)));
        scopes.push();
        assert!(scopes.declare(x, Binding::Local(LocalId(0))));
        assert_eq!(scopes.lookup(x), Some(Binding::Local(LocalId(0))));
        assert!(!scopes.declare(x, Binding::Local(LocalId(1))));
        scopes.pop();
        assert_eq!(scopes.lookup(x), Some(Binding::Param(0)));
    }
}
