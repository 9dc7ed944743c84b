//! Stack growth for recursive compiler passes.
//!
//! Expression parsing, type resolution and SPIR-V lowering all recurse over
//! the expression tree. Generated shaders (macro-heavy permutations in
//! particular) can nest expressions thousands of levels deep, so every such
//! recursion point goes through [`ensure_sufficient_stack`].
//!
//! On native targets the stack is grown on demand with `stacker`. On
//! `wasm32` the closure is called directly.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const SEGMENT_SIZE: usize = 1024 * 1024;

/// Run `f`, first growing the stack if it is close to exhausted.
///
/// ```text
/// fn lower_expr(&mut self, id: ExprId) -> Result<Value, EmitError> {
///     ensure_sufficient_stack(|| match self.arena.expr(id).kind { ... })
/// }
/// ```
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// `wasm32` manages its own stack; run `f` directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
