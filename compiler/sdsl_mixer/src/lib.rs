//! Effect evaluation and mixin composition.
//!
//! An effect request is turned into a single composed shader in two steps:
//!
//! 1. [`evaluate_effect`] runs the effect body against the request's
//!    [`ParameterBag`], producing the root mixins and macro bindings.
//! 2. After the roots are resolved, [`compose`] linearizes the mixins,
//!    merges their fields and methods and finds the entry points.
//!
//! The driver preprocesses the mixin sources with the effect's macros in
//! between, which is why the two steps are separate.

mod compose;
mod effect;
mod params;

#[cfg(test)]
mod test_support;
#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

pub use compose::{
    compose, ComposedBuffer, ComposedField, ComposedProgram, EntryPoint, MethodChain, MethodRef,
    Stage, GLOBALS,
};
pub use effect::{evaluate_effect, EffectPlan};
pub use params::{ParameterBag, ParameterValue};
