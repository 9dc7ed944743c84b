//! Normalization passes run on every module before serialization.

mod fold;
mod hoist;
mod sweep;

use crate::builder::ModuleBuilder;

/// Constant folding, then variable hoisting, then removal of the
/// declarations left unused.
pub(crate) fn run(builder: &mut ModuleBuilder) {
    let folded = fold::fold_constants(builder);
    let hoisted = hoist::hoist_variables(&mut builder.functions);
    let swept = sweep::sweep_declarations(builder);
    tracing::debug!(folded, hoisted, swept, "normalized module");
}
