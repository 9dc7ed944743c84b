//! Loading mixins by name.

use std::sync::Arc;

use sdsl_diagnostic::Diagnostic;
use sdsl_ir::{ContentHash, EffectDecl, ExprArena, Module, Name, ShaderDecl, SourceId};

/// One preprocessed and parsed source file.
#[derive(Debug)]
pub struct SourceUnit {
    pub id: SourceId,
    /// File name the unit was loaded from.
    pub file: String,
    pub module: Module,
    pub arena: ExprArena,
    /// Hash of the raw source text.
    pub hash: ContentHash,
}

impl SourceUnit {
    pub fn shader(&self, name: Name) -> Option<&ShaderDecl> {
        self.module.shader(name)
    }

    pub fn effect(&self, name: Name) -> Option<&EffectDecl> {
        self.module.effect(name)
    }
}

/// Why a unit could not be loaded.
#[derive(Clone, Debug)]
pub enum LoadError {
    /// No source exists for the name.
    NotFound,
    /// The source exists but failed to preprocess or parse.
    Invalid(Vec<Diagnostic>),
}

/// Resolves mixin and effect names to parsed units.
///
/// Implementations memoize per compilation: loading the same name twice
/// returns the same unit.
pub trait MixinLoader: Send + Sync {
    fn load(&self, name: Name) -> Result<Arc<SourceUnit>, LoadError>;
}
