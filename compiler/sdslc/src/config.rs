//! Compiler configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default number of errors after which a phase stops collecting.
pub const DEFAULT_ERROR_LIMIT: usize = 20;

/// Settings shared by every request an [`EffectCompiler`](crate::EffectCompiler)
/// handles.
#[derive(Clone, Debug)]
pub struct CompilerConfig {
    /// Directories searched for shader sources and `#include`d files.
    pub include_dirs: Vec<PathBuf>,
    /// Macros defined for every request.
    pub macros: BTreeMap<String, String>,
    /// Where compiled artifacts persist between runs; `None` disables the
    /// disk cache.
    pub cache_dir: Option<PathBuf>,
    pub error_limit: usize,
    /// Emit `OpName`/`OpMemberName` debug instructions.
    pub emit_debug_names: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            include_dirs: Vec::new(),
            macros: BTreeMap::new(),
            cache_dir: None,
            error_limit: DEFAULT_ERROR_LIMIT,
            emit_debug_names: true,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    #[must_use]
    pub fn with_macro(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.macros.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_error_limit(mut self, limit: usize) -> Self {
        self.error_limit = limit;
        self
    }

    #[must_use]
    pub fn with_debug_names(mut self, emit: bool) -> Self {
        self.emit_debug_names = emit;
        self
    }
}
