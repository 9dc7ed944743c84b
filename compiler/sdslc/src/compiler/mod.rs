//! The compile driver.
//!
//! ```text
//! CompileRequest ──► evaluate_effect ──► resolve ──► compose ──► emit ──► EffectBytecode
//!                    (request macros)    (+ effect macros)
//! ```
//!
//! Each arrow is a phase boundary: diagnostics collected by the phase are
//! located, capped and deduplicated, and any error ends the compilation.
//! Cancellation is checked at every boundary.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use sdsl_diagnostic::{Diagnostic, DiagnosticBag, ErrorCode};
use sdsl_mixer::{compose, evaluate_effect};
use sdsl_preprocess::MacroTable;
use sdsl_resolve::resolve;
use sdsl_spirv::{emit, EffectBytecode, EmitOptions};

use crate::cache::{BytecodeCache, CompilationOrigin, Outcome};
use crate::cancel::CancellationToken;
use crate::config::CompilerConfig;
use crate::context::{cancelled, CompilationContext};
use crate::disk::DiskCache;
use crate::request::{CompileRequest, EffectId};
use crate::sources::{FileSystemSources, SourceCache, SourceProvider};

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

/// Outcome of [`EffectCompiler::compile`]: either bytecode and no
/// diagnostics, or no bytecode and at least one diagnostic.
#[derive(Clone, Debug)]
pub struct CompilerResult {
    pub bytecode: Option<Arc<EffectBytecode>>,
    pub origin: Option<CompilationOrigin>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompilerResult {
    fn success(bytecode: Arc<EffectBytecode>, origin: CompilationOrigin) -> Self {
        CompilerResult {
            bytecode: Some(bytecode),
            origin: Some(origin),
            diagnostics: Vec::new(),
        }
    }

    fn failure(diagnostics: Vec<Diagnostic>) -> Self {
        CompilerResult {
            bytecode: None,
            origin: None,
            diagnostics,
        }
    }

    pub fn is_success(&self) -> bool {
        self.bytecode.is_some()
    }

    /// Error codes in report order.
    pub fn codes(&self) -> Vec<ErrorCode> {
        self.diagnostics.iter().map(|d| d.code).collect()
    }
}

/// Why the pipeline stopped early.
enum Halt {
    Cancelled,
    Failed(Vec<Diagnostic>),
}

/// Compiles effect permutations, sharing sources and artifacts across
/// requests and threads.
pub struct EffectCompiler {
    config: CompilerConfig,
    provider: Arc<dyn SourceProvider>,
    sources: SourceCache,
    cache: BytecodeCache,
    disk: Option<DiskCache>,
}

impl EffectCompiler {
    pub fn new(config: CompilerConfig, provider: Arc<dyn SourceProvider>) -> Self {
        let disk = config.cache_dir.clone().map(DiskCache::new);
        EffectCompiler {
            config,
            provider,
            sources: SourceCache::new(),
            cache: BytecodeCache::new(),
            disk,
        }
    }

    /// A compiler reading `<Name>.sdsl` files from the include directories.
    pub fn from_file_system(config: CompilerConfig) -> Self {
        let provider = Arc::new(FileSystemSources::new(config.include_dirs.clone()));
        Self::new(config, provider)
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    #[tracing::instrument(level = "debug", skip_all, fields(effect = %request.effect))]
    pub fn compile(&self, request: &CompileRequest, token: &CancellationToken) -> CompilerResult {
        let id = request.id();
        let outcome = self
            .cache
            .get_or_compile(id, || self.build(request, id, token));
        match outcome {
            Outcome::Ready(bytecode, origin) => {
                tracing::debug!(?origin, "compiled");
                CompilerResult::success(bytecode, origin)
            }
            Outcome::Failed(diagnostics) => CompilerResult::failure(diagnostics.to_vec()),
            Outcome::Cancelled => CompilerResult::failure(vec![cancelled()]),
        }
    }

    /// Compile independent requests in parallel; results keep the order of
    /// `requests`.
    pub fn compile_many(&self, requests: &[CompileRequest]) -> Vec<CompilerResult> {
        requests
            .par_iter()
            .map(|request| self.compile(request, &CancellationToken::new()))
            .collect()
    }

    /// Forget the given sources and every cached artifact built from them.
    /// Returns how many artifacts were dropped.
    pub fn invalidate_sources(&self, names: &[&str]) -> usize {
        self.sources.invalidate(names);
        let dropped = self
            .cache
            .invalidate(|bytecode| names.iter().any(|name| bytecode.uses_source(name)));
        tracing::debug!(sources = names.len(), dropped, "invalidated");
        dropped
    }

    /// Runs as the owner of a flight.
    fn build(&self, request: &CompileRequest, id: EffectId, token: &CancellationToken) -> Outcome {
        if let Some(bytecode) = self.load_from_disk(id) {
            return Outcome::Ready(Arc::new(bytecode), CompilationOrigin::LoadedFromDisk);
        }
        match self.run_pipeline(request, token) {
            Ok(bytecode) => {
                if let Some(disk) = &self.disk {
                    if let Err(err) = disk.store(id, &bytecode) {
                        tracing::warn!(%err, "cannot write disk cache entry");
                    }
                }
                Outcome::Ready(Arc::new(bytecode), CompilationOrigin::FreshlyCompiled)
            }
            Err(Halt::Cancelled) => Outcome::Cancelled,
            Err(Halt::Failed(diagnostics)) => Outcome::Failed(Arc::from(diagnostics)),
        }
    }

    /// A disk entry counts only while every source it recorded still has
    /// the same hash.
    fn load_from_disk(&self, id: EffectId) -> Option<EffectBytecode> {
        let disk = self.disk.as_ref()?;
        match disk.load(id) {
            Ok(Some(bytecode)) => {
                let provider = &*self.provider;
                if bytecode.sources_match(|name| self.sources.current_hash(name, provider)) {
                    Some(bytecode)
                } else {
                    tracing::debug!(%id, "disk cache entry is stale");
                    None
                }
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(%err, "ignoring disk cache entry");
                None
            }
        }
    }

    fn run_pipeline(
        &self,
        request: &CompileRequest,
        token: &CancellationToken,
    ) -> Result<EffectBytecode, Halt> {
        let cx = CompilationContext::new(&self.sources, &*self.provider, token);
        let mut macros: BTreeMap<String, String> = self.config.macros.clone();
        macros.extend(request.macros.iter().map(|(k, v)| (k.clone(), v.clone())));

        let effect = cx.interner.intern(&request.effect);
        let plan = {
            let loader = cx.loader(macro_table(&macros));
            evaluate_effect(effect, &request.parameters, &loader, &cx.interner)
        };
        let plan = self.checkpoint(&cx, token, plan)?;

        macros.extend(plan.macros.iter().map(|(k, v)| (k.clone(), v.clone())));
        let loader = cx.loader(macro_table(&macros));
        let resolved = resolve(&plan.mixins, &loader, &cx.interner);
        let resolved = self.checkpoint(&cx, token, resolved)?;

        let program = compose(resolved, &request.parameters, &macros, &cx.interner);
        let program = self.checkpoint(&cx, token, program)?;

        let options = EmitOptions {
            debug_names: self.config.emit_debug_names,
        };
        let emitted = emit(&program, &options, &cx.interner, &|| token.is_cancelled());
        let mut bytecode = self.checkpoint(&cx, token, emitted)?;

        // Editing the effect file must invalidate the artifact too.
        for (name, hash) in &plan.sources {
            let name = cx.interner.lookup(*name);
            if !bytecode.uses_source(name) {
                bytecode.used_sources.push((name.to_string(), *hash));
            }
        }
        Ok(bytecode)
    }

    /// A phase boundary.
    fn checkpoint<T>(
        &self,
        cx: &CompilationContext<'_>,
        token: &CancellationToken,
        result: Result<T, Vec<Diagnostic>>,
    ) -> Result<T, Halt> {
        if token.is_cancelled() {
            return Err(Halt::Cancelled);
        }
        let mut errors = match result {
            Ok(value) => return Ok(value),
            Err(errors) => errors,
        };
        cx.locate(&mut errors);
        let mut bag = DiagnosticBag::with_limit(self.config.error_limit);
        bag.extend(errors);
        if !bag.has_errors() {
            bag.push(
                Diagnostic::error(ErrorCode::E9002).with_message("phase failed without an error"),
            );
        }
        Err(Halt::Failed(bag.into_vec()))
    }
}

fn macro_table(macros: &BTreeMap<String, String>) -> MacroTable {
    MacroTable::from_pairs(macros.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}
