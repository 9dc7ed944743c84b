//! Per-request compilation state.
//!
//! A [`CompilationContext`] owns everything one request creates: the
//! interner, the preprocessed units and their source maps. Units are loaded
//! through a [`UnitLoader`], which fixes the macro set they are
//! preprocessed with; the effect is loaded with the request's macros, the
//! mixins it selects again with the effect's `macro` bindings added.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::{Name, SourceId, StringInterner};
use sdsl_preprocess::{MacroTable, SourceMap};
use sdsl_resolve::{LoadError, MixinLoader, SourceUnit};

use crate::cancel::CancellationToken;
use crate::sources::{ProviderIncludes, SourceCache, SourceError, SourceProvider};

pub struct CompilationContext<'a> {
    pub interner: StringInterner,
    sources: &'a SourceCache,
    provider: &'a dyn SourceProvider,
    token: &'a CancellationToken,
    /// Source map of every unit, indexed by its `SourceId`.
    maps: Mutex<Vec<SourceMap>>,
}

impl<'a> CompilationContext<'a> {
    pub fn new(
        sources: &'a SourceCache,
        provider: &'a dyn SourceProvider,
        token: &'a CancellationToken,
    ) -> Self {
        CompilationContext {
            interner: StringInterner::new(),
            sources,
            provider,
            token,
            maps: Mutex::new(Vec::new()),
        }
    }

    /// A loader preprocessing every unit with `macros`.
    pub fn loader(&self, macros: MacroTable) -> UnitLoader<'_, 'a> {
        UnitLoader {
            cx: self,
            macros,
            units: Mutex::new(FxHashMap::default()),
        }
    }

    /// Fill in the original file, line and column of each diagnostic's
    /// primary span.
    pub fn locate(&self, diagnostics: &mut [Diagnostic]) {
        let maps = self.maps.lock();
        for diagnostic in diagnostics {
            if diagnostic.location.is_some() {
                continue;
            }
            let (Some(source), Some(span)) = (diagnostic.source, diagnostic.primary_span()) else {
                continue;
            };
            if let Some(location) = maps
                .get(source.index())
                .and_then(|map| map.locate(span.start))
            {
                diagnostic.location = Some(location);
            }
        }
    }

    fn register(&self, map: SourceMap) -> SourceId {
        let mut maps = self.maps.lock();
        let id = SourceId::new(maps.len() as u32);
        maps.push(map);
        id
    }
}

/// Loads, preprocesses, lexes and parses units on demand, once per name.
pub struct UnitLoader<'cx, 'a> {
    cx: &'cx CompilationContext<'a>,
    macros: MacroTable,
    units: Mutex<FxHashMap<Name, Arc<SourceUnit>>>,
}

impl UnitLoader<'_, '_> {
    fn load_unit(&self, name: Name) -> Result<Arc<SourceUnit>, LoadError> {
        let cx = self.cx;
        if cx.token.is_cancelled() {
            return Err(LoadError::Invalid(vec![cancelled()]));
        }
        let text = cx.interner.lookup(name);
        let source = match cx.sources.get_or_load(text, cx.provider) {
            Ok(source) => source,
            Err(SourceError::NotFound { .. }) => return Err(LoadError::NotFound),
            Err(err) => {
                return Err(LoadError::Invalid(vec![Diagnostic::error(ErrorCode::E9003)
                    .with_message(err.to_string())]));
            }
        };

        let includes = ProviderIncludes(cx.provider);
        let processed = sdsl_preprocess::preprocess(&source.file, &source.text, &self.macros, &includes)
            .map_err(|err| LoadError::Invalid(vec![err.to_diagnostic()]))?;
        let id = cx.register(processed.source_map);

        let lexed = sdsl_lexer::lex(&processed.text, id, &cx.interner);
        if !lexed.errors.is_empty() {
            return Err(LoadError::Invalid(lexed.errors));
        }
        let parsed = sdsl_parse::parse(&lexed.tokens, &cx.interner);
        if !parsed.errors.is_empty() {
            return Err(LoadError::Invalid(
                parsed
                    .errors
                    .iter()
                    .map(|e| e.to_diagnostic().with_source(id))
                    .collect(),
            ));
        }
        tracing::debug!(unit = text, file = %source.file, "loaded unit");
        Ok(Arc::new(SourceUnit {
            id,
            file: source.file,
            module: parsed.module,
            arena: parsed.arena,
            hash: source.hash,
        }))
    }
}

impl MixinLoader for UnitLoader<'_, '_> {
    fn load(&self, name: Name) -> Result<Arc<SourceUnit>, LoadError> {
        if let Some(unit) = self.units.lock().get(&name) {
            return Ok(Arc::clone(unit));
        }
        let unit = self.load_unit(name)?;
        // One file can declare several shaders; each is served from it.
        let mut units = self.units.lock();
        for decl_name in unit.module.decls.iter().map(sdsl_ir::Decl::name) {
            units.entry(decl_name).or_insert_with(|| Arc::clone(&unit));
        }
        Ok(Arc::clone(units.entry(name).or_insert(unit)))
    }
}

pub(crate) fn cancelled() -> Diagnostic {
    Diagnostic::error(ErrorCode::E9001).with_message("compilation was cancelled")
}
