//! Helpers shared by the composer tests.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use sdsl_ir::{ContentHash, Decl, Name, SourceId, StringInterner};
use sdsl_resolve::{resolve, LoadError, MixinLoader, MixinRef, ResolvedProgram, SourceUnit};

/// Serves declarations from in-memory sources, parsed up front.
pub(crate) struct TestLoader {
    units: FxHashMap<Name, Arc<SourceUnit>>,
}

impl TestLoader {
    pub(crate) fn new(interner: &StringInterner, sources: &[&str]) -> Self {
        let mut units = FxHashMap::default();
        for (index, text) in sources.iter().enumerate() {
            let id = SourceId::new(index as u32);
            let lexed = sdsl_lexer::lex(text, id, interner);
            assert!(lexed.errors.is_empty(), "lex errors: {:?}", lexed.errors);
            let parsed = sdsl_parse::parse(&lexed.tokens, interner);
            assert!(!parsed.has_errors(), "parse errors: {:?}", parsed.errors);
            let unit = Arc::new(SourceUnit {
                id,
                file: format!("source{index}.sdsl"),
                module: parsed.module,
                arena: parsed.arena,
                hash: ContentHash::from_bytes(*blake3::hash(text.as_bytes()).as_bytes()),
            });
            for decl in &unit.module.decls {
                let name = match decl {
                    Decl::Shader(s) => s.name,
                    Decl::Effect(e) => e.name,
                };
                units.insert(name, Arc::clone(&unit));
            }
        }
        TestLoader { units }
    }
}

impl MixinLoader for TestLoader {
    fn load(&self, name: Name) -> Result<Arc<SourceUnit>, LoadError> {
        self.units.get(&name).cloned().ok_or(LoadError::NotFound)
    }
}

/// Resolve `roots` over `sources`, panicking on resolver errors.
pub(crate) fn resolve_roots(
    interner: &StringInterner,
    sources: &[&str],
    roots: &[&str],
) -> ResolvedProgram {
    let loader = TestLoader::new(interner, sources);
    let roots: Vec<MixinRef> = roots
        .iter()
        .map(|r| MixinRef::root(interner.intern(r)))
        .collect();
    match resolve(&roots, &loader, interner) {
        Ok(program) => program,
        Err(errors) => panic!("resolution failed: {errors:#?}"),
    }
}
