//! Shader source retrieval and the process-wide source cache.
//!
//! A [`SourceProvider`] maps a mixin or effect name to the text of the file
//! declaring it and resolves `#include`s. [`SourceCache`] memoizes loads
//! with their content hash, which is what cached artifacts are validated
//! against.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use sdsl_ir::ContentHash;
use sdsl_preprocess::{DirectoryIncludes, IncludeResolver, IncludedFile};

/// File extension of shader sources.
pub const SOURCE_EXTENSION: &str = "sdsl";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("no source file for `{name}`")]
    NotFound { name: String },

    #[error("cannot read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Text of a source file and the name diagnostics should report for it.
#[derive(Clone, Debug)]
pub struct LoadedSource {
    pub file: String,
    pub text: Arc<str>,
}

/// Where shader text comes from.
pub trait SourceProvider: Send + Sync {
    /// The file declaring mixin or effect `name`.
    fn load(&self, name: &str) -> Result<LoadedSource, SourceError>;

    /// An `#include`d file, as written in a directive inside `from`.
    fn include(&self, path: &str, from: &str) -> Option<IncludedFile>;
}

/// Looks up `<Name>.sdsl` in each search directory in order.
#[derive(Clone, Debug)]
pub struct FileSystemSources {
    dirs: Vec<PathBuf>,
    includes: DirectoryIncludes,
}

impl FileSystemSources {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        let includes = DirectoryIncludes::new(dirs.clone());
        FileSystemSources { dirs, includes }
    }

    fn candidate(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.{SOURCE_EXTENSION}"))
    }
}

impl SourceProvider for FileSystemSources {
    fn load(&self, name: &str) -> Result<LoadedSource, SourceError> {
        for dir in &self.dirs {
            let path = Self::candidate(dir, name);
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    tracing::trace!(path = %path.display(), "read source");
                    return Ok(LoadedSource {
                        file: path.to_string_lossy().into_owned(),
                        text: Arc::from(text),
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(SourceError::Io { path, source }),
            }
        }
        Err(SourceError::NotFound {
            name: name.to_string(),
        })
    }

    fn include(&self, path: &str, from: &str) -> Option<IncludedFile> {
        self.includes.resolve(path, from)
    }
}

/// Sources held in memory: shaders by name, includes by path.
#[derive(Clone, Debug, Default)]
pub struct MemorySources {
    shaders: FxHashMap<String, Arc<str>>,
    includes: FxHashMap<String, Arc<str>>,
}

impl MemorySources {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_shader(mut self, name: impl Into<String>, text: impl Into<Arc<str>>) -> Self {
        self.insert_shader(name, text);
        self
    }

    #[must_use]
    pub fn with_include(mut self, path: impl Into<String>, text: impl Into<Arc<str>>) -> Self {
        self.includes.insert(path.into(), text.into());
        self
    }

    pub fn insert_shader(&mut self, name: impl Into<String>, text: impl Into<Arc<str>>) {
        self.shaders.insert(name.into(), text.into());
    }
}

impl SourceProvider for MemorySources {
    fn load(&self, name: &str) -> Result<LoadedSource, SourceError> {
        let text = self.shaders.get(name).ok_or_else(|| SourceError::NotFound {
            name: name.to_string(),
        })?;
        Ok(LoadedSource {
            file: format!("{name}.{SOURCE_EXTENSION}"),
            text: Arc::clone(text),
        })
    }

    fn include(&self, path: &str, _from: &str) -> Option<IncludedFile> {
        self.includes.get(path).map(|text| IncludedFile {
            name: path.to_string(),
            text: Arc::clone(text),
        })
    }
}

/// Adapts a provider to the preprocessor's include lookup.
pub(crate) struct ProviderIncludes<'a>(pub &'a dyn SourceProvider);

impl IncludeResolver for ProviderIncludes<'_> {
    fn resolve(&self, path: &str, from: &str) -> Option<IncludedFile> {
        self.0.include(path, from)
    }
}

/// A loaded source and the BLAKE3 hash of its text.
#[derive(Clone, Debug)]
pub struct CachedSource {
    pub file: String,
    pub text: Arc<str>,
    pub hash: ContentHash,
}

/// Process-wide memo of loaded sources, keyed by mixin or effect name.
#[derive(Debug, Default)]
pub struct SourceCache {
    entries: DashMap<String, CachedSource>,
    /// Bumped by every invalidation. A load that overlapped one is returned
    /// but not memoized, since it may have read the old text.
    generation: Mutex<u64>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached source for `name`, loading it on a miss. When two threads
    /// miss together both read, and the first insert wins for both.
    pub fn get_or_load(
        &self,
        name: &str,
        provider: &dyn SourceProvider,
    ) -> Result<CachedSource, SourceError> {
        if let Some(hit) = self.entries.get(name) {
            return Ok(hit.value().clone());
        }
        let started = *self.generation.lock();
        let loaded = provider.load(name)?;
        let hash = ContentHash::from_bytes(*blake3::hash(loaded.text.as_bytes()).as_bytes());
        let source = CachedSource {
            file: loaded.file,
            text: loaded.text,
            hash,
        };
        let generation = self.generation.lock();
        if *generation != started {
            return Ok(source);
        }
        let entry = self.entries.entry(name.to_string()).or_insert(source);
        Ok(entry.value().clone())
    }

    /// Hash of the current text of `name`, loading it if needed. `None`
    /// when the source is gone.
    pub fn current_hash(&self, name: &str, provider: &dyn SourceProvider) -> Option<ContentHash> {
        self.get_or_load(name, provider).ok().map(|s| s.hash)
    }

    /// Forget `names`; the next load reads them again.
    pub fn invalidate(&self, names: &[&str]) {
        let mut generation = self.generation.lock();
        *generation += 1;
        for name in names {
            self.entries.remove(*name);
        }
    }
}
