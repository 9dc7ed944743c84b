//! Include file lookup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

/// A file returned by an [`IncludeResolver`].
#[derive(Clone, Debug)]
pub struct IncludedFile {
    /// Canonical name; used for `#pragma once` and in locations.
    pub name: String,
    pub text: Arc<str>,
}

/// Locates the text of `#include`d files.
pub trait IncludeResolver: Send + Sync {
    /// Resolve `path` as written in a directive inside the file `from`.
    fn resolve(&self, path: &str, from: &str) -> Option<IncludedFile>;
}

/// Rejects every include.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&self, _path: &str, _from: &str) -> Option<IncludedFile> {
        None
    }
}

/// In-memory include files keyed by path.
#[derive(Clone, Debug, Default)]
pub struct MemoryIncludes {
    files: FxHashMap<String, Arc<str>>,
}

impl MemoryIncludes {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, text: impl Into<Arc<str>>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<Arc<str>>) {
        self.files.insert(path.into(), text.into());
    }
}

impl IncludeResolver for MemoryIncludes {
    fn resolve(&self, path: &str, _from: &str) -> Option<IncludedFile> {
        self.files.get(path).map(|text| IncludedFile {
            name: path.to_string(),
            text: Arc::clone(text),
        })
    }
}

/// Looks next to the including file first, then in each search directory.
#[derive(Clone, Debug, Default)]
pub struct DirectoryIncludes {
    search_dirs: Vec<PathBuf>,
}

impl DirectoryIncludes {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        DirectoryIncludes { search_dirs }
    }

    fn read(candidate: &Path) -> Option<IncludedFile> {
        let text = std::fs::read_to_string(candidate).ok()?;
        Some(IncludedFile {
            name: candidate.to_string_lossy().into_owned(),
            text: Arc::from(text),
        })
    }
}

impl IncludeResolver for DirectoryIncludes {
    fn resolve(&self, path: &str, from: &str) -> Option<IncludedFile> {
        let sibling = Path::new(from).parent().map(|dir| dir.join(path));
        sibling
            .into_iter()
            .chain(self.search_dirs.iter().map(|dir| dir.join(path)))
            .find(|candidate| candidate.is_file())
            .and_then(|candidate| Self::read(&candidate))
    }
}
