//! Artifacts persisted between runs, one `bincode` file per effect id.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sdsl_spirv::EffectBytecode;

use crate::request::{EffectId, COMPILER_VERSION};

#[derive(Debug, thiserror::Error)]
pub enum DiskCacheError {
    #[error("cache I/O on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt cache entry `{}`: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("cannot encode cache entry: {0}")]
    Encode(#[source] bincode::Error),
}

#[derive(Serialize, Deserialize)]
struct DiskEntry {
    compiler_version: String,
    bytecode: EffectBytecode,
}

/// A directory of cached artifacts.
#[derive(Clone, Debug)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DiskCache { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: EffectId) -> PathBuf {
        self.dir.join(format!("{}.bin", id.to_hex()))
    }

    /// The stored artifact for `id`, if any. Entries written by another
    /// compiler version are ignored.
    pub fn load(&self, id: EffectId) -> Result<Option<EffectBytecode>, DiskCacheError> {
        let path = self.path(id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(DiskCacheError::Io { path, source }),
        };
        let entry: DiskEntry = bincode::deserialize(&bytes)
            .map_err(|source| DiskCacheError::Decode { path, source })?;
        if entry.compiler_version != COMPILER_VERSION {
            return Ok(None);
        }
        Ok(Some(entry.bytecode))
    }

    /// Store `bytecode` under `id`. The file is written next to its final
    /// name and renamed into place, so readers never see a partial entry.
    pub fn store(&self, id: EffectId, bytecode: &EffectBytecode) -> Result<(), DiskCacheError> {
        let entry = DiskEntry {
            compiler_version: COMPILER_VERSION.to_string(),
            bytecode: bytecode.clone(),
        };
        let bytes = bincode::serialize(&entry).map_err(DiskCacheError::Encode)?;
        let io = |source| DiskCacheError::Io {
            path: self.dir.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io)?;
        let mut file = tempfile::NamedTempFile::new_in(&self.dir).map_err(io)?;
        file.write_all(&bytes).map_err(io)?;
        let path = self.path(id);
        file.persist(&path).map_err(|err| DiskCacheError::Io {
            path,
            source: err.error,
        })?;
        Ok(())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use pretty_assertions::assert_eq;
    use sdsl_ir::ContentHash;
    use sdsl_spirv::EffectReflection;

    use super::*;

    fn artifact() -> EffectBytecode {
        EffectBytecode {
            words: vec![0x0723_0203, 0x0001_0000, 0, 9, 0],
            reflection: EffectReflection::default(),
            program_hash: ContentHash::from_bytes([7; 32]),
            used_sources: vec![("Base".to_string(), ContentHash::from_bytes([1; 32]))],
        }
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("nested"));
        let id = EffectId(ContentHash::from_bytes([3; 32]));
        assert!(cache.load(id).unwrap().is_none());

        cache.store(id, &artifact()).unwrap();
        assert_eq!(cache.load(id).unwrap(), Some(artifact()));
        assert!(cache.dir().join(format!("{}.bin", id.to_hex())).exists());
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let id = EffectId(ContentHash::from_bytes([4; 32]));
        std::fs::write(dir.path().join(format!("{}.bin", id.to_hex())), b"\x01").unwrap();
        assert!(matches!(cache.load(id), Err(DiskCacheError::Decode { .. })));
    }
}
