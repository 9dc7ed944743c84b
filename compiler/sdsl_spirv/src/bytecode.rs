//! The compiled artifact handed to the runtime and stored in caches.

use sdsl_ir::ContentHash;

#[cfg(feature = "cache")]
use serde::{Deserialize, Serialize};

use crate::module::words_to_bytes;
use crate::reflect::EffectReflection;

/// A SPIR-V module plus everything needed to bind it and to decide whether
/// a cached copy is still current.
#[derive(Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "cache", derive(Serialize, Deserialize))]
pub struct EffectBytecode {
    pub words: Vec<u32>,
    pub reflection: EffectReflection,
    /// Hash of the composed program the module was emitted from.
    pub program_hash: ContentHash,
    /// Every composed mixin and the hash of its source text, in
    /// composition order.
    pub used_sources: Vec<(String, ContentHash)>,
}

impl EffectBytecode {
    /// Little-endian byte image, as written to a `.spv` file.
    pub fn to_bytes(&self) -> Vec<u8> {
        words_to_bytes(&self.words)
    }

    /// Whether the module was built from `mixin`.
    pub fn uses_source(&self, mixin: &str) -> bool {
        self.used_sources.iter().any(|(name, _)| name == mixin)
    }

    /// Whether every recorded source still hashes to what `current`
    /// reports. A source `current` no longer knows counts as stale.
    pub fn sources_match(&self, mut current: impl FnMut(&str) -> Option<ContentHash>) -> bool {
        self.used_sources
            .iter()
            .all(|(name, hash)| current(name) == Some(*hash))
    }
}
