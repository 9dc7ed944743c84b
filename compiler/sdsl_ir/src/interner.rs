//! Sharded string interner for identifiers.
//!
//! Interned strings are leaked to `'static`. The interner is shared by every
//! compilation an `EffectCompiler` runs, so the leak is bounded by the set of
//! distinct identifiers across all sources it has seen.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

/// Per-shard storage for interned strings.
struct InternShard {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

impl InternShard {
    fn new() -> Self {
        InternShard {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(128),
        }
    }
}

/// Sharded string interner for concurrent access.
///
/// Compilations running on different threads intern into the same table;
/// each shard is guarded by its own `RwLock`.
pub struct StringInterner {
    shards: [RwLock<InternShard>; Name::NUM_SHARDS],
}

/// Interner shared across compilations.
pub type SharedInterner = Arc<StringInterner>;

impl StringInterner {
    /// Create an interner with the empty string at `Name::EMPTY`.
    pub fn new() -> Self {
        let shards = std::array::from_fn(|_| RwLock::new(InternShard::new()));
        let interner = StringInterner { shards };
        {
            let mut shard = interner.shards[0].write();
            shard.map.insert("", 0);
            shard.strings.push("");
        }
        interner
    }

    /// Create a new shared interner.
    pub fn shared() -> SharedInterner {
        Arc::new(Self::new())
    }

    #[inline]
    fn shard_for(s: &str) -> usize {
        if s.is_empty() {
            return 0;
        }
        let mut hash = 0u32;
        for byte in s.bytes().take(8) {
            hash = hash.wrapping_mul(31).wrapping_add(u32::from(byte));
        }
        (hash as usize) % Name::NUM_SHARDS
    }

    /// Intern a string, returning its `Name`.
    pub fn intern(&self, s: &str) -> Name {
        let shard_idx = Self::shard_for(s);
        let shard = &self.shards[shard_idx];

        if let Some(&local) = shard.read().map.get(s) {
            return Name::new(shard_idx as u32, local);
        }

        let mut guard = shard.write();
        if let Some(&local) = guard.map.get(s) {
            return Name::new(shard_idx as u32, local);
        }

        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let local = (guard.strings.len() as u32).min(Name::MAX_LOCAL);
        guard.strings.push(leaked);
        guard.map.insert(leaked, local);
        Name::new(shard_idx as u32, local)
    }

    /// Look up the string for a `Name`.
    ///
    /// Names from a different interner resolve to the empty string.
    pub fn lookup(&self, name: Name) -> &'static str {
        let shard = self.shards[name.shard()].read();
        shard.strings.get(name.local()).copied().unwrap_or("")
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().strings.len()).sum()
    }

    /// Always false: the empty string is pre-interned.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedups() {
        let interner = StringInterner::new();
        let a = interner.intern("Color");
        let b = interner.intern("Color");
        let c = interner.intern("Position");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.lookup(a), "Color");
        assert_eq!(interner.lookup(c), "Position");
    }

    #[test]
    fn test_empty_is_preinterned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.lookup(Name::EMPTY), "");
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_concurrent_interning() {
        let interner = StringInterner::shared();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let interner = Arc::clone(&interner);
                std::thread::spawn(move || {
                    (0..64)
                        .map(|i| interner.intern(&format!("field{i}")))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let results: Vec<Vec<Name>> = handles
            .into_iter()
            .map(|h| h.join().unwrap_or_default())
            .collect();
        for r in &results[1..] {
            assert_eq!(r, &results[0]);
        }
    }
}
