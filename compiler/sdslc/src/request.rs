//! Compile requests and their identity.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use sdsl_ir::ContentHash;
use sdsl_mixer::{ParameterBag, ParameterValue};

/// Version mixed into every [`EffectId`], so artifacts from another
/// compiler build never match.
pub const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identity of a compile request: BLAKE3 over the compiler version, the
/// effect name, the sorted parameters and the sorted extra macros.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
pub struct EffectId(pub ContentHash);

impl EffectId {
    /// 64 lowercase hex characters; also the disk cache file stem.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectId({:?})", self.0)
    }
}

/// An effect to compile with one permutation of its parameters.
#[derive(Clone, Debug)]
pub struct CompileRequest {
    pub effect: String,
    pub parameters: ParameterBag,
    /// Macros defined for this request only, on top of the global ones.
    pub macros: BTreeMap<String, String>,
}

impl CompileRequest {
    pub fn new(effect: impl Into<String>) -> Self {
        CompileRequest {
            effect: effect.into(),
            parameters: ParameterBag::new(),
            macros: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Self {
        self.parameters.set(name, value);
        self
    }

    #[must_use]
    pub fn with_macro(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.macros.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> EffectId {
        let mut hasher = blake3::Hasher::new();
        write_str(&mut hasher, COMPILER_VERSION);
        write_str(&mut hasher, &self.effect);
        self.parameters.hash_into(&mut hasher);
        hasher.update(&(self.macros.len() as u64).to_le_bytes());
        for (name, value) in &self.macros {
            write_str(&mut hasher, name);
            write_str(&mut hasher, value);
        }
        EffectId(ContentHash::from_bytes(*hasher.finalize().as_bytes()))
    }
}

/// Length-prefixed, so `("ab", "c")` and `("a", "bc")` hash differently.
fn write_str(hasher: &mut blake3::Hasher, text: &str) {
    hasher.update(&(text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
}

impl PartialEq for CompileRequest {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for CompileRequest {}

impl Hash for CompileRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_ne;

    #[test]
    fn test_id_ignores_insertion_order() {
        let a = CompileRequest::new("Lit")
            .with_parameter("Shadows", true)
            .with_parameter("Lights", 4i64)
            .with_macro("A", "1")
            .with_macro("B", "2");
        let b = CompileRequest::new("Lit")
            .with_macro("B", "2")
            .with_macro("A", "1")
            .with_parameter("Lights", 4i64)
            .with_parameter("Shadows", true);
        assert_eq!(a.id(), b.id());
        assert_eq!(a, b);
    }

    #[test]
    fn test_id_covers_every_input() {
        let base = CompileRequest::new("Lit").with_parameter("Shadows", true);
        assert_ne!(base.id(), CompileRequest::new("Unlit").with_parameter("Shadows", true).id());
        assert_ne!(base.id(), CompileRequest::new("Lit").with_parameter("Shadows", false).id());
        assert_ne!(base.id(), base.clone().with_macro("A", "1").id());
        assert_ne!(
            CompileRequest::new("ab").with_macro("c", "").id(),
            CompileRequest::new("a").with_macro("bc", "").id()
        );
    }

    #[test]
    fn test_hex_form() {
        let hex = CompileRequest::new("Lit").id().to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.bytes().all(|b| b.is_ascii_hexdigit()));
    }
}
