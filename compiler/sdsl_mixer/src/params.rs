//! Permutation parameters.

use std::collections::BTreeMap;
use std::fmt;

/// A typed permutation parameter value.
#[derive(Clone, Debug, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "int",
            ParameterValue::Float(_) => "float",
            ParameterValue::Str(_) => "string",
        }
    }

    /// Parse a command-line value: `true`/`false`, an integer, a float, or
    /// anything else as a string.
    pub fn parse_literal(text: &str) -> Self {
        match text {
            "true" => return ParameterValue::Bool(true),
            "false" => return ParameterValue::Bool(false),
            _ => {}
        }
        if let Ok(int) = text.parse::<i64>() {
            return ParameterValue::Int(int);
        }
        if let Ok(float) = text.parse::<f64>() {
            return ParameterValue::Float(float);
        }
        ParameterValue::Str(text.to_string())
    }

    /// Feed a tagged, unambiguous encoding of the value into `hasher`.
    pub fn hash_into(&self, hasher: &mut blake3::Hasher) {
        match self {
            ParameterValue::Bool(b) => {
                hasher.update(&[0, u8::from(*b)]);
            }
            ParameterValue::Int(i) => {
                hasher.update(&[1]);
                hasher.update(&i.to_le_bytes());
            }
            ParameterValue::Float(f) => {
                hasher.update(&[2]);
                hasher.update(&f.to_bits().to_le_bytes());
            }
            ParameterValue::Str(s) => {
                hasher.update(&[3]);
                hasher.update(&(s.len() as u64).to_le_bytes());
                hasher.update(s.as_bytes());
            }
        }
    }
}

/// Renders the value as macro replacement text.
impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(b) => write!(f, "{b}"),
            ParameterValue::Int(i) => write!(f, "{i}"),
            // `{:?}` keeps a decimal point so the macro stays a float literal.
            ParameterValue::Float(v) => write!(f, "{v:?}"),
            ParameterValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Int(i64::from(value))
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Str(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Str(value)
    }
}

/// Parameters of a compile request, ordered by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterBag {
    values: BTreeMap<String, ParameterValue>,
}

impl ParameterBag {
    pub fn new() -> Self {
        ParameterBag::default()
    }

    /// Builder form of [`ParameterBag::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Hash every binding in name order.
    pub fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(&(self.values.len() as u64).to_le_bytes());
        for (name, value) in &self.values {
            hasher.update(&(name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            value.hash_into(hasher);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(bag: &ParameterBag) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        bag.hash_into(&mut hasher);
        *hasher.finalize().as_bytes()
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(ParameterValue::parse_literal("true"), ParameterValue::Bool(true));
        assert_eq!(ParameterValue::parse_literal("-4"), ParameterValue::Int(-4));
        assert_eq!(ParameterValue::parse_literal("0.5"), ParameterValue::Float(0.5));
        assert_eq!(
            ParameterValue::parse_literal("NormalFromMap"),
            ParameterValue::Str("NormalFromMap".into())
        );
    }

    #[test]
    fn test_macro_text() {
        assert_eq!(ParameterValue::Float(1.0).to_string(), "1.0");
        assert_eq!(ParameterValue::Int(3).to_string(), "3");
        assert_eq!(ParameterValue::Bool(false).to_string(), "false");
    }

    #[test]
    fn test_hash_ignores_insertion_order() {
        let a = ParameterBag::new().with("A", 1).with("B", true);
        let b = ParameterBag::new().with("B", true).with("A", 1);
        assert_eq!(digest(&a), digest(&b));
    }

    #[test]
    fn test_hash_distinguishes_types() {
        let int = ParameterBag::new().with("A", 1);
        let string = ParameterBag::new().with("A", "1");
        let float = ParameterBag::new().with("A", 1.0);
        assert_ne!(digest(&int), digest(&string));
        assert_ne!(digest(&int), digest(&float));
    }
}
