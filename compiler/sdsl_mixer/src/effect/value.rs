//! Values of effect expressions.

use std::cmp::Ordering;

use sdsl_ir::BinaryOp;

use crate::ParameterValue;

#[derive(Clone, Debug, PartialEq)]
pub(super) enum Value {
    /// A parameter the request does not set.
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<&ParameterValue> for Value {
    fn from(value: &ParameterValue) -> Self {
        match value {
            ParameterValue::Bool(b) => Value::Bool(*b),
            ParameterValue::Int(i) => Value::Int(*i),
            ParameterValue::Float(f) => Value::Float(*f),
            ParameterValue::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl Value {
    pub(super) fn type_name(&self) -> &'static str {
        match self {
            Value::Missing => "an unset parameter",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }

    /// The default a missing value takes when used like `other`.
    fn default_like(other: &Value) -> Value {
        match other {
            Value::Missing | Value::Bool(_) => Value::Bool(false),
            Value::Int(_) => Value::Int(0),
            Value::Float(_) => Value::Float(0.0),
            Value::Str(_) => Value::Str(String::new()),
        }
    }

    /// Replace a missing operand by the default of the other operand's type.
    pub(super) fn adapt_pair(left: Value, right: Value) -> (Value, Value) {
        match (left, right) {
            (Value::Missing, right) => (Value::default_like(&right), right),
            (left, Value::Missing) => {
                let right = Value::default_like(&left);
                (left, right)
            }
            pair => pair,
        }
    }

    /// A numeric view of the value; missing reads as `0`.
    pub(super) fn adapt_numeric(self) -> Option<Value> {
        match self {
            Value::Missing => Some(Value::Int(0)),
            Value::Int(_) | Value::Float(_) => Some(self),
            Value::Bool(_) | Value::Str(_) => None,
        }
    }

    pub(super) fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub(super) fn arithmetic(self, op: BinaryOp, other: &Value) -> Result<Value, String> {
        let invalid = || {
            format!(
                "operator `{}` cannot combine {} and {}",
                op.as_str(),
                self.type_name(),
                other.type_name()
            )
        };
        match (&self, other) {
            (Value::Int(a), Value::Int(b)) => {
                let (a, b) = (*a, *b);
                let value = match op {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Sub => a.wrapping_sub(b),
                    BinaryOp::Mul => a.wrapping_mul(b),
                    BinaryOp::Div | BinaryOp::Rem if b == 0 => {
                        return Err("division by zero".to_string());
                    }
                    BinaryOp::Div => a.wrapping_div(b),
                    BinaryOp::Rem => a.wrapping_rem(b),
                    BinaryOp::Shl => a.wrapping_shl(b as u32),
                    BinaryOp::Shr => a.wrapping_shr(b as u32),
                    BinaryOp::BitAnd => a & b,
                    BinaryOp::BitOr => a | b,
                    BinaryOp::BitXor => a ^ b,
                    _ => return Err(invalid()),
                };
                Ok(Value::Int(value))
            }
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let (a, b) = (self.as_f64(), other.as_f64());
                let value = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Rem => a % b,
                    _ => return Err(invalid()),
                };
                Ok(Value::Float(value))
            }
            (Value::Str(a), Value::Str(b)) if op == BinaryOp::Add => Ok(Value::Str(format!("{a}{b}"))),
            _ => Err(invalid()),
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Missing | Value::Str(_) => 0.0,
        }
    }

    /// Replacement text for a `macro` binding.
    pub(super) fn to_macro_text(&self) -> String {
        match self {
            Value::Missing => "0".to_string(),
            Value::Bool(b) => ParameterValue::Bool(*b).to_string(),
            Value::Int(i) => ParameterValue::Int(*i).to_string(),
            Value::Float(f) => ParameterValue::Float(*f).to_string(),
            Value::Str(s) => s.clone(),
        }
    }
}
