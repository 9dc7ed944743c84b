//! `#if` / `#elif` expression evaluation.

use sdsl_lexer_core::RawTag;

use crate::macros::{Expander, ExpandError, MacroTable, PpToken};

/// Why a condition could not be evaluated.
#[derive(Debug)]
pub(crate) enum ConditionError {
    Expand(ExpandError),
    Invalid(String),
}

impl From<ExpandError> for ConditionError {
    fn from(err: ExpandError) -> Self {
        ConditionError::Expand(err)
    }
}

/// Evaluate a directive condition to true or false.
pub(crate) fn evaluate(tokens: &[PpToken], macros: &MacroTable) -> Result<bool, ConditionError> {
    let replaced = replace_defined(tokens, macros)?;
    let expanded = Expander::new(macros).expand(&replaced)?;
    if expanded.is_empty() {
        return Err(ConditionError::Invalid("missing expression".to_string()));
    }
    let mut eval = Evaluator {
        tokens: &expanded,
        pos: 0,
    };
    let value = eval.ternary()?;
    if let Some(extra) = eval.peek() {
        return Err(ConditionError::Invalid(format!(
            "unexpected `{}` after expression",
            extra.text
        )));
    }
    Ok(value != 0)
}

/// Replace `defined X` and `defined(X)` with `1` or `0` before expansion.
fn replace_defined(tokens: &[PpToken], macros: &MacroTable) -> Result<Vec<PpToken>, ConditionError> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if !token.is_ident("defined") {
            out.push(token.clone());
            i += 1;
            continue;
        }
        let (name, next) = match tokens.get(i + 1) {
            Some(open) if open.tag == RawTag::LParen => {
                match (tokens.get(i + 2), tokens.get(i + 3)) {
                    (Some(name), Some(close))
                        if name.tag == RawTag::Ident && close.tag == RawTag::RParen =>
                    {
                        (name, i + 4)
                    }
                    _ => return Err(ConditionError::Invalid("malformed `defined(...)`".to_string())),
                }
            }
            Some(name) if name.tag == RawTag::Ident => (name, i + 2),
            _ => return Err(ConditionError::Invalid("`defined` requires a macro name".to_string())),
        };
        let value = if macros.is_defined(&name.text) { "1" } else { "0" };
        out.push(PpToken::new(RawTag::Int, value, token.space_before));
        i = next;
    }
    Ok(out)
}

struct Evaluator<'t> {
    tokens: &'t [PpToken],
    pos: usize,
}

type EvalResult = Result<i64, ConditionError>;

fn invalid(message: impl Into<String>) -> ConditionError {
    ConditionError::Invalid(message.into())
}

impl<'t> Evaluator<'t> {
    fn peek(&self) -> Option<&'t PpToken> {
        self.tokens.get(self.pos)
    }

    fn peek_tag(&self) -> Option<RawTag> {
        self.peek().map(|t| t.tag)
    }

    fn bump(&mut self) -> Option<&'t PpToken> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn eat(&mut self, tag: RawTag) -> bool {
        if self.peek_tag() == Some(tag) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ternary(&mut self) -> EvalResult {
        let cond = self.binary(0)?;
        if !self.eat(RawTag::Question) {
            return Ok(cond);
        }
        let then = self.ternary()?;
        if !self.eat(RawTag::Colon) {
            return Err(invalid("expected `:` in conditional expression"));
        }
        let otherwise = self.ternary()?;
        Ok(if cond != 0 { then } else { otherwise })
    }

    /// Precedence climbing over the C binary operators.
    fn binary(&mut self, min_prec: u8) -> EvalResult {
        let mut lhs = self.unary()?;
        while let Some((prec, op)) = self.peek_tag().and_then(binary_op) {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(prec + 1)?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> EvalResult {
        match self.peek_tag() {
            Some(RawTag::Bang) => {
                self.pos += 1;
                Ok(i64::from(self.unary()? == 0))
            }
            Some(RawTag::Tilde) => {
                self.pos += 1;
                Ok(!self.unary()?)
            }
            Some(RawTag::Minus) => {
                self.pos += 1;
                Ok(self.unary()?.wrapping_neg())
            }
            Some(RawTag::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> EvalResult {
        let Some(token) = self.bump() else {
            return Err(invalid("unexpected end of expression"));
        };
        match token.tag {
            RawTag::Int => parse_int(&token.text),
            RawTag::LParen => {
                let value = self.ternary()?;
                if self.eat(RawTag::RParen) {
                    Ok(value)
                } else {
                    Err(invalid("expected `)`"))
                }
            }
            RawTag::Ident => Ok(i64::from(token.text == "true")),
            RawTag::Float => Err(invalid(format!(
                "floating-point literal `{}` in condition",
                token.text
            ))),
            _ => Err(invalid(format!("unexpected `{}`", token.text))),
        }
    }
}

#[derive(Copy, Clone)]
enum Op {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

fn binary_op(tag: RawTag) -> Option<(u8, Op)> {
    Some(match tag {
        RawTag::PipePipe => (1, Op::Or),
        RawTag::AmpAmp => (2, Op::And),
        RawTag::Pipe => (3, Op::BitOr),
        RawTag::Caret => (4, Op::BitXor),
        RawTag::Amp => (5, Op::BitAnd),
        RawTag::EqEq => (6, Op::Eq),
        RawTag::BangEq => (6, Op::Ne),
        RawTag::Lt => (7, Op::Lt),
        RawTag::Gt => (7, Op::Gt),
        RawTag::LtEq => (7, Op::Le),
        RawTag::GtEq => (7, Op::Ge),
        RawTag::Shl => (8, Op::Shl),
        RawTag::Shr => (8, Op::Shr),
        RawTag::Plus => (9, Op::Add),
        RawTag::Minus => (9, Op::Sub),
        RawTag::Star => (10, Op::Mul),
        RawTag::Slash => (10, Op::Div),
        RawTag::Percent => (10, Op::Rem),
        _ => return None,
    })
}

fn apply(op: Op, lhs: i64, rhs: i64) -> EvalResult {
    Ok(match op {
        Op::Or => i64::from(lhs != 0 || rhs != 0),
        Op::And => i64::from(lhs != 0 && rhs != 0),
        Op::BitOr => lhs | rhs,
        Op::BitXor => lhs ^ rhs,
        Op::BitAnd => lhs & rhs,
        Op::Eq => i64::from(lhs == rhs),
        Op::Ne => i64::from(lhs != rhs),
        Op::Lt => i64::from(lhs < rhs),
        Op::Gt => i64::from(lhs > rhs),
        Op::Le => i64::from(lhs <= rhs),
        Op::Ge => i64::from(lhs >= rhs),
        Op::Shl => lhs.wrapping_shl(rhs as u32),
        Op::Shr => lhs.wrapping_shr(rhs as u32),
        Op::Add => lhs.wrapping_add(rhs),
        Op::Sub => lhs.wrapping_sub(rhs),
        Op::Mul => lhs.wrapping_mul(rhs),
        Op::Div | Op::Rem if rhs == 0 => return Err(invalid("division by zero")),
        Op::Div => lhs.wrapping_div(rhs),
        Op::Rem => lhs.wrapping_rem(rhs),
    })
}

fn parse_int(text: &str) -> EvalResult {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    let parsed = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16)
    } else {
        digits.parse::<i64>()
    };
    parsed.map_err(|_| invalid(format!("invalid integer `{text}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::tokenize;

    fn eval(text: &str, macros: &MacroTable) -> bool {
        match evaluate(&tokenize(text), macros) {
            Ok(v) => v,
            Err(e) => panic!("condition `{text}` failed: {e:?}"),
        }
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        let macros = MacroTable::new();
        assert!(eval("1 + 2 * 3 == 7", &macros));
        assert!(eval("(1 + 2) * 3 == 9", &macros));
        assert!(eval("0x10 >> 2 == 4", &macros));
        assert!(!eval("1 && 0 || 0", &macros));
        assert!(eval("1 ? 2 : 0", &macros));
        assert!(eval("-1 < 0", &macros));
        assert!(eval("!0", &macros));
    }

    #[test]
    fn test_defined_forms() {
        let macros = MacroTable::from_pairs([("LIGHTS", "4")]);
        assert!(eval("defined(LIGHTS)", &macros));
        assert!(eval("defined LIGHTS && LIGHTS > 2", &macros));
        assert!(!eval("defined(SHADOWS)", &macros));
    }

    #[test]
    fn test_unknown_identifiers_are_zero() {
        let macros = MacroTable::new();
        assert!(!eval("UNKNOWN", &macros));
        assert!(eval("true", &macros));
    }

    #[test]
    fn test_division_by_zero_is_invalid() {
        let macros = MacroTable::new();
        assert!(matches!(
            evaluate(&tokenize("1 / 0"), &macros),
            Err(ConditionError::Invalid(_))
        ));
    }

    #[test]
    fn test_trailing_tokens_are_invalid() {
        let macros = MacroTable::new();
        assert!(matches!(
            evaluate(&tokenize("1 2"), &macros),
            Err(ConditionError::Invalid(_))
        ));
    }
}
