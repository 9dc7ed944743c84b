//! Error codes for all compiler diagnostics.
//!
//! Each code is a unique identifier (e.g. `E3001`) whose first digit is the
//! phase that produced it.

use std::fmt;

/// Compiler phase a diagnostic belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Phase {
    Lex,
    Preprocess,
    Parse,
    Semantic,
    /// Mixin composition; a sub-range of semantic errors.
    Composition,
    Emission,
    Internal,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Lex => "lex",
            Phase::Preprocess => "preprocess",
            Phase::Parse => "parse",
            Phase::Semantic => "semantic",
            Phase::Composition => "composition",
            Phase::Emission => "emission",
            Phase::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Error codes.
///
/// Format: E#### where the first digit indicates the phase:
/// - E0xxx: lexer
/// - E1xxx: preprocessor
/// - E2xxx: parser
/// - E3xxx: resolver (symbols and types)
/// - E4xxx: mixin composition
/// - E5xxx: code emission
/// - E9xxx: internal and cancellation
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Lexer (E0xxx)
    /// Unterminated string literal
    E0001,
    /// Invalid character in source
    E0002,
    /// Invalid number literal
    E0003,
    /// Unterminated block comment
    E0004,

    // Preprocessor (E1xxx)
    /// Malformed directive
    E1001,
    /// Include file not found
    E1002,
    /// Unterminated conditional block
    E1003,
    /// `#error` directive
    E1004,
    /// Wrong number of macro arguments
    E1005,
    /// Invalid `#if` expression
    E1006,
    /// `#else`/`#elif`/`#endif` without `#if`
    E1007,
    /// Include nesting too deep
    E1008,

    // Parser (E2xxx)
    /// Unexpected token
    E2001,
    /// Expected expression
    E2002,
    /// Unclosed delimiter
    E2003,
    /// Expected identifier
    E2004,
    /// Expected type
    E2005,
    /// Invalid declaration
    E2006,

    // Resolver (E3xxx)
    /// Type mismatch
    E3001,
    /// Unknown type
    E3002,
    /// Unknown identifier
    E3003,
    /// Wrong argument count
    E3004,
    /// Duplicate definition
    E3005,
    /// Use before declaration
    E3006,
    /// Compose cycle
    E3007,
    /// Unknown mixin
    E3008,
    /// Invalid assignment target
    E3009,
    /// Invalid array size
    E3010,
    /// Unknown member
    E3011,
    /// No matching overload
    E3012,
    /// `break`/`continue` outside a loop
    E3013,
    /// `base.` call without a base method
    E3014,
    /// Invalid operand for operator
    E3015,

    // Composition (E4xxx)
    /// Field redeclared with a conflicting type
    E4001,
    /// Conflicting method definitions
    E4002,
    /// Abstract method has no implementation
    E4003,
    /// Unknown effect
    E4004,
    /// Invalid parameter value in effect condition
    E4005,
    /// Effect includes itself
    E4006,

    // Emission (E5xxx)
    /// Not all paths return a value
    E5001,
    /// Unreachable code
    E5002,
    /// Unsupported construct
    E5003,
    /// Invalid entry point
    E5004,

    // Internal (E9xxx)
    /// Compilation cancelled
    E9001,
    /// Internal compiler error
    E9002,
    /// Source unavailable
    E9003,
}

impl ErrorCode {
    /// The code as written in diagnostics, e.g. `"E3001"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E0001 => "E0001",
            ErrorCode::E0002 => "E0002",
            ErrorCode::E0003 => "E0003",
            ErrorCode::E0004 => "E0004",
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
            ErrorCode::E1005 => "E1005",
            ErrorCode::E1006 => "E1006",
            ErrorCode::E1007 => "E1007",
            ErrorCode::E1008 => "E1008",
            ErrorCode::E2001 => "E2001",
            ErrorCode::E2002 => "E2002",
            ErrorCode::E2003 => "E2003",
            ErrorCode::E2004 => "E2004",
            ErrorCode::E2005 => "E2005",
            ErrorCode::E2006 => "E2006",
            ErrorCode::E3001 => "E3001",
            ErrorCode::E3002 => "E3002",
            ErrorCode::E3003 => "E3003",
            ErrorCode::E3004 => "E3004",
            ErrorCode::E3005 => "E3005",
            ErrorCode::E3006 => "E3006",
            ErrorCode::E3007 => "E3007",
            ErrorCode::E3008 => "E3008",
            ErrorCode::E3009 => "E3009",
            ErrorCode::E3010 => "E3010",
            ErrorCode::E3011 => "E3011",
            ErrorCode::E3012 => "E3012",
            ErrorCode::E3013 => "E3013",
            ErrorCode::E3014 => "E3014",
            ErrorCode::E3015 => "E3015",
            ErrorCode::E4001 => "E4001",
            ErrorCode::E4002 => "E4002",
            ErrorCode::E4003 => "E4003",
            ErrorCode::E4004 => "E4004",
            ErrorCode::E4005 => "E4005",
            ErrorCode::E4006 => "E4006",
            ErrorCode::E5001 => "E5001",
            ErrorCode::E5002 => "E5002",
            ErrorCode::E5003 => "E5003",
            ErrorCode::E5004 => "E5004",
            ErrorCode::E9001 => "E9001",
            ErrorCode::E9002 => "E9002",
            ErrorCode::E9003 => "E9003",
        }
    }

    /// The phase this code belongs to, read from its first digit.
    pub fn phase(&self) -> Phase {
        match self.as_str().as_bytes().get(1) {
            Some(b'0') => Phase::Lex,
            Some(b'1') => Phase::Preprocess,
            Some(b'2') => Phase::Parse,
            Some(b'3') => Phase::Semantic,
            Some(b'4') => Phase::Composition,
            Some(b'5') => Phase::Emission,
            _ => Phase::Internal,
        }
    }

    /// Composition errors are semantic errors raised while merging mixins.
    pub fn is_semantic_error(&self) -> bool {
        matches!(self.phase(), Phase::Semantic | Phase::Composition)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_code() {
        assert_eq!(ErrorCode::E0001.phase(), Phase::Lex);
        assert_eq!(ErrorCode::E1004.phase(), Phase::Preprocess);
        assert_eq!(ErrorCode::E2001.phase(), Phase::Parse);
        assert_eq!(ErrorCode::E3007.phase(), Phase::Semantic);
        assert_eq!(ErrorCode::E4001.phase(), Phase::Composition);
        assert_eq!(ErrorCode::E5001.phase(), Phase::Emission);
        assert_eq!(ErrorCode::E9001.phase(), Phase::Internal);
    }

    #[test]
    fn test_composition_is_semantic() {
        assert!(ErrorCode::E4002.is_semantic_error());
        assert!(ErrorCode::E3001.is_semantic_error());
        assert!(!ErrorCode::E5001.is_semantic_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::E3001.to_string(), "E3001");
    }
}
