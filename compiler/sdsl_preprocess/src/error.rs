//! Fatal preprocessing errors.

use sdsl_diagnostic::{Diagnostic, ErrorCode, SourceLocation};

/// A fatal preprocessor error. `line` is 1-based within `file`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreprocessError {
    #[error("{file}:{line}: malformed directive: {message}")]
    Malformed {
        file: String,
        line: u32,
        message: String,
    },

    #[error("{file}:{line}: cannot find include file `{path}`")]
    MissingInclude {
        file: String,
        line: u32,
        path: String,
    },

    #[error("{file}:{line}: conditional block is never closed with #endif")]
    UnterminatedConditional { file: String, line: u32 },

    #[error("{file}:{line}: #{directive} without matching #if")]
    Unmatched {
        file: String,
        line: u32,
        directive: &'static str,
    },

    #[error("{file}:{line}: #error {message}")]
    ErrorDirective {
        file: String,
        line: u32,
        message: String,
    },

    #[error("{file}:{line}: macro `{name}` expects {expected} argument(s), found {found}")]
    ArgumentCount {
        file: String,
        line: u32,
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("{file}:{line}: invalid #if expression: {message}")]
    InvalidCondition {
        file: String,
        line: u32,
        message: String,
    },

    #[error("{file}:{line}: includes nested more than {limit} levels deep")]
    IncludeDepth { file: String, line: u32, limit: usize },

    #[error("{file}:{line}: unterminated block comment")]
    UnterminatedComment { file: String, line: u32 },
}

impl PreprocessError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PreprocessError::Malformed { .. } => ErrorCode::E1001,
            PreprocessError::MissingInclude { .. } => ErrorCode::E1002,
            PreprocessError::UnterminatedConditional { .. } => ErrorCode::E1003,
            PreprocessError::ErrorDirective { .. } => ErrorCode::E1004,
            PreprocessError::ArgumentCount { .. } => ErrorCode::E1005,
            PreprocessError::InvalidCondition { .. } => ErrorCode::E1006,
            PreprocessError::Unmatched { .. } => ErrorCode::E1007,
            PreprocessError::IncludeDepth { .. } => ErrorCode::E1008,
            PreprocessError::UnterminatedComment { .. } => ErrorCode::E0004,
        }
    }

    /// File and 1-based line the error was raised at.
    pub fn position(&self) -> (&str, u32) {
        match self {
            PreprocessError::Malformed { file, line, .. }
            | PreprocessError::MissingInclude { file, line, .. }
            | PreprocessError::UnterminatedConditional { file, line }
            | PreprocessError::Unmatched { file, line, .. }
            | PreprocessError::ErrorDirective { file, line, .. }
            | PreprocessError::ArgumentCount { file, line, .. }
            | PreprocessError::InvalidCondition { file, line, .. }
            | PreprocessError::IncludeDepth { file, line, .. }
            | PreprocessError::UnterminatedComment { file, line } => (file, *line),
        }
    }

    /// Convert into a located diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (file, line) = self.position();
        let message = self.to_string();
        // Drop the "file:line: " prefix; the location carries it.
        let message = message
            .split_once(": ")
            .map_or(message.as_str(), |(_, rest)| rest)
            .to_string();
        Diagnostic::error(self.code())
            .with_message(message)
            .with_location(SourceLocation::new(file, line, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_carries_file_and_line() {
        let err = PreprocessError::ErrorDirective {
            file: "Lighting.sdsl".to_string(),
            line: 12,
            message: "unsupported light count".to_string(),
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, ErrorCode::E1004);
        assert_eq!(diag.message, "#error unsupported light count");
        assert_eq!(
            diag.location,
            Some(SourceLocation::new("Lighting.sdsl", 12, 1))
        );
    }
}
