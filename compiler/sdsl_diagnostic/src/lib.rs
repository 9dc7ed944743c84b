//! Diagnostic system for the SDSL compiler.
//!
//! Every phase reports problems as [`Diagnostic`] values:
//! - an [`ErrorCode`] whose first digit names the phase
//! - a message saying what went wrong
//! - a primary span inside one preprocessed unit
//! - optional secondary labels and notes
//!
//! Spans are translated to a [`SourceLocation`] (original file, line, column)
//! by the driver once the unit's text links are known.
//!
//! # Error Guarantees
//!
//! [`ErrorGuaranteed`] is type-level proof that at least one error was
//! recorded. Phases return `Result<T, ErrorGuaranteed>` so a failing phase
//! cannot forget to report why.

mod bag;
mod diagnostic;
mod error_code;
mod guarantee;
mod location;

pub use bag::DiagnosticBag;
pub use diagnostic::{
    expected_token, type_mismatch, unexpected_token, unknown_identifier, Diagnostic, Label,
    Severity,
};
pub use error_code::{ErrorCode, Phase};
pub use guarantee::ErrorGuaranteed;
pub use location::{LineOffsetTable, SourceLocation};
