//! Low-level character scanner shared by the preprocessor and the lexer.
//!
//! [`Scanner`] walks a `&str` one character at a time while tracking line and
//! column. Reading past the end yields the sentinel [`EOF_CHAR`] instead of
//! failing, so callers can look ahead freely. Backtracking is only possible
//! through [`Scanner::save`] / [`Scanner::restore`].
//!
//! [`scan_token`] classifies the next raw token (identifier, number, string,
//! comment, punctuation) on top of the scanner.

mod char_class;
mod raw_scanner;
mod scanner;

pub use char_class::{is_ident_continue, is_ident_start, is_horizontal_space};
pub use raw_scanner::{scan_token, RawTag};
pub use scanner::{line_column_at, Scanner, ScannerState, EOF_CHAR};
