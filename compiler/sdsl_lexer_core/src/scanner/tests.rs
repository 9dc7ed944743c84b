use pretty_assertions::assert_eq;

use super::*;

// === Peek and Advance ===

#[test]
fn peek_does_not_consume() {
    let scanner = Scanner::new("abc");
    assert_eq!(scanner.peek(0), 'a');
    assert_eq!(scanner.peek(2), 'c');
    assert_eq!(scanner.pos(), 0);
}

#[test]
fn peek_past_end_returns_sentinel() {
    let scanner = Scanner::new("ab");
    assert_eq!(scanner.peek(2), EOF_CHAR);
    assert_eq!(scanner.peek(100), EOF_CHAR);
}

#[test]
fn advance_past_end_is_clamped() {
    let mut scanner = Scanner::new("ab");
    scanner.advance(10);
    assert!(scanner.is_eof());
    assert_eq!(scanner.pos(), 2);
    assert_eq!(scanner.current(), EOF_CHAR);
}

#[test]
fn advance_tracks_lines_and_columns() {
    let mut scanner = Scanner::new("ab\ncd\n\nx");
    scanner.advance(4);
    assert_eq!((scanner.line(), scanner.column()), (1, 1));
    scanner.advance(3);
    assert_eq!((scanner.line(), scanner.column()), (3, 0));
    assert_eq!(scanner.current(), 'x');
}

#[test]
fn columns_count_characters_not_bytes() {
    let mut scanner = Scanner::new("éé=");
    scanner.advance(2);
    assert_eq!(scanner.column(), 2);
    assert_eq!(scanner.pos(), 4);
    assert_eq!(scanner.current(), '=');
}

// === Literals ===

#[test]
fn read_literal_case_sensitive() {
    let mut scanner = Scanner::new("#define X");
    assert!(!scanner.read_literal("#DEFINE", true));
    assert_eq!(scanner.pos(), 0);
    assert!(scanner.read_literal("#define", true));
    assert_eq!(scanner.pos(), 7);
}

#[test]
fn read_literal_case_insensitive() {
    let mut scanner = Scanner::new("SV_Position");
    assert!(scanner.read_literal("sv_position", false));
    assert!(scanner.is_eof());
}

#[test]
fn read_literal_longer_than_input_fails() {
    let mut scanner = Scanner::new("sha");
    assert!(!scanner.read_literal("shader", true));
    assert_eq!(scanner.pos(), 0);
}

// === Skipping ===

#[test]
fn eat_while_returns_consumed_text() {
    let mut scanner = Scanner::new("Color0 = 1");
    let ident = scanner.eat_while(crate::is_ident_continue);
    assert_eq!(ident, "Color0");
    assert_eq!(scanner.current(), ' ');
}

#[test]
fn skip_to_line_end_stops_before_newline() {
    let mut scanner = Scanner::new("// comment\nnext");
    let skipped = scanner.skip_to_line_end();
    assert_eq!(skipped, "// comment");
    assert_eq!(scanner.current(), '\n');
    assert_eq!(scanner.column(), 10);
}

#[test]
fn skip_past_block_comment_counts_lines() {
    let mut scanner = Scanner::new("/* a\n b\n c */x");
    scanner.advance(2);
    assert!(scanner.skip_past("*/"));
    assert_eq!(scanner.current(), 'x');
    assert_eq!((scanner.line(), scanner.column()), (2, 5));
}

#[test]
fn skip_past_unterminated_reaches_eof() {
    let mut scanner = Scanner::new("/* never closed\n");
    scanner.advance(2);
    assert!(!scanner.skip_past("*/"));
    assert!(scanner.is_eof());
    assert_eq!(scanner.line(), 1);
}

// === Save / Restore ===

#[test]
fn restore_rewinds_position_and_line() {
    let mut scanner = Scanner::new("a\nb\nc");
    let saved = scanner.save();
    scanner.advance(4);
    assert_eq!(scanner.line(), 2);
    scanner.restore(saved);
    assert_eq!((scanner.pos(), scanner.line(), scanner.column()), (0, 0, 0));
}

// === Rescan Agreement ===

#[test]
fn line_column_at_matches_known_positions() {
    let text = "shader A\n{\n  float x;\n}";
    assert_eq!(line_column_at(text, 0), (0, 0));
    assert_eq!(line_column_at(text, 9), (1, 0));
    assert_eq!(line_column_at(text, 13), (2, 2));
    assert_eq!(line_column_at(text, 999), (3, 1));
}

mod proptest_round_trip {
    use proptest::prelude::*;

    use crate::{line_column_at, Scanner};

    proptest! {
        #[test]
        fn incremental_position_matches_rescan(
            text in "[a-z \\n\\t/*é]{0,80}",
            steps in proptest::collection::vec(0usize..6, 0..30),
        ) {
            let mut scanner = Scanner::new(&text);
            for step in steps {
                scanner.advance(step);
                prop_assert_eq!(
                    (scanner.line(), scanner.column()),
                    line_column_at(&text, scanner.pos())
                );
            }
        }

        #[test]
        fn skip_past_matches_rescan(text in "[a-z\\n*/]{0,60}") {
            let mut scanner = Scanner::new(&text);
            scanner.skip_past("*/");
            prop_assert_eq!(
                (scanner.line(), scanner.column()),
                line_column_at(&text, scanner.pos())
            );
        }
    }
}
