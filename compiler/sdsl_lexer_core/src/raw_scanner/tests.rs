use pretty_assertions::assert_eq;

use super::*;

fn tags(text: &str) -> Vec<(RawTag, &str)> {
    let mut scanner = Scanner::new(text);
    let mut out = Vec::new();
    loop {
        let start = scanner.pos();
        let tag = scan_token(&mut scanner);
        if tag == RawTag::Eof {
            break;
        }
        out.push((tag, scanner.slice_from(start)));
    }
    out
}

fn significant(text: &str) -> Vec<(RawTag, &str)> {
    tags(text).into_iter().filter(|(t, _)| !t.is_trivia()).collect()
}

// === Identifiers and Punctuation ===

#[test]
fn field_declaration() {
    assert_eq!(
        significant("float3 Color : COLOR0;"),
        vec![
            (RawTag::Ident, "float3"),
            (RawTag::Ident, "Color"),
            (RawTag::Colon, ":"),
            (RawTag::Ident, "COLOR0"),
            (RawTag::Semi, ";"),
        ]
    );
}

#[test]
fn longest_operator_wins() {
    assert_eq!(
        significant("a <<= b >> c"),
        vec![
            (RawTag::Ident, "a"),
            (RawTag::ShlEq, "<<="),
            (RawTag::Ident, "b"),
            (RawTag::Shr, ">>"),
            (RawTag::Ident, "c"),
        ]
    );
}

#[test]
fn hash_and_paste() {
    assert_eq!(
        significant("#define CAT(a) a##x"),
        vec![
            (RawTag::Hash, "#"),
            (RawTag::Ident, "define"),
            (RawTag::Ident, "CAT"),
            (RawTag::LParen, "("),
            (RawTag::Ident, "a"),
            (RawTag::RParen, ")"),
            (RawTag::Ident, "a"),
            (RawTag::HashHash, "##"),
            (RawTag::Ident, "x"),
        ]
    );
}

// === Numbers ===

#[test]
fn number_forms() {
    assert_eq!(
        significant("1 1u 0x1F 1.0 .5 2. 1e3 1.5f 2h 3f"),
        vec![
            (RawTag::Int, "1"),
            (RawTag::Int, "1u"),
            (RawTag::Int, "0x1F"),
            (RawTag::Float, "1.0"),
            (RawTag::Float, ".5"),
            (RawTag::Float, "2."),
            (RawTag::Float, "1e3"),
            (RawTag::Float, "1.5f"),
            (RawTag::Float, "2h"),
            (RawTag::Float, "3f"),
        ]
    );
}

#[test]
fn swizzle_after_number_is_not_exponent() {
    // `1.e` is not an exponent without digits.
    assert_eq!(
        significant("1.e"),
        vec![(RawTag::Float, "1."), (RawTag::Ident, "e")]
    );
}

// === Strings and Comments ===

#[test]
fn strings() {
    assert_eq!(significant(r#""vertex""#), vec![(RawTag::Str, r#""vertex""#)]);
    assert_eq!(
        significant("\"open\nx"),
        vec![(RawTag::UnterminatedStr, "\"open"), (RawTag::Ident, "x")]
    );
}

#[test]
fn comments_are_trivia() {
    let all = tags("a // line\n/* block */b");
    assert_eq!(
        all,
        vec![
            (RawTag::Ident, "a"),
            (RawTag::Whitespace, " "),
            (RawTag::LineComment, "// line"),
            (RawTag::Newline, "\n"),
            (RawTag::BlockComment, "/* block */"),
            (RawTag::Ident, "b"),
        ]
    );
}

#[test]
fn unterminated_block_comment() {
    assert_eq!(
        tags("/* open"),
        vec![(RawTag::UnterminatedBlockComment, "/* open")]
    );
}

#[test]
fn unknown_character() {
    assert_eq!(significant("@"), vec![(RawTag::Unknown, "@")]);
}

#[test]
fn concatenated_slices_reproduce_input() {
    let text = "shader A { float4 f() { return 1.0f; } } // x\n";
    let joined: String = tags(text).into_iter().map(|(_, s)| s).collect();
    assert_eq!(joined, text);
}
