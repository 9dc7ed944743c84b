//! Character classification for SDSL source.

/// First character of an identifier.
#[inline]
pub fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

/// Subsequent identifier characters.
#[inline]
pub fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Space, tab, and the other non-newline whitespace characters.
#[inline]
pub fn is_horizontal_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\x0B' | '\x0C')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_classes() {
        assert!(is_ident_start('_'));
        assert!(is_ident_start('C'));
        assert!(!is_ident_start('4'));
        assert!(is_ident_continue('4'));
        assert!(!is_ident_continue('.'));
    }

    #[test]
    fn test_horizontal_space_excludes_newline() {
        assert!(is_horizontal_space('\t'));
        assert!(!is_horizontal_space('\n'));
        assert!(!is_horizontal_space('\0'));
    }
}
