//! Error recovery: skip to a synchronization point after a hard error.

use sdsl_ir::TokenKind;

use crate::Parser;

impl Parser<'_> {
    /// Skip to just past the next `;`, or up to the next `}`, at the current
    /// brace depth. A `{ ... }` group met on the way is skipped as a whole,
    /// including its closing brace.
    pub(crate) fn synchronize(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.cursor.current_kind() {
                TokenKind::Eof => return,
                TokenKind::Semi if depth == 0 => {
                    self.cursor.advance();
                    return;
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    if depth == 0 {
                        self.cursor.advance();
                        // `};` closes a declaration.
                        self.cursor.eat(TokenKind::Semi);
                        return;
                    }
                }
                _ => {}
            }
            self.cursor.advance();
        }
    }

    /// Skip to the next top-level `shader` or `effect`.
    pub(crate) fn synchronize_decl(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.cursor.current_kind() {
                TokenKind::Eof => return,
                TokenKind::Shader | TokenKind::Effect if depth == 0 => return,
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.cursor.advance();
        }
    }
}
