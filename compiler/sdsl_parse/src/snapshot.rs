//! Parser snapshots for speculative parsing.
//!
//! Snapshots capture the cursor position and the error count. Arena state
//! is not captured: speculation should only examine tokens.

use crate::Parser;

#[derive(Clone, Copy, Debug)]
pub struct ParserSnapshot {
    pub(crate) cursor_pos: usize,
    pub(crate) error_count: usize,
}

impl Parser<'_> {
    pub(crate) fn snapshot(&self) -> ParserSnapshot {
        ParserSnapshot {
            cursor_pos: self.cursor.position(),
            error_count: self.errors.len(),
        }
    }

    pub(crate) fn restore(&mut self, snapshot: ParserSnapshot) {
        self.cursor.set_position(snapshot.cursor_pos);
        self.errors.truncate(snapshot.error_count);
    }

    /// Run a token-level predicate, then rewind whatever it consumed.
    pub(crate) fn look_ahead(&mut self, f: impl FnOnce(&mut Self) -> bool) -> bool {
        let snapshot = self.snapshot();
        let result = f(self);
        self.restore(snapshot);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_small() {
        assert!(std::mem::size_of::<ParserSnapshot>() <= 16);
    }
}
