//! Links from preprocessed text back to original source files.

use crate::{FileIndex, Span};

/// A span inside one of a unit's original files.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FileSpan {
    pub file: FileIndex,
    pub span: Span,
}

impl FileSpan {
    #[inline]
    pub const fn new(file: FileIndex, span: Span) -> Self {
        FileSpan { file, span }
    }
}

/// How a processed range relates to its origin.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LinkKind {
    /// Copied verbatim: offsets map one to one.
    Passthrough,
    /// Produced by macro expansion: every offset maps to the invocation start.
    MacroExpansion,
}

/// Maps a range of the preprocessed text to where it came from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TextLink {
    pub processed: Span,
    pub origin: FileSpan,
    pub kind: LinkKind,
}

impl TextLink {
    /// Map a processed offset inside this link to its original offset.
    pub fn map_offset(&self, processed_offset: u32) -> u32 {
        match self.kind {
            LinkKind::Passthrough => {
                let delta = processed_offset.saturating_sub(self.processed.start);
                (self.origin.span.start + delta).min(self.origin.span.end)
            }
            LinkKind::MacroExpansion => self.origin.span.start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_maps_one_to_one() {
        let link = TextLink {
            processed: Span::new(10, 20),
            origin: FileSpan::new(FileIndex::ROOT, Span::new(40, 50)),
            kind: LinkKind::Passthrough,
        };
        assert_eq!(link.map_offset(10), 40);
        assert_eq!(link.map_offset(15), 45);
    }

    #[test]
    fn expansion_maps_to_invocation_start() {
        let link = TextLink {
            processed: Span::new(0, 30),
            origin: FileSpan::new(FileIndex::new(1), Span::new(7, 12)),
            kind: LinkKind::MacroExpansion,
        };
        assert_eq!(link.map_offset(0), 7);
        assert_eq!(link.map_offset(29), 7);
    }
}
