//! Mapping from preprocessed offsets back to original files.

use std::sync::Arc;

use sdsl_diagnostic::{LineOffsetTable, SourceLocation};
use sdsl_ir::{FileIndex, FileSpan, LinkKind, Span, TextLink};

/// One original file that contributed text to a preprocessed unit.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub name: String,
    pub text: Arc<str>,
    pub lines: LineOffsetTable,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: Arc<str>) -> Self {
        let lines = LineOffsetTable::build(&text);
        SourceFile {
            name: name.into(),
            text,
            lines,
        }
    }
}

/// Original files of a unit plus the links from processed ranges to them.
///
/// Links are sorted by processed offset and never overlap. Processed text
/// that has no link (comment replacements, blank directive lines) resolves
/// to the end of the closest preceding link.
#[derive(Clone, Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
    links: Vec<TextLink>,
}

impl SourceMap {
    pub(crate) fn new(files: Vec<SourceFile>, links: Vec<TextLink>) -> Self {
        SourceMap { files, links }
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, index: FileIndex) -> Option<&SourceFile> {
        self.files.get(index.index())
    }

    pub fn links(&self) -> &[TextLink] {
        &self.links
    }

    /// Map a processed offset to a file and an offset inside it.
    pub fn resolve(&self, processed_offset: u32) -> Option<(FileIndex, u32)> {
        let idx = self
            .links
            .partition_point(|link| link.processed.start <= processed_offset);
        let link = match idx.checked_sub(1) {
            Some(i) => &self.links[i],
            // Before the first link: only possible for leading synthetic text.
            None => self.links.first()?,
        };
        Some((link.origin.file, link.map_offset(processed_offset)))
    }

    /// Map a processed span to its origin, using the span start.
    pub fn resolve_span(&self, span: Span) -> Option<FileSpan> {
        let (file, start) = self.resolve(span.start)?;
        let end = match self.resolve(span.end.saturating_sub(1).max(span.start)) {
            Some((end_file, end)) if end_file == file && end >= start => {
                if span.is_empty() {
                    end
                } else {
                    end + 1
                }
            }
            _ => start,
        };
        Some(FileSpan::new(file, Span::new(start, end)))
    }

    /// File name, 1-based line and column of a processed offset.
    pub fn locate(&self, processed_offset: u32) -> Option<SourceLocation> {
        let (file, offset) = self.resolve(processed_offset)?;
        let source = self.file(file)?;
        let (line, column) = source.lines.offset_to_line_col(&source.text, offset);
        Some(SourceLocation::new(source.name.clone(), line, column))
    }
}

/// Accumulates processed text and its links.
#[derive(Default)]
pub(crate) struct OutputBuilder {
    text: String,
    links: Vec<TextLink>,
}

impl OutputBuilder {
    fn offset(&self) -> u32 {
        self.text.len() as u32
    }

    /// Copy original text verbatim; merges with a directly preceding link.
    pub(crate) fn passthrough(&mut self, text: &str, file: FileIndex, origin_start: u32) {
        if text.is_empty() {
            return;
        }
        let start = self.offset();
        let len = text.len() as u32;
        self.text.push_str(text);
        if let Some(last) = self.links.last_mut() {
            if last.kind == LinkKind::Passthrough
                && last.origin.file == file
                && last.processed.end == start
                && last.origin.span.end == origin_start
            {
                last.processed.end += len;
                last.origin.span.end += len;
                return;
            }
        }
        self.links.push(TextLink {
            processed: Span::new(start, start + len),
            origin: FileSpan::new(file, Span::new(origin_start, origin_start + len)),
            kind: LinkKind::Passthrough,
        });
    }

    /// Append macro-expanded text that points back at its invocation.
    pub(crate) fn expansion(&mut self, text: &str, file: FileIndex, invocation: Span) {
        if text.is_empty() {
            return;
        }
        let start = self.offset();
        self.text.push_str(text);
        self.links.push(TextLink {
            processed: Span::new(start, self.offset()),
            origin: FileSpan::new(file, invocation),
            kind: LinkKind::MacroExpansion,
        });
    }

    /// Append text with no origin (comment and directive replacements).
    pub(crate) fn synthetic(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub(crate) fn newlines(&mut self, count: usize) {
        for _ in 0..count {
            self.text.push('\n');
        }
    }

    pub(crate) fn finish(self) -> (String, Vec<TextLink>) {
        (self.text, self.links)
    }
}
