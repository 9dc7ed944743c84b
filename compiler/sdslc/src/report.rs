//! Human-readable diagnostic output.
//!
//! Diagnostics whose original file can be read again are drawn as ariadne
//! reports with the offending source line; the rest fall back to the
//! one-line `file:line:col: error[E....]: message` form.

use std::io::{self, Write};
use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use sdsl_diagnostic::{Diagnostic, Severity, SourceLocation};

/// Renders diagnostics to a writer.
pub struct Reporter<F> {
    read_file: F,
    colors: bool,
}

impl<F> Reporter<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// `read_file` returns the text of an original source file by the name
    /// recorded in a diagnostic's location.
    pub fn new(read_file: F, colors: bool) -> Self {
        Reporter { read_file, colors }
    }

    pub fn render_all(&self, diagnostics: &[Diagnostic], out: &mut dyn Write) -> io::Result<()> {
        for diagnostic in diagnostics {
            self.render(diagnostic, out)?;
        }
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        if errors > 0 {
            let s = if errors == 1 { "" } else { "s" };
            writeln!(out, "{errors} error{s} emitted")?;
        }
        Ok(())
    }

    pub fn render(&self, diagnostic: &Diagnostic, out: &mut dyn Write) -> io::Result<()> {
        let Some(location) = &diagnostic.location else {
            return plain(diagnostic, out);
        };
        let Some(text) = (self.read_file)(&location.file) else {
            return plain(diagnostic, out);
        };
        let range = label_range(&text, location, diagnostic);
        let file = location.file.as_str();
        let color = match diagnostic.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
            Severity::Note => Color::Cyan,
        };
        let label_message = diagnostic
            .labels
            .iter()
            .find(|l| l.is_primary)
            .map_or("here", |l| l.message.as_str());

        let mut report = Report::build(kind(diagnostic.severity), file, range.start)
            .with_code(diagnostic.code)
            .with_message(&diagnostic.message)
            .with_config(Config::default().with_color(self.colors))
            .with_label(
                Label::new((file, range))
                    .with_message(label_message)
                    .with_color(color),
            );
        for note in &diagnostic.notes {
            report = report.with_note(note);
        }
        report.finish().write((file, Source::from(text)), out)
    }
}

fn kind(severity: Severity) -> ReportKind<'static> {
    match severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
        Severity::Note => ReportKind::Advice,
    }
}

fn plain(diagnostic: &Diagnostic, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{diagnostic}")?;
    for note in &diagnostic.notes {
        writeln!(out, "  = note: {note}")?;
    }
    Ok(())
}

/// Character range of the primary label in the original file. The label
/// keeps the width of the preprocessed span but never crosses the end of
/// its line.
fn label_range(text: &str, location: &SourceLocation, diagnostic: &Diagnostic) -> Range<usize> {
    let line_index = location.line.saturating_sub(1) as usize;
    let mut start = 0;
    let mut line_len = 0;
    for (index, line) in text.split_inclusive('\n').enumerate() {
        let len = line.trim_end_matches(['\n', '\r']).chars().count();
        if index == line_index {
            line_len = len;
            break;
        }
        start += line.chars().count();
    }
    let column = (location.column.saturating_sub(1) as usize).min(line_len);
    let width = diagnostic
        .primary_span()
        .map_or(1, |span| span.end.saturating_sub(span.start).max(1) as usize);
    let width = width.min(line_len.saturating_sub(column)).max(1);
    start + column..start + column + width
}
