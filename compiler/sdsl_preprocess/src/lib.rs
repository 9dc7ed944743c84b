//! C-style preprocessor for SDSL.
//!
//! Runs before lexing. Supports object and function-like `#define` (with
//! `#` stringizing and `##` pasting), `#undef`, `#if`/`#ifdef`/`#ifndef`/
//! `#elif`/`#else`/`#endif`, `#include` with `#pragma once`, and `#error`.
//!
//! Line structure is preserved: every directive line and every removed line
//! in an inactive branch becomes an empty line, and comments keep their line
//! breaks. Each output range carries a [`TextLink`](sdsl_ir::TextLink) back
//! to the file it came from, so positions in the processed text resolve to
//! original file, line and column through [`SourceMap::locate`].

mod condition;
mod error;
mod include;
mod macros;
mod processor;
mod source_map;

use std::sync::Arc;

pub use error::PreprocessError;
pub use include::{DirectoryIncludes, IncludeResolver, IncludedFile, MemoryIncludes, NoIncludes};
pub use macros::{render, tokenize, MacroDef, MacroTable, PpToken};
pub use processor::MAX_INCLUDE_DEPTH;
pub use source_map::{SourceFile, SourceMap};

use processor::Preprocessor;
use sdsl_ir::FileIndex;

/// Result of preprocessing one file.
#[derive(Clone, Debug)]
pub struct Preprocessed {
    pub text: String,
    pub source_map: SourceMap,
}

/// Preprocess `text` (named `name`) with an initial macro set.
///
/// The root file is always [`FileIndex::ROOT`] in the resulting map.
#[tracing::instrument(level = "debug", skip_all, fields(file = name))]
pub fn preprocess(
    name: &str,
    text: &str,
    macros: &MacroTable,
    includes: &dyn IncludeResolver,
) -> Result<Preprocessed, PreprocessError> {
    let mut pp = Preprocessor::new(macros.clone(), includes);
    let root = pp.add_file(name, Arc::from(text));
    debug_assert_eq!(root, FileIndex::ROOT);
    pp.run_file(root)?;

    let (text, links) = pp.out.finish();
    tracing::debug!(
        bytes = text.len(),
        links = links.len(),
        files = pp.files.len(),
        "preprocessed"
    );
    Ok(Preprocessed {
        text,
        source_map: SourceMap::new(pp.files, links),
    })
}
