//! The directive-driven main loop.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use sdsl_ir::{FileIndex, Span};
use sdsl_lexer_core::{is_horizontal_space, scan_token, RawTag, Scanner};

use crate::condition::{self, ConditionError};
use crate::macros::{render, Expander, ExpandError, MacroDef, MacroTable, PpToken};
use crate::source_map::{OutputBuilder, SourceFile};
use crate::{IncludeResolver, PreprocessError};

/// Deepest include nesting accepted.
pub const MAX_INCLUDE_DEPTH: usize = 32;

/// One open `#if` group.
struct Conditional {
    /// This branch is being emitted.
    active: bool,
    /// Some branch of the group has been (or can no longer be) taken.
    taken: bool,
    /// Every enclosing group is active.
    parent_active: bool,
    seen_else: bool,
    line: u32,
}

pub(crate) struct Preprocessor<'r> {
    macros: MacroTable,
    includes: &'r dyn IncludeResolver,
    pub(crate) files: Vec<SourceFile>,
    pub(crate) out: OutputBuilder,
    once: FxHashSet<String>,
    depth: usize,
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

impl<'r> Preprocessor<'r> {
    pub(crate) fn new(macros: MacroTable, includes: &'r dyn IncludeResolver) -> Self {
        Preprocessor {
            macros,
            includes,
            files: Vec::new(),
            out: OutputBuilder::default(),
            once: FxHashSet::default(),
            depth: 0,
        }
    }

    pub(crate) fn add_file(&mut self, name: &str, text: Arc<str>) -> FileIndex {
        if let Some(i) = self.files.iter().position(|f| f.name == name) {
            return FileIndex::new(i as u32);
        }
        self.files.push(SourceFile::new(name, text));
        FileIndex::new((self.files.len() - 1) as u32)
    }

    fn file_name(&self, file: FileIndex) -> String {
        self.files
            .get(file.index())
            .map(|f| f.name.clone())
            .unwrap_or_default()
    }

    pub(crate) fn run_file(&mut self, file: FileIndex) -> Result<(), PreprocessError> {
        let Some(text) = self.files.get(file.index()).map(|f| Arc::clone(&f.text)) else {
            return Ok(());
        };
        let mut scanner = Scanner::new(&text);
        let mut conds: Vec<Conditional> = Vec::new();
        let mut at_line_start = true;

        while !scanner.is_eof() {
            if at_line_start {
                let saved = scanner.save();
                scanner.eat_while(is_horizontal_space);
                if scanner.current() == '#' {
                    let line = scanner.line() + 1;
                    scanner.advance(1);
                    self.directive(&mut scanner, file, line, &mut conds)?;
                    continue;
                }
                scanner.restore(saved);
                at_line_start = false;
            }

            let active = conds.iter().all(|c| c.active);
            let line = scanner.line() + 1;
            let start = scanner.pos();
            let tag = scan_token(&mut scanner);
            let slice = scanner.slice_from(start);

            if !active {
                match tag {
                    RawTag::Newline => {
                        self.out.newlines(1);
                        at_line_start = true;
                    }
                    RawTag::BlockComment | RawTag::UnterminatedBlockComment => {
                        self.out.newlines(count_newlines(slice));
                    }
                    _ => {}
                }
                continue;
            }

            match tag {
                RawTag::Newline => {
                    self.out.passthrough(slice, file, start);
                    at_line_start = true;
                }
                RawTag::LineComment => {}
                RawTag::BlockComment => {
                    self.out.synthetic(" ");
                    self.out.newlines(count_newlines(slice));
                }
                RawTag::UnterminatedBlockComment => {
                    return Err(PreprocessError::UnterminatedComment {
                        file: self.file_name(file),
                        line,
                    });
                }
                RawTag::Ident if self.macros.is_defined(slice) => {
                    self.invocation(&mut scanner, file, start, line)?;
                }
                _ => self.out.passthrough(slice, file, start),
            }
        }

        match conds.first() {
            Some(open) => Err(PreprocessError::UnterminatedConditional {
                file: self.file_name(file),
                line: open.line,
            }),
            None => Ok(()),
        }
    }

    /// Expand a macro use whose name has just been scanned.
    fn invocation(
        &mut self,
        scanner: &mut Scanner<'_>,
        file: FileIndex,
        start: u32,
        line: u32,
    ) -> Result<(), PreprocessError> {
        let name = scanner.slice_from(start);
        let Some(def) = self.macros.get(name).map(Arc::clone) else {
            self.out.passthrough(name, file, start);
            return Ok(());
        };

        let mut tokens = vec![PpToken::new(RawTag::Ident, name, false)];
        let mut newlines = 0;
        if def.is_function() {
            let before_args = scanner.save();
            let mut skipped_lines = 0;
            loop {
                let saved = scanner.save();
                let tag = scan_token(scanner);
                if tag.is_trivia() {
                    skipped_lines += count_newlines(scanner.slice(saved.pos(), scanner.pos()));
                    continue;
                }
                scanner.restore(saved);
                break;
            }
            if scanner.current() != '(' {
                scanner.restore(before_args);
                self.out.passthrough(name, file, start);
                return Ok(());
            }
            newlines += skipped_lines;
            newlines += self.collect_arguments(scanner, file, line, &def.name, &mut tokens)?;
        }

        let expanded = Expander::new(&self.macros)
            .expand(&tokens)
            .map_err(|e| self.expand_error(e, file, line))?;
        let invocation = Span::new(start, scanner.pos());
        self.out.expansion(&render(&expanded), file, invocation);
        self.out.newlines(newlines);
        Ok(())
    }

    /// Read a balanced `( ... )` argument list into `tokens`. Returns the
    /// number of newlines consumed.
    fn collect_arguments(
        &self,
        scanner: &mut Scanner<'_>,
        file: FileIndex,
        line: u32,
        name: &str,
        tokens: &mut Vec<PpToken>,
    ) -> Result<usize, PreprocessError> {
        let mut depth = 0usize;
        let mut newlines = 0;
        let mut space = false;
        loop {
            let start = scanner.pos();
            let tag = scan_token(scanner);
            let text = scanner.slice_from(start);
            match tag {
                RawTag::Eof => {
                    return Err(self.expand_error(
                        ExpandError::UnterminatedArguments {
                            name: name.to_string(),
                        },
                        file,
                        line,
                    ));
                }
                t if t.is_trivia() => {
                    newlines += count_newlines(text);
                    space = true;
                    continue;
                }
                RawTag::LParen => depth += 1,
                RawTag::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            tokens.push(PpToken::new(tag, text, space));
            space = false;
            if depth == 0 {
                return Ok(newlines);
            }
        }
    }

    fn expand_error(&self, err: ExpandError, file: FileIndex, line: u32) -> PreprocessError {
        let file = self.file_name(file);
        match err {
            ExpandError::ArgumentCount {
                name,
                expected,
                found,
            } => PreprocessError::ArgumentCount {
                file,
                line,
                name,
                expected,
                found,
            },
            ExpandError::UnterminatedArguments { name } => PreprocessError::Malformed {
                file,
                line,
                message: format!("unterminated argument list for macro `{name}`"),
            },
        }
    }

    fn condition_error(&self, err: ConditionError, file: FileIndex, line: u32) -> PreprocessError {
        match err {
            ConditionError::Expand(e) => self.expand_error(e, file, line),
            ConditionError::Invalid(message) => PreprocessError::InvalidCondition {
                file: self.file_name(file),
                line,
                message,
            },
        }
    }

    fn malformed(&self, file: FileIndex, line: u32, message: impl Into<String>) -> PreprocessError {
        PreprocessError::Malformed {
            file: self.file_name(file),
            line,
            message: message.into(),
        }
    }

    /// Handle one directive; the scanner sits just past `#`. The directive's
    /// lines become empty lines in the output.
    fn directive(
        &mut self,
        scanner: &mut Scanner<'_>,
        file: FileIndex,
        line: u32,
        conds: &mut Vec<Conditional>,
    ) -> Result<(), PreprocessError> {
        let (tokens, newlines) = read_directive_line(scanner);
        let active = conds.iter().all(|c| c.active);
        let keyword = match tokens.first() {
            Some(t) if t.tag == RawTag::Ident => t.text.as_str(),
            Some(t) if active => {
                return Err(self.malformed(file, line, format!("unknown directive `#{}`", t.text)));
            }
            _ => "",
        };
        let args = tokens.get(1..).unwrap_or_default();

        match keyword {
            "if" | "ifdef" | "ifndef" => {
                let value = if active {
                    match keyword {
                        "if" => condition::evaluate(args, &self.macros)
                            .map_err(|e| self.condition_error(e, file, line))?,
                        _ => {
                            let name = single_name(args)
                                .ok_or_else(|| self.malformed(file, line, format!("#{keyword} requires a macro name")))?;
                            self.macros.is_defined(name) == (keyword == "ifdef")
                        }
                    }
                } else {
                    false
                };
                conds.push(Conditional {
                    active: value,
                    taken: value || !active,
                    parent_active: active,
                    seen_else: false,
                    line,
                });
            }
            "elif" => {
                let Some(cond) = conds.last() else {
                    return Err(self.unmatched("elif", file, line));
                };
                if cond.seen_else {
                    return Err(self.malformed(file, line, "#elif after #else"));
                }
                let value = if cond.parent_active && !cond.taken {
                    condition::evaluate(args, &self.macros)
                        .map_err(|e| self.condition_error(e, file, line))?
                } else {
                    false
                };
                if let Some(cond) = conds.last_mut() {
                    cond.active = value;
                    cond.taken |= value;
                }
            }
            "else" => {
                let Some(cond) = conds.last_mut() else {
                    return Err(self.unmatched("else", file, line));
                };
                if cond.seen_else {
                    return Err(self.malformed(file, line, "duplicate #else"));
                }
                cond.seen_else = true;
                cond.active = cond.parent_active && !cond.taken;
                cond.taken = true;
            }
            "endif" => {
                if conds.pop().is_none() {
                    return Err(self.unmatched("endif", file, line));
                }
            }
            _ if !active => {}
            "define" => self.define(args, file, line)?,
            "undef" => {
                let name = single_name(args)
                    .ok_or_else(|| self.malformed(file, line, "#undef requires a macro name"))?;
                self.macros.undef(name);
            }
            "include" => self.include(args, file, line)?,
            "error" => {
                return Err(PreprocessError::ErrorDirective {
                    file: self.file_name(file),
                    line,
                    message: render(args),
                });
            }
            "pragma" => {
                if args.first().is_some_and(|t| t.is_ident("once")) {
                    let name = self.file_name(file);
                    self.once.insert(name);
                }
            }
            "" => {}
            other => {
                return Err(self.malformed(file, line, format!("unknown directive `#{other}`")));
            }
        }

        self.out.newlines(newlines);
        Ok(())
    }

    fn unmatched(&self, directive: &'static str, file: FileIndex, line: u32) -> PreprocessError {
        PreprocessError::Unmatched {
            file: self.file_name(file),
            line,
            directive,
        }
    }

    fn define(&mut self, args: &[PpToken], file: FileIndex, line: u32) -> Result<(), PreprocessError> {
        let Some(name) = args.first().filter(|t| t.tag == RawTag::Ident) else {
            return Err(self.malformed(file, line, "#define requires a macro name"));
        };
        let rest = &args[1..];

        // `NAME(` with no space opens a parameter list.
        let (params, body) = match rest.first() {
            Some(open) if open.tag == RawTag::LParen && !open.space_before => {
                let mut params = Vec::new();
                let mut i = 1;
                let mut expect_name = true;
                loop {
                    let Some(token) = rest.get(i) else {
                        return Err(self.malformed(file, line, "unterminated macro parameter list"));
                    };
                    i += 1;
                    match token.tag {
                        RawTag::RParen if expect_name && params.is_empty() => break,
                        RawTag::RParen if !expect_name => break,
                        RawTag::Ident if expect_name => {
                            if params.contains(&token.text) {
                                return Err(self.malformed(
                                    file,
                                    line,
                                    format!("duplicate macro parameter `{}`", token.text),
                                ));
                            }
                            params.push(token.text.clone());
                            expect_name = false;
                        }
                        RawTag::Comma if !expect_name => expect_name = true,
                        _ => {
                            return Err(self.malformed(
                                file,
                                line,
                                format!("unexpected `{}` in macro parameter list", token.text),
                            ));
                        }
                    }
                }
                (Some(params), &rest[i..])
            }
            _ => (None, rest),
        };

        let mut body = body.to_vec();
        if let Some(first) = body.first_mut() {
            first.space_before = false;
        }
        self.macros.insert(MacroDef {
            name: name.text.clone(),
            params,
            body,
        });
        Ok(())
    }

    fn include(&mut self, args: &[PpToken], file: FileIndex, line: u32) -> Result<(), PreprocessError> {
        let path = match args {
            [token] if token.tag == RawTag::Str => token.text.trim_matches('"').to_string(),
            [open, inner @ .., close] if open.tag == RawTag::Lt && close.tag == RawTag::Gt => {
                inner.iter().map(|t| t.text.as_str()).collect()
            }
            _ => return Err(self.malformed(file, line, "#include expects \"file\" or <file>")),
        };

        let from = self.file_name(file);
        let Some(included) = self.includes.resolve(&path, &from) else {
            return Err(PreprocessError::MissingInclude {
                file: from,
                line,
                path,
            });
        };
        if self.once.contains(&included.name) {
            return Ok(());
        }
        if self.depth >= MAX_INCLUDE_DEPTH {
            return Err(PreprocessError::IncludeDepth {
                file: from,
                line,
                limit: MAX_INCLUDE_DEPTH,
            });
        }

        tracing::trace!(path = %included.name, depth = self.depth + 1, "include");
        let index = self.add_file(&included.name, included.text);
        self.depth += 1;
        let result = self.run_file(index);
        self.depth -= 1;
        result
    }
}

fn single_name(args: &[PpToken]) -> Option<&str> {
    match args {
        [name] if name.tag == RawTag::Ident => Some(&name.text),
        _ => None,
    }
}

/// Read the rest of a directive line, joining `\` continuations and
/// dropping comments. Returns the tokens and the number of line breaks
/// consumed, including the terminating one.
fn read_directive_line(scanner: &mut Scanner<'_>) -> (Vec<PpToken>, usize) {
    let mut tokens = Vec::new();
    let mut newlines = 0;
    let mut space = false;
    loop {
        let start = scanner.pos();
        let tag = scan_token(scanner);
        let text = scanner.slice_from(start);
        match tag {
            RawTag::Eof => break,
            RawTag::Newline => {
                newlines += 1;
                break;
            }
            RawTag::Backslash => {
                let saved = scanner.save();
                scanner.eat_while(is_horizontal_space);
                if scan_token(scanner) == RawTag::Newline {
                    newlines += 1;
                    space = true;
                    continue;
                }
                // A stray backslash is ordinary directive text.
                scanner.restore(saved);
                tokens.push(PpToken::new(tag, text, space));
                space = false;
            }
            RawTag::BlockComment | RawTag::UnterminatedBlockComment => {
                newlines += count_newlines(text);
                space = true;
            }
            t if t.is_trivia() => space = true,
            _ => {
                tokens.push(PpToken::new(tag, text, space));
                space = false;
            }
        }
    }
    (tokens, newlines)
}
