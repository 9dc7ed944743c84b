//! Macro definitions and expansion.
//!
//! Expansion works on [`PpToken`] sequences. Function-like arguments are
//! fully expanded before substitution unless they are operands of `#` or
//! `##`; the substituted body is rescanned with the macro's name hidden so
//! self-referencing macros terminate.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use sdsl_lexer_core::{is_ident_continue, is_ident_start, scan_token, RawTag, Scanner};

/// A preprocessing token: raw category, its text, and whether whitespace
/// preceded it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PpToken {
    pub tag: RawTag,
    pub text: String,
    pub space_before: bool,
}

impl PpToken {
    pub fn new(tag: RawTag, text: impl Into<String>, space_before: bool) -> Self {
        PpToken {
            tag,
            text: text.into(),
            space_before,
        }
    }

    pub(crate) fn is_ident(&self, text: &str) -> bool {
        self.tag == RawTag::Ident && self.text == text
    }
}

/// Split a fragment into tokens, dropping trivia.
pub fn tokenize(text: &str) -> Vec<PpToken> {
    let mut scanner = Scanner::new(text);
    let mut tokens = Vec::new();
    let mut space = false;
    loop {
        let start = scanner.pos();
        let tag = scan_token(&mut scanner);
        match tag {
            RawTag::Eof => break,
            t if t.is_trivia() => space = true,
            _ => {
                tokens.push(PpToken::new(tag, scanner.slice_from(start), space));
                space = false;
            }
        }
    }
    tokens
}

/// Render tokens as text, inserting a space wherever one was present or two
/// word-like tokens would otherwise fuse.
pub fn render(tokens: &[PpToken]) -> String {
    let mut out = String::new();
    let mut prev: Option<&PpToken> = None;
    for token in tokens {
        if let Some(p) = prev {
            let fuse = ends_word(&p.text) && starts_word(&token.text);
            if token.space_before || fuse {
                out.push(' ');
            }
        }
        out.push_str(&token.text);
        prev = Some(token);
    }
    out
}

fn ends_word(text: &str) -> bool {
    text.chars().last().is_some_and(is_ident_continue)
}

fn starts_word(text: &str) -> bool {
    text.chars().next().is_some_and(is_ident_continue)
}

/// One `#define`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MacroDef {
    pub name: String,
    /// `None` for object-like macros.
    pub params: Option<Vec<String>>,
    pub body: Vec<PpToken>,
}

impl MacroDef {
    pub fn object(name: impl Into<String>, body: &str) -> Self {
        MacroDef {
            name: name.into(),
            params: None,
            body: strip_leading_space(tokenize(body)),
        }
    }

    pub fn function(name: impl Into<String>, params: Vec<String>, body: &str) -> Self {
        MacroDef {
            name: name.into(),
            params: Some(params),
            body: strip_leading_space(tokenize(body)),
        }
    }

    pub fn is_function(&self) -> bool {
        self.params.is_some()
    }

    fn param_index(&self, name: &str) -> Option<usize> {
        self.params.as_ref()?.iter().position(|p| p == name)
    }
}

fn strip_leading_space(mut tokens: Vec<PpToken>) -> Vec<PpToken> {
    if let Some(first) = tokens.first_mut() {
        first.space_before = false;
    }
    tokens
}

/// The set of macros visible at a point in preprocessing.
#[derive(Clone, Debug, Default)]
pub struct MacroTable {
    defs: FxHashMap<String, Arc<MacroDef>>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table of object-like macros from `(name, body)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut table = MacroTable::new();
        for (name, body) in pairs {
            table.define(name, body);
        }
        table
    }

    /// Define an object-like macro, replacing any previous definition.
    pub fn define(&mut self, name: &str, body: &str) {
        self.insert(MacroDef::object(name, body));
    }

    pub fn insert(&mut self, def: MacroDef) {
        self.defs.insert(def.name.clone(), Arc::new(def));
    }

    pub fn undef(&mut self, name: &str) -> bool {
        self.defs.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<MacroDef>> {
        self.defs.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// Why an expansion failed. The caller attaches file and line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ExpandError {
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },
    UnterminatedArguments {
        name: String,
    },
}

pub(crate) struct Expander<'m> {
    macros: &'m MacroTable,
    hidden: Vec<String>,
}

impl<'m> Expander<'m> {
    pub(crate) fn new(macros: &'m MacroTable) -> Self {
        Expander {
            macros,
            hidden: Vec::new(),
        }
    }

    /// Expand every macro invocation in `tokens`.
    pub(crate) fn expand(&mut self, tokens: &[PpToken]) -> Result<Vec<PpToken>, ExpandError> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            let def = match (token.tag, self.macros.get(&token.text)) {
                (RawTag::Ident, Some(def)) if !self.hidden.contains(&token.text) => {
                    Arc::clone(def)
                }
                _ => {
                    out.push(token.clone());
                    i += 1;
                    continue;
                }
            };

            let substituted = if let Some(params) = &def.params {
                if tokens.get(i + 1).map(|t| t.tag) != Some(RawTag::LParen) {
                    out.push(token.clone());
                    i += 1;
                    continue;
                }
                let (args, next) = split_arguments(tokens, i + 1).ok_or_else(|| {
                    ExpandError::UnterminatedArguments {
                        name: def.name.clone(),
                    }
                })?;
                let args = normalize_arguments(args, params.len());
                if args.len() != params.len() {
                    return Err(ExpandError::ArgumentCount {
                        name: def.name.clone(),
                        expected: params.len(),
                        found: args.len(),
                    });
                }
                i = next;
                let expanded = args
                    .iter()
                    .map(|arg| self.expand(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                substitute(&def, &args, &expanded)
            } else {
                i += 1;
                paste_all(def.body.clone())
            };

            self.hidden.push(def.name.clone());
            let rescanned = self.expand(&substituted);
            self.hidden.pop();
            let mut rescanned = rescanned?;
            if let Some(first) = rescanned.first_mut() {
                first.space_before = token.space_before;
            }
            out.extend(rescanned);
        }
        Ok(out)
    }
}

/// Split `( a, (b, c), d )` starting at the `(` at `open`. Returns the raw
/// arguments and the index after the closing paren.
fn split_arguments(tokens: &[PpToken], open: usize) -> Option<(Vec<Vec<PpToken>>, usize)> {
    let mut args = vec![Vec::new()];
    let mut depth = 0usize;
    for (offset, token) in tokens[open..].iter().enumerate() {
        match token.tag {
            RawTag::LParen => {
                depth += 1;
                if depth == 1 {
                    continue;
                }
            }
            RawTag::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some((args, open + offset + 1));
                }
            }
            RawTag::Comma if depth == 1 => {
                args.push(Vec::new());
                continue;
            }
            _ => {}
        }
        if let Some(current) = args.last_mut() {
            current.push(token.clone());
        }
    }
    None
}

/// `F()` passes one empty argument; a zero-parameter macro takes none.
fn normalize_arguments(args: Vec<Vec<PpToken>>, arity: usize) -> Vec<Vec<PpToken>> {
    if arity == 0 && args.len() == 1 && args[0].is_empty() {
        Vec::new()
    } else {
        args
    }
}

fn substitute(def: &MacroDef, raw: &[Vec<PpToken>], expanded: &[Vec<PpToken>]) -> Vec<PpToken> {
    let body = &def.body;
    let mut out: Vec<PpToken> = Vec::with_capacity(body.len());
    let mut k = 0;
    while k < body.len() {
        let token = &body[k];

        if token.tag == RawTag::Hash {
            if let Some(index) = body.get(k + 1).and_then(|next| def.param_index(&next.text)) {
                out.push(stringize(&raw[index], token.space_before));
                k += 2;
                continue;
            }
        }

        if token.tag == RawTag::Ident {
            if let Some(index) = def.param_index(&token.text) {
                let pasted = out.last().is_some_and(|t| t.tag == RawTag::HashHash)
                    || body.get(k + 1).is_some_and(|t| t.tag == RawTag::HashHash);
                let replacement = if pasted { &raw[index] } else { &expanded[index] };
                let mut replacement = replacement.clone();
                if let Some(first) = replacement.first_mut() {
                    first.space_before = token.space_before;
                }
                out.extend(replacement);
                k += 1;
                continue;
            }
        }

        out.push(token.clone());
        k += 1;
    }
    paste_all(out)
}

fn stringize(arg: &[PpToken], space_before: bool) -> PpToken {
    let text = render(arg);
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    PpToken::new(RawTag::Str, quoted, space_before)
}

/// Resolve every `lhs ## rhs` by concatenating the neighbouring tokens.
fn paste_all(tokens: Vec<PpToken>) -> Vec<PpToken> {
    if !tokens.iter().any(|t| t.tag == RawTag::HashHash) {
        return tokens;
    }
    let mut out: Vec<PpToken> = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        if token.tag != RawTag::HashHash {
            out.push(token);
            continue;
        }
        let rhs = iter.next();
        match (out.pop(), rhs) {
            (Some(lhs), Some(rhs)) => out.push(paste(&lhs, &rhs)),
            (Some(lhs), None) => out.push(lhs),
            (None, Some(rhs)) => out.push(rhs),
            (None, None) => {}
        }
    }
    out
}

fn paste(lhs: &PpToken, rhs: &PpToken) -> PpToken {
    let text = format!("{}{}", lhs.text, rhs.text);
    let tag = {
        let mut scanner = Scanner::new(&text);
        let tag = scan_token(&mut scanner);
        if scanner.is_eof() {
            tag
        } else if text.chars().next().is_some_and(is_ident_start) {
            RawTag::Ident
        } else {
            RawTag::Unknown
        }
    };
    PpToken::new(tag, text, lhs.space_before)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expand(table: &MacroTable, text: &str) -> String {
        let tokens = tokenize(text);
        let out = Expander::new(table).expand(&tokens);
        match out {
            Ok(tokens) => render(&tokens),
            Err(e) => panic!("expansion failed: {e:?}"),
        }
    }

    #[test]
    fn test_object_macro() {
        let table = MacroTable::from_pairs([("N", "3")]);
        assert_eq!(expand(&table, "float a[N];"), "float a[3];");
    }

    #[test]
    fn test_nested_object_macros() {
        let table = MacroTable::from_pairs([("A", "B + 1"), ("B", "2")]);
        assert_eq!(expand(&table, "A"), "2 + 1");
    }

    #[test]
    fn test_self_reference_terminates() {
        let table = MacroTable::from_pairs([("X", "X + 1")]);
        assert_eq!(expand(&table, "X"), "X + 1");
    }

    #[test]
    fn test_function_macro() {
        let mut table = MacroTable::new();
        table.insert(MacroDef::function(
            "SQ",
            vec!["x".to_string()],
            "((x) * (x))",
        ));
        assert_eq!(expand(&table, "SQ(a + 1)"), "((a + 1) * (a + 1))");
    }

    #[test]
    fn test_function_macro_without_parens_is_left_alone() {
        let mut table = MacroTable::new();
        table.insert(MacroDef::function("F", vec!["x".to_string()], "x"));
        assert_eq!(expand(&table, "F + 1"), "F + 1");
    }

    #[test]
    fn test_nested_parens_in_arguments() {
        let mut table = MacroTable::new();
        table.insert(MacroDef::function(
            "FIRST",
            vec!["a".to_string(), "b".to_string()],
            "a",
        ));
        assert_eq!(expand(&table, "FIRST(max(1, 2), 3)"), "max(1, 2)");
    }

    #[test]
    fn test_stringize_and_paste() {
        let mut table = MacroTable::new();
        table.insert(MacroDef::function("STR", vec!["x".to_string()], "#x"));
        table.insert(MacroDef::function(
            "CAT",
            vec!["a".to_string(), "b".to_string()],
            "a##b",
        ));
        assert_eq!(expand(&table, "STR(hello world)"), "\"hello world\"");
        assert_eq!(expand(&table, "CAT(Light, Count)"), "LightCount");
    }

    #[test]
    fn test_argument_count_mismatch() {
        let mut table = MacroTable::new();
        table.insert(MacroDef::function("F", vec!["x".to_string()], "x"));
        let tokens = tokenize("F(1, 2)");
        let err = Expander::new(&table).expand(&tokens);
        assert_eq!(
            err,
            Err(ExpandError::ArgumentCount {
                name: "F".to_string(),
                expected: 1,
                found: 2,
            })
        );
    }

    #[test]
    fn test_zero_parameter_function_macro() {
        let mut table = MacroTable::new();
        table.insert(MacroDef::function("ONE", Vec::new(), "1"));
        assert_eq!(expand(&table, "ONE()"), "1");
    }

    #[test]
    fn test_render_keeps_words_apart() {
        let tokens = vec![
            PpToken::new(RawTag::Ident, "float", false),
            PpToken::new(RawTag::Ident, "x", false),
            PpToken::new(RawTag::Semi, ";", false),
        ];
        assert_eq!(render(&tokens), "float x;");
    }
}
