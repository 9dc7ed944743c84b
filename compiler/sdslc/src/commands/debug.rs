//! Debug commands for inspecting single phases: `preprocess`, `lex`,
//! `parse` and `disasm`.

use std::path::PathBuf;

use sdsl_ir::{Decl, SourceId, StringInterner};
use sdsl_preprocess::{preprocess, DirectoryIncludes, Preprocessed};
use sdsl_spirv::{bytes_to_words, disassemble};

use super::{read_file, report, CliError, CompileOptions};

fn preprocessed(options: &CompileOptions) -> Result<Preprocessed, CliError> {
    let text = read_file(&options.target)?;
    let includes = DirectoryIncludes::new(options.include_dirs.clone());
    preprocess(&options.target, &text, &options.macro_table(), &includes).map_err(|err| {
        report(&[err.to_diagnostic()]);
        CliError::Failed { errors: 1 }
    })
}

/// Print a file after macro expansion and includes.
pub fn preprocess_file(options: &CompileOptions) -> Result<(), CliError> {
    print!("{}", preprocessed(options)?.text);
    Ok(())
}

/// Print the token stream of a preprocessed file.
pub fn lex_file(options: &CompileOptions) -> Result<(), CliError> {
    let processed = preprocessed(options)?;
    let interner = StringInterner::new();
    let lexed = sdsl_lexer::lex(&processed.text, SourceId::new(0), &interner);

    println!("Tokens for '{}' ({} tokens):", options.target, lexed.tokens.len());
    for token in lexed.tokens.iter() {
        println!("  {:?} @ {}", token.kind, token.span);
    }
    if lexed.errors.is_empty() {
        return Ok(());
    }
    let mut errors = lexed.errors;
    for error in &mut errors {
        error.location = error
            .primary_span()
            .and_then(|span| processed.source_map.locate(span.start));
    }
    report(&errors);
    Err(CliError::Failed {
        errors: errors.len(),
    })
}

/// Print the declarations of a preprocessed file.
pub fn parse_file(options: &CompileOptions) -> Result<(), CliError> {
    let processed = preprocessed(options)?;
    let interner = StringInterner::new();
    let lexed = sdsl_lexer::lex(&processed.text, SourceId::new(0), &interner);
    let parsed = sdsl_parse::parse(&lexed.tokens, &interner);

    println!("Parse result for '{}':", options.target);
    println!("  Declarations: {}", parsed.module.decls.len());
    println!("  Expressions: {}", parsed.arena.expr_count());
    println!("  Errors: {}", lexed.errors.len() + parsed.errors.len());
    for decl in &parsed.module.decls {
        let (kind, bases) = match decl {
            Decl::Shader(shader) => ("shader", &shader.bases),
            Decl::Effect(effect) => ("effect", &effect.bases),
        };
        let bases: Vec<&str> = bases.iter().map(|b| interner.lookup(b.name)).collect();
        if bases.is_empty() {
            println!("  {kind} {}", interner.lookup(decl.name()));
        } else {
            println!("  {kind} {} : {}", interner.lookup(decl.name()), bases.join(", "));
        }
    }

    let mut errors = lexed.errors;
    errors.extend(parsed.errors.iter().map(|e| e.to_diagnostic()));
    if errors.is_empty() {
        return Ok(());
    }
    for error in &mut errors {
        error.location = error
            .primary_span()
            .and_then(|span| processed.source_map.locate(span.start));
    }
    report(&errors);
    Err(CliError::Failed {
        errors: errors.len(),
    })
}

/// Disassemble a SPIR-V binary.
pub fn disasm_file(path: &str) -> Result<(), CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::Read {
        path: PathBuf::from(path),
        source,
    })?;
    let not_spirv = |reason: String| CliError::NotSpirv {
        path: PathBuf::from(path),
        reason,
    };
    let words = bytes_to_words(&bytes)
        .ok_or_else(|| not_spirv("length is not a multiple of four".to_string()))?;
    let text = disassemble(&words).map_err(|err| not_spirv(err.to_string()))?;
    print!("{text}");
    Ok(())
}
