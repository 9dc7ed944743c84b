//! The `compile` and `check` commands.

use sdsl_spirv::disassemble;

use super::{report, CliError, CompileOptions};
use crate::cancel::CancellationToken;
use crate::compiler::{CompilerResult, EffectCompiler};

fn run(options: &CompileOptions) -> Result<CompilerResult, CliError> {
    let compiler = EffectCompiler::from_file_system(options.config());
    let result = compiler.compile(&options.request(), &CancellationToken::new());
    if result.is_success() {
        return Ok(result);
    }
    report(&result.diagnostics);
    let errors = result.diagnostics.iter().filter(|d| d.is_error()).count();
    Err(CliError::Failed { errors })
}

/// Compile an effect permutation, writing the module to `-o` and printing
/// its disassembly or reflection on request.
pub fn compile_effect(options: &CompileOptions) -> Result<(), CliError> {
    let result = run(options)?;
    let Some(bytecode) = result.bytecode else {
        return Err(CliError::Failed { errors: 0 });
    };
    if let Some(path) = &options.output {
        std::fs::write(path, bytecode.to_bytes()).map_err(|source| CliError::Write {
            path: path.clone(),
            source,
        })?;
    }
    if options.reflect {
        print!("{}", bytecode.reflection);
    }
    if options.disasm {
        match disassemble(&bytecode.words) {
            Ok(text) => print!("{text}"),
            Err(err) => tracing::warn!(%err, "cannot disassemble the emitted module"),
        }
    }
    if options.output.is_none() && !options.reflect && !options.disasm {
        println!(
            "{}: {} words, {} entry point(s)",
            options.target,
            bytecode.words.len(),
            bytecode.reflection.entry_points.len()
        );
    }
    Ok(())
}

/// Compile without producing output.
pub fn check_effect(options: &CompileOptions) -> Result<(), CliError> {
    run(options).map(|_| ())
}
