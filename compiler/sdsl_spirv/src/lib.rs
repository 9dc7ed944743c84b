//! SPIR-V emission for composed SDSL shaders.
//!
//! [`emit`] lowers a [`ComposedProgram`] to a SPIR-V 1.0 module in one walk:
//! fields become global variables or constant-buffer members, each
//! reachable method becomes a function, and each entry point gets a `main`
//! wrapper that moves stage inputs and outputs through the stream
//! variables. A program without entry points is emitted as a library with
//! every method exported.
//!
//! Before serialization every module goes through constant folding and
//! variable hoisting. The result is an [`EffectBytecode`]: the word stream,
//! its [`EffectReflection`] and the hashes of the sources it came from.

mod builder;
mod bytecode;
mod disasm;
mod instruction;
mod lower;
mod module;
pub mod op;
mod passes;
mod reflect;


pub use bytecode::EffectBytecode;
pub use disasm::{disassemble, DisasmError};
pub use instruction::{Id, Instruction, Operand};
pub use module::{bytes_to_words, words_to_bytes};
pub use reflect::{
    BindingClass, ConstantBufferMember, ConstantBufferReflection, EffectReflection,
    EntryPointReflection, InputAttribute, ResourceBinding, ShaderStage,
};

use sdsl_diagnostic::{Diagnostic, ErrorCode};
use sdsl_ir::StringInterner;
use sdsl_mixer::ComposedProgram;

/// Emission settings.
#[derive(Clone, Debug)]
pub struct EmitOptions {
    /// Emit `OpName`/`OpMemberName` for variables, functions and members.
    pub debug_names: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions { debug_names: true }
    }
}

/// Emit `program` as SPIR-V.
///
/// `should_stop` is polled between functions; when it returns true the
/// partial module is dropped and a single E9001 diagnostic is returned.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(functions = program.reachable.len(), entries = program.entry_points.len())
)]
pub fn emit(
    program: &ComposedProgram,
    options: &EmitOptions,
    interner: &StringInterner,
    should_stop: &dyn Fn() -> bool,
) -> Result<EffectBytecode, Vec<Diagnostic>> {
    let emitter = lower::Emitter::new(program, options, interner);
    let Some(result) = emitter.run(should_stop) else {
        tracing::debug!("emission cancelled");
        return Err(vec![
            Diagnostic::error(ErrorCode::E9001).with_message("compilation was cancelled")
        ]);
    };
    let (module, reflection) = result?;
    let words = module.assemble();
    tracing::debug!(words = words.len(), "emitted module");
    Ok(EffectBytecode {
        words,
        reflection,
        program_hash: program.program_hash,
        used_sources: program
            .sources()
            .map(|(name, hash)| (interner.lookup(name).to_string(), hash))
            .collect(),
    })
}
