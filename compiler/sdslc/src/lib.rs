//! The SDSL effect compiler.
//!
//! [`EffectCompiler`] turns a [`CompileRequest`] (an effect name, its
//! parameters and extra macros) into [`EffectBytecode`]: a SPIR-V module
//! with reflection data. Sources are read once through a [`SourceProvider`]
//! and shared by every request; finished modules are kept in a
//! [`BytecodeCache`] keyed by the request's [`EffectId`] so concurrent
//! requests for the same permutation compile it only once, and optionally
//! persisted to disk between runs.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sdslc::{CancellationToken, CompileRequest, CompilerConfig, EffectCompiler, MemorySources};
//!
//! let sources = MemorySources::new().with_shader(
//!     "Flat",
//!     "shader Flat { float4 PSMain() : SV_Target { return float4(1, 0, 0, 1); } }",
//! );
//! let compiler = EffectCompiler::new(CompilerConfig::new(), Arc::new(sources));
//! let result = compiler.compile(&CompileRequest::new("Flat"), &CancellationToken::new());
//! assert!(result.is_success());
//! ```

mod cache;
mod cancel;
pub mod commands;
mod compiler;
mod config;
mod context;
mod disk;
mod logging;
mod report;
mod request;
mod sources;

pub use cache::{BytecodeCache, CompilationOrigin, Outcome};
pub use cancel::CancellationToken;
pub use compiler::{CompilerResult, EffectCompiler};
pub use config::{CompilerConfig, DEFAULT_ERROR_LIMIT};
pub use disk::{DiskCache, DiskCacheError};
pub use logging::init_tracing;
pub use report::Reporter;
pub use request::{CompileRequest, EffectId, COMPILER_VERSION};
pub use sources::{FileSystemSources, LoadedSource, MemorySources, SourceError, SourceProvider};

pub use sdsl_mixer::{ParameterBag, ParameterValue};
pub use sdsl_spirv::{EffectBytecode, EffectReflection};
