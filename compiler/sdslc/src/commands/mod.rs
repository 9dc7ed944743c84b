//! Command handlers for the `sdslc` CLI.
//!
//! Each submodule implements one command. Argument parsing and the shared
//! error type live here.

use std::collections::BTreeMap;
use std::path::PathBuf;

use sdsl_mixer::{ParameterBag, ParameterValue};
use sdsl_preprocess::MacroTable;

use crate::config::CompilerConfig;
use crate::request::CompileRequest;

mod compile;
mod debug;

pub use compile::{check_effect, compile_effect};
pub use debug::{disasm_file, lex_file, parse_file, preprocess_file};

/// Why a command failed. Compilation errors are reported before this is
/// returned, so `Failed` only carries the count.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("cannot read `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write `{}`: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("`{}` is not a SPIR-V module: {reason}", path.display())]
    NotSpirv { path: PathBuf, reason: String },
    #[error("could not compile due to {errors} previous error{}", if *errors == 1 { "" } else { "s" })]
    Failed { errors: usize },
}

/// Options shared by every command that compiles or preprocesses.
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    /// The effect name, or a file path for single-file commands.
    pub target: String,
    pub include_dirs: Vec<PathBuf>,
    pub macros: BTreeMap<String, String>,
    pub parameters: ParameterBag,
    pub cache_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub no_debug_names: bool,
    pub disasm: bool,
    pub reflect: bool,
}

impl CompileOptions {
    pub fn config(&self) -> CompilerConfig {
        let mut config = CompilerConfig::new().with_debug_names(!self.no_debug_names);
        config.include_dirs.clone_from(&self.include_dirs);
        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir);
        }
        config
    }

    /// Command-line macros belong to the request so they take part in its
    /// identity.
    pub fn request(&self) -> CompileRequest {
        let mut request = CompileRequest::new(&self.target);
        request.parameters = self.parameters.clone();
        request.macros = self.macros.clone();
        request
    }

    pub fn macro_table(&self) -> MacroTable {
        MacroTable::from_pairs(self.macros.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// Parse `<target> [options]`.
///
/// Options: `-I <dir>`, `-D NAME[=VALUE]`, `-P name=value`,
/// `--cache-dir <dir>`, `-o <path>`, `--no-debug-names`, `--disasm`,
/// `--reflect`. Flags taking a value also accept it joined (`-Iinclude`).
pub fn parse_compile_options(args: &[String]) -> Result<CompileOptions, CliError> {
    let mut options = CompileOptions::default();
    let mut target = None;
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        let (flag, joined) = split_flag(arg);
        let takes_value = matches!(flag, "-I" | "-D" | "-P" | "-o" | "--cache-dir");
        let value = if takes_value {
            match joined {
                Some(value) => Some(value.to_string()),
                None => {
                    i += 1;
                    let Some(value) = args.get(i) else {
                        return Err(CliError::Usage(format!("`{flag}` expects a value")));
                    };
                    Some(value.clone())
                }
            }
        } else {
            None
        };

        match (flag, value) {
            ("-I", Some(dir)) => options.include_dirs.push(PathBuf::from(dir)),
            ("-D", Some(definition)) => {
                let (name, value) = definition.split_once('=').unwrap_or((definition.as_str(), "1"));
                options.macros.insert(name.to_string(), value.to_string());
            }
            ("-P", Some(assignment)) => {
                let Some((name, value)) = assignment.split_once('=') else {
                    return Err(CliError::Usage(format!(
                        "parameter `{assignment}` must be written `name=value`"
                    )));
                };
                options
                    .parameters
                    .set(name, ParameterValue::parse_literal(value));
            }
            ("-o", Some(path)) => options.output = Some(PathBuf::from(path)),
            ("--cache-dir", Some(dir)) => options.cache_dir = Some(PathBuf::from(dir)),
            ("--no-debug-names", None) => options.no_debug_names = true,
            ("--disasm", None) => options.disasm = true,
            ("--reflect", None) => options.reflect = true,
            (other, _) if other.starts_with('-') => {
                return Err(CliError::Usage(format!("unknown option `{other}`")));
            }
            (positional, _) => {
                if target.replace(positional.to_string()).is_some() {
                    return Err(CliError::Usage(format!("unexpected argument `{positional}`")));
                }
            }
        }
        i += 1;
    }
    options.target = target.ok_or_else(|| CliError::Usage("missing effect or file".to_string()))?;
    Ok(options)
}

/// `-Ifoo` is `-I` with value `foo`; long flags never join.
fn split_flag(arg: &str) -> (&str, Option<&str>) {
    for short in ["-I", "-D", "-P", "-o"] {
        if let Some(rest) = arg.strip_prefix(short) {
            if !rest.is_empty() {
                return (short, Some(rest));
            }
        }
    }
    (arg, None)
}

fn read_file(path: &str) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: PathBuf::from(path),
        source,
    })
}

/// Print diagnostics to stderr, with source excerpts where the file can be
/// read again.
fn report(diagnostics: &[sdsl_diagnostic::Diagnostic]) {
    let colors = std::io::IsTerminal::is_terminal(&std::io::stderr());
    let reporter = crate::report::Reporter::new(|file: &str| std::fs::read_to_string(file).ok(), colors);
    let mut stderr = std::io::stderr().lock();
    if let Err(err) = reporter.render_all(diagnostics, &mut stderr) {
        tracing::warn!(%err, "cannot write diagnostics");
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn args(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_parse_compile_options() {
        let options = parse_compile_options(&args(
            "-I shaders -Iinclude Lighting -D FAST -DMAX=4 -P LightCount=3 -P Mode=hq -o out.spv --disasm",
        ))
        .unwrap();
        assert_eq!(options.target, "Lighting");
        assert_eq!(
            options.include_dirs,
            vec![PathBuf::from("shaders"), PathBuf::from("include")]
        );
        assert_eq!(
            options.macros.iter().collect::<Vec<_>>(),
            vec![
                (&"FAST".to_string(), &"1".to_string()),
                (&"MAX".to_string(), &"4".to_string())
            ]
        );
        assert_eq!(options.parameters.get("LightCount"), Some(&ParameterValue::Int(3)));
        assert_eq!(
            options.parameters.get("Mode"),
            Some(&ParameterValue::Str("hq".to_string()))
        );
        assert_eq!(options.output, Some(PathBuf::from("out.spv")));
        assert!(options.disasm);
        assert!(!options.reflect);
    }

    #[test]
    fn test_request_carries_macros_and_parameters() {
        let options = parse_compile_options(&args("E -D A=1 -P X=true")).unwrap();
        let same = CompileRequest::new("E")
            .with_macro("A", "1")
            .with_parameter("X", true);
        assert_eq!(options.request().id(), same.id());
    }

    #[test]
    fn test_usage_errors() {
        let missing = parse_compile_options(&args("-I")).unwrap_err();
        assert_eq!(missing.to_string(), "`-I` expects a value");
        let unknown = parse_compile_options(&args("E --fast")).unwrap_err();
        assert_eq!(unknown.to_string(), "unknown option `--fast`");
        let extra = parse_compile_options(&args("E F")).unwrap_err();
        assert_eq!(extra.to_string(), "unexpected argument `F`");
        assert!(matches!(
            parse_compile_options(&args("-P X")),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(parse_compile_options(&[]), Err(CliError::Usage(_))));
    }
}
