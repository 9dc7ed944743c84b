//! SDSL compiler CLI.

use sdslc::commands::{
    check_effect, compile_effect, disasm_file, lex_file, parse_compile_options, parse_file,
    preprocess_file, CliError,
};

fn main() {
    sdslc::init_tracing();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = args[1].as_str();
    let rest = &args[2..];
    let result = match command {
        "compile" => parse_compile_options(rest).and_then(|options| compile_effect(&options)),
        "check" => parse_compile_options(rest).and_then(|options| check_effect(&options)),
        "preprocess" => parse_compile_options(rest).and_then(|options| preprocess_file(&options)),
        "lex" => parse_compile_options(rest).and_then(|options| lex_file(&options)),
        "parse" => parse_compile_options(rest).and_then(|options| parse_file(&options)),
        "disasm" => match rest {
            [path] => disasm_file(path),
            _ => Err(CliError::Usage("Usage: sdslc disasm <module.spv>".to_string())),
        },
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "version" | "--version" | "-V" => {
            println!("sdslc {}", sdslc::COMPILER_VERSION);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        if matches!(err, CliError::Usage(_)) {
            eprintln!();
            print_usage();
        }
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("SDSL Shader Compiler");
    println!();
    println!("Usage: sdslc <command> [options]");
    println!();
    println!("Commands:");
    println!("  compile <Effect>    Compile an effect permutation to SPIR-V");
    println!("  check <Effect>      Compile and report errors only");
    println!("  preprocess <file>   Print a file after macro expansion");
    println!("  lex <file>          Print the token stream");
    println!("  parse <file>        Print the declarations of a file");
    println!("  disasm <file.spv>   Disassemble a SPIR-V module");
    println!("  help                Show this help message");
    println!("  version             Show version information");
    println!();
    println!("Options:");
    println!("  -I <dir>            Search <dir> for shaders and includes");
    println!("  -D NAME[=VALUE]     Define a macro (default value 1)");
    println!("  -P name=value       Set an effect parameter");
    println!("  --cache-dir <dir>   Keep compiled modules in <dir> between runs");
    println!("  -o <path>           Write the module to <path>");
    println!("  --no-debug-names    Omit OpName debug instructions");
    println!("  --disasm            Print the module's disassembly");
    println!("  --reflect           Print reflection data");
    println!();
    println!("Environment:");
    println!("  RUST_LOG            Enable tracing (e.g. RUST_LOG=sdslc=debug)");
    println!("  SDSLC_TRACE_TREE    Draw tracing spans as a tree");
}
