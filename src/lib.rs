pub mod alphabet_c;
pub mod alphabet_vm;
pub mod ffi;
pub mod lsp;
pub mod macros;
pub mod repl;

use std::io::Write;
use std::path::PathBuf;

use bumpalo::Bump;
use miette::IntoDiagnostic;

use alphabet_c::codegen::Compiler;
use alphabet_c::frontend::{self, parser::arena::AstArena};
use alphabet_vm::AlphabetVM;
use alphabet_vm::bytecode::Program;
use alphabet_vm::error::RuntimeError;

fn get_path(path: &str) -> PathBuf {
    let mut path_buf = PathBuf::from(path.to_owned());
    if let Ok(current_dir) = std::env::current_dir() {
        if !path_buf.is_absolute() {
            path_buf = current_dir.join(path_buf);
        }
    } else {
        eprintln!("Failed to get current directory");
    }
    path_buf
}

/// Runs a source buffer through the whole pipeline: scan, parse, compile.
/// Declarations dropped during parser recovery are logged, not fatal; a
/// missing header or a compile error aborts.
pub fn compile_source(source: &str, path: &str) -> miette::Result<Program> {
    let bump = Bump::new();
    let arena = AstArena::new(&bump);
    let (statements, _dropped) = frontend::parse(path, &arena, source)?;

    let mut compiler = Compiler::new(source);
    let program = compiler.compile(&statements)?;
    Ok(program)
}

/// Compiles and executes a source buffer in-process. An unhandled exception
/// ends the run with the documented stderr line; it is not a pipeline error.
pub fn run_source(source: &str, path: &str) -> miette::Result<()> {
    let program = compile_source(source, path)?;
    let mut vm = AlphabetVM::new(&program);
    match vm.run() {
        Ok(()) => Ok(()),
        Err(err @ RuntimeError::UnhandledException(_)) => {
            eprintln!("{err}");
            Ok(())
        }
        Err(other) => Err(other).into_diagnostic(),
    }
}

/// Reads and runs a source file.
pub fn run(path: String) -> miette::Result<()> {
    let path_buf = get_path(&path);
    let source = std::fs::read_to_string(&path_buf).unwrap_or_else(|_| {
        eprintln!("Failed to read source file at path: {}", path);
        std::process::exit(1);
    });
    run_source(&source, &path)
}

/// Compile-only mode. With an output path the main stream is serialized as
/// an `ALPH` fingerprint file; without one only the instruction count is
/// reported.
pub fn build(path: String, output: Option<String>) -> miette::Result<()> {
    let source = std::fs::read_to_string(get_path(&path)).unwrap_or_else(|_| {
        eprintln!("Failed to read source file at path: {}", path);
        std::process::exit(1);
    });
    let program = compile_source(&source, &path)?;

    match output {
        Some(out_path) => {
            let Ok(mut file) = std::fs::File::create(&out_path) else {
                eprintln!("Error: cannot write to {}", out_path);
                std::process::exit(1);
            };
            program.write_bytecode(&mut file).into_diagnostic()?;
            file.flush().into_diagnostic()?;
            println!(
                "Compiled {} instructions to {}",
                program.main.len(),
                out_path
            );
        }
        None => {
            println!("Compilation successful: {} instructions", program.main.len());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_source_runs_the_whole_frontend() {
        let program = compile_source("#alphabet<x>\nz.o(\"hi\")", "<test>").unwrap();
        assert!(!program.main.is_empty());
    }

    #[test]
    fn missing_header_aborts_the_pipeline() {
        assert!(compile_source("5 x = 10", "<test>").is_err());
    }

    #[test]
    fn compile_errors_abort_the_pipeline() {
        assert!(compile_source("#alphabet<x>\n5 x = \"foo\"", "<test>").is_err());
    }

    #[test]
    fn parse_recovery_still_compiles_the_rest() {
        // the broken interface is dropped, the var after the sync point runs
        let program = compile_source("#alphabet<x>\nj 5 { }\nr\n5 x = 1", "<test>").unwrap();
        assert_eq!(program.globals, vec!["x".to_string()]);
    }

    #[test]
    fn unhandled_exceptions_are_not_pipeline_errors() {
        assert!(run_source("#alphabet<x>\nz.t()", "<test>").is_ok());
    }
}
