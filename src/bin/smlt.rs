//! The translator: compiles a line-numbered source file into a Simpletron
//! memory image.

use clap::Parser;
use simpletron::back::encode_image;
use simpletron::middle::{CompileError, Compiler};
use std::fs;
use std::process::ExitCode;

/// Compile a Simpletron BASIC program into a memory image.
#[derive(Parser)]
struct Args {
    /// Source file to compile.
    source: String,
    /// Where to write the compiled image.
    output: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let source = match fs::read_to_string(&args.source) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error reading '{}': {e}", args.source);
            return ExitCode::FAILURE;
        }
    };

    let image = match Compiler::compile_program(&source) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("{e}");
            if let CompileError::Syntax { text, .. } = &e {
                eprintln!("{text}");
            }
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = fs::write(&args.output, encode_image(&image)) {
        eprintln!("error writing '{}': {e}", args.output);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
