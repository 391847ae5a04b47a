//! The virtual machine: executes a Simpletron memory image, reading it from
//! a file or, if none is given, from stdin.

use clap::Parser;
use simpletron::back::decode_image;
use simpletron::machine::io::StdIo;
use simpletron::machine::{RuntimeError, Simpletron, Status};
use simpletron::word::Instruction;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

/// Run a compiled Simpletron memory image.
#[derive(Parser)]
struct Args {
    /// Image file to run; reads from stdin if omitted.
    image: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let text = match &args.image {
        Some(path) => match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("error reading '{path}': {e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            let mut text = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut text) {
                eprintln!("error reading image from stdin: {e}");
                return ExitCode::FAILURE;
            }
            text
        }
    };

    let image = match decode_image(&text) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut vm = Simpletron::load(&image);
    let mut io = StdIo;

    match vm.run(&mut io) {
        Ok(Status::Halted) => {
            println!("\n*** Simpletron execution terminated ***");
            ExitCode::SUCCESS
        }
        Ok(Status::Stopped) => {
            println!("\n*** Simpletron execution stopped ***");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("\n*** Simpletron execution abnormally terminated ***");
            eprintln!("{e}");
            print_registers(&vm);
            ExitCode::FAILURE
        }
    }
}

fn print_registers(vm: &Simpletron) {
    let ir = vm.instruction_register();
    let ic = vm.instruction_counter();
    eprintln!("REGISTERS:");
    eprintln!("instruction counter:   {ic:>5}");
    eprintln!("instruction register:  {ir:>5}");
    eprintln!("accumulator:           {:>5}", vm.accumulator());
    if let Ok(instr) = Instruction::decode(ir, ic) {
        eprintln!("operation code:        {:>5}", instr.opcode);
        eprintln!("operand:               {:>5}", instr.operand);
    }
}
