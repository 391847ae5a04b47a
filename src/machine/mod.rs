//! The virtual machine: a fetch-decode-execute loop over a flat word array,
//! one accumulator, no hardware stack. `Simpletron::step` runs one cycle;
//! `Simpletron::run` drives it to completion.

pub mod io;

pub use io::Io;

use crate::word::{Address, Instruction, InvalidOpcode, Opcode, Word, MEMORY_SIZE, STOP_VALUE, WORD_MAX, WORD_MIN};
use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    #[display("{_0}")]
    InvalidOpcode(InvalidOpcode),
    #[display("division by zero at address {address}")]
    DivideByZero { address: Address },
    #[display("accumulator overflow at address {address}: {value} does not fit in a word")]
    Overflow { address: Address, value: i32 },
    #[display("I/O failure: {_0}")]
    Io(IoFailure),
}

/// A lightweight, comparable stand-in for `std::io::Error`, which isn't
/// itself `PartialEq`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display("input/output error")]
pub struct IoFailure;

impl std::error::Error for RuntimeError {}

impl From<InvalidOpcode> for RuntimeError {
    fn from(e: InvalidOpcode) -> Self {
        RuntimeError::InvalidOpcode(e)
    }
}

/// Why the machine stopped running, mirroring the original's
/// `enum Status {STOP, SUCCESS, FAIL}` minus the failure case, which this
/// crate represents as `Err(RuntimeError)` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Ran a `halt` instruction.
    Halted,
    /// A `read` received the `STOP_VALUE` sentinel instead of a value.
    Stopped,
}

pub struct Simpletron {
    memory: [Word; MEMORY_SIZE],
    ip: Address,
    ir: Word,
    accumulator: Word,
}

impl Simpletron {
    /// Load `image` into a fresh machine, zero-filling anything beyond it.
    pub fn load(image: &[Word]) -> Self {
        let mut memory = [0 as Word; MEMORY_SIZE];
        let n = image.len().min(MEMORY_SIZE);
        memory[..n].copy_from_slice(&image[..n]);
        Simpletron { memory, ip: 0, ir: 0, accumulator: 0 }
    }

    pub fn accumulator(&self) -> Word {
        self.accumulator
    }

    pub fn memory(&self) -> &[Word; MEMORY_SIZE] {
        &self.memory
    }

    /// Address of the *next* instruction to fetch.
    pub fn instruction_counter(&self) -> Address {
        self.ip
    }

    /// The raw word last fetched into the instruction register.
    pub fn instruction_register(&self) -> Word {
        self.ir
    }

    /// Run until `halt`, a `read` stop sentinel, or a runtime error.
    pub fn run(&mut self, io: &mut impl Io) -> Result<Status, RuntimeError> {
        loop {
            if let Some(status) = self.step(io)? {
                return Ok(status);
            }
        }
    }

    /// Execute a single fetch-decode-execute cycle, returning `Some(status)`
    /// once the machine should stop.
    pub fn step(&mut self, io: &mut impl Io) -> Result<Option<Status>, RuntimeError> {
        let fetch_addr = self.ip;
        let word = self.memory[fetch_addr as usize];
        self.ir = word;
        let instr = Instruction::decode(word, fetch_addr)?;
        let address = instr.operand;
        self.ip = fetch_addr.wrapping_add(1);

        match instr.opcode {
            Opcode::Nop => {}

            Opcode::Read => {
                let value = loop {
                    let raw = io.read_word().map_err(|_| RuntimeError::Io(IoFailure))?;
                    if raw == STOP_VALUE {
                        return Ok(Some(Status::Stopped));
                    }
                    if (WORD_MIN..=WORD_MAX).contains(&raw) {
                        break raw as Word;
                    }
                };
                self.memory[address as usize] = value;
            }
            Opcode::Write => {
                io.write_word(self.memory[address as usize] as i32).map_err(|_| RuntimeError::Io(IoFailure))?;
            }
            Opcode::ReadStr => {
                let text = io.read_str().map_err(|_| RuntimeError::Io(IoFailure))?;
                self.store_str(address, &text);
            }
            Opcode::WriteStr => {
                let text = self.load_str(address);
                io.write_str(&text).map_err(|_| RuntimeError::Io(IoFailure))?;
            }

            Opcode::Load => self.accumulator = self.memory[address as usize],
            Opcode::Store => self.memory[address as usize] = self.accumulator,

            Opcode::Add => self.arith(address, |a, b| a + b)?,
            Opcode::Subtract => self.arith(address, |a, b| a - b)?,
            Opcode::Multiply => self.arith(address, |a, b| a * b)?,
            Opcode::Divide => self.arith_checked(address, |a, b| {
                if b == 0 {
                    None
                } else {
                    Some(a / b)
                }
            })?,
            Opcode::Remainder => self.arith_checked(address, |a, b| if b == 0 { None } else { Some(a % b) })?,
            Opcode::Power => {
                let exponent = self.memory[address as usize] as i32;
                let base = self.accumulator as i32;
                let result = if exponent < 0 { 0 } else { base.checked_pow(exponent as u32).unwrap_or(i32::MAX) };
                self.set_accumulator(result, address)?;
            }

            Opcode::Branch => self.ip = address,
            Opcode::BranchNeg => {
                if self.accumulator < 0 {
                    self.ip = address;
                }
            }
            Opcode::BranchZero => {
                if self.accumulator == 0 {
                    self.ip = address;
                }
            }
            Opcode::Halt => return Ok(Some(Status::Halted)),
        }

        Ok(None)
    }

    fn arith(&mut self, address: Address, op: impl Fn(i32, i32) -> i32) -> Result<(), RuntimeError> {
        let lhs = self.accumulator as i32;
        let rhs = self.memory[address as usize] as i32;
        self.set_accumulator(op(lhs, rhs), address)
    }

    fn arith_checked(&mut self, address: Address, op: impl Fn(i32, i32) -> Option<i32>) -> Result<(), RuntimeError> {
        let lhs = self.accumulator as i32;
        let rhs = self.memory[address as usize] as i32;
        let result = op(lhs, rhs).ok_or(RuntimeError::DivideByZero { address })?;
        self.set_accumulator(result, address)
    }

    fn set_accumulator(&mut self, value: i32, address: Address) -> Result<(), RuntimeError> {
        if !(WORD_MIN..=WORD_MAX).contains(&value) {
            return Err(RuntimeError::Overflow { address, value });
        }
        self.accumulator = value as Word;
        Ok(())
    }

    /// Read a run of memory words as bytes starting at `start`, one ASCII
    /// character per word, stopping at the first zero word.
    fn load_str(&self, start: Address) -> String {
        let mut out = String::new();
        let mut addr = start as usize;
        while addr < MEMORY_SIZE {
            let word = self.memory[addr];
            if word == 0 {
                break;
            }
            out.push(word as u8 as char);
            addr += 1;
        }
        out
    }

    /// Write `text` as one ASCII byte per word starting at `start`,
    /// terminated by a zero word (truncated if it would run past the end
    /// of memory).
    fn store_str(&mut self, start: Address, text: &str) {
        let mut addr = start as usize;
        for byte in text.bytes() {
            if addr >= MEMORY_SIZE {
                return;
            }
            self.memory[addr] = byte as Word;
            addr += 1;
        }
        if addr < MEMORY_SIZE {
            self.memory[addr] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::io::test_support::ScriptedIo;
    use crate::word::Instruction;

    fn image_from(instrs: &[(Opcode, Address)]) -> Vec<Word> {
        let mut words = vec![0 as Word; MEMORY_SIZE];
        for (i, (opcode, operand)) in instrs.iter().enumerate() {
            words[i] = Instruction::new(*opcode, *operand).encode();
        }
        words
    }

    #[test]
    fn halts_cleanly() {
        let image = image_from(&[(Opcode::Halt, 0)]);
        let mut vm = Simpletron::load(&image);
        let mut io = ScriptedIo::default();
        assert_eq!(vm.run(&mut io).unwrap(), Status::Halted);
    }

    #[test]
    fn reads_and_adds_two_values() {
        // memory[50..53] are data slots past the instruction region.
        let image = image_from(&[
            (Opcode::Read, 50),
            (Opcode::Read, 51),
            (Opcode::Load, 50),
            (Opcode::Add, 51),
            (Opcode::Store, 52),
            (Opcode::Write, 52),
            (Opcode::Halt, 0),
        ]);
        let mut vm = Simpletron::load(&image);
        let mut io = ScriptedIo::with_words([2, 3]);
        let status = vm.run(&mut io).unwrap();
        assert_eq!(status, Status::Halted);
        assert_eq!(io.output_words, vec![5]);
    }

    #[test]
    fn divide_by_zero_is_a_runtime_error() {
        let image = image_from(&[(Opcode::Load, 10), (Opcode::Divide, 11), (Opcode::Halt, 0)]);
        let mut vm = Simpletron::load(&image);
        let mut io = ScriptedIo::default();
        let err = vm.run(&mut io).unwrap_err();
        assert_eq!(err, RuntimeError::DivideByZero { address: 11 });
    }

    #[test]
    fn accumulator_overflow_is_a_runtime_error() {
        let mut image = image_from(&[(Opcode::Load, 10), (Opcode::Add, 11), (Opcode::Halt, 0)]);
        image[10] = WORD_MAX as Word;
        image[11] = 1;
        let mut vm = Simpletron::load(&image);
        let mut io = ScriptedIo::default();
        assert!(matches!(vm.run(&mut io).unwrap_err(), RuntimeError::Overflow { .. }));
    }

    #[test]
    fn stop_value_ends_the_run_without_error() {
        let image = image_from(&[(Opcode::Read, 50), (Opcode::Halt, 0)]);
        let mut vm = Simpletron::load(&image);
        let mut io = ScriptedIo::with_words([STOP_VALUE]);
        assert_eq!(vm.run(&mut io).unwrap(), Status::Stopped);
    }

    #[test]
    fn branch_zero_takes_the_jump_when_accumulator_is_zero() {
        let image = image_from(&[
            (Opcode::Load, 10),   // acc = 0
            (Opcode::BranchZero, 4),
            (Opcode::Load, 11),   // skipped
            (Opcode::Halt, 0),    // skipped
            (Opcode::Halt, 0),
        ]);
        let mut vm = Simpletron::load(&image);
        let mut io = ScriptedIo::default();
        assert_eq!(vm.run(&mut io).unwrap(), Status::Halted);
        assert_eq!(vm.accumulator(), 0);
    }

    #[test]
    fn power_computes_exponentiation() {
        let mut image = image_from(&[(Opcode::Load, 10), (Opcode::Power, 11), (Opcode::Halt, 0)]);
        image[10] = 2;
        image[11] = 8;
        let mut vm = Simpletron::load(&image);
        let mut io = ScriptedIo::default();
        vm.run(&mut io).unwrap();
        assert_eq!(vm.accumulator(), 256);
    }

    #[test]
    fn writestr_reads_a_nul_terminated_run_of_words() {
        let image = image_from(&[(Opcode::WriteStr, 100), (Opcode::Halt, 0)]);
        let mut vm = Simpletron::load(&image);
        for (i, b) in b"hi".iter().enumerate() {
            vm.memory[100 + i] = *b as Word;
        }
        let mut io = ScriptedIo::default();
        vm.run(&mut io).unwrap();
        assert_eq!(io.output_strs, vec!["hi".to_string()]);
    }
}
