//! The statement compiler and linker pass: turns parsed source lines into a
//! finished memory image.
//!
//! Compilation runs in one forward sweep over the lines, appending to a
//! single flat instruction vector (so any already-emitted instruction's
//! final address is just its index — no adjustment needed later). Three
//! kinds of operand can't be resolved on the spot, each its own
//! [`Operand`] variant: a `goto`/`if` target naming a line not yet seen
//! (`Operand::Line`), a variable or constant's data-region address, which
//! depends on how long the code region turns out to be (`Operand::Data`),
//! and an evaluation-stack slot, which counts down from the top of memory
//! (`Operand::StackSlot`) and must not collide with the data region once
//! it's done growing. [`Compiler::finish`] is the linker pass: it resolves
//! all three once the whole program has been seen and lowers every
//! instruction to a concrete [`Word`].

use crate::common::Id;
use crate::front::source::{parse_line, Comparison, ForBound, LineError, Stmt};
use crate::middle::codegen::{compile_postfix, CodegenError};
use crate::middle::pending::{Operand, PendingInstruction};
use crate::middle::symtab::{SymbolError, SymbolTable};
use crate::word::{Address, Instruction, Opcode, Word, MEMORY_SIZE};
use derive_more::Display;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[display("line {line}: {source}")]
    Syntax { line: u32, text: String, source: LineError },
    #[display("{_0}")]
    Codegen(CodegenError),
    #[display("{_0}")]
    Symbol(SymbolError),
    #[display("goto/if on line {_0} targets a line number that is never defined")]
    UnresolvedTarget(u32),
    #[display("'for {_0}' is never closed by a matching 'next'")]
    UnclosedFor(Id),
    #[display("'next' has no matching open 'for'")]
    NextWithoutFor,
    #[display("'next {found}' does not match the innermost open 'for {expected}'")]
    ForMismatch { expected: Id, found: Id },
    #[display("program does not fit in {MEMORY_SIZE} words of memory")]
    ProgramTooLarge,
}

impl std::error::Error for CompileError {}

impl From<CodegenError> for CompileError {
    fn from(e: CodegenError) -> Self {
        CompileError::Codegen(e)
    }
}

impl From<SymbolError> for CompileError {
    fn from(e: SymbolError) -> Self {
        CompileError::Symbol(e)
    }
}

/// Bookkeeping for one open `for` loop, alive between the `for` statement
/// and its matching `next`.
struct ForFrame {
    var: Id,
    var_addr: Address,
    hidden_step: Address,
    test_addr: Address,
    exit_patches: Vec<usize>,
}

/// Drives one compilation from line text to a finished [`Vec<Word>`] image.
pub struct Compiler {
    symtab: SymbolTable,
    code: Vec<PendingInstruction>,
    for_stack: Vec<ForFrame>,
    for_counter: u32,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler { symtab: SymbolTable::new(), code: Vec::new(), for_stack: Vec::new(), for_counter: 0 }
    }

    fn push_raw(&mut self, opcode: Opcode, operand: Operand) -> usize {
        self.code.push(PendingInstruction::new(opcode, operand));
        self.code.len() - 1
    }

    /// Compile every physical line of `source` in order, then link.
    pub fn compile_program(source: &str) -> Result<Vec<Word>, CompileError> {
        let mut compiler = Compiler::new();
        for raw in source.lines() {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            // the line number itself may be what's malformed, so the error
            // message can only use whatever looks like a number up front.
            let parsed = parse_line(trimmed).map_err(|e| CompileError::Syntax {
                line: leading_number(trimmed),
                text: trimmed.to_string(),
                source: e,
            })?;
            compiler.compile_line(parsed.number, parsed.stmt)?;
        }
        compiler.finish()
    }

    fn compile_line(&mut self, number: u32, stmt: Stmt) -> Result<(), CompileError> {
        self.symtab.add_line(number, self.code.len() as Address)?;
        match stmt {
            Stmt::Rem => {}
            Stmt::Input(ids) => self.compile_input(ids)?,
            Stmt::Let(var, expr) => self.compile_let(var, expr)?,
            Stmt::Print(items) => self.compile_print(items)?,
            Stmt::Goto(target) => self.compile_goto(target),
            Stmt::If { lhs, cmp, rhs, target } => self.compile_if(lhs, cmp, rhs, target)?,
            Stmt::For { var, start, end, step } => self.compile_for(var, start, end, step)?,
            Stmt::Next(var) => self.compile_next(var)?,
            Stmt::End => {
                self.push_raw(Opcode::Halt, Operand::Code(0));
            }
        }
        Ok(())
    }

    fn compile_input(&mut self, ids: Vec<Id>) -> Result<(), CompileError> {
        for id in ids {
            let sym = self.symtab.search_or_add_var(id)?;
            self.push_raw(Opcode::Read, Operand::Data(sym.address));
        }
        Ok(())
    }

    fn compile_let(&mut self, var: Id, expr: Vec<crate::front::expr::Token>) -> Result<(), CompileError> {
        let (code, result) = compile_postfix(&expr, &mut self.symtab)?;
        self.code.extend(code);
        self.push_raw(Opcode::Load, result);
        let sym = self.symtab.search_or_add_var(var)?;
        self.push_raw(Opcode::Store, Operand::Data(sym.address));
        Ok(())
    }

    fn compile_print(&mut self, items: Vec<Vec<crate::front::expr::Token>>) -> Result<(), CompileError> {
        for item in items {
            let (code, result) = compile_postfix(&item, &mut self.symtab)?;
            self.code.extend(code);
            self.push_raw(Opcode::Write, result);
        }
        Ok(())
    }

    fn compile_goto(&mut self, target: u32) {
        self.push_raw(Opcode::Branch, Operand::Line(target));
    }

    fn compile_if(
        &mut self,
        lhs: Vec<crate::front::expr::Token>,
        cmp: Comparison,
        rhs: Vec<crate::front::expr::Token>,
        target: u32,
    ) -> Result<(), CompileError> {
        let (lcode, lresult) = compile_postfix(&lhs, &mut self.symtab)?;
        self.code.extend(lcode);
        self.push_raw(Opcode::Load, lresult);
        let (rcode, rresult) = compile_postfix(&rhs, &mut self.symtab)?;
        self.code.extend(rcode);
        self.push_raw(Opcode::Subtract, rresult);
        self.emit_branch_to(cmp, Operand::Line(target));
        Ok(())
    }

    /// Emit the branch(es) testing "accumulator `cmp` 0", all targeting
    /// `target`. Direct comparisons (`==`, `<`, `<=`) use the machine's own
    /// `branchzero`/`branchneg`; their negations (`!=`, `>=`, `>`) fall back
    /// to skipping over an unconditional branch, the same "fakeaddr" trick
    /// the original compiler used for `!=`, generalized to the other two.
    fn emit_branch_to(&mut self, cmp: Comparison, target: Operand) {
        let indices = self.emit_branch_placeholder(cmp);
        for idx in indices {
            self.code[idx].operand = target;
        }
    }

    /// Same as [`Self::emit_branch_to`] but leaves the final target
    /// unresolved (`Operand::Code(0)` as a placeholder), returning the
    /// indices of every instruction that must be patched once the real
    /// target address is known. Used by `for`/`next`, whose loop-exit
    /// address isn't known until the loop body has been compiled.
    fn emit_branch_placeholder(&mut self, cmp: Comparison) -> Vec<usize> {
        use Comparison::*;
        match cmp {
            Eq => vec![self.push_raw(Opcode::BranchZero, Operand::Code(0))],
            Lt => vec![self.push_raw(Opcode::BranchNeg, Operand::Code(0))],
            Le => vec![
                self.push_raw(Opcode::BranchNeg, Operand::Code(0)),
                self.push_raw(Opcode::BranchZero, Operand::Code(0)),
            ],
            Ne => {
                let after = (self.code.len() + 2) as Address;
                self.push_raw(Opcode::BranchZero, Operand::Code(after));
                vec![self.push_raw(Opcode::Branch, Operand::Code(0))]
            }
            Ge => {
                let after = (self.code.len() + 2) as Address;
                self.push_raw(Opcode::BranchNeg, Operand::Code(after));
                vec![self.push_raw(Opcode::Branch, Operand::Code(0))]
            }
            Gt => {
                let after = (self.code.len() + 3) as Address;
                self.push_raw(Opcode::BranchNeg, Operand::Code(after));
                self.push_raw(Opcode::BranchZero, Operand::Code(after));
                vec![self.push_raw(Opcode::Branch, Operand::Code(0))]
            }
        }
    }

    fn bound_operand(&mut self, bound: ForBound) -> Result<Operand, CompileError> {
        Ok(match bound {
            ForBound::Number(n) => Operand::Data(self.symtab.search_or_add_const(n)?.address),
            ForBound::Var(name) => Operand::Data(self.symtab.search_or_add_var(name)?.address),
        })
    }

    /// Lower `for v = start to end [step s]` into code that works whether
    /// the step turns out to be positive or negative at run time, decided
    /// once at loop entry (the step value itself is snapshotted, so it
    /// can't change mid-loop): a shared loop body is reached through
    /// either an ascending test (`v <= end`) or a descending one
    /// (`v >= end`), chosen by a single `branchneg` on the step's sign.
    fn compile_for(&mut self, var: Id, start: ForBound, end: ForBound, step: Option<ForBound>) -> Result<(), CompileError> {
        let var_sym = self.symtab.search_or_add_var(var)?;
        let suffix = self.for_counter;
        self.for_counter += 1;
        let hidden_end = self.symtab.search_or_add_var(Id::from(format!("__for_end_{suffix}")))?.address;
        let hidden_step = self.symtab.search_or_add_var(Id::from(format!("__for_step_{suffix}")))?.address;

        let start_operand = self.bound_operand(start)?;
        self.push_raw(Opcode::Load, start_operand);
        self.push_raw(Opcode::Store, Operand::Data(var_sym.address));

        let end_operand = self.bound_operand(end)?;
        self.push_raw(Opcode::Load, end_operand);
        self.push_raw(Opcode::Store, Operand::Data(hidden_end));

        let step_operand = match step {
            Some(b) => self.bound_operand(b)?,
            None => Operand::Data(self.symtab.search_or_add_const(1)?.address),
        };
        self.push_raw(Opcode::Load, step_operand);
        self.push_raw(Opcode::Store, Operand::Data(hidden_step));

        // `next` branches back here, not past it: the step's sign must be
        // re-checked every iteration, even though the step itself never
        // changes, so the right one of the two test blocks below keeps
        // being picked once the loop starts running the body repeatedly.
        let test_addr = self.code.len() as Address;
        self.push_raw(Opcode::Load, Operand::Data(hidden_step));
        let desc_branch_idx = self.push_raw(Opcode::BranchNeg, Operand::Code(0));

        self.push_raw(Opcode::Load, Operand::Data(var_sym.address));
        self.push_raw(Opcode::Subtract, Operand::Data(hidden_end));
        let mut exit_patches = self.emit_branch_placeholder(Comparison::Gt);
        let skip_desc_idx = self.push_raw(Opcode::Branch, Operand::Code(0));

        let desc_test_addr = self.code.len() as Address;
        self.code[desc_branch_idx].operand = Operand::Code(desc_test_addr);
        self.push_raw(Opcode::Load, Operand::Data(var_sym.address));
        self.push_raw(Opcode::Subtract, Operand::Data(hidden_end));
        exit_patches.extend(self.emit_branch_placeholder(Comparison::Lt));

        let body_addr = self.code.len() as Address;
        self.code[skip_desc_idx].operand = Operand::Code(body_addr);

        self.for_stack.push(ForFrame { var: var_sym.name, var_addr: var_sym.address, hidden_step, test_addr, exit_patches });
        Ok(())
    }

    /// `next`'s variable name is an optional assertion, not a required
    /// token (spec's canonical counted loop writes a bare `next`): when
    /// given, it must match the innermost open `for`; when omitted, `next`
    /// just pops that frame.
    fn compile_next(&mut self, var: Option<Id>) -> Result<(), CompileError> {
        let frame = self.for_stack.pop().ok_or(CompileError::NextWithoutFor)?;
        if let Some(found) = var {
            if frame.var != found {
                return Err(CompileError::ForMismatch { expected: frame.var, found });
            }
        }
        self.push_raw(Opcode::Load, Operand::Data(frame.var_addr));
        self.push_raw(Opcode::Add, Operand::Data(frame.hidden_step));
        self.push_raw(Opcode::Store, Operand::Data(frame.var_addr));
        self.push_raw(Opcode::Branch, Operand::Code(frame.test_addr));

        let exit_addr = self.code.len() as Address;
        for idx in frame.exit_patches {
            self.code[idx].operand = Operand::Code(exit_addr);
        }
        Ok(())
    }

    /// The linker pass: resolve every [`Operand`] to a final address and
    /// lower each instruction to a [`Word`], then lay out the full
    /// `MEMORY_SIZE`-word image (code, then the data region holding
    /// variables and constants, the rest left zeroed for the evaluation
    /// stack to use at run time).
    fn finish(mut self) -> Result<Vec<Word>, CompileError> {
        if let Some(frame) = self.for_stack.first() {
            return Err(CompileError::UnclosedFor(frame.var));
        }

        let ip_final = self.code.len();
        if ip_final > MEMORY_SIZE {
            return Err(CompileError::ProgramTooLarge);
        }
        let dp_final = ip_final + self.symtab.dp() as usize;
        if dp_final > MEMORY_SIZE || dp_final as Address > self.symtab.sp_floor() {
            return Err(CompileError::ProgramTooLarge);
        }

        let mut image = vec![0 as Word; MEMORY_SIZE];

        for (index, pending) in self.code.iter().enumerate() {
            let address = self.resolve(pending.operand, ip_final)?;
            let instr = Instruction::new(pending.opcode, address);
            image[index] = instr.encode();
        }

        for (value, offset) in self.symtab.constants() {
            image[ip_final + offset as usize] = value as Word;
        }

        Ok(image)
    }

    fn resolve(&self, operand: Operand, ip_final: usize) -> Result<Address, CompileError> {
        Ok(match operand {
            Operand::Code(addr) => addr,
            Operand::Line(line) => {
                self.symtab.line_address(line).ok_or(CompileError::UnresolvedTarget(line))?
            }
            Operand::Data(offset) => ip_final as Address + offset,
            Operand::StackSlot(index) => (MEMORY_SIZE - 1 - index) as Address,
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Scrape a leading decimal line number off `line` for error reporting,
/// even when the line turns out not to parse at all.
fn leading_number(line: &str) -> u32 {
    line.split_whitespace().next().and_then(|w| w.parse().ok()).unwrap_or(0)
}
