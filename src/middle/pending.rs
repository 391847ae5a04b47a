//! The structured stand-in for an instruction whose operand can't be known
//! until compilation finishes: a forward `goto`/`if` target, a variable or
//! constant's eventual data-region address, or an evaluation-stack slot
//! whose final address depends on how far the data region grows. This
//! replaces the original's scheme of OR-ing a patch value into an
//! otherwise-zero operand field later: every pending instruction carries
//! its operand kind explicitly, so "not yet resolved" is a distinct variant
//! rather than a sentinel zero.

use crate::word::{Address, Opcode};

/// An instruction operand that may need to be resolved against information
/// not yet known at the point the instruction is emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    /// Already a final instruction address — a branch target computed from
    /// the code vector's own length, which never changes retroactively.
    Code(Address),
    /// A source line number; resolves to that line's instruction address
    /// once every line has been compiled.
    Line(u32),
    /// A 0-based offset into the data region (where variables and constants
    /// live); resolves to `ip_final + offset` once the code region's final
    /// length is known.
    Data(Address),
    /// An evaluation-stack slot, indexed from the bottom of the region the
    /// current expression uses; resolves to `MEMORY_SIZE - 1 - index`, i.e.
    /// counting down from the top of memory.
    StackSlot(usize),
}

/// One instruction as emitted by the front/middle passes, before its
/// operand has necessarily been resolved to a final address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingInstruction {
    pub opcode: Opcode,
    pub operand: Operand,
}

impl PendingInstruction {
    pub fn new(opcode: Opcode, operand: Operand) -> Self {
        PendingInstruction { opcode, operand }
    }
}
