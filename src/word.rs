//! The machine word: bit widths, the opcode/operand split, and instruction
//! encode/decode. Everything here is a compile-time constant, matching the
//! original's `#define WORD_BITS 16` / `#define OPCODE_BITS 8`.

use derive_more::Display;

/// Bits in one machine word (an instruction, or a data value).
pub const WORD_BITS: u32 = 16;
/// Bits of the opcode field, the high bits of a word.
pub const OPCODE_BITS: u32 = 8;
/// Bits of the operand field, the low bits of a word; doubles as the
/// address width.
pub const OPERAND_BITS: u32 = WORD_BITS - OPCODE_BITS;
/// Number of addressable words.
pub const MEMORY_SIZE: usize = 1 << OPERAND_BITS;

/// Smallest representable signed word value.
pub const WORD_MIN: i32 = -(1 << (WORD_BITS - 1));
/// Largest representable signed word value.
pub const WORD_MAX: i32 = (1 << (WORD_BITS - 1)) - 1;
/// One past the largest representable word; reserved as the `READ` sentinel
/// that requests orderly termination.
pub const STOP_VALUE: i32 = 1 << WORD_BITS;

/// A signed machine word.
pub type Word = i16;
/// An address: an index into memory, 0..[`MEMORY_SIZE`].
pub type Address = u16;

/// Operations the machine understands. The opcode field also works as a
/// small tagged-variant enumeration rather than the original's raw `char`
/// constants, so an unhandled case is a compile error, not a silent no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[repr(u8)]
pub enum Opcode {
    #[display("nop")]
    Nop = 0x00,

    #[display("read")]
    Read = 0x10,
    #[display("write")]
    Write = 0x11,
    #[display("readstr")]
    ReadStr = 0x12,
    #[display("writestr")]
    WriteStr = 0x13,

    #[display("load")]
    Load = 0x20,
    #[display("store")]
    Store = 0x21,

    #[display("add")]
    Add = 0x30,
    #[display("subtract")]
    Subtract = 0x31,
    #[display("divide")]
    Divide = 0x32,
    #[display("multiply")]
    Multiply = 0x33,
    #[display("remainder")]
    Remainder = 0x34,
    #[display("power")]
    Power = 0x35,

    #[display("branch")]
    Branch = 0x40,
    #[display("branchneg")]
    BranchNeg = 0x41,
    #[display("branchzero")]
    BranchZero = 0x42,
    #[display("halt")]
    Halt = 0x43,
}

impl Opcode {
    fn from_u8(byte: u8) -> Option<Opcode> {
        use Opcode::*;
        Some(match byte {
            0x00 => Nop,
            0x10 => Read,
            0x11 => Write,
            0x12 => ReadStr,
            0x13 => WriteStr,
            0x20 => Load,
            0x21 => Store,
            0x30 => Add,
            0x31 => Subtract,
            0x32 => Divide,
            0x33 => Multiply,
            0x34 => Remainder,
            0x35 => Power,
            0x40 => Branch,
            0x41 => BranchNeg,
            0x42 => BranchZero,
            0x43 => Halt,
            _ => return None,
        })
    }
}

/// An instruction word: an opcode in the high [`OPCODE_BITS`] bits and an
/// address operand in the low [`OPERAND_BITS`] bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: Address,
}

/// An instruction word whose opcode field does not name a known [`Opcode`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display("invalid opcode 0x{opcode:02X} at address {address}")]
pub struct InvalidOpcode {
    pub opcode: u8,
    pub address: Address,
}

impl Instruction {
    pub fn new(opcode: Opcode, operand: Address) -> Self {
        Instruction { opcode, operand }
    }

    /// Pack into a single machine word.
    pub fn encode(self) -> Word {
        let packed = ((self.opcode as u16) << OPERAND_BITS) | (self.operand & operand_mask());
        packed as Word
    }

    /// Unpack a machine word fetched from `address`, failing if the high
    /// bits don't name a known opcode.
    pub fn decode(word: Word, address: Address) -> Result<Self, InvalidOpcode> {
        let bits = word as u16;
        let opcode_bits = (bits >> OPERAND_BITS) as u8;
        let operand = bits & operand_mask();
        let opcode = Opcode::from_u8(opcode_bits).ok_or(InvalidOpcode { opcode: opcode_bits, address })?;
        Ok(Instruction { opcode, operand })
    }
}

fn operand_mask() -> u16 {
    ((1u32 << OPERAND_BITS) - 1) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let instr = Instruction::new(Opcode::Load, 0x42);
        let word = instr.encode();
        assert_eq!(Instruction::decode(word, 0).unwrap(), instr);
    }

    #[test]
    fn memory_size_matches_operand_width() {
        assert_eq!(MEMORY_SIZE, 256);
        assert_eq!(operand_mask(), 0xFF);
    }

    #[test]
    fn decode_rejects_unknown_opcode() {
        let word = (0x05u16 << OPERAND_BITS) as Word;
        let err = Instruction::decode(word, 7).unwrap_err();
        assert_eq!(err.opcode, 0x05);
        assert_eq!(err.address, 7);
    }

    #[test]
    fn stop_value_is_one_more_than_the_largest_word_magnitude() {
        assert_eq!(STOP_VALUE, 1 << WORD_BITS);
        assert_eq!(WORD_MIN, -32768);
        assert_eq!(WORD_MAX, 32767);
    }
}
