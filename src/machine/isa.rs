//! Instruction set definitions.
//!
//! The machine has three general-purpose registers and a flat memory of
//! signed integers. Instructions are closed tagged variants: every operand
//! slot carries the exact type its opcode demands, so a structurally invalid
//! instruction (an INC whose target is a memory cell, say) cannot be
//! constructed, generated, or deserialized in the first place. Runtime
//! faults are limited to *computed* addresses, which the interpreter
//! contains (see [`interpreter`](super::interpreter)).
//!
//! Jump targets are signed offsets relative to the current program counter.
//! A taken jump moves the counter by exactly the offset; there is no
//! implicit advance on top. `LABEL` is an inert marker with no runtime
//! effect.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};

/// One of the machine's three general-purpose registers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, BorshSerialize, BorshDeserialize)]
pub enum Reg {
    R0,
    R1,
    R2,
}

impl Reg {
    /// All registers, in index order.
    pub const ALL: [Reg; 3] = [Reg::R0, Reg::R1, Reg::R2];
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::R0 => write!(f, "R0"),
            Reg::R1 => write!(f, "R1"),
            Reg::R2 => write!(f, "R2"),
        }
    }
}

/// An operand: a register, or an integer whose meaning (immediate value or
/// memory offset) depends on the operand's position in its instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub enum Arg {
    /// Names a register; resolution is opcode-specific (value, or the value
    /// used as an address).
    Reg(Reg),
    /// A literal integer. Memory offsets are non-negative by convention,
    /// but any value is representable and out-of-range values are contained
    /// at runtime like every other bad computed address.
    Loc(i64),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Reg(r) => write!(f, "{r}"),
            Arg::Loc(v) => write!(f, "{v}"),
        }
    }
}

/// A single machine instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub enum Instruction {
    /// `SET dst imm` ; dst = imm
    Set { dst: Reg, value: i64 },
    /// `INC dst` ; dst = dst + 1 (wrapping)
    Inc { dst: Reg },
    /// `DEC dst` ; dst = dst - 1 (wrapping)
    Dec { dst: Reg },
    /// `READ dst src` ; dst = src (register copy) or dst = mem[src]
    Read { dst: Reg, src: Arg },
    /// `SWAP a b` ; exchange mem[addr(a)] and mem[addr(b)]; a register
    /// operand's *value* is the address
    Swap { a: Arg, b: Arg },
    /// `JLT a b offset` ; if value(a) < value(b) then pc = pc + offset
    Jlt { a: Arg, b: Arg, offset: i32 },
    /// `JZ a offset` ; if value(a) == 0 then pc = pc + offset
    Jz { a: Arg, offset: i32 },
    /// `JUMP offset` ; pc = pc + offset
    Jump { offset: i32 },
    /// `LABEL` ; no-op
    Label,
}

impl Instruction {
    /// The opcode this instruction is an instance of.
    pub const fn opcode(&self) -> OpCode {
        match self {
            Instruction::Set { .. } => OpCode::Set,
            Instruction::Inc { .. } => OpCode::Inc,
            Instruction::Dec { .. } => OpCode::Dec,
            Instruction::Read { .. } => OpCode::Read,
            Instruction::Swap { .. } => OpCode::Swap,
            Instruction::Jlt { .. } => OpCode::Jlt,
            Instruction::Jz { .. } => OpCode::Jz,
            Instruction::Jump { .. } => OpCode::Jump,
            Instruction::Label => OpCode::Label,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Set { dst, value } => write!(f, "SET {dst} {value}"),
            Instruction::Inc { dst } => write!(f, "INC {dst}"),
            Instruction::Dec { dst } => write!(f, "DEC {dst}"),
            Instruction::Read { dst, src } => write!(f, "READ {dst} {src}"),
            Instruction::Swap { a, b } => write!(f, "SWAP {a} {b}"),
            Instruction::Jlt { a, b, offset } => write!(f, "JLT {a} {b} {offset}"),
            Instruction::Jz { a, offset } => write!(f, "JZ {a} {offset}"),
            Instruction::Jump { offset } => write!(f, "JUMP {offset}"),
            Instruction::Label => write!(f, "LABEL"),
        }
    }
}

/// Payload-free opcode discriminant.
///
/// Used wherever an opcode is data rather than an executable instruction:
/// the generation vocabulary, the pretty-printer, and the consistency tests.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OpCode {
    Set,
    Inc,
    Dec,
    Read,
    Swap,
    Jlt,
    Jz,
    Jump,
    Label,
}

impl OpCode {
    /// All opcodes, in mnemonic-table order.
    pub const ALL: [OpCode; 9] = [
        OpCode::Set,
        OpCode::Inc,
        OpCode::Dec,
        OpCode::Read,
        OpCode::Swap,
        OpCode::Jlt,
        OpCode::Jz,
        OpCode::Jump,
        OpCode::Label,
    ];

    /// Returns the assembly mnemonic for this opcode.
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Set => "SET",
            OpCode::Inc => "INC",
            OpCode::Dec => "DEC",
            OpCode::Read => "READ",
            OpCode::Swap => "SWAP",
            OpCode::Jlt => "JLT",
            OpCode::Jz => "JZ",
            OpCode::Jump => "JUMP",
            OpCode::Label => "LABEL",
        }
    }

    /// Describes the operand roles, one word per operand slot.
    pub const fn signature(&self) -> &'static str {
        match self {
            OpCode::Set => "dst imm",
            OpCode::Inc => "dst",
            OpCode::Dec => "dst",
            OpCode::Read => "dst src",
            OpCode::Swap => "addr addr",
            OpCode::Jlt => "val val offset",
            OpCode::Jz => "val offset",
            OpCode::Jump => "offset",
            OpCode::Label => "",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg_display() {
        assert_eq!(Reg::R0.to_string(), "R0");
        assert_eq!(Reg::R1.to_string(), "R1");
        assert_eq!(Reg::R2.to_string(), "R2");
    }

    #[test]
    fn arg_display() {
        assert_eq!(Arg::Reg(Reg::R2).to_string(), "R2");
        assert_eq!(Arg::Loc(7).to_string(), "7");
        assert_eq!(Arg::Loc(-3).to_string(), "-3");
    }

    #[test]
    fn instruction_display() {
        assert_eq!(
            Instruction::Set {
                dst: Reg::R0,
                value: 5
            }
            .to_string(),
            "SET R0 5"
        );
        assert_eq!(Instruction::Inc { dst: Reg::R1 }.to_string(), "INC R1");
        assert_eq!(
            Instruction::Read {
                dst: Reg::R2,
                src: Arg::Loc(4)
            }
            .to_string(),
            "READ R2 4"
        );
        assert_eq!(
            Instruction::Swap {
                a: Arg::Loc(0),
                b: Arg::Reg(Reg::R0)
            }
            .to_string(),
            "SWAP 0 R0"
        );
        assert_eq!(
            Instruction::Jlt {
                a: Arg::Loc(1),
                b: Arg::Loc(0),
                offset: 2
            }
            .to_string(),
            "JLT 1 0 2"
        );
        assert_eq!(
            Instruction::Jz {
                a: Arg::Reg(Reg::R0),
                offset: 3
            }
            .to_string(),
            "JZ R0 3"
        );
        assert_eq!(Instruction::Jump { offset: -2 }.to_string(), "JUMP -2");
        assert_eq!(Instruction::Label.to_string(), "LABEL");
    }

    #[test]
    fn opcode_of_instruction() {
        assert_eq!(
            Instruction::Swap {
                a: Arg::Loc(0),
                b: Arg::Loc(1)
            }
            .opcode(),
            OpCode::Swap
        );
        assert_eq!(Instruction::Label.opcode(), OpCode::Label);
    }
}
