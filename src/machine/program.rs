//! Program representation.
//!
//! A [`Program`] is an ordered, fixed-length sequence of instructions and is
//! the unit of evolution. Programs are immutable once constructed: every
//! operator that "changes" a program (mutation, generation) returns a fresh
//! value, so two population slots can never alias one program and then
//! diverge.

use std::fmt;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::machine::isa::Instruction;

/// An immutable instruction sequence.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Wraps an instruction sequence.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Builds the inert baseline program: `len` LABEL markers. Running it
    /// touches neither memory nor registers.
    pub fn no_op(len: usize) -> Self {
        Self {
            instructions: vec![Instruction::Label; len],
        }
    }

    /// The instruction sequence.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the program holds no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl fmt::Display for Program {
    /// One instruction per line, `OPCODE arg1 arg2 target`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}
