//! Population operators: random generation, mutation, and the population
//! container.
//!
//! All operators take the RNG as a parameter and build fresh [`Program`]s;
//! nothing here mutates an existing program in place. Instruction slots are
//! drawn from a weighted [`Vocabulary`], so a run can restrict or re-weight
//! the opcodes evolution is allowed to use.

use borsh::{BorshDeserialize, BorshSerialize};
use rand::Rng;

use crate::evolve::errors::EvolveError;
use crate::machine::isa::{Arg, Instruction, OpCode, Reg};
use crate::machine::program::Program;

/// Operand ranges for generated instructions.
#[derive(Clone, Copy, Debug)]
pub struct GenLimits {
    /// Memory locations and SET immediates are drawn from `0..array_len`.
    pub array_len: usize,
    /// Jump offsets are drawn from `-max_offset..=max_offset`.
    pub max_offset: i32,
}

impl GenLimits {
    pub fn new(array_len: usize, max_offset: i32) -> Self {
        Self {
            array_len,
            max_offset,
        }
    }
}

/// Weighted opcode set used by generation and mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vocabulary {
    entries: Vec<(OpCode, u32)>,
    total: u64,
}

impl Vocabulary {
    /// Builds a vocabulary from `(opcode, weight)` entries. Zero-weight
    /// entries are legal and never drawn; a vocabulary whose weights sum to
    /// zero is rejected.
    pub fn new(entries: Vec<(OpCode, u32)>) -> Result<Self, EvolveError> {
        let total: u64 = entries.iter().map(|&(_, w)| w as u64).sum();
        if total == 0 {
            return Err(EvolveError::EmptyVocabulary);
        }
        Ok(Self { entries, total })
    }

    /// Uniform weights over the given opcodes.
    pub fn uniform(ops: &[OpCode]) -> Result<Self, EvolveError> {
        Self::new(ops.iter().map(|&op| (op, 1)).collect())
    }

    /// Uniform weights over the entire instruction set.
    pub fn full() -> Self {
        Self {
            entries: OpCode::ALL.iter().map(|&op| (op, 1)).collect(),
            total: OpCode::ALL.len() as u64,
        }
    }

    /// Draws one opcode proportionally to its weight.
    fn sample(&self, rng: &mut impl Rng) -> OpCode {
        let mut ticket = rng.random_range(0..self.total);
        for &(op, weight) in &self.entries {
            let weight = weight as u64;
            if ticket < weight {
                return op;
            }
            ticket -= weight;
        }
        // `total` is the sum of the weights, so the loop always returns.
        self.entries[self.entries.len() - 1].0
    }
}

impl Default for Vocabulary {
    /// The conditional-swap subset evolution historically runs with:
    /// JLT, SWAP, and LABEL, uniformly weighted.
    fn default() -> Self {
        Self {
            entries: vec![(OpCode::Jlt, 1), (OpCode::Swap, 1), (OpCode::Label, 1)],
            total: 3,
        }
    }
}

fn random_reg(rng: &mut impl Rng) -> Reg {
    match rng.random_range(0..3) {
        0 => Reg::R0,
        1 => Reg::R1,
        _ => Reg::R2,
    }
}

fn random_location(limits: &GenLimits, rng: &mut impl Rng) -> Arg {
    Arg::Loc(rng.random_range(0..limits.array_len as i64))
}

/// A register three times in four, a memory location otherwise.
fn random_operand(limits: &GenLimits, rng: &mut impl Rng) -> Arg {
    match rng.random_range(0..4) {
        0 => Arg::Reg(Reg::R0),
        1 => Arg::Reg(Reg::R1),
        2 => Arg::Reg(Reg::R2),
        _ => random_location(limits, rng),
    }
}

fn random_offset(limits: &GenLimits, rng: &mut impl Rng) -> i32 {
    rng.random_range(-limits.max_offset..=limits.max_offset)
}

/// Draws one instruction from the vocabulary. Every result is structurally
/// valid by construction; only *computed* addresses can still go wrong at
/// runtime, and the interpreter contains those.
pub fn random_instruction(
    vocab: &Vocabulary,
    limits: &GenLimits,
    rng: &mut impl Rng,
) -> Instruction {
    match vocab.sample(rng) {
        OpCode::Set => Instruction::Set {
            dst: random_reg(rng),
            value: rng.random_range(0..limits.array_len as i64),
        },
        OpCode::Inc => Instruction::Inc {
            dst: random_reg(rng),
        },
        OpCode::Dec => Instruction::Dec {
            dst: random_reg(rng),
        },
        OpCode::Read => Instruction::Read {
            dst: random_reg(rng),
            src: random_operand(limits, rng),
        },
        OpCode::Swap => Instruction::Swap {
            a: random_location(limits, rng),
            b: random_location(limits, rng),
        },
        OpCode::Jlt => Instruction::Jlt {
            a: random_location(limits, rng),
            b: random_location(limits, rng),
            offset: random_offset(limits, rng),
        },
        OpCode::Jz => Instruction::Jz {
            a: random_location(limits, rng),
            offset: random_offset(limits, rng),
        },
        OpCode::Jump => Instruction::Jump {
            offset: random_offset(limits, rng),
        },
        OpCode::Label => Instruction::Label,
    }
}

impl Program {
    /// Builds a program of `len` independent weighted draws.
    pub fn random(
        len: usize,
        vocab: &Vocabulary,
        limits: &GenLimits,
        rng: &mut impl Rng,
    ) -> Self {
        Program::new(
            (0..len)
                .map(|_| random_instruction(vocab, limits, rng))
                .collect(),
        )
    }

    /// Returns a copy with `floor(len × rate)` randomly chosen slots (drawn
    /// independently, so not necessarily distinct) overwritten by fresh
    /// random instructions. `self` is never modified.
    pub fn mutated(
        &self,
        rate: f64,
        vocab: &Vocabulary,
        limits: &GenLimits,
        rng: &mut impl Rng,
    ) -> Self {
        let mut instructions = self.instructions().to_vec();
        let count = (instructions.len() as f64 * rate).floor() as usize;
        for _ in 0..count {
            let slot = rng.random_range(0..instructions.len());
            instructions[slot] = random_instruction(vocab, limits, rng);
        }
        Program::new(instructions)
    }
}

/// An ordered, fixed-size list of programs; the unit of selection.
///
/// Slot 0 is conventionally seeded with the no-op program as an inert
/// baseline.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Population {
    programs: Vec<Program>,
}

impl Population {
    pub fn new(programs: Vec<Program>) -> Self {
        Self { programs }
    }

    /// Seeds a population: the no-op baseline in slot 0, random programs in
    /// the remaining `count − 1` slots.
    pub fn seeded(
        count: usize,
        program_len: usize,
        vocab: &Vocabulary,
        limits: &GenLimits,
        rng: &mut impl Rng,
    ) -> Self {
        let mut programs = Vec::with_capacity(count);
        if count > 0 {
            programs.push(Program::no_op(program_len));
        }
        while programs.len() < count {
            programs.push(Program::random(program_len, vocab, limits, rng));
        }
        Self { programs }
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn get(&self, index: usize) -> Option<&Program> {
        self.programs.get(index)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
