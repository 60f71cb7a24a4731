//! Fitness scoring.
//!
//! An [`Evaluator`] is a pure function from (program, input array) to a
//! scalar score: copy the input into a fresh zeroed memory buffer, run the
//! program under the step budget in permissive mode, score what came out.
//! Scores are never positive; zero is a perfect, value-preserving,
//! non-decreasing result.

use std::collections::HashMap;

use crate::machine::interpreter::run_contained;
use crate::machine::program::Program;

/// Which penalties the score accumulates.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ScoreRule {
    /// Canonical rule: −1 per adjacent inversion within the input-length
    /// prefix of the output buffer.
    #[default]
    Inversions,
    /// Stricter rule: the inversion penalty plus, per distinct value, the
    /// absolute difference between its count in the input and in the
    /// input-length prefix of the output. Punishes programs that discard
    /// input values instead of ordering them.
    Preserving,
}

/// A program paired with its score; higher is better, 0 is perfect.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Scored {
    pub program: Program,
    pub score: i64,
}

/// Scores programs against input arrays.
#[derive(Clone, Copy, Debug)]
pub struct Evaluator {
    mem_len: usize,
    step_budget: u64,
    rule: ScoreRule,
}

impl Evaluator {
    /// Creates an evaluator; `mem_len` cells of machine memory per run,
    /// `step_budget` instructions per run.
    pub fn new(mem_len: usize, step_budget: u64, rule: ScoreRule) -> Self {
        Self {
            mem_len,
            step_budget,
            rule,
        }
    }

    /// Runs `program` over a fresh buffer seeded with `input` and returns
    /// the score together with the final memory.
    pub fn run(&self, program: &Program, input: &[i64]) -> (i64, Vec<i64>) {
        // Engine configuration guarantees input fits; clamp rather than
        // index past either buffer if a caller bypassed that validation.
        let prefix = input.len().min(self.mem_len);
        let mut mem = vec![0i64; self.mem_len];
        mem[..prefix].copy_from_slice(&input[..prefix]);

        run_contained(program, &mut mem, self.step_budget);

        let mut score = inversion_penalty(&mem[..prefix]);
        if self.rule == ScoreRule::Preserving {
            score += drift_penalty(&input[..prefix], &mem[..prefix]);
        }
        (score, mem)
    }

    /// Runs `program` and returns its score.
    pub fn score(&self, program: &Program, input: &[i64]) -> i64 {
        self.run(program, input).0
    }
}

/// −1 for each position whose value is strictly below its left neighbor.
fn inversion_penalty(out: &[i64]) -> i64 {
    let mut penalty = 0;
    for pair in out.windows(2) {
        if pair[1] < pair[0] {
            penalty -= 1;
        }
    }
    penalty
}

/// Negated sum over distinct values of |count in input − count in output|.
fn drift_penalty(input: &[i64], out: &[i64]) -> i64 {
    let mut residual: HashMap<i64, i64> = HashMap::new();
    for &v in input {
        *residual.entry(v).or_default() += 1;
    }
    for &v in out {
        *residual.entry(v).or_default() -= 1;
    }
    -residual.values().map(|c| c.abs()).sum::<i64>()
}
