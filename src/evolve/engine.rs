//! The evolutionary search loop.
//!
//! One round: draw a test array (or reuse the run's fixed one), evaluate
//! every program in parallel, sort by score, keep the elite, refill the
//! rest with mutated elites. Rounds repeat for a caller-chosen count; there
//! is deliberately no convergence detection or early stop.
//!
//! Evaluation fans out one task per program and joins them all before
//! selection. Tasks share nothing mutable: each gets its own program clone
//! and allocates its own memory buffer, with the round's test array shared
//! read-only. Every task is bounded by the interpreter's step budget, so no
//! cancellation or timeout exists beyond the join itself.

use std::cmp::Reverse;
use std::sync::Arc;

use futures::future;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::evolve::errors::EvolveError;
use crate::evolve::fitness::{Evaluator, ScoreRule, Scored};
use crate::evolve::population::{GenLimits, Population, Vocabulary};
use crate::machine::program::Program;

/// Knobs for one evolutionary run.
#[derive(Clone, Debug)]
pub struct EvolveConfig {
    /// Programs per generation.
    pub population_size: usize,
    /// Instructions per generated program.
    pub program_len: usize,
    /// Test array length.
    pub array_len: usize,
    /// Machine memory cells per evaluation; at least `array_len`.
    pub mem_len: usize,
    /// Test array values are drawn from `0..value_range`.
    pub value_range: i64,
    /// Interpreter step budget per evaluation.
    pub step_budget: u64,
    /// Fraction of the population replaced each round.
    pub learning_rate: f64,
    /// Fraction of instruction slots re-rolled per mutation.
    pub mutation_rate: f64,
    /// Scoring rule for every evaluation in the run.
    pub rule: ScoreRule,
    /// Draw a fresh test array every round; when false, one array drawn at
    /// engine construction is reused for the whole run.
    pub randomize_each_round: bool,
    /// Opcode set (with weights) available to generation and mutation.
    pub vocabulary: Vocabulary,
}

impl Default for EvolveConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            program_len: 30,
            array_len: 10,
            mem_len: 16,
            value_range: 10,
            step_budget: 1_000,
            learning_rate: 0.2,
            mutation_rate: 0.1,
            rule: ScoreRule::Inversions,
            randomize_each_round: true,
            vocabulary: Vocabulary::default(),
        }
    }
}

impl EvolveConfig {
    /// Rejects configurations the run could not execute.
    pub fn validate(&self) -> Result<(), EvolveError> {
        if self.population_size == 0 {
            return Err(EvolveError::EmptyPopulation);
        }
        if self.program_len == 0 {
            return Err(EvolveError::EmptyProgram);
        }
        if self.array_len == 0 {
            return Err(EvolveError::EmptyArray);
        }
        if self.array_len > self.mem_len {
            return Err(EvolveError::ArrayExceedsMemory {
                array_len: self.array_len,
                mem_len: self.mem_len,
            });
        }
        if self.value_range < 1 {
            return Err(EvolveError::InvalidValueRange(self.value_range));
        }
        for (name, value) in [
            ("learning rate", self.learning_rate),
            ("mutation rate", self.mutation_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EvolveError::RateOutOfRange { name, value });
            }
        }
        Ok(())
    }

    /// Operand ranges implied by this configuration.
    pub fn limits(&self) -> GenLimits {
        GenLimits::new(self.array_len, self.program_len as i32)
    }
}

/// Best and mean score over a population.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
    pub best: f64,
    pub mean: f64,
}

/// Drives rounds of evaluate → select → reproduce.
pub struct Engine {
    cfg: EvolveConfig,
    evaluator: Evaluator,
    limits: GenLimits,
    fixed_array: Option<Vec<i64>>,
    rng: StdRng,
}

impl Engine {
    /// Builds an engine seeded from the operating system.
    pub fn new(cfg: EvolveConfig) -> Result<Self, EvolveError> {
        Self::with_rng(cfg, StdRng::from_os_rng())
    }

    /// Builds an engine with a fixed seed; identical seeds and
    /// configurations replay identical runs.
    pub fn seeded(cfg: EvolveConfig, seed: u64) -> Result<Self, EvolveError> {
        Self::with_rng(cfg, StdRng::seed_from_u64(seed))
    }

    fn with_rng(cfg: EvolveConfig, mut rng: StdRng) -> Result<Self, EvolveError> {
        cfg.validate()?;
        let fixed_array = (!cfg.randomize_each_round)
            .then(|| random_array(cfg.array_len, cfg.value_range, &mut rng));
        Ok(Self {
            evaluator: Evaluator::new(cfg.mem_len, cfg.step_budget, cfg.rule),
            limits: cfg.limits(),
            fixed_array,
            rng,
            cfg,
        })
    }

    pub fn config(&self) -> &EvolveConfig {
        &self.cfg
    }

    /// Seeds a starting population: the no-op baseline plus random programs.
    pub fn seed_population(&mut self) -> Population {
        Population::seeded(
            self.cfg.population_size,
            self.cfg.program_len,
            &self.cfg.vocabulary,
            &self.limits,
            &mut self.rng,
        )
    }

    /// The round's test array under the run's randomization policy.
    fn next_array(&mut self) -> Vec<i64> {
        match &self.fixed_array {
            Some(array) => array.clone(),
            None => random_array(self.cfg.array_len, self.cfg.value_range, &mut self.rng),
        }
    }

    /// Evaluates every program against `array`, one task per program, and
    /// returns the results sorted by score descending (ties keep their
    /// population order). Completion order carries no meaning; results are
    /// re-sorted after the join.
    pub async fn eval_all(
        &self,
        programs: &[Program],
        array: &[i64],
    ) -> Result<Vec<Scored>, EvolveError> {
        let shared: Arc<[i64]> = Arc::from(array);
        let tasks: Vec<_> = programs
            .iter()
            .cloned()
            .map(|program| {
                let evaluator = self.evaluator;
                let array = Arc::clone(&shared);
                tokio::spawn(async move {
                    let score = evaluator.score(&program, &array);
                    Scored { program, score }
                })
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for joined in future::join_all(tasks).await {
            results.push(joined?);
        }
        results.sort_by_key(|scored| Reverse(scored.score));
        Ok(results)
    }

    /// Elite slots retained per round: `floor(n × (1 − learning_rate))`,
    /// clamped so the pool mutation draws from is never empty.
    fn keep_count(&self, n: usize) -> usize {
        ((n as f64 * (1.0 - self.cfg.learning_rate)).floor() as usize).clamp(1, n)
    }

    /// Runs one evaluate → select → reproduce round, replacing the
    /// population with the next generation.
    pub async fn round(&mut self, population: &mut Population) -> Result<(), EvolveError> {
        if population.is_empty() {
            return Err(EvolveError::EmptyPopulation);
        }
        let array = self.next_array();
        let results = self.eval_all(population.programs(), &array).await?;

        let keep = self.keep_count(results.len());
        let mut next: Vec<Program> = results
            .iter()
            .take(keep)
            .map(|scored| scored.program.clone())
            .collect();
        while next.len() < results.len() {
            let parent = self.rng.random_range(0..keep);
            let child = next[parent].mutated(
                self.cfg.mutation_rate,
                &self.cfg.vocabulary,
                &self.limits,
                &mut self.rng,
            );
            next.push(child);
        }

        *population = Population::new(next);
        Ok(())
    }

    /// Runs `rounds` rounds back to back.
    pub async fn evolve(
        &mut self,
        population: &mut Population,
        rounds: usize,
    ) -> Result<(), EvolveError> {
        for _ in 0..rounds {
            self.round(population).await?;
        }
        Ok(())
    }

    /// Mean score per program over `samples` test arrays drawn under the
    /// run's randomization policy, in input order.
    pub async fn measure(
        &mut self,
        programs: &[Program],
        samples: usize,
    ) -> Result<Vec<f64>, EvolveError> {
        let samples = samples.max(1);
        let fixed: Option<Arc<[i64]>> = self.fixed_array.as_deref().map(Arc::from);
        let tasks: Vec<_> = programs
            .iter()
            .cloned()
            .map(|program| {
                let evaluator = self.evaluator;
                let (len, range) = (self.cfg.array_len, self.cfg.value_range);
                let seed: u64 = self.rng.random();
                let fixed = fixed.clone();
                tokio::spawn(async move {
                    let mut rng = StdRng::seed_from_u64(seed);
                    let mut sum = 0i64;
                    for _ in 0..samples {
                        let score = match &fixed {
                            Some(array) => evaluator.score(&program, array),
                            None => {
                                evaluator.score(&program, &random_array(len, range, &mut rng))
                            }
                        };
                        sum += score;
                    }
                    sum as f64 / samples as f64
                })
            })
            .collect();

        let mut means = Vec::with_capacity(tasks.len());
        for joined in future::join_all(tasks).await {
            means.push(joined?);
        }
        Ok(means)
    }

    /// Best and mean of the per-program means; the reporting contract the
    /// CLI prints before and after a run.
    pub async fn summary(
        &mut self,
        population: &Population,
        samples: usize,
    ) -> Result<Summary, EvolveError> {
        if population.is_empty() {
            return Err(EvolveError::EmptyPopulation);
        }
        let means = self.measure(population.programs(), samples).await?;
        let best = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = means.iter().sum::<f64>() / means.len() as f64;
        Ok(Summary { best, mean })
    }
}

/// Draws a test array of `len` values from `0..value_range`.
pub fn random_array(len: usize, value_range: i64, rng: &mut impl Rng) -> Vec<i64> {
    (0..len).map(|_| rng.random_range(0..value_range)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::isa::{Arg, Instruction, OpCode};

    fn small_config() -> EvolveConfig {
        EvolveConfig {
            population_size: 12,
            program_len: 10,
            array_len: 4,
            mem_len: 8,
            value_range: 6,
            step_budget: 200,
            ..EvolveConfig::default()
        }
    }

    // ==================== Configuration ====================

    #[test]
    fn default_config_validates() {
        assert!(EvolveConfig::default().validate().is_ok());
    }

    #[test]
    fn config_rejects_array_larger_than_memory() {
        let cfg = EvolveConfig {
            array_len: 20,
            mem_len: 8,
            ..EvolveConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(EvolveError::ArrayExceedsMemory {
                array_len: 20,
                mem_len: 8
            })
        ));
    }

    #[test]
    fn config_rejects_out_of_range_rates() {
        let cfg = EvolveConfig {
            learning_rate: 1.5,
            ..EvolveConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(EvolveError::RateOutOfRange { name: "learning rate", .. })
        ));
        let cfg = EvolveConfig {
            mutation_rate: -0.1,
            ..EvolveConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(EvolveError::RateOutOfRange { name: "mutation rate", .. })
        ));
    }

    #[test]
    fn config_rejects_degenerate_sizes() {
        for cfg in [
            EvolveConfig {
                population_size: 0,
                ..EvolveConfig::default()
            },
            EvolveConfig {
                program_len: 0,
                ..EvolveConfig::default()
            },
            EvolveConfig {
                array_len: 0,
                ..EvolveConfig::default()
            },
            EvolveConfig {
                value_range: 0,
                ..EvolveConfig::default()
            },
        ] {
            assert!(cfg.validate().is_err());
        }
    }

    #[test]
    fn keep_count_is_clamped_to_at_least_one() {
        let cfg = EvolveConfig {
            learning_rate: 1.0,
            ..small_config()
        };
        let engine = Engine::seeded(cfg, 0).unwrap();
        assert_eq!(engine.keep_count(10), 1);
        let cfg = EvolveConfig {
            learning_rate: 0.2,
            ..small_config()
        };
        let engine = Engine::seeded(cfg, 0).unwrap();
        assert_eq!(engine.keep_count(10), 8);
    }

    // ==================== Evaluation ====================

    #[tokio::test]
    async fn eval_all_sorts_by_score_descending() {
        let cfg = EvolveConfig {
            array_len: 2,
            rule: ScoreRule::Preserving,
            ..small_config()
        };
        let engine = Engine::seeded(cfg, 1).unwrap();
        // A perfect two-cell sorter, the no-op baseline, and a program that
        // swaps a value out into scratch memory.
        let sorter = Program::new(vec![
            Instruction::Jlt {
                a: Arg::Loc(1),
                b: Arg::Loc(0),
                offset: 2,
            },
            Instruction::Jump { offset: 2 },
            Instruction::Swap {
                a: Arg::Loc(0),
                b: Arg::Loc(1),
            },
        ]);
        let spoiler = Program::new(vec![Instruction::Swap {
            a: Arg::Loc(0),
            b: Arg::Loc(7),
        }]);
        let programs = vec![spoiler.clone(), Program::no_op(3), sorter.clone()];

        // Strict ranking on [2, 1]: the sorter scores 0, the no-op −1 (one
        // inversion), the spoiler −2 (a 2 drifted out, a 0 drifted in).
        let results = engine.eval_all(&programs, &[2, 1]).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].program, sorter);
        assert_eq!(results[0].score, 0);
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);
        assert_eq!(results[2].program, spoiler);
    }

    #[tokio::test]
    async fn eval_all_ties_keep_population_order() {
        let engine = Engine::seeded(small_config(), 2).unwrap();
        let a = Program::no_op(1);
        let b = Program::no_op(2);
        let c = Program::no_op(3);
        let results = engine
            .eval_all(&[a.clone(), b.clone(), c.clone()], &[1, 2, 3, 4])
            .await
            .unwrap();
        let programs: Vec<_> = results.iter().map(|s| s.program.clone()).collect();
        assert_eq!(programs, vec![a, b, c]);
    }

    // ==================== Rounds ====================

    #[tokio::test]
    async fn round_preserves_population_size_and_program_length() {
        let mut engine = Engine::seeded(small_config(), 3).unwrap();
        let mut population = engine.seed_population();
        engine.round(&mut population).await.unwrap();
        assert_eq!(population.len(), 12);
        for program in population.programs() {
            assert_eq!(program.len(), 10);
        }
    }

    #[tokio::test]
    async fn round_retains_the_elite_unchanged() {
        let cfg = EvolveConfig {
            randomize_each_round: false,
            ..small_config()
        };
        let mut engine = Engine::seeded(cfg, 4).unwrap();
        let mut population = engine.seed_population();

        let array = engine.fixed_array.clone().unwrap();
        let before = engine.eval_all(population.programs(), &array).await.unwrap();
        let keep = engine.keep_count(before.len());

        engine.round(&mut population).await.unwrap();
        for (slot, scored) in population.programs().iter().zip(&before).take(keep) {
            assert_eq!(slot, &scored.program);
        }
    }

    #[tokio::test]
    async fn refilled_slots_share_length_with_their_parents() {
        let cfg = EvolveConfig {
            learning_rate: 0.5,
            ..small_config()
        };
        let mut engine = Engine::seeded(cfg, 5).unwrap();
        let mut population = engine.seed_population();
        engine.evolve(&mut population, 3).await.unwrap();
        assert_eq!(population.len(), 12);
        assert!(population.programs().iter().all(|p| p.len() == 10));
    }

    #[tokio::test]
    async fn round_on_an_empty_population_is_rejected() {
        let mut engine = Engine::seeded(small_config(), 6).unwrap();
        let mut population = Population::new(vec![]);
        assert!(matches!(
            engine.round(&mut population).await,
            Err(EvolveError::EmptyPopulation)
        ));
    }

    #[tokio::test]
    async fn seeded_runs_replay_identically() {
        let mut first = Engine::seeded(small_config(), 7).unwrap();
        let mut second = Engine::seeded(small_config(), 7).unwrap();
        let mut pop_a = first.seed_population();
        let mut pop_b = second.seed_population();
        assert_eq!(pop_a, pop_b);
        first.evolve(&mut pop_a, 4).await.unwrap();
        second.evolve(&mut pop_b, 4).await.unwrap();
        assert_eq!(pop_a, pop_b);
    }

    // ==================== Reporting ====================

    #[tokio::test]
    async fn summary_scores_are_never_positive() {
        let mut engine = Engine::seeded(small_config(), 8).unwrap();
        let population = engine.seed_population();
        let summary = engine.summary(&population, 16).await.unwrap();
        assert!(summary.best <= 0.0);
        assert!(summary.mean <= summary.best);
    }

    #[tokio::test]
    async fn single_value_range_scores_every_program_zero_inversions() {
        // With every array cell equal, no program can create an inversion.
        let cfg = EvolveConfig {
            value_range: 1,
            vocabulary: Vocabulary::uniform(&[OpCode::Swap, OpCode::Label]).unwrap(),
            ..small_config()
        };
        let mut engine = Engine::seeded(cfg, 9).unwrap();
        let population = engine.seed_population();
        let means = engine.measure(population.programs(), 5).await.unwrap();
        assert!(means.iter().all(|&m| m == 0.0));
    }

    #[tokio::test]
    async fn fixed_array_policy_reuses_one_array() {
        let cfg = EvolveConfig {
            randomize_each_round: false,
            ..small_config()
        };
        let mut engine = Engine::seeded(cfg, 10).unwrap();
        let fixed = engine.fixed_array.clone().unwrap();
        assert_eq!(engine.next_array(), fixed);
        assert_eq!(engine.next_array(), fixed);
    }
}
