use thiserror::Error;

/// Errors raised while configuring or driving an evolutionary run.
///
/// Everything here is either a construction-time configuration rejection or
/// a worker-join failure; evaluation itself is deterministic and infallible,
/// so nothing in this module is ever retried.
#[derive(Debug, Error)]
pub enum EvolveError {
    /// The generation vocabulary has no opcode with nonzero weight.
    #[error("vocabulary has no selectable opcodes")]
    EmptyVocabulary,
    /// The test array would not fit in machine memory.
    #[error("test array length {array_len} exceeds memory length {mem_len}")]
    ArrayExceedsMemory { array_len: usize, mem_len: usize },
    /// A run needs at least one test array cell.
    #[error("test array length must be nonzero")]
    EmptyArray,
    /// A run needs at least one program.
    #[error("population must hold at least one program")]
    EmptyPopulation,
    /// Generated programs need at least one instruction slot.
    #[error("program length must be nonzero")]
    EmptyProgram,
    /// Test array values are drawn from `0..value_range`.
    #[error("value range must be positive, got {0}")]
    InvalidValueRange(i64),
    /// Learning and mutation rates are fractions.
    #[error("{name} must be within [0.0, 1.0], got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },
    /// An evaluation task panicked or was cancelled at the join.
    #[error("evaluation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
