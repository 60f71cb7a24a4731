use thiserror::Error;

/// Faults surfaced by strict-mode execution.
///
/// Permissive mode (the mode the evolutionary loop runs in) contains every
/// one of these conditions as a no-op and never constructs this type.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MachineError {
    /// A computed address fell outside the memory buffer.
    #[error("address {addr} out of range for memory of {len} cells")]
    AddressOutOfRange { addr: i64, len: usize },
}
