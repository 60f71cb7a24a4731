//! Population persistence.
//!
//! Populations are written as a small binary container: a magic tag, a
//! three-byte format version, then the borsh-encoded program list. Decoding
//! validates the magic, demands an exact version match, and rejects
//! trailing bytes, so a corrupt or foreign file fails loudly instead of
//! yielding a partial population.

use std::fs;
use std::path::Path;

use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;

use crate::evolve::population::Population;

/// Magic bytes identifying a population file.
const MAGIC: &[u8; 6] = b"EVOPOP";

/// Current file format version; bumped whenever the instruction encoding
/// changes shape.
const CURRENT_VERSION: [u8; 3] = [1, 0, 0];

const HEADER_LEN: usize = MAGIC.len() + CURRENT_VERSION.len();

/// Failures while reading or writing a population file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is shorter than the header.
    #[error("population file is truncated")]
    Truncated,
    /// The file does not start with the population magic.
    #[error("not a population file (bad magic)")]
    BadMagic,
    /// The file was written by an incompatible format revision.
    #[error("unsupported population file version {found:?}, expected {expected:?}")]
    UnsupportedVersion { found: [u8; 3], expected: [u8; 3] },
    /// The payload failed to decode as a program list.
    #[error("malformed population payload: {0}")]
    Decode(String),
    /// Well-formed payload followed by garbage.
    #[error("{0} trailing bytes after population payload")]
    TrailingBytes(usize),
}

/// Serializes a population to the portable container format.
pub fn to_bytes(population: &Population) -> Result<Vec<u8>, StoreError> {
    let mut out = Vec::with_capacity(HEADER_LEN + 64 * population.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&CURRENT_VERSION);
    population.serialize(&mut out)?;
    Ok(out)
}

/// Deserializes a population, validating magic, version, and length.
pub fn from_bytes(input: &[u8]) -> Result<Population, StoreError> {
    if input.len() < HEADER_LEN {
        return Err(StoreError::Truncated);
    }
    if &input[..MAGIC.len()] != MAGIC {
        return Err(StoreError::BadMagic);
    }
    let mut found = [0u8; 3];
    found.copy_from_slice(&input[MAGIC.len()..HEADER_LEN]);
    if found != CURRENT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found,
            expected: CURRENT_VERSION,
        });
    }

    let mut rest = &input[HEADER_LEN..];
    let population =
        Population::deserialize(&mut rest).map_err(|e| StoreError::Decode(e.to_string()))?;
    if !rest.is_empty() {
        return Err(StoreError::TrailingBytes(rest.len()));
    }
    Ok(population)
}

/// Writes `population` to `path`, replacing any existing file.
pub fn save(path: &Path, population: &Population) -> Result<(), StoreError> {
    fs::write(path, to_bytes(population)?)?;
    Ok(())
}

/// Reads the population stored at `path`.
pub fn load(path: &Path) -> Result<Population, StoreError> {
    from_bytes(&fs::read(path)?)
}
