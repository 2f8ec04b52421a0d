//! Incremental SHA-256 content digest.
//!
//! The accumulator is fed chunks in order and finalized once. The result only
//! depends on the concatenated bytes, never on how they were chunked, which
//! is what lets streaming and whole-buffer hashing be swapped freely.

use crate::error::ReadError;
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

const BUF_SIZE: usize = 64 * 1024;

/// A finalized 256-bit content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    fn from_slice(raw: &[u8]) -> Self {
        let mut out = [0u8; 32];
        out.copy_from_slice(raw);
        Digest(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = ReadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut out)
            .map_err(|e| ReadError::InvalidState(format!("bad digest hex {:?}: {}", s, e)))?;
        Ok(Digest(out))
    }
}

/// Running hash state. `None` once finalized.
#[derive(Debug, Clone)]
pub struct Accumulator {
    state: Option<Sha256>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            state: Some(Sha256::new()),
        }
    }

    /// Feed the next chunk. Zero-length chunks are accepted and change nothing.
    pub fn update(&mut self, chunk: &[u8]) -> Result<(), ReadError> {
        match self.state.as_mut() {
            Some(h) => {
                h.update(chunk);
                Ok(())
            }
            None => Err(ReadError::InvalidState(
                "update after finalize".to_string(),
            )),
        }
    }

    /// Produce the digest. A second call fails with `InvalidState`.
    pub fn finalize(&mut self) -> Result<Digest, ReadError> {
        let h = self.state.take().ok_or_else(|| {
            ReadError::InvalidState("accumulator already finalized".to_string())
        })?;
        Ok(Digest::from_slice(&h.finalize()))
    }

    pub fn is_finalized(&self) -> bool {
        self.state.is_none()
    }
}

/// One-shot digest of an in-memory buffer.
pub fn of_bytes(data: &[u8]) -> Digest {
    Digest::from_slice(&Sha256::digest(data))
}

/// Digest of a local file, read in bounded chunks.
pub fn sha256_path(path: &Path) -> Result<Digest, ReadError> {
    let mut f = File::open(path).map_err(|e| ReadError::from_io(path, e))?;
    let mut acc = Accumulator::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf).map_err(|e| ReadError::from_io(path, e))?;
        if n == 0 {
            break;
        }
        acc.update(&buf[..n])?;
    }
    acc.finalize()
}
