/// Identifier generation for stored objects
use crate::error::{RelayError, RelayResult};
use rand::{rngs::OsRng, RngCore};

/// URL-safe alphabet, 64 symbols
const ALPHABET: &[u8; 64] = b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

/// Default identifier length (21 symbols, ~126 bits of entropy)
pub const ID_LENGTH: usize = 21;

/// Source of object identifiers
pub trait IdGenerator: Send + Sync {
    /// Produce a fresh identifier
    fn generate(&self) -> RelayResult<String>;
}

/// Random identifiers drawn from the OS CSPRNG
#[derive(Debug, Clone, Copy)]
pub struct NanoIdGenerator {
    length: usize,
}

impl NanoIdGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for NanoIdGenerator {
    fn default() -> Self {
        Self::new(ID_LENGTH)
    }
}

impl IdGenerator for NanoIdGenerator {
    fn generate(&self) -> RelayResult<String> {
        let mut bytes = vec![0u8; self.length];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| RelayError::RandomnessUnavailable(e.to_string()))?;

        // 256 is a multiple of 64, so masking keeps the distribution uniform
        Ok(bytes
            .iter()
            .map(|b| ALPHABET[(b & 63) as usize] as char)
            .collect())
    }
}
