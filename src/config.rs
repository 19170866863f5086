use serde::{Deserialize, Serialize};

use crate::error::{HuffmanError, Result};

/// Number of tokens in a plain byte alphabet.
pub const DEFAULT_VOCAB_SIZE: usize = 256;

/// Largest vocabulary a [`Token`](crate::Token) can address.
pub const MAX_VOCAB_SIZE: usize = 1 << 16;

/// Default stream buffer size, in bytes.
pub const DEFAULT_STREAM_CAPACITY: usize = 8192;

/// What to do when the frequency table contains exactly one used token.
///
/// A lone leaf sits at depth zero, so a plain traversal would give it an empty code that the
/// decoder can never consume.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SingleSymbolPolicy {
    /// Give the token the one-bit code `0`.
    #[default]
    OneBit,
    /// Refuse to build a code and report [`HuffmanError::SingleSymbolAlphabet`].
    Reject,
}

/// Sizing and policy parameters shared by the tree, code table and stream.
///
/// The vocabulary size, the node count and the stream capacity scale together, so they are
/// checked once in [`validate`](CodecConfig::validate) rather than at every use.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct CodecConfig {
    /// Number of distinct tokens. Must be at least 256 to encode arbitrary bytes.
    pub vocab_size: usize,
    /// Capacity of an output stream, in bytes.
    pub stream_capacity: usize,
    /// Handling of single-symbol alphabets.
    pub single_symbol: SingleSymbolPolicy,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            vocab_size: DEFAULT_VOCAB_SIZE,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
            single_symbol: SingleSymbolPolicy::default(),
        }
    }
}

impl CodecConfig {
    /// Upper bound on the number of nodes a tree over this vocabulary can hold. Zero for an
    /// empty vocabulary.
    pub const fn max_nodes(&self) -> usize {
        self.vocab_size.saturating_mul(2).saturating_sub(1)
    }

    /// Capacity of an output stream, in bits. Saturates for capacities that
    /// [`validate`](CodecConfig::validate) rejects.
    pub const fn stream_capacity_bits(&self) -> usize {
        self.stream_capacity.saturating_mul(8)
    }

    /// Checks that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`HuffmanError::InvalidConfig`] naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 || self.vocab_size > MAX_VOCAB_SIZE {
            return Err(HuffmanError::InvalidConfig(format!(
                "vocab_size must be in 1..={}, got {}",
                MAX_VOCAB_SIZE, self.vocab_size
            )));
        }
        if self.stream_capacity == 0 {
            return Err(HuffmanError::InvalidConfig("stream_capacity must be nonzero".to_string()));
        }
        if self.stream_capacity.checked_mul(8).is_none() {
            return Err(HuffmanError::InvalidConfig(format!(
                "stream_capacity of {} bytes cannot be addressed in bits",
                self.stream_capacity
            )));
        }
        Ok(())
    }

    /// Looks up a named preset.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" | "bytes" => Some(Self::default()),
            "wide" => Some(Self {
                vocab_size: MAX_VOCAB_SIZE,
                stream_capacity: 1 << 20,
                single_symbol: SingleSymbolPolicy::OneBit,
            }),
            "strict" => Some(Self {
                single_symbol: SingleSymbolPolicy::Reject,
                ..Self::default()
            }),
            _ => None,
        }
    }

    /// Parses a configuration from JSON. Missing fields take their default value.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
