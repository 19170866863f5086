use serde::{Deserialize, Serialize};

use crate::{
    config::MAX_VOCAB_SIZE,
    error::{HuffmanError, Result},
    huffman::Token,
};

if_tracing! {
    use tracing::trace;
}

/// Occurrence counts for every token of a vocabulary.
///
/// The table only ever grows: [`accumulate`](FrequencyTable::accumulate) can be called on many
/// inputs in a row before a single tree build, and there is no way to decrement a count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "SparseCounts", try_from = "SparseCounts")]
pub struct FrequencyTable {
    counts: Vec<u64>,
}

impl FrequencyTable {
    /// Creates a zeroed table for `vocab_size` tokens.
    pub fn new(vocab_size: usize) -> Self {
        Self {
            counts: vec![0; vocab_size],
        }
    }

    /// Zeroes every count.
    pub fn clear(&mut self) {
        self.counts.fill(0);
    }

    /// Counts each byte of `data` once.
    ///
    /// # Errors
    ///
    /// Returns [`HuffmanError::TokenOutOfRange`] if a byte does not fit in the vocabulary. Bytes
    /// before the offending one have already been counted.
    pub fn accumulate(&mut self, data: &[u8]) -> Result<()> {
        if_tracing! {
            trace!(target = "frequency", input_len = data.len(), "accumulate bytes");
        }
        for &byte in data {
            self.bump(usize::from(byte), 1)?;
        }
        Ok(())
    }

    /// Counts each token of `tokens` once.
    ///
    /// # Errors
    ///
    /// Returns [`HuffmanError::TokenOutOfRange`] as [`accumulate`](FrequencyTable::accumulate).
    pub fn accumulate_tokens(&mut self, tokens: &[Token]) -> Result<()> {
        for &token in tokens {
            self.bump(usize::from(token), 1)?;
        }
        Ok(())
    }

    /// Adds `count` occurrences of `token` without any input data.
    ///
    /// # Errors
    ///
    /// Returns [`HuffmanError::TokenOutOfRange`] for tokens outside the vocabulary.
    pub fn seed(&mut self, token: Token, count: u64) -> Result<()> {
        self.bump(usize::from(token), count)
    }

    fn bump(&mut self, token: usize, by: u64) -> Result<()> {
        let vocab_size = self.counts.len();
        let slot = self
            .counts
            .get_mut(token)
            .ok_or(HuffmanError::TokenOutOfRange { token, vocab_size })?;
        *slot = slot.saturating_add(by);
        Ok(())
    }

    /// Count recorded for `token`, or 0 outside the vocabulary.
    pub fn get(&self, token: Token) -> u64 {
        self.counts.get(usize::from(token)).copied().unwrap_or(0)
    }

    pub fn vocab_size(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of tokens with a nonzero count.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&count| count != 0).count()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().fold(0u64, |acc, &count| acc.saturating_add(count))
    }

    /// Every `(token, count)` pair with a nonzero count, in token order.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (Token, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count != 0)
            .map(|(token, &count)| (token as Token, count))
    }
}

/// On-disk form of a [`FrequencyTable`]: only the used tokens are listed.
#[derive(Serialize, Deserialize)]
struct SparseCounts {
    vocab_size: usize,
    counts: Vec<(Token, u64)>,
}

impl From<FrequencyTable> for SparseCounts {
    fn from(table: FrequencyTable) -> Self {
        Self {
            vocab_size: table.vocab_size(),
            counts: table.iter_nonzero().collect(),
        }
    }
}

impl TryFrom<SparseCounts> for FrequencyTable {
    type Error = HuffmanError;

    fn try_from(sparse: SparseCounts) -> Result<Self> {
        if sparse.vocab_size == 0 || sparse.vocab_size > MAX_VOCAB_SIZE {
            return Err(HuffmanError::InvalidConfig(format!(
                "vocab_size must be in 1..={}, got {}",
                MAX_VOCAB_SIZE, sparse.vocab_size
            )));
        }
        let mut table = FrequencyTable::new(sparse.vocab_size);
        for (token, count) in sparse.counts {
            table.seed(token, count)?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_across_calls() {
        let mut table = FrequencyTable::new(256);
        table.accumulate(b"abracadabra").unwrap();
        table.accumulate(b"cab").unwrap();

        assert_eq!(table.get(u16::from(b'a')), 6);
        assert_eq!(table.get(u16::from(b'b')), 3);
        assert_eq!(table.get(u16::from(b'c')), 2);
        assert_eq!(table.get(u16::from(b'z')), 0);
        assert_eq!(table.distinct(), 5);
        assert_eq!(table.total(), 14);
    }

    #[test]
    fn clear_resets_counts() {
        let mut table = FrequencyTable::new(256);
        table.accumulate(b"xyz").unwrap();
        table.clear();
        assert_eq!(table.total(), 0);
        assert_eq!(table, FrequencyTable::new(256));
    }

    #[test]
    fn bytes_outside_small_vocabulary_fail() {
        let mut table = FrequencyTable::new(4);
        table.accumulate(&[0, 1, 3]).unwrap();
        assert_eq!(
            table.accumulate(&[2, 4]),
            Err(HuffmanError::TokenOutOfRange { token: 4, vocab_size: 4 })
        );
        assert_eq!(table.get(2), 1);
    }

    #[test]
    fn wide_tokens() {
        let mut table = FrequencyTable::new(1024);
        table.accumulate_tokens(&[1000, 1000, 7]).unwrap();
        table.seed(512, 40).unwrap();
        assert_eq!(table.iter_nonzero().collect::<Vec<_>>(), [(7, 1), (512, 40), (1000, 2)]);
    }

    #[test]
    fn json_lists_only_used_tokens() {
        let mut table = FrequencyTable::new(256);
        table.accumulate(b"aab").unwrap();

        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"vocab_size":256,"counts":[[97,2],[98,1]]}"#);

        let restored: FrequencyTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn json_with_out_of_range_token_is_rejected() {
        let json = r#"{"vocab_size":4,"counts":[[9,1]]}"#;
        assert!(serde_json::from_str::<FrequencyTable>(json).is_err());
    }

    #[test]
    fn json_with_unusable_vocab_size_is_rejected() {
        let huge = r#"{"vocab_size":1000000000000000,"counts":[]}"#;
        let err = serde_json::from_str::<FrequencyTable>(huge).unwrap_err();
        assert!(err.to_string().contains("vocab_size must be in 1..=65536"), "{}", err);

        let empty = r#"{"vocab_size":0,"counts":[]}"#;
        assert!(serde_json::from_str::<FrequencyTable>(empty).is_err());

        let widest = r#"{"vocab_size":65536,"counts":[[65535,3]]}"#;
        let table = serde_json::from_str::<FrequencyTable>(widest).unwrap();
        assert_eq!(table.get(65535), 3);
    }
}
