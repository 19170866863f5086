use thiserror::Error;

use crate::huffman::Token;

/// Errors produced while building, deriving, encoding or decoding a Huffman code.
///
/// Every variant is a deterministic logic error local to the caller; retrying the same
/// operation with the same inputs fails the same way.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HuffmanError {
    /// The frequency table had no nonzero entries, so the tree has no root.
    #[error("frequency table has no nonzero entries, cannot build a tree")]
    EmptyAlphabet,

    /// Exactly one token occurs, and the configured policy refuses to give it a code.
    #[error("alphabet contains a single symbol ({token}) and the single-symbol policy rejects it")]
    SingleSymbolAlphabet { token: Token },

    /// Writing one more bit would exceed the stream's capacity.
    #[error("bit stream overflow: writing past the capacity of {capacity} bits")]
    StreamOverflow { capacity: usize },

    /// Reading one more bit would pass the logical end of the stream.
    #[error("bit stream underflow: read at bit {position} but only {len} bits are available")]
    StreamUnderflow { position: usize, len: usize },

    /// The bits read at `position` do not lead to any leaf of the tree.
    #[error("bit {position} does not continue any assigned code")]
    InvalidCode { position: usize },

    /// The token has no code because it never occurred in the frequency table.
    #[error("token {0} has no assigned code")]
    UnknownToken(Token),

    /// The token does not fit in the configured vocabulary.
    #[error("token {token} is outside the vocabulary of {vocab_size} symbols")]
    TokenOutOfRange { token: usize, vocab_size: usize },

    /// The frequency table was sized for a different vocabulary than the codec.
    #[error("frequency table covers {found} symbols but the codec expects {expected}")]
    VocabularyMismatch { expected: usize, found: usize },

    /// Merging two subtrees overflowed the weight counter.
    #[error("combined frequency overflowed while merging nodes {left} and {right}")]
    WeightOverflow { left: usize, right: usize },

    /// The codec configuration failed validation.
    #[error("invalid codec configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = HuffmanError> = std::result::Result<T, E>;
