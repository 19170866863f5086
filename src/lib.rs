//! huffmania builds a Huffman prefix code from token frequencies, flattens it into a packed
//! bit-level code table, and uses that table to pack a byte sequence into a bitstream and
//! restore it losslessly.
//!
//! The pipeline is split into small pieces that can be bolted together in different ways:
//!
//! - [`FrequencyTable`] accumulates token counts, possibly over many inputs.
//! - [`HuffmanTree::build`] greedily merges the two lightest nodes until one root remains.
//! - [`CodeTable::derive`] walks the tree and writes every token's code into one packed array.
//! - [`Codec`] ties the tree and table together to encode into and decode from a [`BitStream`].
//!
//! The tree is never stored inside the encoded stream. Encoder and decoder must agree on it out
//! of band, usually by sharing the frequency table, since building is deterministic.
//!
//! ```
//! use huffmania::{Codec, CodecConfig};
//!
//! let data = b"now is the winter of our discount tents";
//! let config = CodecConfig::default();
//! let codec = Codec::from_data(&config, data)?;
//!
//! let mut stream = codec.new_stream();
//! codec.encode(data, &mut stream)?;
//! stream.reset();
//! assert_eq!(codec.decode(&mut stream)?, data);
//! # Ok::<(), huffmania::HuffmanError>(())
//! ```

#[macro_export]
macro_rules! if_tracing {
    {$($body:tt)*} => {
        ::cfg_if::cfg_if! {
            if #[cfg(feature = "tracing")] {
                $($body)*
            }
        }
    };
}

#[macro_export]
macro_rules! if_not_tracing {
    {$($body:tt)*} => {
        ::cfg_if::cfg_if! {
            if #[cfg(not(feature = "tracing"))] {
                $($body)*
            }
        }
    };
}

pub mod compressor;
pub mod config;
pub mod error;
pub mod huffman;


pub use config::{CodecConfig, SingleSymbolPolicy};
pub use error::HuffmanError;
pub use huffman::{
    BitStream, CodeRef, CodeTable, Codec, DerivationSummary, FrequencyTable, HuffmanCoding, HuffmanTree, Node, NodeIndex,
    Token,
};
