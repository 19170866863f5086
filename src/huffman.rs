use core::fmt::{self, Display};

use anyhow::anyhow;

use crate::{
    compressor::{Compressor, DecompressionError, Result},
    config::CodecConfig,
};

if_tracing! {
    use tracing::debug;
}

pub mod bitstream;
pub mod code_table;
pub mod codec;
pub mod frequency;
pub mod tree;

pub use bitstream::BitStream;
pub use code_table::{CodeRef, CodeTable, DerivationSummary};
pub use codec::Codec;
pub use frequency::FrequencyTable;
pub use tree::{HuffmanTree, Node, NodeIndex, TreeNode};

/// One symbol of the alphabet. Bytes map to the token of the same value.
pub type Token = u16;

/// Byte-in, byte-out Huffman coding.
///
/// The code is built from whatever was last compressed and kept as shared state, since the
/// compressed bytes do not carry the tree. Decompressing therefore only works with the same
/// `HuffmanCoding` (or one given the same codec through [`with_codec`](HuffmanCoding::with_codec)).
///
/// Compressed layout: 8-byte little-endian bit count, then the packed bits.
#[derive(Clone, Debug, Default)]
pub struct HuffmanCoding {
    config: CodecConfig,
    codec: Option<Codec>,
}

impl HuffmanCoding {
    pub fn new(config: CodecConfig) -> Self {
        Self { config, codec: None }
    }

    /// A coder that decodes (and encodes) with an already built codec.
    pub fn with_codec(codec: Codec) -> Self {
        Self {
            config: *codec.config(),
            codec: Some(codec),
        }
    }

    /// The codec built by the last compression, if any.
    pub fn codec(&self) -> Option<&Codec> {
        self.codec.as_ref()
    }

    /// Builds a code for `data` and encodes it.
    ///
    /// Any previously kept codec is dropped first, so after a failed call nothing can be
    /// decompressed until the next successful one.
    pub fn huffman_encode(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.codec = None;
        if data.is_empty() {
            if_tracing! {
                debug!(target = "huffman", "huffman encode passthrough: input empty");
            }
            return Ok(BitStream::with_capacity(0).to_payload());
        }

        let codec = Codec::from_data(&self.config, data)?;
        let mut stream = codec.new_stream();
        codec.encode(data, &mut stream)?;
        let payload = stream.to_payload();
        self.codec = Some(codec);
        Ok(payload)
    }

    pub fn huffman_decode(&mut self, data: &[u8]) -> Result<Vec<u8>, DecompressionError> {
        let mut stream =
            BitStream::from_payload(data).map_err(|e| DecompressionError::InvalidInput(format!("bad payload: {}", e)))?;
        if stream.is_empty() {
            return Ok(Vec::new());
        }
        let codec = self.codec.as_ref().ok_or_else(|| {
            DecompressionError::InvalidInput("no huffman code is known for this payload".to_string())
        })?;
        codec
            .decode(&mut stream)
            .map_err(|e| DecompressionError::InvalidInput(e.to_string()))
    }
}

impl Compressor for HuffmanCoding {
    fn compress_bytes(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.huffman_encode(data)
    }

    fn decompress_bytes(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.huffman_decode(data).map_err(|e| anyhow!(e))
    }

    fn compressor_name(&self) -> String {
        self.to_string()
    }
}

impl Display for HuffmanCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Huffman Coding")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_tests() {
        crate::tests::roundtrip_test(HuffmanCoding::default());
    }

    #[test]
    fn decoding_needs_a_known_code() {
        let mut encoder = HuffmanCoding::default();
        let compressed = encoder.compress_bytes(b"some bytes").unwrap();

        let mut stranger = HuffmanCoding::default();
        assert!(stranger.decompress_bytes(&compressed).is_err());

        let mut friend = HuffmanCoding::with_codec(encoder.codec().unwrap().clone());
        assert_eq!(friend.decompress_bytes(&compressed).unwrap(), b"some bytes");
    }

    #[test]
    fn payload_header_carries_bit_count() {
        let mut coder = HuffmanCoding::default();
        let compressed = coder.compress_bytes(b"aab").unwrap();
        // a -> 1, b -> 0 (b is lighter and merged first as the left child)
        assert_eq!(&compressed[..8], &3u64.to_le_bytes());
        assert_eq!(&compressed[8..], &[0b1100_0000]);
    }

    #[test]
    fn failed_compression_forgets_the_previous_code() {
        let strict = CodecConfig {
            single_symbol: crate::SingleSymbolPolicy::Reject,
            ..CodecConfig::default()
        };
        let mut coder = HuffmanCoding::new(strict);
        let compressed = coder.compress_bytes(b"abcabc").unwrap();
        assert!(coder.compress_bytes(b"qqqq").is_err());
        assert!(coder.codec().is_none());

        let err = coder.decompress_bytes(&compressed).unwrap_err();
        assert!(err.to_string().contains("no huffman code"), "{}", err);
    }

    #[test]
    fn overflowing_compression_forgets_the_previous_code() {
        let tiny = CodecConfig {
            stream_capacity: 1,
            ..CodecConfig::default()
        };
        let mut coder = HuffmanCoding::new(tiny);
        let compressed = coder.compress_bytes(b"ab").unwrap();
        assert!(coder.compress_bytes(b"the quick brown fox").is_err());
        assert!(coder.decompress_bytes(&compressed).is_err());
    }

    #[test]
    fn corrupt_payload_is_an_error() {
        let mut coder = HuffmanCoding::default();
        coder.compress_bytes(b"abc").unwrap();
        assert!(coder.decompress_bytes(&[0xff; 4]).is_err());
    }
}
