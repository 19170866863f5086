use crate::{
    config::CodecConfig,
    error::{HuffmanError, Result},
    huffman::{BitStream, CodeTable, FrequencyTable, HuffmanTree, Node, Token},
};

if_tracing! {
    use tracing::{debug, info};
}

/// A built Huffman code: the tree used for decoding and the table derived from it for encoding.
///
/// Encoder and decoder must hold the same codec. The tree is not written into the stream, so a
/// decoder normally rebuilds the codec from the same [`FrequencyTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codec {
    config: CodecConfig,
    tree: HuffmanTree,
    table: CodeTable,
}

impl Codec {
    /// Builds the tree from `frequencies` and flattens it into a code table.
    ///
    /// # Errors
    ///
    /// - [`HuffmanError::InvalidConfig`] if `config` does not validate.
    /// - [`HuffmanError::VocabularyMismatch`] if the table was sized for another vocabulary.
    /// - Anything [`HuffmanTree::build`] or [`CodeTable::derive`] reports.
    pub fn build(config: &CodecConfig, frequencies: &FrequencyTable) -> Result<Self> {
        config.validate()?;
        if frequencies.vocab_size() != config.vocab_size {
            return Err(HuffmanError::VocabularyMismatch {
                expected: config.vocab_size,
                found: frequencies.vocab_size(),
            });
        }

        let tree = HuffmanTree::build(frequencies)?;
        let table = CodeTable::derive(&tree, config.single_symbol)?;

        if_tracing! {
            info!(
                target = "codec",
                distinct = frequencies.distinct(),
                total = frequencies.total(),
                max_code_len = table.max_length(),
                weighted_bits = table.summary().weighted_bits,
                "codec built"
            );
        }

        Ok(Self {
            config: *config,
            tree,
            table,
        })
    }

    /// Counts the bytes of `data` and builds a codec for them.
    ///
    /// # Errors
    ///
    /// As [`build`](Codec::build), plus [`HuffmanError::TokenOutOfRange`] for bytes that do not fit
    /// a small vocabulary.
    pub fn from_data(config: &CodecConfig, data: &[u8]) -> Result<Self> {
        config.validate()?;
        let mut frequencies = FrequencyTable::new(config.vocab_size);
        frequencies.accumulate(data)?;
        Self::build(config, &frequencies)
    }

    /// Builds a codec for `data` and encodes it into a stream sized to fit exactly.
    ///
    /// Unlike [`new_stream`](Codec::new_stream), the configured capacity does not limit the
    /// result.
    ///
    /// # Errors
    ///
    /// As [`from_data`](Codec::from_data).
    pub fn compress(config: &CodecConfig, data: &[u8]) -> Result<(Self, BitStream)> {
        let codec = Self::from_data(config, data)?;
        let bits = codec.encoded_len(data.iter().map(|&byte| Token::from(byte)))?;
        let mut stream = BitStream::with_capacity(bits.div_ceil(8));
        codec.encode(data, &mut stream)?;
        Ok((codec, stream))
    }

    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub const fn tree(&self) -> &HuffmanTree {
        &self.tree
    }

    pub const fn table(&self) -> &CodeTable {
        &self.table
    }

    /// An empty stream sized by the configured capacity.
    pub fn new_stream(&self) -> BitStream {
        BitStream::with_capacity(self.config.stream_capacity)
    }

    /// Number of bits `tokens` will occupy once encoded.
    ///
    /// # Errors
    ///
    /// [`HuffmanError::UnknownToken`] for the first token without a code.
    pub fn encoded_len<I>(&self, tokens: I) -> Result<usize>
    where
        I: IntoIterator<Item = Token>,
    {
        tokens.into_iter().try_fold(0usize, |bits, token| {
            let code = self.table.code(token).ok_or(HuffmanError::UnknownToken(token))?;
            Ok(bits + code.length)
        })
    }

    /// Appends the code of every byte of `data` to `stream`.
    ///
    /// The whole input is checked before the first bit is written, so on error `stream` is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// - [`HuffmanError::UnknownToken`] if a byte has no code.
    /// - [`HuffmanError::StreamOverflow`] if the encoded data does not fit in `stream`.
    pub fn encode(&self, data: &[u8], stream: &mut BitStream) -> Result<()> {
        self.encode_iter(data.iter().map(|&byte| Token::from(byte)), stream)
    }

    /// [`encode`](Codec::encode) for token streams.
    pub fn encode_tokens(&self, tokens: &[Token], stream: &mut BitStream) -> Result<()> {
        self.encode_iter(tokens.iter().copied(), stream)
    }

    fn encode_iter<I>(&self, tokens: I, stream: &mut BitStream) -> Result<()>
    where
        I: Iterator<Item = Token> + Clone,
    {
        let needed = self.encoded_len(tokens.clone())?;
        if needed > stream.free() {
            return Err(HuffmanError::StreamOverflow {
                capacity: stream.capacity(),
            });
        }

        for token in tokens {
            // every token has a code, checked by encoded_len
            if let Some(bits) = self.table.code_bits(token) {
                stream.write_bits(bits)?;
            }
        }

        if_tracing! {
            debug!(target = "codec", bits = needed, stream_len = stream.len(), "encode finished");
        }
        Ok(())
    }

    /// Decodes one token starting at the stream's cursor.
    ///
    /// # Errors
    ///
    /// - [`HuffmanError::StreamUnderflow`] if the stream ends inside a code.
    /// - [`HuffmanError::InvalidCode`] if a bit leads off the tree, which only happens with the
    ///   one-bit code of a single-symbol alphabet.
    pub fn decode_token(&self, stream: &mut BitStream) -> Result<Token> {
        let mut current = self.tree.top();
        // a lone leaf owns the code `0`
        if let Some(Node::Leaf { token }) = self.tree.node(current).map(|node| node.node) {
            let position = stream.position();
            return match stream.read_bit()? {
                false => Ok(token),
                true => Err(HuffmanError::InvalidCode { position }),
            };
        }

        loop {
            let position = stream.position();
            let bit = stream.read_bit()?;
            current = self.tree.step(current, bit).ok_or(HuffmanError::InvalidCode { position })?;
            if let Some(Node::Leaf { token }) = self.tree.node(current).map(|node| node.node) {
                return Ok(token);
            }
        }
    }

    /// Decodes tokens from the cursor until the logical end of the stream.
    ///
    /// The stream's bit length delimits the data, so every token value, including 0, is
    /// ordinary data.
    ///
    /// # Errors
    ///
    /// As [`decode_token`](Codec::decode_token).
    pub fn decode_tokens(&self, stream: &mut BitStream) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while stream.remaining() > 0 {
            tokens.push(self.decode_token(stream)?);
        }

        if_tracing! {
            debug!(target = "codec", tokens = tokens.len(), bits = stream.position(), "decode finished");
        }
        Ok(tokens)
    }

    /// Decodes bytes from the cursor until the logical end of the stream.
    ///
    /// # Errors
    ///
    /// As [`decode_tokens`](Codec::decode_tokens), plus [`HuffmanError::TokenOutOfRange`] if a
    /// decoded token does not fit in a byte.
    pub fn decode(&self, stream: &mut BitStream) -> Result<Vec<u8>> {
        self.decode_tokens(stream)?.into_iter().map(token_to_byte).collect()
    }

    /// Decodes exactly `count` bytes from the cursor, ignoring whatever follows.
    ///
    /// # Errors
    ///
    /// As [`decode`](Codec::decode); running out of bits before `count` bytes is a
    /// [`HuffmanError::StreamUnderflow`].
    pub fn decode_exact(&self, stream: &mut BitStream, count: usize) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(count);
        for _ in 0..count {
            data.push(token_to_byte(self.decode_token(stream)?)?);
        }
        Ok(data)
    }
}

fn token_to_byte(token: Token) -> Result<u8> {
    u8::try_from(token).map_err(|_| HuffmanError::TokenOutOfRange {
        token: usize::from(token),
        vocab_size: 256,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SingleSymbolPolicy;

    const WINTER: &[u8] = b"Now is the winter of our discount tents.\0";

    fn roundtrip(config: &CodecConfig, data: &[u8]) -> Vec<u8> {
        let codec = Codec::from_data(config, data).unwrap();
        let mut stream = codec.new_stream();
        codec.encode(data, &mut stream).unwrap();
        stream.reset();
        codec.decode(&mut stream).unwrap()
    }

    #[test]
    fn roundtrip_keeps_zero_bytes() {
        let data = b"\0zero\0in\0the\0middle\0\0";
        assert_eq!(roundtrip(&CodecConfig::default(), data), data);
        // the trailing terminator of the demo string is plain data too
        assert_eq!(roundtrip(&CodecConfig::default(), WINTER), WINTER);
    }

    #[test]
    fn stream_length_is_weighted_code_length() {
        let codec = Codec::from_data(&CodecConfig::default(), WINTER).unwrap();
        let mut stream = codec.new_stream();
        codec.encode(WINTER, &mut stream).unwrap();
        assert_eq!(stream.len() as u64, codec.table().summary().weighted_bits);
        assert_eq!(codec.encoded_len(WINTER.iter().map(|&b| Token::from(b))).unwrap(), stream.len());
        assert!(stream.len() < WINTER.len() * 8);
    }

    #[test]
    fn textbook_stream_is_224_bits() {
        let mut frequencies = FrequencyTable::new(256);
        let mut data = Vec::new();
        for (byte, count) in [(b'a', 5), (b'b', 9), (b'c', 12), (b'd', 13), (b'e', 16), (b'f', 45)] {
            frequencies.seed(byte.into(), count).unwrap();
            data.extend(core::iter::repeat_n(byte, count as usize));
        }
        let codec = Codec::build(&CodecConfig::default(), &frequencies).unwrap();
        let mut stream = codec.new_stream();
        codec.encode(&data, &mut stream).unwrap();
        assert_eq!(stream.len(), 224);

        stream.reset();
        assert_eq!(codec.decode(&mut stream).unwrap(), data);
    }

    #[test]
    fn compress_ignores_configured_capacity() {
        let config = CodecConfig {
            stream_capacity: 1,
            ..CodecConfig::default()
        };
        let (codec, mut stream) = Codec::compress(&config, WINTER).unwrap();
        assert_eq!(stream.len() as u64, codec.table().summary().weighted_bits);
        assert_eq!(stream.capacity(), stream.len().div_ceil(8) * 8);

        stream.reset();
        assert_eq!(codec.decode(&mut stream).unwrap(), WINTER);
    }

    #[test]
    fn unknown_byte_is_rejected() {
        let codec = Codec::from_data(&CodecConfig::default(), b"abc").unwrap();
        let mut stream = codec.new_stream();
        assert_eq!(
            codec.encode(b"abd", &mut stream),
            Err(HuffmanError::UnknownToken(b'd'.into()))
        );
        assert!(stream.is_empty());
    }

    #[test]
    fn overflow_leaves_stream_untouched() {
        let config = CodecConfig {
            stream_capacity: 2,
            ..CodecConfig::default()
        };
        let data = b"abcdefghabcdefgh";
        let codec = Codec::from_data(&config, data).unwrap();
        let mut stream = codec.new_stream();
        // 8 equally likely symbols need 3 bits each: 48 bits into a 16 bit stream
        assert_eq!(
            codec.encode(data, &mut stream),
            Err(HuffmanError::StreamOverflow { capacity: 16 })
        );
        assert!(stream.is_empty());
        assert_eq!(stream.position(), 0);

        codec.encode(b"abcde", &mut stream).unwrap();
        assert_eq!(stream.len(), 15);
        assert_eq!(
            codec.encode(b"f", &mut stream),
            Err(HuffmanError::StreamOverflow { capacity: 16 })
        );
    }

    #[test]
    fn encoding_appends_across_calls() {
        let data = b"hello, hello, hello";
        let codec = Codec::from_data(&CodecConfig::default(), data).unwrap();
        let mut stream = codec.new_stream();
        codec.encode(&data[..7], &mut stream).unwrap();
        codec.encode(&data[7..], &mut stream).unwrap();
        stream.reset();
        assert_eq!(codec.decode(&mut stream).unwrap(), data);
    }

    #[test]
    fn truncated_stream_underflows() {
        let data = b"abracadabra";
        let codec = Codec::from_data(&CodecConfig::default(), data).unwrap();
        let mut stream = codec.new_stream();
        codec.encode(data, &mut stream).unwrap();

        let bytes = stream.as_bytes().to_vec();
        // drop the last bit, which always ends a code of at least one bit
        let mut truncated = BitStream::from_bytes(bytes, stream.len() - 1).unwrap();
        assert!(matches!(
            codec.decode(&mut truncated),
            Err(HuffmanError::StreamUnderflow { .. })
        ));
    }

    #[test]
    fn decode_exact_stops_after_count() {
        let data = b"mississippi";
        let codec = Codec::from_data(&CodecConfig::default(), data).unwrap();
        let mut stream = codec.new_stream();
        codec.encode(data, &mut stream).unwrap();
        stream.reset();

        assert_eq!(codec.decode_exact(&mut stream, 4).unwrap(), b"miss");
        assert_eq!(codec.decode(&mut stream).unwrap(), b"issippi");

        stream.reset();
        assert!(matches!(
            codec.decode_exact(&mut stream, 12),
            Err(HuffmanError::StreamUnderflow { .. })
        ));
    }

    #[test]
    fn single_symbol_input_roundtrips_with_one_bit_codes() {
        let data = [7u8; 10];
        let codec = Codec::from_data(&CodecConfig::default(), &data).unwrap();
        assert_eq!(codec.table().length(7), 1);

        let mut stream = codec.new_stream();
        codec.encode(&data, &mut stream).unwrap();
        assert_eq!(stream.len(), 10);
        assert_eq!(stream.as_bytes(), &[0, 0]);

        stream.reset();
        assert_eq!(codec.decode(&mut stream).unwrap(), data);
    }

    #[test]
    fn single_symbol_rejects_one_bits() {
        let codec = Codec::from_data(&CodecConfig::default(), b"qqq").unwrap();
        let mut stream = BitStream::from_bytes(vec![0b0100_0000], 3).unwrap();
        assert_eq!(codec.decode(&mut stream), Err(HuffmanError::InvalidCode { position: 1 }));
    }

    #[test]
    fn strict_policy_rejects_single_symbol() {
        let config = CodecConfig {
            single_symbol: SingleSymbolPolicy::Reject,
            ..CodecConfig::default()
        };
        assert_eq!(
            Codec::from_data(&config, b"qqq"),
            Err(HuffmanError::SingleSymbolAlphabet { token: b'q'.into() })
        );
    }

    #[test]
    fn empty_input_has_no_alphabet() {
        assert_eq!(
            Codec::from_data(&CodecConfig::default(), b""),
            Err(HuffmanError::EmptyAlphabet)
        );
    }

    #[test]
    fn vocabulary_must_match() {
        let frequencies = FrequencyTable::new(128);
        assert_eq!(
            Codec::build(&CodecConfig::default(), &frequencies),
            Err(HuffmanError::VocabularyMismatch { expected: 256, found: 128 })
        );
    }

    #[test]
    fn invalid_config_is_reported_before_building() {
        let config = CodecConfig {
            stream_capacity: 0,
            ..CodecConfig::default()
        };
        assert!(matches!(Codec::from_data(&config, b"ab"), Err(HuffmanError::InvalidConfig(_))));
    }

    #[test]
    fn wide_vocabulary_tokens() {
        let config = CodecConfig {
            vocab_size: 1000,
            ..CodecConfig::default()
        };
        let tokens: Vec<Token> = vec![999, 0, 500, 500, 999, 999, 3];
        let mut frequencies = FrequencyTable::new(1000);
        frequencies.accumulate_tokens(&tokens).unwrap();
        let codec = Codec::build(&config, &frequencies).unwrap();

        let mut stream = codec.new_stream();
        codec.encode_tokens(&tokens, &mut stream).unwrap();
        stream.reset();
        assert_eq!(codec.decode_tokens(&mut stream).unwrap(), tokens);

        stream.reset();
        assert_eq!(
            codec.decode(&mut stream),
            Err(HuffmanError::TokenOutOfRange { token: 999, vocab_size: 256 })
        );
    }

    #[test]
    fn rebuilt_codec_decodes_foreign_stream() {
        // the decoder only shares the frequency table, not the encoder's codec
        let mut frequencies = FrequencyTable::new(256);
        frequencies.accumulate(WINTER).unwrap();
        let encoder = Codec::build(&CodecConfig::default(), &frequencies).unwrap();
        let mut stream = encoder.new_stream();
        encoder.encode(WINTER, &mut stream).unwrap();

        let json = serde_json::to_string(&frequencies).unwrap();
        let shared: FrequencyTable = serde_json::from_str(&json).unwrap();
        let decoder = Codec::build(&CodecConfig::default(), &shared).unwrap();
        assert_eq!(decoder, encoder);

        let mut received = BitStream::from_payload(&stream.to_payload()).unwrap();
        assert_eq!(decoder.decode(&mut received).unwrap(), WINTER);
    }
}
