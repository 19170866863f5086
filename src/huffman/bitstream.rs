use bitvec::prelude::*;

use crate::error::{HuffmanError, Result};

/// Size of the bit-length header in front of a serialized stream.
const PAYLOAD_HEADER_LEN: usize = 8;

/// A fixed-capacity, bit-addressable buffer with a single cursor.
///
/// The same cursor is used for writing and for sequential reading. Write the stream first,
/// call [`reset`](BitStream::reset), then read it back. The logical length is the furthest
/// position ever written, so reads stop exactly at the end of the encoded data rather than at
/// the end of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStream {
    buffer: BitVec<u8, Msb0>,
    /// in bits
    len: usize,
    /// in bits
    cursor: usize,
}

impl BitStream {
    /// Creates an empty stream able to hold `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BitVec::repeat(false, capacity.saturating_mul(8)),
            len: 0,
            cursor: 0,
        }
    }

    /// Wraps already-packed bytes holding `bit_len` meaningful bits. The cursor starts at 0.
    ///
    /// # Errors
    ///
    /// Returns [`HuffmanError::StreamUnderflow`] if `bytes` holds fewer than `bit_len` bits.
    pub fn from_bytes(bytes: Vec<u8>, bit_len: usize) -> Result<Self> {
        let available = bytes.len() * 8;
        if bit_len > available {
            return Err(HuffmanError::StreamUnderflow {
                position: available,
                len: bit_len,
            });
        }
        let mut buffer = BitVec::<u8, Msb0>::from_vec(bytes);
        buffer[bit_len..].fill(false);
        Ok(Self {
            buffer,
            len: bit_len,
            cursor: 0,
        })
    }

    /// Moves the cursor back to the start without discarding written bits.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Zeroes the buffer and forgets everything written so far.
    pub fn clear(&mut self) {
        self.buffer.fill(false);
        self.len = 0;
        self.cursor = 0;
    }

    /// Writes one bit at the cursor and advances it.
    ///
    /// # Errors
    ///
    /// Returns [`HuffmanError::StreamOverflow`] when the cursor is already at capacity. Nothing
    /// is written in that case.
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        if self.cursor >= self.capacity() {
            return Err(HuffmanError::StreamOverflow {
                capacity: self.capacity(),
            });
        }
        self.buffer.set(self.cursor, bit);
        self.cursor += 1;
        self.len = self.len.max(self.cursor);
        Ok(())
    }

    /// Writes all of `bits` at the cursor and advances past them.
    ///
    /// # Errors
    ///
    /// Returns [`HuffmanError::StreamOverflow`] if `bits` does not fit. Nothing is written in
    /// that case.
    pub fn write_bits(&mut self, bits: &BitSlice<u8, Msb0>) -> Result<()> {
        if bits.len() > self.free() {
            return Err(HuffmanError::StreamOverflow {
                capacity: self.capacity(),
            });
        }
        let end = self.cursor + bits.len();
        self.buffer[self.cursor..end].copy_from_bitslice(bits);
        self.cursor = end;
        self.len = self.len.max(end);
        Ok(())
    }

    /// Reads the bit at the cursor and advances it.
    ///
    /// # Errors
    ///
    /// Returns [`HuffmanError::StreamUnderflow`] when the cursor is at the logical end.
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.cursor >= self.len {
            return Err(HuffmanError::StreamUnderflow {
                position: self.cursor,
                len: self.len,
            });
        }
        let bit = self.buffer[self.cursor];
        self.cursor += 1;
        Ok(bit)
    }

    /// Number of meaningful bits in the stream.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Capacity in bits.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Current cursor position, in bits.
    pub const fn position(&self) -> usize {
        self.cursor
    }

    /// Bits left to read before the logical end.
    pub const fn remaining(&self) -> usize {
        self.len.saturating_sub(self.cursor)
    }

    /// Bits that can still be written before the stream overflows.
    pub fn free(&self) -> usize {
        self.capacity() - self.cursor
    }

    /// The written bits.
    pub fn as_bitslice(&self) -> &BitSlice<u8, Msb0> {
        &self.buffer[..self.len]
    }

    /// The bytes covering the written bits. Trailing bits of the last byte are zero.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer.as_raw_slice()[..self.len.div_ceil(8)]
    }

    /// Serializes the stream as an 8-byte little-endian bit count followed by the packed bits.
    pub fn to_payload(&self) -> Vec<u8> {
        let bytes = self.as_bytes();
        let mut payload = Vec::with_capacity(PAYLOAD_HEADER_LEN + bytes.len());
        payload.extend_from_slice(&(self.len as u64).to_le_bytes());
        payload.extend_from_slice(bytes);
        payload
    }

    /// Parses the output of [`to_payload`](BitStream::to_payload).
    ///
    /// # Errors
    ///
    /// Returns [`HuffmanError::StreamUnderflow`] if the header is truncated or announces more
    /// bits than the payload carries.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let Some((header, body)) = payload.split_first_chunk::<PAYLOAD_HEADER_LEN>() else {
            return Err(HuffmanError::StreamUnderflow {
                position: payload.len() * 8,
                len: PAYLOAD_HEADER_LEN * 8,
            });
        };
        let bit_len = u64::from_le_bytes(*header);
        let bit_len = usize::try_from(bit_len).map_err(|_| HuffmanError::StreamUnderflow {
            position: body.len() * 8,
            len: usize::MAX,
        })?;
        Self::from_bytes(body.to_vec(), bit_len)
    }
}
