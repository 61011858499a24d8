//! Little-endian byte cursor with a handful of bit-level primitives.
//!
//! Everything in an NRBF stream is byte-aligned except two things: the
//! 7-bit varint groups of a length-prefixed string, and the 7-magnitude +
//! 1-sign layout of an `sbyte`. Rather than special-case those two spots,
//! the cursor tracks a bit offset within the current byte so `read_bits`
//! covers both; every other `read_*` method is a thin wrapper that first
//! asserts byte alignment.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// A positional reader over a fully-buffered byte slice.
///
/// Never performs I/O of its own; running out of input is reported as
/// [`Error::TruncatedInput`] rather than panicking.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> Reader<'a> {
    /// Wraps `data` for reading. Does not validate the header byte; callers
    /// that need the stream-level `0x00` check should use
    /// [`Reader::new_validated`].
    pub fn new(data: &'a [u8]) -> Self {
        Reader {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// Wraps `data`, failing immediately if the first byte is not the
    /// `0x00` SerializationHeaderRecord tag every NRBF stream starts with.
    pub fn new_validated(data: &'a [u8]) -> Result<Self> {
        if data.first() != Some(&0x00) {
            return Err(Error::InvalidHeader);
        }
        Ok(Reader::new(data))
    }

    /// Current byte offset into the input (bit offset is only ever
    /// nonzero mid-varint or mid-sbyte).
    pub fn position(&self) -> usize {
        self.byte_pos
    }

    fn is_byte_aligned(&self) -> bool {
        self.bit_pos == 0
    }

    /// Reads `n` bits (1..=32), LSB-first within a byte and low-byte-first
    /// across bytes, advancing the cursor.
    pub fn read_bits(&mut self, n: u8) -> Result<u32> {
        if n == 0 || n > 32 {
            return Err(Error::ReaderMisuse("bit count must be 1..=32"));
        }

        let mut result: u64 = 0;
        let mut read = 0u8;

        while read < n {
            let byte = *self
                .data
                .get(self.byte_pos)
                .ok_or(Error::TruncatedInput)?;
            let available = 8 - self.bit_pos;
            let take = available.min(n - read);
            let mask = ((1u16 << take) - 1) as u8;
            let bits = (byte >> self.bit_pos) & mask;

            result |= (bits as u64) << read;
            read += take;
            self.bit_pos += take;

            if self.bit_pos == 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
        }

        Ok(result as u32)
    }

    /// Same as [`Reader::read_bits`] without advancing the cursor.
    pub fn peek_bits(&self, n: u8) -> Result<u32> {
        let mut clone = self.clone();
        clone.read_bits(n)
    }

    /// Reads `n` raw bytes. Fails if the cursor is not byte-aligned or if
    /// fewer than `n` bytes remain.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if !self.is_byte_aligned() {
            return Err(Error::ReaderMisuse(
                "byte-aligned read attempted mid-bitfield",
            ));
        }
        let end = self
            .byte_pos
            .checked_add(n)
            .ok_or(Error::TruncatedInput)?;
        let slice = self.data.get(self.byte_pos..end).ok_or(Error::TruncatedInput)?;
        self.byte_pos = end;
        Ok(slice)
    }

    /// Alias for [`Reader::read_bytes`] used where the caller wants a raw
    /// range rather than a typed field.
    pub fn read_raw(&mut self, n: usize) -> Result<&'a [u8]> {
        self.read_bytes(n)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let value = self.read_bytes(1)?[0];
        trace!("read_u8 -> {} (pos={})", value, self.byte_pos);
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let value = LittleEndian::read_u16(self.read_bytes(2)?);
        trace!("read_u16 -> {} (pos={})", value, self.byte_pos);
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let value = LittleEndian::read_u32(self.read_bytes(4)?);
        trace!("read_u32 -> {} (pos={})", value, self.byte_pos);
        Ok(value)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let value = LittleEndian::read_u64(self.read_bytes(8)?);
        trace!("read_u64 -> {} (pos={})", value, self.byte_pos);
        Ok(value)
    }

    /// Reads a `sbyte`: the low 7 bits of the byte are the magnitude, the
    /// top bit is the sign. When the sign bit is set the value is
    /// `magnitude - 128`, not `-magnitude` — this mirrors the wire layout
    /// exactly rather than two's-complement.
    pub fn read_i8(&mut self) -> Result<i8> {
        if !self.is_byte_aligned() {
            return Err(Error::ReaderMisuse(
                "sbyte read attempted mid-bitfield",
            ));
        }
        let magnitude = self.read_bits(7)? as i16;
        let sign = self.read_bits(1)?;
        let value = if sign != 0 { magnitude - 128 } else { magnitude };
        let value = value as i8;
        trace!("read_i8 -> {} (pos={})", value, self.byte_pos);
        Ok(value)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let value = LittleEndian::read_f32(self.read_bytes(4)?);
        trace!("read_f32 -> {} (pos={})", value, self.byte_pos);
        Ok(value)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let value = LittleEndian::read_f64(self.read_bytes(8)?);
        trace!("read_f64 -> {} (pos={})", value, self.byte_pos);
        Ok(value)
    }

    /// Reads a length-prefixed string: up to five 7-bit groups (each
    /// followed by a continuation bit) form a base-128 little-endian
    /// length, followed by that many raw bytes decoded as UTF-8.
    ///
    /// The source this format was distilled from maps bytes to code
    /// points one-to-one instead of decoding UTF-8 properly; that is a
    /// bug in the source, not a property of the wire format, so this
    /// decodes the byte range as UTF-8 and reports [`Error::InvalidUtf8`]
    /// on failure rather than reproducing the mis-decode.
    pub fn read_length_prefixed_string(&mut self) -> Result<String> {
        const MAX_GROUPS: u8 = 5;

        let mut length: u32 = 0;
        let mut group = 0u8;
        loop {
            if group >= MAX_GROUPS {
                return Err(Error::MalformedLength);
            }
            let bits = self.read_bits(7)?;
            let more = self.read_bits(1)? != 0;
            length |= bits << (group * 7);
            group += 1;
            if !more {
                break;
            }
        }

        if (length as usize) > self.data.len() - self.byte_pos {
            return Err(Error::MalformedLength);
        }
        let bytes = self.read_bytes(length as usize)?;
        trace!(
            "read_length_prefixed_string -> {} bytes (pos={})",
            length,
            self.byte_pos
        );
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::InvalidUtf8)
    }
}
