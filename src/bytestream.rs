//! Variable-length integer decoding over an in-memory byte image (§4.1).
//!
//! Three encodings are supported, all big-endian, matching picokfst.c's
//! `FixedBytesToUnsignedNum` / `FixedBytesToSignedNum` / `BytesToNum`:
//!
//! - fixed-width unsigned: `n` bytes concatenated big-endian.
//! - fixed-width signed (zig-zag): decode `n` bytes as unsigned `v`; odd `v`
//!   is negative (`-((v-1)/2)-1`), even `v` is positive (`v/2`).
//! - varint signed (zig-zag): 7 bits per byte, top bit clear continues,
//!   first byte with the top bit set terminates (contributing `b - 128`);
//!   the accumulated unsigned value is zig-zag decoded as above.

use crate::error::CoreError;

/// Cursor over a borrowed byte image. Never panics; reading past the end
/// returns [`CoreError::Decode`] and leaves the cursor at the image length.
#[derive(Clone, Copy, Debug)]
pub struct ByteStreamReader<'a> {
    image: &'a [u8],
    pos: usize,
}

impl<'a> ByteStreamReader<'a> {
    pub fn new(image: &'a [u8]) -> Self {
        Self { image, pos: 0 }
    }

    pub fn at(image: &'a [u8], pos: usize) -> Self {
        Self { image, pos }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.image.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CoreError> {
        let end = self.pos.checked_add(n).ok_or(CoreError::Decode)?;
        if end > self.image.len() {
            self.pos = self.image.len();
            return Err(CoreError::Decode);
        }
        let slice = &self.image[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Fixed-width unsigned, `n_bytes` in `1..=4`, big-endian.
    pub fn read_fixed_unsigned(&mut self, n_bytes: u8) -> Result<u32, CoreError> {
        let bytes = self.take(n_bytes as usize)?;
        let mut num: u32 = 0;
        for &b in bytes {
            num = (num << 8) | u32::from(b);
        }
        Ok(num)
    }

    /// Fixed-width signed zig-zag, `n_bytes` in `1..=4`, big-endian.
    pub fn read_fixed_signed_zigzag(&mut self, n_bytes: u8) -> Result<i32, CoreError> {
        let val = self.read_fixed_unsigned(n_bytes)?;
        Ok(zigzag_decode(val))
    }

    /// Varint signed zig-zag: 7 low bits per byte, terminated by the first
    /// byte with the top bit set (which contributes `b - 128`).
    pub fn read_varint_zigzag(&mut self) -> Result<i32, CoreError> {
        let mut val: u32 = 0;
        loop {
            let byte = self.take(1)?[0];
            if byte < 128 {
                val = (val << 7) | u32::from(byte);
            } else {
                val = (val << 7) | u32::from(byte - 128);
                break;
            }
        }
        Ok(zigzag_decode(val))
    }
}

#[inline]
fn zigzag_decode(val: u32) -> i32 {
    if val % 2 == 1 {
        -(((val - 1) / 2) as i32) - 1
    } else {
        (val / 2) as i32
    }
}

/// Re-encodes a zig-zag decoded value back to its unsigned wire form, used
/// only by the round-trip property test (§8 item 1) and by test fixtures
/// that build FST images by hand.
pub fn zigzag_encode(num: i32) -> u32 {
    if num < 0 {
        (((-num - 1) as u32) * 2) + 1
    } else {
        (num as u32) * 2
    }
}

/// Encodes `num` as a varint (same 7-bits-per-byte, top-bit-terminates
/// convention as [`ByteStreamReader::read_varint_zigzag`]).
pub fn encode_varint_zigzag(num: i32, out: &mut alloc::vec::Vec<u8>) {
    let mut val = zigzag_encode(num);
    let mut chunks = alloc::vec::Vec::with_capacity(5);
    chunks.push((val & 0x7F) as u8);
    val >>= 7;
    while val > 0 {
        chunks.push((val & 0x7F) as u8);
        val >>= 7;
    }
    // Original loop terminates on the *last-read* byte having its top bit
    // set, and that byte is the most-significant chunk; bytes before it
    // must have their top bit clear.
    for (i, chunk) in chunks.iter().rev().enumerate() {
        let is_last = i == chunks.len() - 1;
        out.push(if is_last { chunk | 0x80 } else { *chunk });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_unsigned_big_endian() {
        let img = [0x01, 0x02, 0x03, 0x04];
        let mut r = ByteStreamReader::new(&img);
        assert_eq!(r.read_fixed_unsigned(4).unwrap(), 0x01020304);
    }

    #[test]
    fn fixed_unsigned_one_byte() {
        let img = [0xFF];
        let mut r = ByteStreamReader::new(&img);
        assert_eq!(r.read_fixed_unsigned(1).unwrap(), 0xFF);
    }

    #[test]
    fn fixed_signed_zigzag_roundtrip() {
        for n in [-5_i32, -1, 0, 1, 5, 1000, -1000] {
            let u = zigzag_encode(n);
            let bytes = u.to_be_bytes();
            let mut r = ByteStreamReader::new(&bytes);
            assert_eq!(r.read_fixed_signed_zigzag(4).unwrap(), n);
        }
    }

    #[test]
    fn read_past_end_is_decode_error() {
        let img = [0x01];
        let mut r = ByteStreamReader::new(&img);
        assert_eq!(r.read_fixed_unsigned(4), Err(CoreError::Decode));
    }

    #[test]
    fn varint_zigzag_small_values() {
        let mut buf = alloc::vec::Vec::new();
        encode_varint_zigzag(0, &mut buf);
        let mut r = ByteStreamReader::new(&buf);
        assert_eq!(r.read_varint_zigzag().unwrap(), 0);
    }

    #[test]
    fn varint_zigzag_roundtrip_property_sample() {
        for n in [-(1 << 29), -12345, -1, 0, 1, 12345, (1 << 29) - 1] {
            let mut buf = alloc::vec::Vec::new();
            encode_varint_zigzag(n, &mut buf);
            let mut r = ByteStreamReader::new(&buf);
            assert_eq!(r.read_varint_zigzag().unwrap(), n, "failed for {n}");
        }
    }
}
