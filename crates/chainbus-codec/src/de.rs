use tracing::trace;

use crate::error::{ErrorCode, Result};
use crate::order::ByteOrder;
use crate::NO_LIMIT;

/// Decoding cursor over captured input.
///
/// Mirrors [`Serializer`](crate::Serializer): bit-fields are read LSB-first
/// from a fetched byte, and a byte-aligned read discards whatever bits of
/// that byte were not consumed.
#[derive(Debug)]
pub struct Deserializer<'a> {
    input: &'a [u8],
    pos: usize,
    order: ByteOrder,
    stage: u8,
    staged_bits: u8,
    error: Option<ErrorCode>,
}

impl<'a> Deserializer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            order: ByteOrder::NATIVE,
            stage: 0,
            staged_bits: 0,
            error: None,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Length of the captured input.
    pub fn capacity(&self) -> usize {
        self.input.len()
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    /// Unread input, without consuming it.
    pub fn rest(&self) -> &'a [u8] {
        let input = self.input;
        &input[self.pos..]
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn error(&self) -> Option<ErrorCode> {
        self.error
    }

    pub fn status(&self) -> Result<()> {
        match self.error {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    /// Flip the byte order for all following fields.
    pub fn hn(&mut self) -> &mut Self {
        self.order = self.order.flipped();
        self
    }

    /// Set an absolute byte order for all following fields.
    pub fn order(&mut self, order: ByteOrder) -> &mut Self {
        self.order = order;
        self
    }

    pub fn read_u8(&mut self, value: &mut u8) -> &mut Self {
        if let Some([byte]) = self.take::<1>() {
            *value = byte;
        }
        self
    }

    pub fn read_u16(&mut self, value: &mut u16) -> &mut Self {
        if let Some(bytes) = self.take::<2>() {
            *value = match self.order {
                ByteOrder::Little => u16::from_le_bytes(bytes),
                ByteOrder::Big => u16::from_be_bytes(bytes),
            };
        }
        self
    }

    pub fn read_u32(&mut self, value: &mut u32) -> &mut Self {
        if let Some(bytes) = self.take::<4>() {
            *value = match self.order {
                ByteOrder::Little => u32::from_le_bytes(bytes),
                ByteOrder::Big => u32::from_be_bytes(bytes),
            };
        }
        self
    }

    pub fn read_i8(&mut self, value: &mut i8) -> &mut Self {
        let mut raw = 0u8;
        self.read_u8(&mut raw);
        if self.error.is_none() {
            *value = raw as i8;
        }
        self
    }

    pub fn read_i16(&mut self, value: &mut i16) -> &mut Self {
        let mut raw = 0u16;
        self.read_u16(&mut raw);
        if self.error.is_none() {
            *value = raw as i16;
        }
        self
    }

    pub fn read_i32(&mut self, value: &mut i32) -> &mut Self {
        let mut raw = 0u32;
        self.read_u32(&mut raw);
        if self.error.is_none() {
            *value = raw as i32;
        }
        self
    }

    /// Fill `out` from the input. With a non-native order active the span is
    /// read back to front.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> &mut Self {
        if !self.begin_aligned() {
            return self;
        }
        if self.remaining() < out.len() {
            self.fail(ErrorCode::BufferOverrun);
            return self;
        }
        let span = &self.input[self.pos..self.pos + out.len()];
        if self.order.is_native() {
            out.copy_from_slice(span);
        } else {
            for (dst, src) in out.iter_mut().zip(span.iter().rev()) {
                *dst = *src;
            }
        }
        self.pos += out.len();
        self
    }

    /// Read a NUL-terminated string into `out`, always terminating `out`.
    ///
    /// At most `max_len` characters are kept ([`NO_LIMIT`] for no limit).
    /// The cursor ends right after the source terminator either way. A
    /// missing terminator sets [`ErrorCode::BufferOverrun`]; an `out` too
    /// small for the kept characters sets [`ErrorCode::BufferOverflow`]
    /// after storing what fits.
    pub fn read_string(&mut self, out: &mut [u8], max_len: usize) -> &mut Self {
        if !self.begin_aligned() {
            return self;
        }
        if out.is_empty() {
            self.fail(ErrorCode::InvalidArgument);
            return self;
        }
        let input = self.input;
        let rest = &input[self.pos..];
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            self.fail(ErrorCode::BufferOverrun);
            return self;
        };

        let wanted = if max_len == NO_LIMIT {
            len
        } else {
            len.min(max_len)
        };
        let kept = wanted.min(out.len() - 1);
        out[..kept].copy_from_slice(&rest[..kept]);
        out[kept] = 0;
        self.pos += len + 1;

        if kept < wanted {
            self.fail(ErrorCode::BufferOverflow);
        }
        self
    }

    pub fn read_bit(&mut self, bit: &mut bool) -> &mut Self {
        let mut raw = 0u8;
        self.read_bitfield(&mut raw, 1);
        if self.error.is_none() {
            *bit = raw != 0;
        }
        self
    }

    /// Unpack `width` bits (1..=8) into the low bits of `value`.
    pub fn read_bitfield(&mut self, value: &mut u8, width: u8) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        if width == 0 || width > 8 {
            self.fail(ErrorCode::InvalidArgument);
            return self;
        }

        let mut out = 0u8;
        for i in 0..width {
            if self.staged_bits == 0 {
                if self.remaining() == 0 {
                    self.fail(ErrorCode::BufferOverrun);
                    return self;
                }
                self.stage = self.input[self.pos];
                self.staged_bits = 8;
                self.pos += 1;
            }
            out |= (self.stage & 1) << i;
            self.stage >>= 1;
            self.staged_bits -= 1;
        }
        *value = out;
        self
    }

    /// Run a validation hook over everything consumed so far.
    ///
    /// Returning `false` sets [`ErrorCode::InvalidData`].
    pub fn validate<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnOnce(&[u8]) -> bool,
    {
        if !self.begin_aligned() {
            return self;
        }
        if !hook(&self.input[..self.pos]) {
            self.fail(ErrorCode::InvalidData);
        }
        self
    }

    /// Move the cursor by `delta` bytes, clamped to `[0, input length]`.
    pub fn seek(&mut self, delta: isize) -> &mut Self {
        if !self.begin_aligned() {
            return self;
        }
        self.pos = if delta >= 0 {
            self.pos.saturating_add(delta.unsigned_abs()).min(self.input.len())
        } else {
            self.pos.saturating_sub(delta.unsigned_abs())
        };
        self
    }

    /// Return the consumed length, or the sticky error.
    pub fn finish(&mut self) -> Result<usize> {
        self.begin_aligned();
        self.status().map(|()| self.pos)
    }

    fn fail(&mut self, code: ErrorCode) {
        if self.error.is_none() {
            trace!(error = %code, pos = self.pos, "decode failed");
            self.error = Some(code);
        }
    }

    /// Drop unread bits of a partially consumed byte. False once failed.
    fn begin_aligned(&mut self) -> bool {
        self.stage = 0;
        self.staged_bits = 0;
        self.error.is_none()
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        if !self.begin_aligned() {
            return None;
        }
        if self.remaining() < N {
            self.fail(ErrorCode::BufferOverrun);
            return None;
        }
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.input[self.pos..self.pos + N]);
        self.pos += N;
        Some(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chars_read_in_order() {
        let buf = *b"abcdefghij";
        let mut de = Deserializer::new(&buf);
        let mut out = [0u8; 10];
        for slot in out.iter_mut() {
            de.read_u8(slot);
        }
        assert_eq!(de.position(), 10);
        assert_eq!(de.error(), None);
        assert_eq!(&out, b"abcdefghij");
    }

    #[test]
    fn hn_switches_order_midstream() {
        let buf = [0x78, 0x56, 0x34, 0x12, 0x12, 0x34, 0x56, 0x78];
        let mut first = 0u32;
        let mut second = 0u32;
        let mut de = Deserializer::new(&buf);
        de.order(ByteOrder::Little)
            .read_u32(&mut first)
            .hn()
            .read_u32(&mut second);
        assert_eq!(de.finish(), Ok(8));
        assert_eq!(first, 0x1234_5678);
        assert_eq!(second, 0x1234_5678);
    }

    #[test]
    fn overrun_is_sticky_and_leaves_values() {
        let buf = [1u8, 2, 3];
        let mut a = 0u16;
        let mut b = 0xFFFF_FFFFu32;
        let mut c = 0u8;
        let mut de = Deserializer::new(&buf);
        de.read_u16(&mut a).read_u32(&mut b).read_u8(&mut c);

        assert_eq!(de.error(), Some(ErrorCode::BufferOverrun));
        assert_eq!(de.position(), 2);
        assert_eq!(b, 0xFFFF_FFFF);
        assert_eq!(c, 0);
    }

    #[test]
    fn string_positions_after_terminator() {
        let buf = *b"hello\0x";
        let mut out = [0u8; 3];
        let mut tail = 0u8;
        let mut de = Deserializer::new(&buf);
        de.read_string(&mut out, 2).read_u8(&mut tail);
        assert_eq!(de.error(), None);
        assert_eq!(&out, b"he\0");
        assert_eq!(tail, b'x');
    }

    #[test]
    fn string_too_long_for_destination() {
        let buf = *b"hello\0";
        let mut out = [0u8; 4];
        let mut de = Deserializer::new(&buf);
        de.read_string(&mut out, NO_LIMIT);
        assert_eq!(de.error(), Some(ErrorCode::BufferOverflow));
        assert_eq!(&out, b"hel\0");
        assert_eq!(de.position(), 6);
    }

    #[test]
    fn string_without_terminator_overruns() {
        let buf = *b"abc";
        let mut out = [0u8; 8];
        let mut de = Deserializer::new(&buf);
        de.read_string(&mut out, NO_LIMIT);
        assert_eq!(de.error(), Some(ErrorCode::BufferOverrun));
        assert_eq!(de.position(), 0);
    }

    #[test]
    fn empty_string_destination_is_invalid() {
        let buf = *b"a\0";
        let mut de = Deserializer::new(&buf);
        de.read_string(&mut [], NO_LIMIT);
        assert_eq!(de.error(), Some(ErrorCode::InvalidArgument));
    }

    #[test]
    fn bits_then_aligned_read_skips_padding() {
        let buf = [0b0000_1101, 0xAB];
        let mut three = 0u8;
        let mut flag = false;
        let mut next = 0u8;
        let mut de = Deserializer::new(&buf);
        de.read_bitfield(&mut three, 3)
            .read_bit(&mut flag)
            .read_u8(&mut next);
        assert_eq!(de.finish(), Ok(2));
        assert_eq!((three, flag, next), (0b101, true, 0xAB));
    }

    #[test]
    fn bitfield_spans_bytes() {
        let buf = [0b1011_1111, 0b0000_0010];
        let mut six = 0u8;
        let mut four = 0u8;
        let mut de = Deserializer::new(&buf);
        de.read_bitfield(&mut six, 6).read_bitfield(&mut four, 4);
        assert_eq!(de.error(), None);
        assert_eq!((six, four), (0b11_1111, 0b1010));
        assert_eq!(de.position(), 2);
    }

    #[test]
    fn bit_read_past_end_overruns() {
        let buf = [0xFFu8];
        let mut v = 0u8;
        let mut de = Deserializer::new(&buf);
        de.read_bitfield(&mut v, 6).read_bitfield(&mut v, 4);
        assert_eq!(de.error(), Some(ErrorCode::BufferOverrun));
        assert_eq!(v, 0b11_1111);
    }

    #[test]
    fn validate_sees_consumed_span() {
        let buf = [1u8, 2, 3, 4];
        let mut seen = Vec::new();
        let mut de = Deserializer::new(&buf);
        de.seek(3).validate(|span| {
            seen.extend_from_slice(span);
            true
        });
        assert_eq!(de.error(), None);
        assert_eq!(seen, vec![1, 2, 3]);

        de.validate(|_| false);
        assert_eq!(de.error(), Some(ErrorCode::InvalidData));
    }

    #[test]
    fn seek_is_clamped_to_input() {
        let buf = [0u8; 4];
        let mut de = Deserializer::new(&buf);
        de.seek(9);
        assert_eq!(de.position(), 4);
        de.seek(-2);
        assert_eq!(de.position(), 2);
        assert_eq!(de.rest().len(), 2);
        de.seek(-9);
        assert_eq!(de.position(), 0);
    }

    #[test]
    fn signed_values_roundtrip() {
        let buf = [0xFF, 0xFE, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut a = 0i8;
        let mut b = 0i8;
        let mut c = 0i32;
        let mut de = Deserializer::new(&buf);
        de.read_i8(&mut a).read_i8(&mut b).read_i32(&mut c);
        assert_eq!((a, b, c), (-1, -2, -1));
    }
}
