use tracing::trace;

use crate::error::{ErrorCode, Result};
use crate::order::ByteOrder;
use crate::NO_LIMIT;

enum Output<'a> {
    Buffer(&'a mut [u8]),
    Sink(&'a mut dyn FnMut(u8)),
}

/// Encoding cursor over a fixed byte region or a byte sink.
///
/// Bit-fields are packed LSB-first into a staging byte. The staging byte is
/// committed once it holds 8 bits, or zero-padded and committed by the next
/// byte-aligned operation (`write_u8`, `write_bytes`, `sign`, `finish`, ...).
pub struct Serializer<'a> {
    out: Output<'a>,
    pos: usize,
    order: ByteOrder,
    stage: u8,
    staged_bits: u8,
    error: Option<ErrorCode>,
}

impl<'a> Serializer<'a> {
    /// Encode into `buf`. Capacity is `buf.len()`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self::with_output(Output::Buffer(buf))
    }

    /// Encode into a byte sink, one call per committed byte.
    ///
    /// A sink has no capacity limit, cannot be signed and cannot seek.
    pub fn with_sink(sink: &'a mut dyn FnMut(u8)) -> Self {
        Self::with_output(Output::Sink(sink))
    }

    fn with_output(out: Output<'a>) -> Self {
        Self {
            out,
            pos: 0,
            order: ByteOrder::NATIVE,
            stage: 0,
            staged_bits: 0,
            error: None,
        }
    }

    /// Bytes committed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Size of the destination region (`usize::MAX` for a sink).
    pub fn capacity(&self) -> usize {
        match &self.out {
            Output::Buffer(buf) => buf.len(),
            Output::Sink(_) => usize::MAX,
        }
    }

    /// Bytes still available after the current position.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.pos
    }

    /// Currently active byte order.
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// The sticky error, if any.
    pub fn error(&self) -> Option<ErrorCode> {
        self.error
    }

    /// `Ok(())` until the first failure.
    pub fn status(&self) -> Result<()> {
        match self.error {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    /// The committed bytes (empty for a sink).
    pub fn written(&self) -> &[u8] {
        match &self.out {
            Output::Buffer(buf) => &buf[..self.pos],
            Output::Sink(_) => &[],
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

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.put_aligned(&[value], false)
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        let bytes = match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };
        self.put_aligned(&bytes, false)
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        let bytes = match self.order {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };
        self.put_aligned(&bytes, false)
    }

    pub fn write_i8(&mut self, value: i8) -> &mut Self {
        self.write_u8(value as u8)
    }

    pub fn write_i16(&mut self, value: i16) -> &mut Self {
        self.write_u16(value as u16)
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.write_u32(value as u32)
    }

    /// Copy a byte span. With a non-native order active the span is written
    /// back to front.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        let reversed = !self.order.is_native();
        self.put_aligned(bytes, reversed)
    }

    /// Write a NUL-terminated string.
    ///
    /// The source ends at its first NUL or at the end of the slice. At most
    /// `max_len` characters are written ([`NO_LIMIT`] for no limit); that
    /// truncation is not an error. Running out of space sets
    /// [`ErrorCode::BufferOverflow`] after writing what fits, and the
    /// terminator is written whenever any space remains.
    pub fn write_string(&mut self, text: impl AsRef<[u8]>, max_len: usize) -> &mut Self {
        if self.error.is_some() || !self.align() {
            return self;
        }
        let text = text.as_ref();
        let text = match text.iter().position(|&b| b == 0) {
            Some(end) => &text[..end],
            None => text,
        };
        let wanted = if max_len == NO_LIMIT {
            text.len()
        } else {
            text.len().min(max_len)
        };

        let remaining = self.remaining();
        if remaining == 0 {
            self.fail(ErrorCode::BufferOverflow);
            return self;
        }

        let fits = wanted.min(remaining - 1);
        for &byte in &text[..fits] {
            self.store(byte);
        }
        self.store(0);
        if fits < wanted {
            self.fail(ErrorCode::BufferOverflow);
        }
        self
    }

    pub fn write_bit(&mut self, bit: bool) -> &mut Self {
        self.write_bitfield(bit as u8, 1)
    }

    /// Pack the low `width` bits of `value` (1..=8). Higher bits are ignored.
    pub fn write_bitfield(&mut self, value: u8, width: u8) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        if width == 0 || width > 8 {
            self.fail(ErrorCode::InvalidArgument);
            return self;
        }

        for i in 0..width {
            let bit = (value >> i) & 1;
            self.stage |= bit << self.staged_bits;
            self.staged_bits += 1;
            if self.staged_bits == 8 && !self.align() {
                break;
            }
        }
        self
    }

    /// Commit a partially filled bit-field byte, zero-padded.
    pub fn flush(&mut self) -> &mut Self {
        if self.error.is_none() {
            self.align();
        }
        self
    }

    /// Run a signing hook over everything written so far.
    ///
    /// The hook may patch any byte of the span (a reserved checksum slot,
    /// a length field). Returning `false` sets [`ErrorCode::NoSign`].
    pub fn sign<F>(&mut self, hook: F) -> &mut Self
    where
        F: FnOnce(&mut [u8]) -> bool,
    {
        if self.error.is_some() || !self.align() {
            return self;
        }
        let pos = self.pos;
        let signed = match &mut self.out {
            Output::Buffer(buf) => Some(hook(&mut buf[..pos])),
            Output::Sink(_) => None,
        };
        match signed {
            Some(true) => {}
            Some(false) => self.fail(ErrorCode::NoSign),
            None => self.fail(ErrorCode::NotReady),
        }
        self
    }

    /// Move the cursor by `delta` bytes, clamped to `[0, capacity]`.
    ///
    /// Skipped bytes keep their previous contents.
    pub fn seek(&mut self, delta: isize) -> &mut Self {
        if self.error.is_some() || !self.align() {
            return self;
        }
        if let Output::Sink(_) = self.out {
            if delta != 0 {
                self.fail(ErrorCode::NotReady);
            }
            return self;
        }
        self.pos = if delta >= 0 {
            self.pos.saturating_add(delta.unsigned_abs()).min(self.capacity())
        } else {
            self.pos.saturating_sub(delta.unsigned_abs())
        };
        self
    }

    /// Commit pending bits and return the encoded length.
    pub fn finish(&mut self) -> Result<usize> {
        self.flush();
        self.status().map(|()| self.pos)
    }

    fn fail(&mut self, code: ErrorCode) {
        if self.error.is_none() {
            trace!(error = %code, pos = self.pos, "encode failed");
            self.error = Some(code);
        }
    }

    /// Write one byte; capacity must already be checked.
    fn store(&mut self, byte: u8) {
        match &mut self.out {
            Output::Buffer(buf) => buf[self.pos] = byte,
            Output::Sink(sink) => sink(byte),
        }
        self.pos += 1;
    }

    /// Commit the staging byte if it holds any bits.
    fn align(&mut self) -> bool {
        if self.staged_bits == 0 {
            return true;
        }
        let byte = self.stage;
        self.stage = 0;
        self.staged_bits = 0;
        if self.remaining() == 0 {
            self.fail(ErrorCode::BufferOverflow);
            return false;
        }
        self.store(byte);
        true
    }

    fn put_aligned(&mut self, bytes: &[u8], reversed: bool) -> &mut Self {
        if self.error.is_some() || !self.align() {
            return self;
        }
        if self.remaining() < bytes.len() {
            self.fail(ErrorCode::BufferOverflow);
            return self;
        }
        if reversed {
            for &byte in bytes.iter().rev() {
                self.store(byte);
            }
        } else {
            for &byte in bytes {
                self.store(byte);
            }
        }
        self
    }
}

impl std::fmt::Debug for Serializer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.out {
            Output::Buffer(_) => "buffer",
            Output::Sink(_) => "sink",
        };
        f.debug_struct("Serializer")
            .field("output", &kind)
            .field("pos", &self.pos)
            .field("order", &self.order)
            .field("staged_bits", &self.staged_bits)
            .field("error", &self.error)
            .finish()
    }
}
