//! Per-frame control bits.

/// The `write` and `request` bits carried in every frame header.
///
/// The bus only transports them; what a write or a request means is up to
/// the receiving handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags {
    pub write: bool,
    pub request: bool,
}

impl Flags {
    pub const fn new(write: bool, request: bool) -> Self {
        Self { write, request }
    }

    /// A read request.
    pub const READ_REQUEST: Flags = Flags::new(false, true);

    /// A write request.
    pub const WRITE_REQUEST: Flags = Flags::new(true, true);

    /// Pack into two bits: `write` is bit 0, `request` is bit 1.
    pub const fn bits(self) -> u8 {
        (self.write as u8) | ((self.request as u8) << 1)
    }

    /// Inverse of [`bits`](Self::bits). Higher bits are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Self::new(bits & 0b01 != 0, bits & 0b10 != 0)
    }
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rw = if self.write { "W" } else { "R" };
        let kind = if self.request { "REQ" } else { "RSP" };
        write!(f, "{rw}/{kind}")
    }
}
