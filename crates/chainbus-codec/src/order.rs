/// Byte order applied to multi-byte fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Order of the host this code runs on.
    #[cfg(target_endian = "little")]
    pub const NATIVE: ByteOrder = ByteOrder::Little;
    /// Order of the host this code runs on.
    #[cfg(target_endian = "big")]
    pub const NATIVE: ByteOrder = ByteOrder::Big;

    /// The opposite order.
    pub const fn flipped(self) -> Self {
        match self {
            ByteOrder::Little => ByteOrder::Big,
            ByteOrder::Big => ByteOrder::Little,
        }
    }

    /// True if this is the host order.
    pub fn is_native(self) -> bool {
        self == Self::NATIVE
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::NATIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flipped_twice_is_identity() {
        assert_eq!(ByteOrder::Little.flipped().flipped(), ByteOrder::Little);
        assert_eq!(ByteOrder::Big.flipped(), ByteOrder::Little);
    }

    #[test]
    fn default_is_native() {
        assert!(ByteOrder::default().is_native());
        assert!(!ByteOrder::NATIVE.flipped().is_native());
    }
}
