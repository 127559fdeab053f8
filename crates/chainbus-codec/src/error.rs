/// Sticky error status of a codec cursor.
///
/// "OK" is the absence of an error (`None` / `Ok(_)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorCode {
    /// Encode ran out of destination space.
    #[error("buffer overflow")]
    BufferOverflow,

    /// The validation hook rejected the input.
    #[error("invalid data")]
    InvalidData,

    /// The signing hook failed; the output must not be sent.
    #[error("signing failed")]
    NoSign,

    /// A size, width or index argument was out of range.
    #[error("invalid argument")]
    InvalidArgument,

    /// The operation needs setup the cursor does not have.
    #[error("not ready")]
    NotReady,

    /// Decode ran past the available input.
    #[error("buffer overrun")]
    BufferOverrun,
}

impl ErrorCode {
    /// Numeric code shared with firmware diagnostics.
    pub fn code(self) -> u8 {
        match self {
            ErrorCode::BufferOverflow => 1,
            ErrorCode::InvalidData => 2,
            ErrorCode::NoSign => 3,
            ErrorCode::InvalidArgument => 4,
            ErrorCode::NotReady => 5,
            ErrorCode::BufferOverrun => 6,
        }
    }
}

pub type Result<T> = std::result::Result<T, ErrorCode>;
