use chainbus_codec::ErrorCode;
use chainbus_line::LineError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds what the size field can carry.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The codec failed (short buffer, rejected checksum, failed signing).
    #[error("frame codec error: {0}")]
    Codec(#[from] ErrorCode),

    /// The transmit queue has no room for the whole frame.
    #[error("transmit queue full ({needed} bytes needed, {free} free)")]
    QueueFull { needed: usize, free: usize },

    /// The line failed while the frame was being transmitted.
    #[error("frame line error: {0}")]
    Line(#[from] LineError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
