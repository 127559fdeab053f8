use chainbus_frame::FrameError;

/// Errors that can occur when sending on the bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The payload does not fit in one frame.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A frame must be allowed at least one hop.
    #[error("time-to-live must be at least 1")]
    ZeroTtl,

    /// Encoding or transmitting the frame failed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, BusError>;
