/// Errors that can occur while driving the serial line.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    /// An I/O error occurred on the underlying stream.
    #[error("line I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The receiving end of the line is gone.
    #[error("line disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, LineError>;
