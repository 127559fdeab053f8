use std::fmt;
use std::io;

use chainbus_frame::FrameError;
use chainbus_kernel::KernelError;
use chainbus_line::LineError;
use chainbus_node::BusError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const LINE_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn line_error(context: &str, err: LineError) -> CliError {
    match err {
        LineError::Io(source) => io_error(context, source),
        other => CliError::new(LINE_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Line(source) => line_error(context, source),
        FrameError::QueueFull { .. } => CliError::new(LINE_ERROR, format!("{context}: {err}")),
        FrameError::PayloadTooLarge { .. } | FrameError::Codec(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn bus_error(context: &str, err: BusError) -> CliError {
    match err {
        BusError::Frame(err) => frame_error(context, err),
        BusError::PayloadTooLarge { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        BusError::ZeroTtl => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn kernel_error(context: &str, err: KernelError) -> CliError {
    CliError::new(INTERNAL, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use chainbus_codec::ErrorCode;

    use super::*;

    #[test]
    fn maps_error_kinds_to_exit_codes() {
        let err = bus_error("send", BusError::ZeroTtl);
        assert_eq!(err.code, USAGE);
        assert_eq!(err.to_string(), "send: time-to-live must be at least 1");

        let err = frame_error("decode", FrameError::Codec(ErrorCode::InvalidData));
        assert_eq!(err.code, DATA_INVALID);

        let err = bus_error(
            "send",
            BusError::Frame(FrameError::Line(LineError::Disconnected)),
        );
        assert_eq!(err.code, LINE_ERROR);

        let err = frame_error("send", FrameError::QueueFull { needed: 9, free: 4 });
        assert_eq!(err.code, LINE_ERROR);

        let err = io_error("read", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.code, PERMISSION_DENIED);
    }
}
