use std::io::{ErrorKind, Write};

use tracing::warn;

use crate::error::{LineError, Result};
use crate::traits::LineTx;

/// Line over any `std::io::Write` (a serial port device file, a pipe, stdout).
pub struct WriteLine<W> {
    inner: W,
}

impl<W: Write> WriteLine<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(LineError::Io(err)),
            }
        }
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the line and return the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> LineTx for WriteLine<W> {
    fn transmit(&mut self, byte: u8) -> Result<()> {
        loop {
            match self.inner.write(&[byte]) {
                Ok(0) => return Err(LineError::Disconnected),
                Ok(_) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => {
                    warn!(error = %err, "line write failed");
                    return Err(LineError::Io(err));
                }
            }
        }
    }
}

impl<W> std::fmt::Debug for WriteLine<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteLine").finish_non_exhaustive()
    }
}
