use crate::error::Result;

/// Single-byte transmit on the physical bus.
///
/// Implementations may block or buffer, but must deliver bytes in the order
/// they were handed over. On a board this wraps the UART data register; the
/// protocol calls it once per encoded byte.
pub trait LineTx {
    /// Transmit one byte.
    fn transmit(&mut self, byte: u8) -> Result<()>;

    /// Transmit a run of bytes, stopping at the first failure.
    fn transmit_all(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.transmit(byte)?;
        }
        Ok(())
    }
}

impl<T: LineTx + ?Sized> LineTx for &mut T {
    fn transmit(&mut self, byte: u8) -> Result<()> {
        (**self).transmit(byte)
    }
}

impl<T: LineTx + ?Sized> LineTx for Box<T> {
    fn transmit(&mut self, byte: u8) -> Result<()> {
        (**self).transmit(byte)
    }
}

/// Receive callback for bytes arriving on the line.
///
/// The board's receive interrupt calls [`LineRx::on_byte`] once per byte.
/// Implementations must return in bounded time without blocking, since this
/// may run with interrupts masked.
pub trait LineRx {
    /// Hand one received byte to the protocol.
    fn on_byte(&self, byte: u8);
}

impl<T: LineRx + ?Sized> LineRx for std::sync::Arc<T> {
    fn on_byte(&self, byte: u8) {
        (**self).on_byte(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LineError;

    struct FailAfter {
        remaining: usize,
        sent: Vec<u8>,
    }

    impl LineTx for FailAfter {
        fn transmit(&mut self, byte: u8) -> Result<()> {
            if self.remaining == 0 {
                return Err(LineError::Disconnected);
            }
            self.remaining -= 1;
            self.sent.push(byte);
            Ok(())
        }
    }

    #[test]
    fn transmit_all_stops_at_first_failure() {
        let mut line = FailAfter {
            remaining: 2,
            sent: Vec::new(),
        };
        let err = line.transmit_all(&[1, 2, 3, 4]).unwrap_err();

        assert!(matches!(err, LineError::Disconnected));
        assert_eq!(line.sent, vec![1, 2]);
    }

    #[test]
    fn boxed_line_forwards() {
        let inner = FailAfter {
            remaining: 8,
            sent: Vec::new(),
        };
        let mut boxed: Box<FailAfter> = Box::new(inner);
        boxed.transmit_all(b"ok").unwrap();
        assert_eq!(boxed.sent, b"ok".to_vec());
    }
}
