use core::cell::RefCell;

use chainbus_line::LineTx;
use critical_section::Mutex;
use heapless::Deque;
use tracing::{trace, warn};

use crate::codec::{encode_frame, Frame, FrameConfig, MAX_FRAME_SIZE};
use crate::error::{FrameError, Result};

/// Bytes the transmit queue can hold: four full-size frames.
pub const TX_QUEUE_SIZE: usize = 4 * MAX_FRAME_SIZE;

struct TxState {
    bytes: Deque<u8, TX_QUEUE_SIZE>,
    draining: bool,
}

/// Outgoing byte queue shared between the main loop and interrupt handlers.
///
/// A frame is encoded on the caller's stack and copied into the queue in one
/// short critical section, so frames never interleave. Bytes leave the queue
/// one at a time with interrupts enabled: whoever queues into an idle queue
/// becomes the drainer and sends until the queue is empty. Callers that queue
/// while a drain is running return at once and their bytes go out with it.
pub struct TxQueue {
    state: Mutex<RefCell<TxState>>,
    config: FrameConfig,
}

impl TxQueue {
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            state: Mutex::new(RefCell::new(TxState {
                bytes: Deque::new(),
                draining: false,
            })),
            config,
        }
    }

    /// Encode `frame` and queue its bytes.
    ///
    /// Returns `true` if the caller claimed the drain and must now call
    /// [`drain`](Self::drain) until [`release`](Self::release) succeeds.
    /// Nothing is queued if encoding fails or the frame does not fit.
    pub fn enqueue(&self, frame: &Frame) -> Result<bool> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = encode_frame(frame, &mut buf, &self.config)?;

        let claimed = critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let free = state.bytes.capacity() - state.bytes.len();
            if free < len {
                return Err(FrameError::QueueFull { needed: len, free });
            }
            for &byte in &buf[..len] {
                // Room was checked above.
                let _ = state.bytes.push_back(byte);
            }
            let claimed = !state.draining;
            state.draining = true;
            Ok(claimed)
        })?;

        trace!(dst = frame.destination, len, claimed, "frame queued");
        Ok(claimed)
    }

    /// Send queued bytes until the queue is momentarily empty. Returns the
    /// number of bytes sent.
    ///
    /// Only the drainer may call this. After a line failure the drainer
    /// must [`abort`](Self::abort).
    pub fn drain<L: LineTx + ?Sized>(&self, line: &mut L) -> Result<usize> {
        let mut sent = 0;
        while let Some(byte) =
            critical_section::with(|cs| self.state.borrow_ref_mut(cs).bytes.pop_front())
        {
            if let Err(err) = line.transmit(byte) {
                warn!(error = %err, sent, "line failed mid-drain");
                return Err(err.into());
            }
            sent += 1;
        }
        Ok(sent)
    }

    /// Give up the drain if nothing is left to send. Returns `false` when
    /// bytes arrived since the last [`drain`](Self::drain); the caller is
    /// still the drainer and must drain again.
    pub fn release(&self) -> bool {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.bytes.is_empty() {
                state.draining = false;
                true
            } else {
                false
            }
        })
    }

    /// Drop everything queued and end the drain. Returns the bytes dropped.
    pub fn abort(&self) -> usize {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let dropped = state.bytes.len();
            state.bytes.clear();
            state.draining = false;
            dropped
        })
    }

    /// Bytes waiting to be sent.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).bytes.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while some caller holds the drain.
    pub fn is_draining(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).draining)
    }
}

impl Default for TxQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TxQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxQueue")
            .field("len", &self.len())
            .field("draining", &self.is_draining())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chainbus_codec::ErrorCode;
    use chainbus_line::{CaptureLine, LineError};

    use super::*;
    use crate::codec::{decode_frame, MAX_PAYLOAD};
    use crate::flags::Flags;

    fn frame(payload: &[u8]) -> Frame {
        Frame::new(7, 1, Flags::default(), 4, payload).unwrap()
    }

    fn send(queue: &TxQueue, line: &mut CaptureLine) -> usize {
        let mut sent = 0;
        loop {
            sent += queue.drain(line).unwrap();
            if queue.release() {
                return sent;
            }
        }
    }

    #[test]
    fn first_caller_claims_the_drain() {
        let queue = TxQueue::new();
        let mut line = CaptureLine::new();

        assert!(queue.enqueue(&frame(b"one")).unwrap());
        assert!(!queue.enqueue(&frame(b"two")).unwrap());
        assert!(queue.is_draining());

        let sent = send(&queue, &mut line);

        let wire = line.bytes();
        assert_eq!(sent, wire.len());
        assert_eq!(line.calls(), sent);
        let config = FrameConfig::default();
        let first = decode_frame(&wire, &config).unwrap().unwrap();
        let second = decode_frame(&wire[first.wire_size()..], &config)
            .unwrap()
            .unwrap();
        assert_eq!(first.payload.as_slice(), b"one");
        assert_eq!(second.payload.as_slice(), b"two");
        assert!(!queue.is_draining());
        assert!(queue.is_empty());
    }

    #[test]
    fn release_fails_while_bytes_are_pending() {
        let queue = TxQueue::new();
        assert!(queue.enqueue(&frame(b"x")).unwrap());
        assert!(!queue.release());
        assert!(queue.is_draining());
    }

    #[test]
    fn full_queue_rejects_whole_frame() {
        let queue = TxQueue::new();
        let big = frame(&[0xAB; MAX_PAYLOAD]);
        for _ in 0..4 {
            queue.enqueue(&big).unwrap();
        }
        assert_eq!(queue.len(), TX_QUEUE_SIZE);

        let err = queue.enqueue(&frame(b"late")).unwrap_err();
        assert!(matches!(err, FrameError::QueueFull { free: 0, .. }));
        assert_eq!(queue.len(), TX_QUEUE_SIZE);
    }

    #[test]
    fn failed_signing_queues_nothing() {
        let config = FrameConfig {
            sign: |_| false,
            ..FrameConfig::default()
        };
        let queue = TxQueue::with_config(config);

        let err = queue.enqueue(&frame(b"x")).unwrap_err();
        assert!(matches!(err, FrameError::Codec(ErrorCode::NoSign)));
        assert!(queue.is_empty());
        assert!(!queue.is_draining());
    }

    #[test]
    fn abort_after_line_failure_discards_queue() {
        let queue = TxQueue::new();
        queue.enqueue(&frame(b"a")).unwrap();
        queue.enqueue(&frame(b"b")).unwrap();

        let err = queue.drain(&mut DeadLine).unwrap_err();
        assert!(matches!(err, FrameError::Line(LineError::Disconnected)));
        assert!(queue.is_draining());

        // The first byte of "a" was popped before the line failed.
        assert_eq!(queue.abort(), 2 * frame(b"a").wire_size() - 1);
        assert!(queue.is_empty());
        assert!(!queue.is_draining());
    }

    struct DeadLine;

    impl LineTx for DeadLine {
        fn transmit(&mut self, _byte: u8) -> chainbus_line::Result<()> {
            Err(LineError::Disconnected)
        }
    }
}
