use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};

use crate::error::Result;
use crate::traits::LineTx;

/// Line that records every transmitted byte.
///
/// Clones share the same recording, so a test can keep one handle while the
/// bus owns another.
#[derive(Clone, Default)]
pub struct CaptureLine {
    inner: Arc<Mutex<Captured>>,
}

#[derive(Default)]
struct Captured {
    bytes: BytesMut,
    calls: usize,
}

impl CaptureLine {
    /// Create an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything transmitted so far.
    pub fn bytes(&self) -> Bytes {
        let captured = self.lock();
        Bytes::copy_from_slice(&captured.bytes)
    }

    /// Take the recorded bytes, leaving the capture empty.
    pub fn take(&self) -> Bytes {
        let mut captured = self.lock();
        captured.calls = 0;
        captured.bytes.split().freeze()
    }

    /// Number of `transmit` calls since creation or the last [`take`](Self::take).
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    /// True if nothing has been transmitted.
    pub fn is_empty(&self) -> bool {
        self.lock().bytes.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Captured> {
        // A panicking test thread must not hide what was captured.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LineTx for CaptureLine {
    fn transmit(&mut self, byte: u8) -> Result<()> {
        let mut captured = self.lock();
        captured.bytes.extend_from_slice(&[byte]);
        captured.calls += 1;
        Ok(())
    }
}

impl std::fmt::Debug for CaptureLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let captured = self.lock();
        f.debug_struct("CaptureLine")
            .field("len", &captured.bytes.len())
            .field("calls", &captured.calls)
            .finish()
    }
}
