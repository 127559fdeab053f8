use core::cell::RefCell;

use critical_section::Mutex;
use tracing::{debug, trace};

use crate::codec::{
    decode_frame, Frame, FrameConfig, Header, HEADER_SIZE, MAX_FRAME_SIZE, TRAILER_SIZE,
};

/// Where the accumulator looks for a frame after each byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Only at the start of the window. After line noise the receiver stays
    /// out of sync until the noise has slid out of the full window.
    #[default]
    HeadOnly,
    /// At every offset whose announced frame ends at the newest byte.
    /// Recovers on the first clean frame after noise.
    TailScan,
}

/// Receive state as seen from outside [`ReceiveAccumulator::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    /// Window empty.
    Idle,
    /// Bytes held, no complete valid frame among them.
    Accumulating,
    /// A complete candidate is being checked. Only held inside the
    /// critical section.
    Validating,
}

/// Counters kept by the accumulator. All wrap on overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxStats {
    /// Frames extracted and handed back to the caller.
    pub frames: u32,
    /// Complete candidates that failed validation.
    pub rejected: u32,
    /// Bytes dropped off the front of a full window.
    pub overflowed: u32,
}

struct Window {
    bytes: [u8; MAX_FRAME_SIZE],
    len: usize,
    state: RxState,
    stats: RxStats,
}

impl Window {
    const fn new() -> Self {
        Self {
            bytes: [0; MAX_FRAME_SIZE],
            len: 0,
            state: RxState::Idle,
            stats: RxStats {
                frames: 0,
                rejected: 0,
                overflowed: 0,
            },
        }
    }

    fn push(&mut self, byte: u8) {
        if self.len == MAX_FRAME_SIZE {
            self.bytes.copy_within(1.., 0);
            self.len -= 1;
            self.stats.overflowed = self.stats.overflowed.wrapping_add(1);
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        self.state = RxState::Accumulating;
    }

    /// Try the frame starting at `start`. Only a frame ending exactly at the
    /// newest byte counts.
    fn candidate(&mut self, start: usize, config: &FrameConfig) -> Option<Frame> {
        let span = &self.bytes[start..self.len];
        let header = Header::peek(span)?;
        if header.frame_len() != span.len() {
            return None;
        }

        self.state = RxState::Validating;
        let result = decode_frame(span, config);
        self.state = RxState::Accumulating;
        match result {
            Ok(frame) => frame,
            Err(_) => {
                self.stats.rejected = self.stats.rejected.wrapping_add(1);
                None
            }
        }
    }

    fn clear(&mut self) {
        self.len = 0;
        self.state = RxState::Idle;
    }
}

/// Rebuilds frames from a byte stream, one byte per call.
///
/// Holds the most recent [`MAX_FRAME_SIZE`] bytes. Every window access runs
/// inside a `critical_section`, so [`ingest`](Self::ingest) may be called
/// from a receive interrupt while the main loop inspects the accumulator.
pub struct ReceiveAccumulator {
    window: Mutex<RefCell<Window>>,
    config: FrameConfig,
    policy: SyncPolicy,
}

impl ReceiveAccumulator {
    /// Create an accumulator with default frame hooks and [`SyncPolicy::HeadOnly`].
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default(), SyncPolicy::default())
    }

    pub fn with_config(config: FrameConfig, policy: SyncPolicy) -> Self {
        Self {
            window: Mutex::new(RefCell::new(Window::new())),
            config,
            policy,
        }
    }

    /// Append one received byte and return the frame it completes, if any.
    ///
    /// Returns in bounded time and never blocks. A full window drops its
    /// oldest byte first. On success the window is cleared; the caller
    /// dispatches the frame outside the critical section.
    pub fn ingest(&self, byte: u8) -> Option<Frame> {
        let found = critical_section::with(|cs| {
            let mut window = self.window.borrow_ref_mut(cs);
            window.push(byte);

            let found = match self.policy {
                SyncPolicy::HeadOnly => window.candidate(0, &self.config),
                SyncPolicy::TailScan => {
                    let last_start = window.len.saturating_sub(HEADER_SIZE + TRAILER_SIZE);
                    (0..=last_start).find_map(|start| window.candidate(start, &self.config))
                }
            };
            if found.is_some() {
                window.clear();
                window.stats.frames = window.stats.frames.wrapping_add(1);
            }
            found
        });

        if let Some(frame) = &found {
            trace!(
                dst = frame.destination,
                src = frame.source,
                ttl = frame.ttl,
                size = frame.payload.len(),
                "frame received"
            );
        }
        found
    }

    /// Discard any partial frame.
    pub fn reset(&self) {
        critical_section::with(|cs| self.window.borrow_ref_mut(cs).clear());
        debug!("receive window reset");
    }

    /// Bytes currently held.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.window.borrow_ref(cs).len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn state(&self) -> RxState {
        critical_section::with(|cs| self.window.borrow_ref(cs).state)
    }

    pub fn stats(&self) -> RxStats {
        critical_section::with(|cs| self.window.borrow_ref(cs).stats)
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Current frame hooks.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for ReceiveAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReceiveAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiveAccumulator")
            .field("policy", &self.policy)
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
