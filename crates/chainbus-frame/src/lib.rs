//! Bus frames for a chained serial line.
//!
//! Every frame carries:
//! - a 2-byte destination and a 2-byte source address (little-endian)
//! - one byte packing a 6-bit payload size with the `write` and `request` flags
//! - a 1-byte time-to-live hop counter
//! - up to [`MAX_PAYLOAD`] payload bytes
//! - a 2-byte CRC-16 trailer
//!
//! Frames are built with `chainbus-codec` into fixed buffers; nothing on the
//! frame path allocates. [`ReceiveAccumulator`] rebuilds frames from a byte
//! stream one byte at a time and is safe to feed from an interrupt handler.
//! [`TxQueue`] is its transmit-side counterpart: frames are queued whole and
//! sent byte by byte without holding a critical section.

pub mod accumulator;
pub mod codec;
pub mod error;
pub mod flags;
pub mod queue;

pub use accumulator::{ReceiveAccumulator, RxState, RxStats, SyncPolicy};
pub use codec::{
    crc16, crc16_sign, crc16_validate, decode_frame, encode_frame, Address, Frame, FrameConfig,
    Header, Payload, DEFAULT_TTL, HEADER_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD, TRAILER_SIZE,
};
pub use error::{FrameError, Result};
pub use flags::Flags;
pub use queue::{TxQueue, TX_QUEUE_SIZE};
