//! Serial line capability.
//!
//! The board-support seam of chainbus. A device sits on one shared serial line
//! chained through every other device on the bus; this crate only describes
//! how a single byte leaves ([`LineTx`]) and how a received byte is handed to
//! the protocol ([`LineRx`]).
//!
//! Host implementations are provided for tools and tests:
//! - [`CaptureLine`] records every transmitted byte
//! - [`WriteLine`] forwards bytes to any `std::io::Write`
//! - [`ChannelLine`] pushes bytes into an `mpsc` queue (multi-device simulation)

pub mod capture;
pub mod channel;
pub mod error;
pub mod stream;
pub mod traits;

pub use capture::CaptureLine;
pub use channel::ChannelLine;
pub use error::{LineError, Result};
pub use stream::WriteLine;
pub use traits::{LineRx, LineTx};
