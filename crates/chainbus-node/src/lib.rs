//! Bus nodes and routing.
//!
//! A [`Bus`] is one device's view of the chained serial line. Modules attach
//! [`Node`]s to it; each node has an address and a [`Handler`]. Sending
//! resolves the destination against the local [`Registry`] first and only
//! touches the line when no local node matches. Frames arriving from the line
//! are delivered locally or forwarded with one less hop of time-to-live.

pub mod bus;
pub mod error;
pub mod handler;
pub mod node;
pub mod registry;
pub mod stats;

pub use bus::{Bus, BusConfig};
pub use error::{BusError, Result};
pub use handler::{Handler, Message};
pub use node::Node;
pub use registry::Registry;
pub use stats::BusStats;
