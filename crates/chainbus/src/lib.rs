//! Addressed multi-hop messaging over a chained serial line.
//!
//! Devices sit on one serial line, each wired to the next. A frame that is
//! not for any node on the receiving device is passed on with one hop less of
//! time-to-live, so every device can reach every other one.
//!
//! # Crate Structure
//!
//! - [`line`]: Byte-level line capability (the board-support seam)
//! - [`codec`]: Allocation-free binary serializer/deserializer
//! - [`frame`]: Frame layout, CRC-16 hooks and the receive accumulator
//! - [`node`]: Node registry, nodes and the bus routing logic
//! - [`kernel`]: Cooperative module scheduler (behind `kernel` feature)
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use chainbus::frame::Flags;
//! use chainbus::line::CaptureLine;
//! use chainbus::node::{Bus, Message, Node};
//!
//! let wire = CaptureLine::new();
//! let bus = Arc::new(Bus::new(wire.clone()));
//! let sensor = Node::new(&bus, 0x0001, |_: &Message<'_>| {});
//!
//! // Nobody on this device listens at 0x0200, so the frame leaves on the line.
//! sensor.signal(b"21.5C", 0x0200, Flags::default()).unwrap();
//! assert!(!wire.is_empty());
//! ```

/// Re-export line types.
pub mod line {
    pub use chainbus_line::*;
}

/// Re-export codec types.
pub mod codec {
    pub use chainbus_codec::*;
}

/// Re-export frame types.
pub mod frame {
    pub use chainbus_frame::*;
}

/// Re-export node and bus types.
pub mod node {
    pub use chainbus_node::*;
}

/// Re-export kernel types (requires `kernel` feature).
#[cfg(feature = "kernel")]
pub mod kernel {
    pub use chainbus_kernel::*;
}
