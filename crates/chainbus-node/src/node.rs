use std::sync::Arc;

use chainbus_frame::{Address, Flags};

use crate::bus::Bus;
use crate::error::Result;
use crate::handler::Handler;

/// An addressed endpoint on a [`Bus`].
///
/// Registers itself on construction. The bus only keeps a weak reference to
/// the handler, so dropping the node takes it off the bus.
pub struct Node {
    address: Address,
    handler: Arc<dyn Handler>,
    bus: Arc<Bus>,
}

impl Node {
    /// Attach a node with `address` and `handler` to `bus`.
    pub fn new(bus: &Arc<Bus>, address: Address, handler: impl Handler + 'static) -> Self {
        let handler: Arc<dyn Handler> = Arc::new(handler);
        bus.registry().register(address, &handler);
        Self {
            address,
            handler,
            bus: Arc::clone(bus),
        }
    }

    /// Send `payload` to `destination` with the bus's default TTL.
    pub fn signal(&self, payload: &[u8], destination: Address, flags: Flags) -> Result<()> {
        self.signal_with_ttl(payload, destination, flags, self.bus.config().default_ttl)
    }

    /// Send `payload` to `destination` allowing at most `ttl` hops.
    pub fn signal_with_ttl(
        &self,
        payload: &[u8],
        destination: Address,
        flags: Flags,
        ttl: u8,
    ) -> Result<()> {
        self.bus
            .signal(self.address, destination, payload, flags, ttl)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    /// The handler this node registered.
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chainbus_frame::{decode_frame, FrameConfig};
    use chainbus_line::CaptureLine;

    use super::*;
    use crate::bus::BusConfig;
    use crate::error::BusError;
    use crate::handler::Message;

    #[test]
    fn nodes_talk_locally() {
        let capture = CaptureLine::new();
        let bus = Arc::new(Bus::new(capture.clone()));
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);

        let sender = Node::new(&bus, 1, |_: &Message<'_>| {});
        let _receiver = Node::new(&bus, 2, move |msg: &Message<'_>| {
            assert_eq!(msg.source, 1);
            assert_eq!(msg.payload, b"local");
            seen.fetch_add(1, Ordering::SeqCst);
        });

        sender.signal(b"local", 2, Flags::default()).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(capture.is_empty());
    }

    #[test]
    fn signal_uses_configured_default_ttl() {
        let capture = CaptureLine::new();
        let bus = Arc::new(Bus::with_config(
            capture.clone(),
            BusConfig::default().with_default_ttl(5),
        ));
        let node = Node::new(&bus, 1, |_: &Message<'_>| {});

        node.signal(b"out", 0x0200, Flags::default()).unwrap();

        let frame = decode_frame(&capture.bytes(), &FrameConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(frame.ttl, 5);
        assert_eq!(frame.source, 1);
    }

    #[test]
    fn zero_ttl_is_an_error() {
        let bus = Arc::new(Bus::new(CaptureLine::new()));
        let node = Node::new(&bus, 1, |_: &Message<'_>| {});
        assert!(matches!(
            node.signal_with_ttl(b"x", 2, Flags::default(), 0),
            Err(BusError::ZeroTtl)
        ));
    }

    #[test]
    fn dropping_a_node_unregisters_it() {
        let capture = CaptureLine::new();
        let bus = Arc::new(Bus::new(capture.clone()));
        let sender = Node::new(&bus, 1, |_: &Message<'_>| {});
        let receiver = Node::new(&bus, 2, |_: &Message<'_>| {});
        assert_eq!(bus.registry().len(), 2);

        drop(receiver);
        sender.signal(b"gone", 2, Flags::default()).unwrap();

        assert_eq!(bus.registry().addresses(), vec![1]);
        assert!(!capture.is_empty());
    }
}
