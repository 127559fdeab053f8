use chainbus_frame::{Address, Flags};

/// A message as seen by the receiving node.
///
/// Locally delivered messages carry the sender's TTL unchanged; messages from
/// the line carry the TTL they arrived with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    pub destination: Address,
    pub source: Address,
    pub flags: Flags,
    pub ttl: u8,
    pub payload: &'a [u8],
}

/// Receives messages addressed to a node.
///
/// Called synchronously on the sender's stack for local delivery and from the
/// receive path otherwise, never with a critical section held. A handler may
/// send from inside `handle`.
pub trait Handler: Send + Sync {
    fn handle(&self, message: &Message<'_>);
}

impl<F> Handler for F
where
    F: Fn(&Message<'_>) + Send + Sync,
{
    fn handle(&self, message: &Message<'_>) {
        self(message)
    }
}
