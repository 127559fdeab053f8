use core::cell::RefCell;
use std::sync::{Arc, Weak};

use chainbus_frame::Address;
use critical_section::Mutex;
use tracing::{debug, warn};

use crate::handler::Handler;

struct Entry {
    address: Address,
    handler: Weak<dyn Handler>,
}

/// Addressed endpoints known to this device.
///
/// Holds weak references only: dropping the owning [`Node`](crate::Node)
/// retires its entry. Entries are kept in registration order and the earliest
/// live entry for an address wins.
pub struct Registry {
    entries: Mutex<RefCell<Vec<Entry>>>,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Append a handler under `address`, pruning retired entries.
    ///
    /// A second live registration of the same address is accepted but only
    /// reachable once the first is dropped.
    pub fn register(&self, address: Address, handler: &Arc<dyn Handler>) {
        let duplicate = critical_section::with(|cs| {
            let mut entries = self.entries.borrow_ref_mut(cs);
            entries.retain(|entry| entry.handler.strong_count() > 0);
            let duplicate = entries.iter().any(|entry| entry.address == address);
            entries.push(Entry {
                address,
                handler: Arc::downgrade(handler),
            });
            duplicate
        });

        if duplicate {
            warn!(address, "address registered twice; earliest registration wins");
        } else {
            debug!(address, "node registered");
        }
    }

    /// First live handler registered under `address`.
    pub fn resolve(&self, address: Address) -> Option<Arc<dyn Handler>> {
        critical_section::with(|cs| {
            self.entries
                .borrow_ref(cs)
                .iter()
                .filter(|entry| entry.address == address)
                .find_map(|entry| entry.handler.upgrade())
        })
    }

    /// Live addresses in registration order, duplicates included.
    pub fn addresses(&self) -> Vec<Address> {
        critical_section::with(|cs| {
            self.entries
                .borrow_ref(cs)
                .iter()
                .filter(|entry| entry.handler.strong_count() > 0)
                .map(|entry| entry.address)
                .collect()
        })
    }

    /// Addresses held by more than one live node, ascending.
    pub fn duplicates(&self) -> Vec<Address> {
        let mut addresses = self.addresses();
        addresses.sort_unstable();
        let mut duplicates: Vec<Address> = addresses
            .windows(2)
            .filter(|pair| pair[0] == pair[1])
            .map(|pair| pair[0])
            .collect();
        duplicates.dedup();
        duplicates
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.addresses().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("addresses", &self.addresses())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::handler::Message;

    fn counter() -> (Arc<AtomicUsize>, Arc<dyn Handler>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let handler: Arc<dyn Handler> = Arc::new(move |_: &Message<'_>| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (hits, handler)
    }

    fn poke(handler: &Arc<dyn Handler>) {
        handler.handle(&Message {
            destination: 0,
            source: 0,
            flags: Default::default(),
            ttl: 1,
            payload: &[],
        });
    }

    #[test]
    fn resolve_registered_address() {
        let registry = Registry::new();
        let (hits, handler) = counter();
        registry.register(5, &handler);

        poke(&registry.resolve(5).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(registry.resolve(6).is_none());
    }

    #[test]
    fn dropped_handler_is_unreachable() {
        let registry = Registry::new();
        let (_hits, handler) = counter();
        registry.register(5, &handler);
        drop(handler);

        assert!(registry.resolve(5).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn earliest_duplicate_wins() {
        let registry = Registry::new();
        let (first_hits, first) = counter();
        let (second_hits, second) = counter();
        registry.register(9, &first);
        registry.register(9, &second);

        poke(&registry.resolve(9).unwrap());
        assert_eq!(first_hits.load(Ordering::SeqCst), 1);
        assert_eq!(second_hits.load(Ordering::SeqCst), 0);
        assert_eq!(registry.duplicates(), vec![9]);

        drop(first);
        poke(&registry.resolve(9).unwrap());
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
        assert!(registry.duplicates().is_empty());
    }

    #[test]
    fn register_prunes_dead_entries() {
        let registry = Registry::new();
        let (_a, dead) = counter();
        let (_b, live) = counter();
        registry.register(1, &dead);
        drop(dead);
        registry.register(2, &live);

        assert_eq!(registry.addresses(), vec![2]);
        assert_eq!(registry.len(), 1);
    }
}
