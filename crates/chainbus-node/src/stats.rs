use std::sync::atomic::{AtomicU32, Ordering};

/// Snapshot of bus traffic counters. All counters wrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Messages handed to a local handler (sent locally or received).
    pub delivered: u32,
    /// Received frames retransmitted towards their destination.
    pub forwarded: u32,
    /// Frames queued for the line without error, forwarded ones included.
    pub transmitted: u32,
    /// Received frames dropped because their hop budget ran out.
    pub expired: u32,
    /// Frames refused by a full transmit queue or lost to a line failure.
    pub tx_errors: u32,
    /// Received candidates that failed validation.
    pub rejected: u32,
    /// Received bytes dropped off a full receive window.
    pub overflowed: u32,
}

#[derive(Default)]
pub(crate) struct Counters {
    pub delivered: AtomicU32,
    pub forwarded: AtomicU32,
    pub transmitted: AtomicU32,
    pub expired: AtomicU32,
    pub tx_errors: AtomicU32,
}

impl Counters {
    pub fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BusStats {
        BusStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            transmitted: self.transmitted.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
            ..BusStats::default()
        }
    }
}
