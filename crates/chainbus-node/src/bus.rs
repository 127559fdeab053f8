use core::cell::RefCell;

use chainbus_frame::{
    Address, Flags, Frame, FrameConfig, FrameError, ReceiveAccumulator, SyncPolicy, TxQueue, DEFAULT_TTL,
    MAX_PAYLOAD,
};
use chainbus_line::{LineRx, LineTx};
use critical_section::Mutex;
use tracing::{debug, warn};

use crate::error::{BusError, Result};
use crate::handler::Message;
use crate::registry::Registry;
use crate::stats::{BusStats, Counters};

/// Configuration for a [`Bus`].
#[derive(Debug, Clone, Copy)]
pub struct BusConfig {
    /// Hop budget for [`Node::signal`](crate::Node::signal). Default: 8.
    pub default_ttl: u8,
    /// Signing and validation hooks for frames on the line.
    pub frame: FrameConfig,
    /// How the receiver looks for frames in the incoming byte stream.
    pub sync: SyncPolicy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            frame: FrameConfig::default(),
            sync: SyncPolicy::default(),
        }
    }
}

impl BusConfig {
    pub fn with_default_ttl(mut self, ttl: u8) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_frame_config(mut self, frame: FrameConfig) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_sync_policy(mut self, sync: SyncPolicy) -> Self {
        self.sync = sync;
        self
    }
}

/// One device's attachment to the chained serial line.
///
/// Owns the node registry, the transmit side of the line and the receive
/// accumulator. The board's receive interrupt feeds [`ingest`](Self::ingest)
/// (or [`LineRx::on_byte`]); nodes send through [`signal`](Self::signal).
///
/// Outgoing frames go through a [`TxQueue`]; critical sections only cover
/// queue and window updates, never the line itself. The line must not call
/// back into the same bus while a byte is being transmitted. Devices chained
/// in a ring have to queue bytes between them.
pub struct Bus {
    registry: Registry,
    tx: TxQueue,
    /// Taken by whoever holds the drain of `tx`.
    line: Mutex<RefCell<Option<Box<dyn LineTx + Send>>>>,
    accumulator: ReceiveAccumulator,
    counters: Counters,
    config: BusConfig,
}

impl Bus {
    /// Create a bus over `line` with default configuration.
    pub fn new(line: impl LineTx + Send + 'static) -> Self {
        Self::with_config(line, BusConfig::default())
    }

    /// Create a bus over `line` with explicit configuration.
    pub fn with_config(line: impl LineTx + Send + 'static, config: BusConfig) -> Self {
        let line: Box<dyn LineTx + Send> = Box::new(line);
        Self {
            registry: Registry::new(),
            tx: TxQueue::with_config(config.frame),
            line: Mutex::new(RefCell::new(Some(line))),
            accumulator: ReceiveAccumulator::with_config(config.frame, config.sync),
            counters: Counters::default(),
            config,
        }
    }

    /// Send `payload` from `source` to `destination`.
    ///
    /// A destination registered on this bus is handled right away on the
    /// caller's stack and nothing is transmitted. Anything else goes out on
    /// the line as one frame.
    pub fn signal(
        &self,
        source: Address,
        destination: Address,
        payload: &[u8],
        flags: Flags,
        ttl: u8,
    ) -> Result<()> {
        if payload.len() > MAX_PAYLOAD {
            return Err(BusError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        if ttl == 0 {
            return Err(BusError::ZeroTtl);
        }

        if let Some(handler) = self.registry.resolve(destination) {
            handler.handle(&Message {
                destination,
                source,
                flags,
                ttl,
                payload,
            });
            Counters::bump(&self.counters.delivered);
            debug!(src = source, dst = destination, "delivered locally");
            return Ok(());
        }

        let frame = Frame::new(destination, source, flags, ttl, payload)?;
        self.transmit(&frame)
    }

    /// Feed one byte received from the line.
    ///
    /// Safe to call from the receive interrupt. A frame completed by this
    /// byte is routed before returning, outside any critical section.
    pub fn ingest(&self, byte: u8) {
        if let Some(frame) = self.accumulator.ingest(byte) {
            self.receive(&frame);
        }
    }

    /// Route a validated frame from the line: deliver it to a local node or
    /// forward it with one hop less.
    pub fn receive(&self, frame: &Frame) {
        if frame.ttl == 0 {
            Counters::bump(&self.counters.expired);
            debug!(src = frame.source, dst = frame.destination, "dropped frame with zero ttl");
            return;
        }

        if let Some(handler) = self.registry.resolve(frame.destination) {
            handler.handle(&Message {
                destination: frame.destination,
                source: frame.source,
                flags: frame.flags,
                ttl: frame.ttl,
                payload: &frame.payload,
            });
            Counters::bump(&self.counters.delivered);
            debug!(src = frame.source, dst = frame.destination, ttl = frame.ttl, "delivered");
            return;
        }

        let ttl = frame.ttl - 1;
        if ttl == 0 {
            Counters::bump(&self.counters.expired);
            debug!(src = frame.source, dst = frame.destination, "hop budget exhausted");
            return;
        }

        if self.transmit(&frame.with_ttl(ttl)).is_ok() {
            Counters::bump(&self.counters.forwarded);
            debug!(src = frame.source, dst = frame.destination, ttl, "forwarded");
        }
    }

    fn transmit(&self, frame: &Frame) -> Result<()> {
        let result = match self.tx.enqueue(frame) {
            Ok(true) => self.drain(),
            Ok(false) => Ok(()),
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                Counters::bump(&self.counters.transmitted);
                Ok(())
            }
            Err(err) => {
                Counters::bump(&self.counters.tx_errors);
                warn!(dst = frame.destination, error = %err, "frame transmit failed");
                Err(err.into())
            }
        }
    }

    /// Send queued bytes until the queue stays empty. Only called by the
    /// holder of the drain, so the line is always there to take.
    fn drain(&self) -> std::result::Result<(), FrameError> {
        loop {
            let Some(mut line) = critical_section::with(|cs| self.line.borrow_ref_mut(cs).take())
            else {
                let dropped = self.tx.abort();
                warn!(dropped, "line missing, transmit queue discarded");
                return Ok(());
            };
            let result = self.tx.drain(&mut line);
            critical_section::with(|cs| *self.line.borrow_ref_mut(cs) = Some(line));

            if let Err(err) = result {
                let dropped = self.tx.abort();
                debug!(dropped, "transmit queue discarded");
                return Err(err);
            }
            if self.tx.release() {
                return Ok(());
            }
        }
    }

    /// Outgoing byte queue.
    pub fn tx_queue(&self) -> &TxQueue {
        &self.tx
    }

    /// Nodes registered on this bus.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Receive accumulator fed by [`ingest`](Self::ingest).
    pub fn accumulator(&self) -> &ReceiveAccumulator {
        &self.accumulator
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Traffic counters, receive side included.
    pub fn stats(&self) -> BusStats {
        let rx = self.accumulator.stats();
        BusStats {
            rejected: rx.rejected,
            overflowed: rx.overflowed,
            ..self.counters.snapshot()
        }
    }
}

impl LineRx for Bus {
    fn on_byte(&self, byte: u8) {
        self.ingest(byte)
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
