//! Three simulated devices chained in a ring, driven by the module scheduler.
//!
//! Run with:
//!   cargo run --example ring
//!
//! Device 0 asks a node on device 2 for a reading. The request travels two
//! hops forward; the reply continues around the ring back to device 0.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use chainbus::frame::Flags;
use chainbus::kernel::{Module, Scheduler};
use chainbus::line::ChannelLine;
use chainbus::node::{Bus, Message, Node};

const CONSOLE: u16 = 0x0010;
const THERMOMETER: u16 = 0x0030;

/// Moves bytes queued by the upstream device into this device's bus.
struct Link {
    name: String,
    upstream: Receiver<u8>,
    bus: Arc<Bus>,
}

impl Module for Link {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) -> bool {
        true
    }

    fn poll(&mut self) {
        for byte in self.upstream.try_iter() {
            self.bus.ingest(byte);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (lines, mut upstreams): (Vec<_>, Vec<_>) = (0..3).map(|_| ChannelLine::pair()).unzip();
    upstreams.rotate_right(1);

    let buses: Vec<Arc<Bus>> = lines.into_iter().map(|line| Arc::new(Bus::new(line))).collect();

    let mut scheduler = Scheduler::new();
    let mut previous = None;
    for (index, (bus, upstream)) in buses.iter().zip(upstreams).enumerate() {
        let id = scheduler.add(Link {
            name: format!("link-{index}"),
            upstream,
            bus: Arc::clone(bus),
        })?;
        // Bring links up in ring order.
        if let Some(previous) = previous {
            scheduler.depend(id, previous)?;
        }
        previous = Some(id);
    }

    let console = Node::new(&buses[0], CONSOLE, |msg: &Message<'_>| {
        println!(
            "console <- {:#06x} [{}] ttl={}: {}",
            msg.source,
            msg.flags,
            msg.ttl,
            String::from_utf8_lossy(msg.payload)
        );
    });

    let thermometer_bus = Arc::clone(&buses[2]);
    let _thermometer = Node::new(&buses[2], THERMOMETER, move |msg: &Message<'_>| {
        println!(
            "thermometer <- {:#06x} [{}] ttl={}",
            msg.source, msg.flags, msg.ttl
        );
        if msg.flags.request {
            let reply = thermometer_bus.signal(
                THERMOMETER,
                msg.source,
                b"21.5C",
                Flags::new(false, false),
                chainbus::frame::DEFAULT_TTL,
            );
            if let Err(err) = reply {
                eprintln!("reply failed: {err}");
            }
        }
    });

    console.signal(b"temperature?", THERMOMETER, Flags::READ_REQUEST)?;

    for tick in 0..16 {
        scheduler.step(tick);
    }

    for (index, bus) in buses.iter().enumerate() {
        let stats = bus.stats();
        println!(
            "device {index}: tx={} fwd={} delivered={}",
            stats.transmitted, stats.forwarded, stats.delivered
        );
    }
    Ok(())
}
