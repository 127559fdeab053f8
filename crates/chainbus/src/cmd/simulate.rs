use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

use chainbus_frame::{Address, Flags};
use chainbus_kernel::{Module, Scheduler, SchedulerConfig};
use chainbus_line::ChannelLine;
use chainbus_node::{Bus, BusConfig, Message, Node};
use tracing::{debug, info, warn};

use crate::cmd::{resolve_payload, SimulateArgs};
use crate::exit::{bus_error, kernel_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{
    payload_preview, print_simulation, DeliveryOutput, DeviceOutput, OutputFormat,
    SimulationOutput,
};

type Deliveries = Arc<Mutex<Vec<DeliveryOutput>>>;

/// Drains the queue fed by the upstream device into this device's bus.
struct LinkPump {
    name: String,
    upstream: Receiver<u8>,
    bus: Arc<Bus>,
    moved: Arc<AtomicUsize>,
}

impl Module for LinkPump {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) -> bool {
        true
    }

    fn poll(&mut self) {
        for byte in self.upstream.try_iter() {
            self.bus.ingest(byte);
            self.moved.fetch_add(1, Ordering::Relaxed);
        }
    }
}

struct Device {
    address: Address,
    bus: Arc<Bus>,
    node: Node,
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let count = args.devices;
    let to = args.to.unwrap_or(count - 1);
    if args.from >= count || to >= count {
        return Err(CliError::new(
            USAGE,
            format!("device index out of range (ring has {count} devices)"),
        ));
    }
    let last_address = u32::from(args.base_address) + u32::from(count) - 1;
    if last_address > u32::from(Address::MAX) {
        return Err(CliError::new(USAGE, "device addresses overflow 0xffff"));
    }
    let payload = resolve_payload(&args.payload)?;
    let payload = if payload.is_empty() {
        b"hello".to_vec()
    } else {
        payload
    };

    let config = BusConfig::default().with_sync_policy(args.sync.into());
    let deliveries = Deliveries::default();
    let moved = Arc::new(AtomicUsize::new(0));

    let (lines, mut upstreams): (Vec<_>, Vec<_>) =
        (0..count).map(|_| ChannelLine::pair()).unzip();
    // Device `i` hears what device `i - 1` transmits.
    upstreams.rotate_right(1);

    let mut scheduler = Scheduler::with_config(SchedulerConfig {
        max_modules: usize::from(count),
    });
    let mut devices = Vec::with_capacity(usize::from(count));
    for (index, (line, upstream)) in lines.into_iter().zip(upstreams).enumerate() {
        let address = args.base_address + index as Address;
        let bus = Arc::new(Bus::with_config(line, config));
        let node = Node::new(&bus, address, recorder(index, &deliveries));

        scheduler
            .add(LinkPump {
                name: format!("device-{index}"),
                upstream,
                bus: Arc::clone(&bus),
                moved: Arc::clone(&moved),
            })
            .map_err(|err| kernel_error("simulation setup failed", err))?;
        devices.push(Device { address, bus, node });
    }

    let source = &devices[usize::from(args.from)];
    let destination = devices[usize::from(to)].address;
    info!(
        devices = count,
        src = source.address,
        dst = destination,
        ttl = args.ttl,
        "simulation started"
    );
    source
        .node
        .signal_with_ttl(&payload, destination, Flags::default(), args.ttl)
        .map_err(|err| bus_error("signal failed", err))?;

    let steps = pump(&mut scheduler, &moved, args.max_steps);

    let deliveries = std::mem::take(&mut *deliveries.lock().unwrap_or_else(|e| e.into_inner()));
    let delivered = deliveries.iter().any(|d| d.address == destination);
    let output = SimulationOutput {
        devices: usize::from(count),
        source: source.address,
        destination,
        ttl: args.ttl,
        delivered,
        steps,
        deliveries,
        stats: devices
            .iter()
            .enumerate()
            .map(|(index, device)| {
                let stats = device.bus.stats();
                DeviceOutput {
                    device: index,
                    address: device.address,
                    transmitted: stats.transmitted,
                    forwarded: stats.forwarded,
                    delivered: stats.delivered,
                    expired: stats.expired,
                    rejected: stats.rejected,
                }
            })
            .collect(),
    };
    print_simulation(&output, format);

    if delivered {
        Ok(SUCCESS)
    } else {
        warn!(dst = destination, "message was not delivered");
        Ok(FAILURE)
    }
}

/// Step the scheduler until a whole step moves no bytes. Returns the steps run.
fn pump(scheduler: &mut Scheduler, moved: &AtomicUsize, max_steps: u32) -> u32 {
    let mut steps = 0;
    while steps < max_steps {
        let before = moved.load(Ordering::Relaxed);
        scheduler.step(steps);
        steps += 1;
        if moved.load(Ordering::Relaxed) == before {
            debug!(steps, "line idle");
            return steps;
        }
    }
    warn!(max_steps, "simulation stopped before the line went idle");
    steps
}

fn recorder(device: usize, deliveries: &Deliveries) -> impl Fn(&Message<'_>) + Send + Sync {
    let deliveries = Arc::clone(deliveries);
    move |msg: &Message<'_>| {
        deliveries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DeliveryOutput {
                device,
                address: msg.destination,
                source: msg.source,
                ttl: msg.ttl,
                payload: payload_preview(msg.payload),
                raw: msg.payload.to_vec(),
            });
    }
}
