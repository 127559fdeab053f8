use std::io::{IsTerminal, Write};

use chainbus_frame::{Address, Frame};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FrameOutput {
    pub destination: Address,
    pub source: Address,
    pub write: bool,
    pub request: bool,
    pub ttl: u8,
    pub payload_size: usize,
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wire: Option<String>,
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl FrameOutput {
    pub fn new(frame: &Frame, wire: Option<&[u8]>) -> Self {
        Self {
            destination: frame.destination,
            source: frame.source,
            write: frame.flags.write,
            request: frame.flags.request,
            ttl: frame.ttl,
            payload_size: frame.payload.len(),
            payload: payload_preview(&frame.payload),
            wire: wire.map(to_hex),
            raw: frame.payload.to_vec(),
        }
    }
}

#[derive(Serialize, Debug, Default)]
pub struct RxOutput {
    pub bytes: usize,
    pub frames: u32,
    pub rejected: u32,
    pub overflowed: u32,
    pub pending: usize,
}

#[derive(Serialize, Debug)]
pub struct DecodeOutput {
    pub frames: Vec<FrameOutput>,
    pub rx: RxOutput,
}

#[derive(Serialize, Debug, Clone)]
pub struct DeliveryOutput {
    pub device: usize,
    pub address: Address,
    pub source: Address,
    pub ttl: u8,
    pub payload: String,
    #[serde(skip)]
    pub raw: Vec<u8>,
}

#[derive(Serialize, Debug, Clone)]
pub struct DeviceOutput {
    pub device: usize,
    pub address: Address,
    pub transmitted: u32,
    pub forwarded: u32,
    pub delivered: u32,
    pub expired: u32,
    pub rejected: u32,
}

#[derive(Serialize, Debug)]
pub struct SimulationOutput {
    pub devices: usize,
    pub source: Address,
    pub destination: Address,
    pub ttl: u8,
    pub delivered: bool,
    pub steps: u32,
    pub deliveries: Vec<DeliveryOutput>,
    pub stats: Vec<DeviceOutput>,
}

pub fn print_frames(frames: &[FrameOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(frames),
        OutputFormat::Table => println!("{}", frame_table(frames)),
        OutputFormat::Pretty => {
            for frame in frames {
                println!("{}", pretty_frame(frame));
            }
        }
        OutputFormat::Raw => {
            for frame in frames {
                print_raw(&frame.raw);
            }
        }
    }
}

pub fn print_decode(output: &DecodeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => {
            println!("{}", frame_table(&output.frames));
            let mut table = new_table(vec!["BYTES", "FRAMES", "REJECTED", "OVERFLOWED", "PENDING"]);
            table.add_row(vec![
                output.rx.bytes.to_string(),
                output.rx.frames.to_string(),
                output.rx.rejected.to_string(),
                output.rx.overflowed.to_string(),
                output.rx.pending.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for frame in &output.frames {
                println!("{}", pretty_frame(frame));
            }
            println!(
                "bytes={} frames={} rejected={} overflowed={} pending={}",
                output.rx.bytes,
                output.rx.frames,
                output.rx.rejected,
                output.rx.overflowed,
                output.rx.pending
            );
        }
        OutputFormat::Raw => print_frames(&output.frames, format),
    }
}

pub fn print_simulation(output: &SimulationOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => {
            let mut deliveries = new_table(vec!["DEVICE", "ADDRESS", "SOURCE", "TTL", "PAYLOAD"]);
            for d in &output.deliveries {
                deliveries.add_row(vec![
                    d.device.to_string(),
                    format!("{:#06x}", d.address),
                    format!("{:#06x}", d.source),
                    d.ttl.to_string(),
                    d.payload.clone(),
                ]);
            }
            println!("{deliveries}");
            println!("{}", device_table(&output.stats));
        }
        OutputFormat::Pretty => {
            println!(
                "{:#06x} -> {:#06x} over {} devices, ttl={}: {} after {} steps",
                output.source,
                output.destination,
                output.devices,
                output.ttl,
                if output.delivered { "delivered" } else { "not delivered" },
                output.steps
            );
            for s in &output.stats {
                println!(
                    "  device {} ({:#06x}): tx={} fwd={} rx={} expired={} rejected={}",
                    s.device, s.address, s.transmitted, s.forwarded, s.delivered, s.expired, s.rejected
                );
            }
        }
        OutputFormat::Raw => {
            for d in &output.deliveries {
                print_raw(&d.raw);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn frame_table(frames: &[FrameOutput]) -> Table {
    let mut table = new_table(vec!["DST", "SRC", "FLAGS", "TTL", "SIZE", "PAYLOAD"]);
    for frame in frames {
        table.add_row(vec![
            format!("{:#06x}", frame.destination),
            format!("{:#06x}", frame.source),
            flags_label(frame),
            frame.ttl.to_string(),
            frame.payload_size.to_string(),
            frame.payload.clone(),
        ]);
    }
    table
}

fn device_table(stats: &[DeviceOutput]) -> Table {
    let mut table = new_table(vec![
        "DEVICE", "ADDRESS", "TX", "FORWARDED", "DELIVERED", "EXPIRED", "REJECTED",
    ]);
    for s in stats {
        table.add_row(vec![
            s.device.to_string(),
            format!("{:#06x}", s.address),
            s.transmitted.to_string(),
            s.forwarded.to_string(),
            s.delivered.to_string(),
            s.expired.to_string(),
            s.rejected.to_string(),
        ]);
    }
    table
}

fn pretty_frame(frame: &FrameOutput) -> String {
    let mut line = format!(
        "dst={:#06x} src={:#06x} flags={} ttl={} size={} payload={}",
        frame.destination,
        frame.source,
        flags_label(frame),
        frame.ttl,
        frame.payload_size,
        frame.payload
    );
    if let Some(wire) = &frame.wire {
        line.push_str(" wire=");
        line.push_str(wire);
    }
    line
}

fn flags_label(frame: &FrameOutput) -> String {
    chainbus_frame::Flags::new(frame.write, frame.request).to_string()
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
