use std::io::Read;
use std::path::{Path, PathBuf};

use chainbus_frame::{Address, SyncPolicy, DEFAULT_TTL};
use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one frame and print it.
    Encode(EncodeArgs),
    /// Reassemble frames from a byte stream.
    Decode(DecodeArgs),
    /// Send a message around a ring of simulated devices.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// UTF-8 string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex-encoded payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Destination address (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_address)]
    pub dst: Address,
    /// Source address (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_address, default_value = "0")]
    pub src: Address,
    /// Hop budget.
    #[arg(long, default_value_t = DEFAULT_TTL, value_parser = clap::value_parser!(u8).range(1..))]
    pub ttl: u8,
    /// Set the write flag.
    #[arg(long)]
    pub write: bool,
    /// Set the request flag.
    #[arg(long)]
    pub request: bool,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex-encoded byte stream. Reads raw bytes from --file or stdin when omitted.
    #[arg(conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read the raw byte stream from file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Where the receiver looks for frames.
    #[arg(long, value_enum, default_value = "head")]
    pub sync: SyncArg,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of devices in the ring.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub devices: u16,
    /// Index of the sending device.
    #[arg(long, default_value_t = 0)]
    pub from: u16,
    /// Index of the receiving device. Default: the last device.
    #[arg(long)]
    pub to: Option<u16>,
    /// Address of device 0; device `i` listens at `base + i`.
    #[arg(long, value_parser = parse_address, default_value = "0x0100")]
    pub base_address: Address,
    /// Hop budget.
    #[arg(long, default_value_t = DEFAULT_TTL, value_parser = clap::value_parser!(u8).range(1..))]
    pub ttl: u8,
    /// Where each receiver looks for frames.
    #[arg(long, value_enum, default_value = "head")]
    pub sync: SyncArg,
    /// Give up after this many scheduler steps.
    #[arg(long, default_value_t = 10_000)]
    pub max_steps: u32,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum SyncArg {
    Head,
    Tail,
}

impl From<SyncArg> for SyncPolicy {
    fn from(arg: SyncArg) -> Self {
        match arg {
            SyncArg::Head => SyncPolicy::HeadOnly,
            SyncArg::Tail => SyncPolicy::TailScan,
        }
    }
}

pub fn parse_address(input: &str) -> Result<Address, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => Address::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid address {input:?}: {err}"))
}

/// Decode hex, ignoring whitespace and an optional `0x` prefix.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let digits: Vec<u8> = trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::new(USAGE, "hex input has an odd number of digits"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).unwrap_or("");
            u8::from_str_radix(text, 16)
                .map_err(|_| CliError::new(USAGE, format!("invalid hex byte {text:?}")))
        })
        .collect()
}

pub fn resolve_payload(args: &PayloadArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return read_file(path);
    }
    Ok(Vec::new())
}

pub fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    std::fs::read(path).map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

pub fn read_stdin() -> CliResult<Vec<u8>> {
    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex_addresses() {
        assert_eq!(parse_address("42"), Ok(42));
        assert_eq!(parse_address("0x0102"), Ok(0x0102));
        assert_eq!(parse_address("0XFFFF"), Ok(0xFFFF));
        assert!(parse_address("0x10000").is_err());
        assert!(parse_address("node").is_err());
    }

    #[test]
    fn parses_hex_with_whitespace() {
        assert_eq!(parse_hex("0x01 ab\nFF").unwrap(), vec![0x01, 0xab, 0xff]);
        assert_eq!(parse_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_bad_hex() {
        assert_eq!(parse_hex("abc").unwrap_err().code, USAGE);
        assert_eq!(parse_hex("zz").unwrap_err().code, USAGE);
    }

    #[test]
    fn payload_sources() {
        let args = PayloadArgs {
            data: None,
            hex: Some("6869".to_string()),
            file: None,
        };
        assert_eq!(resolve_payload(&args).unwrap(), b"hi");

        let empty = PayloadArgs {
            data: None,
            hex: None,
            file: None,
        };
        assert!(resolve_payload(&empty).unwrap().is_empty());
    }
}
