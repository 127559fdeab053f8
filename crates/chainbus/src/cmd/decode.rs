use chainbus_frame::{FrameConfig, ReceiveAccumulator};
use tracing::{debug, warn};

use crate::cmd::{parse_hex, read_file, read_stdin, DecodeArgs};
use crate::exit::{CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_decode, DecodeOutput, FrameOutput, OutputFormat, RxOutput};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = match (&args.hex, &args.file) {
        (Some(hex), _) => parse_hex(hex)?,
        (None, Some(path)) => read_file(path)?,
        (None, None) => read_stdin()?,
    };

    let accumulator = ReceiveAccumulator::with_config(FrameConfig::default(), args.sync.into());
    let output = decode_stream(&bytes, &accumulator);
    print_decode(&output, format);

    if output.frames.is_empty() {
        warn!(bytes = bytes.len(), "no valid frame in input");
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

/// Feed `bytes` through `accumulator` one at a time, like a receive interrupt.
fn decode_stream(bytes: &[u8], accumulator: &ReceiveAccumulator) -> DecodeOutput {
    let frames: Vec<FrameOutput> = bytes
        .iter()
        .filter_map(|&byte| accumulator.ingest(byte))
        .map(|frame| FrameOutput::new(&frame, None))
        .collect();

    let stats = accumulator.stats();
    debug!(frames = stats.frames, rejected = stats.rejected, "stream decoded");
    DecodeOutput {
        frames,
        rx: RxOutput {
            bytes: bytes.len(),
            frames: stats.frames,
            rejected: stats.rejected,
            overflowed: stats.overflowed,
            pending: accumulator.len(),
        },
    }
}
