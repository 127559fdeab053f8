use chainbus_frame::{encode_frame, Flags, Frame, FrameConfig, MAX_FRAME_SIZE};
use chainbus_line::{LineTx, WriteLine};
use tracing::debug;

use crate::cmd::{resolve_payload, EncodeArgs};
use crate::exit::{frame_error, line_error, CliResult, SUCCESS};
use crate::output::{print_frames, FrameOutput, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args.payload)?;
    let frame = Frame::new(
        args.dst,
        args.src,
        Flags::new(args.write, args.request),
        args.ttl,
        &payload,
    )
    .map_err(|err| frame_error("encode failed", err))?;

    let mut buf = [0u8; MAX_FRAME_SIZE];
    let len = encode_frame(&frame, &mut buf, &FrameConfig::default())
        .map_err(|err| frame_error("encode failed", err))?;
    let wire = &buf[..len];
    debug!(len, "frame encoded");

    match format {
        OutputFormat::Raw => {
            // Stdout stands in for the serial line.
            let mut line = WriteLine::new(std::io::stdout().lock());
            line.transmit_all(wire)
                .and_then(|()| line.flush())
                .map_err(|err| line_error("write failed", err))?;
        }
        _ => print_frames(&[FrameOutput::new(&frame, Some(wire))], format),
    }
    Ok(SUCCESS)
}
