use chainbus_codec::{ByteOrder, Deserializer, Serializer};

use crate::error::{FrameError, Result};
use crate::flags::Flags;

/// Bus node address.
pub type Address = u16;

/// Frame header: destination (2) + source (2) + size/flags (1) + ttl (1) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// CRC-16 trailer.
pub const TRAILER_SIZE: usize = 2;

/// Largest payload the 6-bit size field can describe.
pub const MAX_PAYLOAD: usize = (1 << SIZE_BITS) - 1;

/// Largest frame on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD + TRAILER_SIZE;

/// Hop budget used when the sender does not pick one.
pub const DEFAULT_TTL: u8 = 8;

const SIZE_BITS: u8 = 6;
const FLAG_BITS: u8 = 2;

/// Fixed-capacity payload storage.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD>;

/// A bus frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Address the frame is for.
    pub destination: Address,
    /// Address of the node that originated the frame. Preserved across hops.
    pub source: Address,
    pub flags: Flags,
    /// Remaining hops. A frame arriving with 1 is delivered but never forwarded.
    pub ttl: u8,
    pub payload: Payload,
}

impl Frame {
    /// Create a frame, rejecting payloads the size field cannot carry.
    pub fn new(
        destination: Address,
        source: Address,
        flags: Flags,
        ttl: u8,
        payload: &[u8],
    ) -> Result<Self> {
        let payload = Payload::from_slice(payload).map_err(|()| FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        })?;
        Ok(Self {
            destination,
            source,
            flags,
            ttl,
            payload,
        })
    }

    /// The total wire size of this frame (header + payload + trailer).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + TRAILER_SIZE
    }

    /// The same frame with its hop budget replaced.
    pub fn with_ttl(&self, ttl: u8) -> Self {
        Self {
            ttl,
            ..self.clone()
        }
    }

    /// The header this frame is sent with.
    pub fn header(&self) -> Header {
        Header {
            destination: self.destination,
            source: self.source,
            size: self.payload.len() as u8,
            flags: self.flags,
            ttl: self.ttl,
        }
    }
}

/// The fixed part of a frame, readable before the payload has arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub destination: Address,
    pub source: Address,
    /// Declared payload length.
    pub size: u8,
    pub flags: Flags,
    pub ttl: u8,
}

impl Header {
    /// Parse a header from the start of `src`.
    ///
    /// Returns `None` if fewer than [`HEADER_SIZE`] bytes are available.
    pub fn peek(src: &[u8]) -> Option<Self> {
        if src.len() < HEADER_SIZE {
            return None;
        }
        let mut header = Header {
            destination: 0,
            source: 0,
            size: 0,
            flags: Flags::default(),
            ttl: 0,
        };
        let mut flag_bits = 0u8;
        Deserializer::new(&src[..HEADER_SIZE])
            .order(ByteOrder::Little)
            .read_u16(&mut header.destination)
            .read_u16(&mut header.source)
            .read_bitfield(&mut header.size, SIZE_BITS)
            .read_bitfield(&mut flag_bits, FLAG_BITS)
            .read_u8(&mut header.ttl)
            .finish()
            .ok()?;
        header.flags = Flags::from_bits(flag_bits);
        Some(header)
    }

    /// Wire size of the frame this header announces.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.size as usize + TRAILER_SIZE
    }
}

/// Signing and validation hooks applied to every frame.
///
/// `sign` receives the encoded frame with a zeroed trailer and fills the
/// trailer in. `validate` receives a complete frame, trailer included.
#[derive(Debug, Clone, Copy)]
pub struct FrameConfig {
    pub sign: fn(&mut [u8]) -> bool,
    pub validate: fn(&[u8]) -> bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            sign: crc16_sign,
            validate: crc16_validate,
        }
    }
}

/// Encode a frame into `dst`, returning the number of bytes written.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────┬───────────────────────┬──────┬──────────┬───────────┐
/// │ Dst      │ Src      │ size:6 write:1 req:1  │ TTL  │ Payload  │ CRC-16    │
/// │ (2B LE)  │ (2B LE)  │ (1B, LSB first)       │ (1B) │ (size B) │ (2B LE)   │
/// └──────────┴──────────┴───────────────────────┴──────┴──────────┴───────────┘
/// ```
pub fn encode_frame(frame: &Frame, dst: &mut [u8], config: &FrameConfig) -> Result<usize> {
    if frame.payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: frame.payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let header = frame.header();
    let written = Serializer::new(dst)
        .order(ByteOrder::Little)
        .write_u16(header.destination)
        .write_u16(header.source)
        .write_bitfield(header.size, SIZE_BITS)
        .write_bitfield(header.flags.bits(), FLAG_BITS)
        .write_u8(header.ttl)
        .order(ByteOrder::NATIVE)
        .write_bytes(&frame.payload)
        .write_u16(0)
        .sign(config.sign)
        .finish()?;
    Ok(written)
}

/// Decode one frame from the start of `src`.
///
/// Returns `Ok(None)` if `src` doesn't hold the whole frame its header
/// announces yet. Bytes past the frame are ignored. A frame that fails the
/// validation hook is `FrameError::Codec(ErrorCode::InvalidData)`.
pub fn decode_frame(src: &[u8], config: &FrameConfig) -> Result<Option<Frame>> {
    let Some(header) = Header::peek(src) else {
        return Ok(None); // Need more data
    };
    let total = header.frame_len();
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let mut payload = [0u8; MAX_PAYLOAD];
    let size = header.size as usize;
    Deserializer::new(&src[..total])
        .seek(HEADER_SIZE as isize)
        .order(ByteOrder::NATIVE)
        .read_bytes(&mut payload[..size])
        .seek(TRAILER_SIZE as isize)
        .validate(config.validate)
        .finish()?;

    Frame::new(
        header.destination,
        header.source,
        header.flags,
        header.ttl,
        &payload[..size],
    )
    .map(Some)
}

/// CRC-16/CCITT-FALSE (poly 0x1021, init 0xFFFF, MSB first).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Signing hook: store the CRC of everything before the trailer in the trailer.
pub fn crc16_sign(span: &mut [u8]) -> bool {
    let Some(body_len) = span.len().checked_sub(TRAILER_SIZE) else {
        return false;
    };
    let crc = crc16(&span[..body_len]);
    span[body_len..].copy_from_slice(&crc.to_le_bytes());
    true
}

/// Validation hook: check the trailer against the CRC of the rest.
pub fn crc16_validate(span: &[u8]) -> bool {
    let Some(body_len) = span.len().checked_sub(TRAILER_SIZE) else {
        return false;
    };
    let expected = u16::from_le_bytes([span[body_len], span[body_len + 1]]);
    crc16(&span[..body_len]) == expected
}

#[cfg(test)]
mod tests {
    use chainbus_codec::ErrorCode;

    use super::*;

    fn frame(payload: &[u8]) -> Frame {
        Frame::new(0x0102, 0x0304, Flags::new(true, false), 3, payload).unwrap()
    }

    fn encode(frame: &Frame) -> Vec<u8> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let n = encode_frame(frame, &mut buf, &FrameConfig::default()).unwrap();
        buf[..n].to_vec()
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let original = frame(b"hello, bus!");
        let wire = encode(&original);
        assert_eq!(wire.len(), original.wire_size());

        let decoded = decode_frame(&wire, &FrameConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_header_layout() {
        let wire = encode(&Frame::new(0x0102, 0x0304, Flags::new(true, true), 7, b"abc").unwrap());
        assert_eq!(&wire[..4], &[0x02, 0x01, 0x04, 0x03]);
        // size 3 in the low six bits, then write, then request.
        assert_eq!(wire[4], 0b1100_0011);
        assert_eq!(wire[5], 7);
        assert_eq!(&wire[6..9], b"abc");
    }

    #[test]
    fn test_crc_check_value() {
        assert_eq!(crc16(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_trailer_is_crc_of_body() {
        let wire = encode(&frame(b"xyz"));
        let body = &wire[..wire.len() - TRAILER_SIZE];
        let trailer = u16::from_le_bytes([wire[wire.len() - 2], wire[wire.len() - 1]]);
        assert_eq!(trailer, crc16(body));
    }

    #[test]
    fn test_decode_incomplete_header() {
        let result = decode_frame(&[0x01, 0x00, 0x02], &FrameConfig::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let wire = encode(&frame(b"hello"));
        let result = decode_frame(&wire[..HEADER_SIZE + 2], &FrameConfig::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_corrupted_payload() {
        let mut wire = encode(&frame(b"hello"));
        wire[HEADER_SIZE] ^= 0x01;
        let result = decode_frame(&wire, &FrameConfig::default());
        assert!(matches!(
            result,
            Err(FrameError::Codec(ErrorCode::InvalidData))
        ));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut wire = encode(&frame(b"one"));
        wire.extend_from_slice(&[0xAA, 0xBB]);
        let decoded = decode_frame(&wire, &FrameConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(decoded.payload.as_slice(), b"one");
    }

    #[test]
    fn test_payload_too_large() {
        let err = Frame::new(1, 2, Flags::default(), 1, &[0u8; MAX_PAYLOAD + 1]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size, max } if size == MAX_PAYLOAD + 1 && max == MAX_PAYLOAD
        ));
    }

    #[test]
    fn test_max_payload_fits() {
        let original = frame(&[0x5A; MAX_PAYLOAD]);
        let wire = encode(&original);
        assert_eq!(wire.len(), MAX_FRAME_SIZE);
        let decoded = decode_frame(&wire, &FrameConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(decoded.payload.len(), MAX_PAYLOAD);
    }

    #[test]
    fn test_encode_short_buffer() {
        let mut buf = [0u8; HEADER_SIZE + 1];
        let err = encode_frame(&frame(b"hello"), &mut buf, &FrameConfig::default()).unwrap_err();
        assert!(matches!(err, FrameError::Codec(ErrorCode::BufferOverflow)));
    }

    #[test]
    fn test_refusing_signer() {
        let config = FrameConfig {
            sign: |_| false,
            ..FrameConfig::default()
        };
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let err = encode_frame(&frame(b"x"), &mut buf, &config).unwrap_err();
        assert!(matches!(err, FrameError::Codec(ErrorCode::NoSign)));
    }

    #[test]
    fn test_empty_payload() {
        let wire = encode(&frame(b""));
        assert_eq!(wire.len(), HEADER_SIZE + TRAILER_SIZE);
        let decoded = decode_frame(&wire, &FrameConfig::default())
            .unwrap()
            .unwrap();
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_header_peek() {
        let wire = encode(&frame(b"abcd"));
        let header = Header::peek(&wire).unwrap();
        assert_eq!(header.destination, 0x0102);
        assert_eq!(header.source, 0x0304);
        assert_eq!(header.size, 4);
        assert!(header.flags.write);
        assert!(!header.flags.request);
        assert_eq!(header.frame_len(), wire.len());
        assert!(Header::peek(&wire[..HEADER_SIZE - 1]).is_none());
    }

    #[test]
    fn test_header_flags_every_combination() {
        for bits in 0..4 {
            let flags = Flags::from_bits(bits);
            let frame = Frame::new(9, 8, flags, 2, b"f").unwrap();
            let wire = encode(&frame);
            assert_eq!(wire[4] >> 6, bits);
            assert_eq!(Header::peek(&wire), Some(frame.header()));
        }
    }

    #[test]
    fn test_with_ttl_keeps_everything_else() {
        let original = frame(b"hop");
        let next = original.with_ttl(2);
        assert_eq!(next.ttl, 2);
        assert_eq!(next.source, original.source);
        assert_eq!(next.payload, original.payload);
    }
}
