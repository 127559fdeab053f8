//! Allocation-free binary codec.
//!
//! A [`Serializer`] writes into a caller-owned byte region (or a byte sink), a
//! [`Deserializer`] reads back from one. Both track a position, a byte order
//! and a sticky [`ErrorCode`]; every method returns the cursor so a message
//! reads as its field list:
//!
//! ```
//! use chainbus_codec::{Deserializer, Serializer, NO_LIMIT};
//!
//! let mut buf = [0u8; 16];
//! let written = Serializer::new(&mut buf)
//!     .write_u16(0x0102)
//!     .write_bitfield(5, 3)
//!     .write_bit(true)
//!     .write_string("hi", NO_LIMIT)
//!     .finish()
//!     .unwrap();
//!
//! let (mut addr, mut kind, mut flag, mut name) = (0u16, 0u8, false, [0u8; 4]);
//! let read = Deserializer::new(&buf[..written])
//!     .read_u16(&mut addr)
//!     .read_bitfield(&mut kind, 3)
//!     .read_bit(&mut flag)
//!     .read_string(&mut name, NO_LIMIT)
//!     .finish()
//!     .unwrap();
//!
//! assert_eq!((addr, kind, flag, &name[..3]), (0x0102, 5, true, &b"hi\0"[..]));
//! assert_eq!(read, written);
//! ```
//!
//! Errors never unwind. Once a cursor has failed, every later call is a no-op,
//! so a chain can be written unconditionally and checked once at the end.

pub mod de;
pub mod error;
pub mod order;
pub mod ser;

pub use de::Deserializer;
pub use error::{ErrorCode, Result};
pub use order::ByteOrder;
pub use ser::Serializer;

/// String length sentinel: no limit beyond the region's capacity.
pub const NO_LIMIT: usize = 0;
