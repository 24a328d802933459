//! Protocol implementations
//!
//! Provides checksum and sentence decoders for the modem's text protocols:
//! - CRC-16/XMODEM command/response suffix
//! - NMEA-0183 location sentences

pub mod checksum;
pub mod nmea;

pub use checksum::{strip_crc_suffix, xor_checksum, CrcXmodem, CRC_MARKER};
pub use nmea::{CoordinateResolution, LocationSnapshot, NmeaLocationDecoder, NmeaSentenceType};
