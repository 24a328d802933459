//! # NIMO Modem Library
//!
//! Drives satellite IoT (NIMO) modems over their AT command interface:
//! - Half-duplex command/response transport over a serial port
//! - Automatic detection of command echo, short result codes and CRC mode
//! - CRC-16/XMODEM command and response checksums
//! - ORBCOMM and Quectel message queue records
//! - NMEA-0183 location decoding
//!
//! ## Example
//!
//! ```rust,no_run
//! use nimo_modem::{AtCommandTransport, AtOutcome, SerialChannel, SerialConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let channel = SerialChannel::open(SerialConfig::new("/dev/ttyUSB0", 9600))?;
//!     let mut modem = AtCommandTransport::new(channel);
//!
//!     let (outcome, mobile_id) = modem.exchange("AT+GSN", Some("+GSN:")).await?;
//!     if outcome == AtOutcome::Ok {
//!         println!("Mobile ID: {}", mobile_id);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::config::{AtSettings, LoggingConfig, ModemConfig, NmeaSettings};
pub use crate::core::codec::{Codec, CodecError};
pub use crate::core::command::{
    AtCommandTransport, AtError, AtOutcome, ProtocolModes, ReadinessGate, DEFAULT_AT_TIMEOUT,
};
pub use crate::core::constants::{
    is_valid, AtErrorCode, CodeEnum, DataFormat, GeoBeam, GeoSatellite, GnssFixQuality,
    GnssFixType, MessagePriority, MessageState,
};
pub use crate::core::message::{
    DecodeError, Direction, Manufacturer, MessageRecord, MoMessage, ValidationError,
};
pub use crate::core::protocol::{CoordinateResolution, CrcXmodem, LocationSnapshot, NmeaLocationDecoder};
pub use crate::core::transport::{ByteChannel, ChannelError, MockChannel, SerialChannel, SerialConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
