//! Core module containing the modem protocol stack
//!
//! This module provides:
//! - Byte channels to the modem (serial port, scripted mock)
//! - AT command transport with echo/verbose/CRC detection
//! - CRC-16/XMODEM and NMEA-0183 protocol helpers
//! - Payload codecs (text, hex, base64)
//! - Message queue record decoding per manufacturer
//! - Shared protocol constants

pub mod codec;
pub mod command;
pub mod constants;
pub mod message;
pub mod protocol;
pub mod transport;
