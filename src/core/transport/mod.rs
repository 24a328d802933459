//! Byte channel abstraction under the AT command transport
//!
//! Supports:
//! - Serial ports (USB-Serial, UART) via [`SerialChannel`]
//! - Scripted in-memory channel for tests via [`MockChannel`]

mod mock;
mod serial;

pub use mock::MockChannel;
pub use serial::{list_ports, SerialChannel, SerialConfig, SerialFlowControl, SerialParity};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Channel error types
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Port could not be opened
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A read found nothing to return
    #[error("No data available")]
    NoData,

    /// Disconnected
    #[error("Disconnected")]
    Disconnected,

    /// Scripted channel received bytes it was not told to expect
    #[error("Unexpected write: {0}")]
    UnexpectedWrite(String),
}

/// Half-duplex byte stream to a modem
///
/// Reads are only issued after [`ByteChannel::bytes_available`] reported
/// queued data, so `read_byte` never waits for the line.
#[async_trait]
pub trait ByteChannel: Send {
    /// Write the whole buffer
    async fn write_all(&mut self, data: &[u8]) -> Result<(), ChannelError>;

    /// Push any buffered output onto the line
    async fn flush(&mut self) -> Result<(), ChannelError>;

    /// Number of received bytes waiting to be read
    fn bytes_available(&mut self) -> Result<usize, ChannelError>;

    /// Read a single byte
    async fn read_byte(&mut self) -> Result<u8, ChannelError>;

    /// Line speed in bits per second
    fn baud_rate(&self) -> u32;

    /// Time to transfer one 8-bit character at the line speed
    fn char_delay(&self) -> Duration {
        Duration::from_secs_f64(8.0 / f64::from(self.baud_rate().max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_delay() {
        let channel = MockChannel::new(9600);
        assert_eq!(channel.char_delay().as_micros(), 833);
        let channel = MockChannel::new(115200);
        assert_eq!(channel.char_delay().as_micros(), 69);
    }
}
