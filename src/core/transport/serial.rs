//! Serial port channel implementation

use super::{ByteChannel, ChannelError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// Serial port flow control type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialFlowControl {
    /// No flow control
    #[default]
    None,
    /// Hardware flow control (RTS/CTS)
    Hardware,
    /// Software flow control (XON/XOFF)
    Software,
}

/// Serial port parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    /// No parity
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name (e.g., COM3, /dev/ttyUSB0)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Parity
    pub parity: SerialParity,
    /// Flow control
    pub flow_control: SerialFlowControl,
    /// Read timeout of the underlying port in milliseconds
    pub read_timeout_ms: u64,
}

impl SerialConfig {
    /// Create a new serial configuration with 8N1 framing
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            parity: SerialParity::None,
            flow_control: SerialFlowControl::None,
            read_timeout_ms: 100,
        }
    }

    /// Set parity
    #[must_use]
    pub fn parity(mut self, parity: SerialParity) -> Self {
        self.parity = parity;
        self
    }

    /// Set flow control
    #[must_use]
    pub fn flow_control(mut self, flow: SerialFlowControl) -> Self {
        self.flow_control = flow;
        self
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        // Factory default of the modems
        Self::new("/dev/ttyUSB0", 9600)
    }
}

/// Modem attached to a local serial port
pub struct SerialChannel {
    config: SerialConfig,
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Open the port described by `config`
    pub fn open(config: SerialConfig) -> Result<Self, ChannelError> {
        let parity = match config.parity {
            SerialParity::Odd => Parity::Odd,
            SerialParity::Even => Parity::Even,
            SerialParity::None => Parity::None,
        };

        let flow_control = match config.flow_control {
            SerialFlowControl::Hardware => FlowControl::Hardware,
            SerialFlowControl::Software => FlowControl::Software,
            SerialFlowControl::None => FlowControl::None,
        };

        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(parity)
            .flow_control(flow_control)
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => ChannelError::PortNotFound(config.port.clone()),
                serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                    ChannelError::PermissionDenied(config.port.clone())
                }
                _ => ChannelError::ConnectionFailed(e.to_string()),
            })?;

        info!("Opened {} @ {} baud", config.port, config.baud_rate);
        Ok(Self { config, port })
    }

    /// Port name
    pub fn name(&self) -> &str {
        &self.config.port
    }
}

#[async_trait]
impl ByteChannel for SerialChannel {
    async fn write_all(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        self.port.write_all(data)?;
        debug!("{} bytes written to {}", data.len(), self.config.port);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ChannelError> {
        self.port.flush()?;
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize, ChannelError> {
        let count = self
            .port
            .bytes_to_read()
            .map_err(|e| ChannelError::IoError(e.into()))?;
        Ok(count as usize)
    }

    async fn read_byte(&mut self) -> Result<u8, ChannelError> {
        let mut buffer = [0u8; 1];
        match self.port.read(&mut buffer) {
            Ok(0) => Err(ChannelError::Disconnected),
            Ok(_) => Ok(buffer[0]),
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => Err(ChannelError::NoData),
            Err(e) => Err(ChannelError::IoError(e)),
        }
    }

    fn baud_rate(&self) -> u32 {
        self.config.baud_rate
    }
}

/// List available serial ports
pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>, ChannelError> {
    serialport::available_ports().map_err(|e| ChannelError::IoError(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = SerialConfig::new("COM3", 115200)
            .parity(SerialParity::Even)
            .flow_control(SerialFlowControl::Hardware);
        assert_eq!(config.port, "COM3");
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.parity, SerialParity::Even);
        assert_eq!(config.flow_control, SerialFlowControl::Hardware);
    }

    #[test]
    fn test_missing_port() {
        let result = SerialChannel::open(SerialConfig::new("/dev/does-not-exist-nimo", 9600));
        assert!(result.is_err());
    }
}
