//! Scripted in-memory channel for deterministic tests
//!
//! [`MockChannel`] is cheaply cloneable: every clone shares the same line,
//! so a test can keep one handle to inject bytes or inspect writes while
//! the transport owns another.
//!
//! ```
//! use nimo_modem::core::transport::MockChannel;
//!
//! let mock = MockChannel::new(9600);
//! // When the transport writes this frame, the modem answers with this text.
//! mock.expect(b"AT\r", b"AT\r\r\nOK\r\n");
//! ```

use super::{ByteChannel, ChannelError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A pre-loaded request/response pair
#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    response: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockLine {
    rx: VecDeque<u8>,
    expectations: VecDeque<Expectation>,
    sent_log: Vec<Vec<u8>>,
    connected: bool,
}

/// In-memory modem line
///
/// Expectations are consumed in order. A write matching the next expectation
/// queues its response for reading; a mismatching write fails. Writes made
/// while no expectation is pending are logged and otherwise ignored, like a
/// modem that never answers.
#[derive(Debug, Clone)]
pub struct MockChannel {
    baud_rate: u32,
    line: Arc<Mutex<MockLine>>,
}

impl MockChannel {
    /// Create a connected channel running at `baud_rate`
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            line: Arc::new(Mutex::new(MockLine {
                connected: true,
                ..MockLine::default()
            })),
        }
    }

    /// Add an expected request/response pair
    pub fn expect(&self, request: &[u8], response: &[u8]) {
        self.line.lock().expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Queue bytes as if the modem sent them unprompted
    pub fn inject(&self, data: &[u8]) {
        self.line.lock().rx.extend(data);
    }

    /// Every buffer written so far, one entry per `write_all`
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.line.lock().sent_log.clone()
    }

    /// Number of expectations not yet consumed
    pub fn remaining_expectations(&self) -> usize {
        self.line.lock().expectations.len()
    }

    /// Number of received bytes not yet read
    pub fn pending_rx(&self) -> usize {
        self.line.lock().rx.len()
    }

    /// Simulate unplugging the modem
    pub fn set_connected(&self, connected: bool) {
        self.line.lock().connected = connected;
    }
}

#[async_trait]
impl ByteChannel for MockChannel {
    async fn write_all(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        let mut line = self.line.lock();
        if !line.connected {
            return Err(ChannelError::Disconnected);
        }
        line.sent_log.push(data.to_vec());

        if let Some(expectation) = line.expectations.pop_front() {
            if data != expectation.request.as_slice() {
                return Err(ChannelError::UnexpectedWrite(format!(
                    "expected {:?}, got {:?}",
                    String::from_utf8_lossy(&expectation.request),
                    String::from_utf8_lossy(data)
                )));
            }
            line.rx.extend(expectation.response);
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ChannelError> {
        if self.line.lock().connected {
            Ok(())
        } else {
            Err(ChannelError::Disconnected)
        }
    }

    fn bytes_available(&mut self) -> Result<usize, ChannelError> {
        let line = self.line.lock();
        if !line.connected {
            return Err(ChannelError::Disconnected);
        }
        Ok(line.rx.len())
    }

    async fn read_byte(&mut self) -> Result<u8, ChannelError> {
        let mut line = self.line.lock();
        if !line.connected {
            return Err(ChannelError::Disconnected);
        }
        line.rx.pop_front().ok_or(ChannelError::NoData)
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}
