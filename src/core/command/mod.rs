//! AT command transport
//!
//! Turns a submitted command into a classified, cleaned response over a
//! half-duplex [`ByteChannel`]. The modem may or may not echo the command,
//! may answer with verbose or short result codes and may append a CRC-16
//! checksum line; the parser works out which from the trailing bytes it sees
//! and remembers what it learned in [`ProtocolModes`].
//!
//! Only one command is in flight at a time. [`AtCommandTransport::send`]
//! takes the readiness gate and every exit from
//! [`AtCommandTransport::parse`] gives it back.

mod response;
mod state;

pub use response::{clean_response, is_short_code, printable, RES_ERR, RES_OK, VRES_ERR, VRES_OK};
pub use state::{AtOutcome, ParsingState, ProtocolModes};

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::config::AtSettings;
use crate::core::protocol::checksum::{CrcXmodem, CRC_MARKER};
use crate::core::transport::{ByteChannel, ChannelError};

/// Default time allowed for a complete response
pub const DEFAULT_AT_TIMEOUT: Duration = Duration::from_secs(3);

/// Usage and channel failures of the transport
#[derive(Error, Debug)]
pub enum AtError {
    /// A command is already awaiting its response
    #[error("AT command pending, parse its response first")]
    Busy,

    /// Parse called without a submitted command
    #[error("No pending command to read response for")]
    NoPendingCommand,

    /// Underlying channel failed
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// The command between `send` and the end of `parse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    /// Command as submitted, without checksum or terminator
    pub text: String,
    /// Exact bytes written, including checksum and `\r`
    pub framed: String,
    /// A checksum was appended to `text`
    pub crc_appended: bool,
    /// When the command was written
    pub submitted: Instant,
}

impl PendingCommand {
    /// The command switches the modem into checksum mode (`AT%CRC=1`)
    pub fn enables_crc(&self) -> bool {
        self.text.trim_end().to_ascii_uppercase().ends_with("CRC=1")
    }
}

/// Shared view of the transport's one-command-at-a-time gate
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    semaphore: Arc<Semaphore>,
}

impl ReadinessGate {
    /// No command is in flight
    pub fn is_ready(&self) -> bool {
        self.semaphore.available_permits() > 0
    }

    /// Wait until no command is in flight
    ///
    /// The gate is held for an instant while checking, so a `send` racing
    /// this call may see [`AtError::Busy`].
    pub async fn wait_ready(&self) {
        if let Ok(permit) = self.semaphore.acquire().await {
            drop(permit);
        }
    }

    /// Wait until ready or `timeout` elapses, returning readiness
    pub async fn wait_ready_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_ready()).await.is_ok()
    }
}

/// AT command/response engine over a byte channel
pub struct AtCommandTransport<C: ByteChannel> {
    channel: C,
    crc: CrcXmodem,
    echo: bool,
    modes: ProtocolModes,
    timeout: Duration,
    trace: bool,
    gate: Arc<Semaphore>,
    permit: Option<OwnedSemaphorePermit>,
    pending: Option<PendingCommand>,
    lookahead: Option<u8>,
    rx_buffer: Vec<u8>,
    response: String,
    urc_buffer: Vec<u8>,
}

impl<C: ByteChannel> AtCommandTransport<C> {
    /// Transport with factory modem defaults: echo on, verbose on, CRC off
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            crc: CrcXmodem::new(),
            echo: true,
            modes: ProtocolModes::default(),
            timeout: DEFAULT_AT_TIMEOUT,
            trace: false,
            gate: Arc::new(Semaphore::new(1)),
            permit: None,
            pending: None,
            lookahead: None,
            rx_buffer: Vec::new(),
            response: String::new(),
            urc_buffer: Vec::new(),
        }
    }

    /// Transport configured from settings
    pub fn with_settings(channel: C, settings: &AtSettings) -> Self {
        let mut transport = Self::new(channel);
        transport.echo = settings.echo;
        transport.modes = ProtocolModes::new(settings.verbose, settings.crc);
        transport.crc = CrcXmodem::with_seed(settings.crc_seed);
        transport.timeout = settings.timeout();
        transport.trace = settings.trace;
        transport
    }

    /// The modem echoes commands back
    pub fn echo(&self) -> bool {
        self.echo
    }

    /// Tell the parser whether to expect the command echo
    pub fn set_echo(&mut self, enable: bool) {
        self.echo = enable;
    }

    /// Current response conventions
    pub fn modes(&self) -> ProtocolModes {
        self.modes
    }

    /// Set verbose result codes, typically after `ATV0`/`ATV1` succeeded
    pub fn set_verbose(&mut self, enable: bool) {
        self.modes.set_verbose(enable);
    }

    /// Set checksum mode, typically after `AT%CRC=0` succeeded
    pub fn set_crc(&mut self, enable: bool) {
        self.modes.set_crc(enable);
    }

    /// Handle other tasks can use to await readiness
    pub fn gate(&self) -> ReadinessGate {
        ReadinessGate {
            semaphore: Arc::clone(&self.gate),
        }
    }

    /// The command awaiting its response, if any
    pub fn pending(&self) -> Option<&PendingCommand> {
        self.pending.as_ref()
    }

    /// Underlying channel
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Consume the transport, returning the channel
    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Submit a command
    ///
    /// A checksum is appended when requested or when CRC mode is on, unless
    /// the command already carries one. Bytes left over from earlier
    /// exchanges are discarded first.
    pub async fn send(&mut self, command: &str, crc_requested: bool) -> Result<(), AtError> {
        let permit = Arc::clone(&self.gate)
            .try_acquire_owned()
            .map_err(|_| AtError::Busy)?;

        let mut dropped = Vec::new();
        while self.queued()? > 0 {
            dropped.push(self.read_next().await?);
        }
        if !dropped.is_empty() {
            warn!("Dropping stale RX bytes: {}", printable(&dropped));
        }
        self.urc_buffer.clear();
        self.response.clear();

        let crc_appended =
            (crc_requested || self.modes.crc()) && !command.contains(CRC_MARKER);
        let mut framed = if crc_appended {
            self.crc.apply(command)
        } else {
            command.to_string()
        };
        framed.push('\r');

        self.channel.write_all(framed.as_bytes()).await?;
        self.channel.flush().await?;
        if self.trace {
            debug!("Sent: {}", printable(&framed));
        }

        self.pending = Some(PendingCommand {
            text: command.to_string(),
            framed,
            crc_appended,
            submitted: Instant::now(),
        });
        self.permit = Some(permit);
        Ok(())
    }

    /// Read and classify the response to the pending command
    ///
    /// On [`AtOutcome::Ok`] the cleaned text, with `prefix` removed, is kept
    /// for [`AtCommandTransport::get_response`]. `tick` only paces a debug
    /// countdown while nothing has arrived.
    pub async fn parse(
        &mut self,
        prefix: Option<&str>,
        timeout: Duration,
        tick: Option<Duration>,
    ) -> Result<AtOutcome, AtError> {
        let Some(pending) = self.pending.clone() else {
            return Err(AtError::NoPendingCommand);
        };

        let result = self.read_response(&pending, prefix, timeout, tick).await;
        if result.is_err() {
            self.rx_buffer.clear();
        }
        self.pending = None;
        self.permit = None;
        result
    }

    /// Return the cleaned response text, leaving it empty
    pub fn get_response(&mut self) -> String {
        std::mem::take(&mut self.response)
    }

    /// Send, parse with the configured timeout and fetch the response
    ///
    /// A [`AtOutcome::CrcConfigMismatch`] switches CRC mode on, so the
    /// command is resubmitted once with a checksum.
    pub async fn exchange(
        &mut self,
        command: &str,
        prefix: Option<&str>,
    ) -> Result<(AtOutcome, String), AtError> {
        let mut outcome = self.exchange_once(command, prefix).await?;
        if outcome == AtOutcome::CrcConfigMismatch {
            info!("Retrying {} with CRC", command);
            outcome = self.exchange_once(command, prefix).await?;
        }
        Ok((outcome, self.get_response()))
    }

    async fn exchange_once(
        &mut self,
        command: &str,
        prefix: Option<&str>,
    ) -> Result<AtOutcome, AtError> {
        self.send(command, false).await?;
        self.parse(prefix, self.timeout, None).await
    }

    /// Look for an unsolicited `<prefix><int>` line among queued bytes
    ///
    /// Never blocks and never writes. Lines not starting with `prefix` are
    /// dropped. Does nothing while a command awaits its response.
    pub async fn get_unsolicited_code(&mut self, prefix: &str) -> Result<Option<i32>, AtError> {
        if self.pending.is_some() {
            return Ok(None);
        }
        while self.queued()? > 0 {
            let byte = self.read_next().await?;
            self.urc_buffer.push(byte);
            if byte != b'\n' {
                continue;
            }
            let line = std::mem::take(&mut self.urc_buffer);
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            match line.strip_prefix(prefix) {
                Some(code) => match code.trim().parse::<i32>() {
                    Ok(code) => {
                        debug!("Found URC: {}", code);
                        return Ok(Some(code));
                    }
                    Err(_) => warn!("Malformed URC: {}", line),
                },
                None if !line.is_empty() => debug!("Dropping unsolicited line: {}", line),
                None => {}
            }
        }
        Ok(None)
    }

    async fn read_response(
        &mut self,
        pending: &PendingCommand,
        prefix: Option<&str>,
        timeout: Duration,
        tick: Option<Duration>,
    ) -> Result<AtOutcome, AtError> {
        let char_delay = self.channel.char_delay();
        let deadline = Instant::now() + timeout;
        let mut next_tick = tick.map(|t| (t, Instant::now() + t));
        let mut state = if self.echo {
            ParsingState::Echo
        } else {
            ParsingState::Response
        };
        let mut result_ok = false;
        let mut crc_found = false;
        let mut invalid_crc = false;
        self.rx_buffer.clear();

        while !state.is_terminal() {
            let now = Instant::now();
            if now >= deadline {
                return Ok(self.timed_out());
            }
            if self.queued()? == 0 {
                if let Some((interval, at)) = next_tick.as_mut() {
                    if now >= *at && self.rx_buffer.is_empty() {
                        debug!("Countdown: {}s", (deadline - now).as_secs());
                        *at += *interval;
                    }
                }
                sleep(char_delay).await;
                continue;
            }

            let byte = self.read_next().await?;
            self.rx_buffer.push(byte);

            match byte {
                b'\n' if state == ParsingState::Crc => {
                    if self.trace {
                        debug!("CRC parsing complete");
                    }
                    if !result_ok {
                        state = ParsingState::Error;
                    } else if self.crc.validate(&self.rx_buffer) {
                        state = ParsingState::Ok;
                    } else {
                        error!("Invalid CRC: {}", printable(&self.rx_buffer));
                        state = ParsingState::Error;
                        invalid_crc = true;
                    }
                }
                b'\n' => {
                    if self.rx_buffer.ends_with(VRES_OK.as_bytes()) {
                        result_ok = true;
                        state = self.resolve_ok(pending, char_delay).await?;
                    } else if self.rx_buffer.ends_with(VRES_ERR.as_bytes()) {
                        state = self.resolve_error(char_delay).await?;
                    }
                }
                b'\r' if self.rx_buffer == pending.framed.as_bytes() => {
                    if self.trace {
                        debug!("Echo received - clearing RX buffer");
                    }
                    self.rx_buffer.clear();
                    state = ParsingState::Response;
                }
                b'\r' if state != ParsingState::Crc => {
                    let short_ok = is_short_code(&self.rx_buffer, RES_OK);
                    if !short_ok && !is_short_code(&self.rx_buffer, RES_ERR) {
                        continue;
                    }
                    // `\r\n0\r` may be a value line of a verbose response
                    let value_line = self.modes.verbose() && self.rx_buffer.len() > RES_OK.len();
                    let next = if value_line {
                        self.wait_for_byte(deadline, char_delay).await?
                    } else {
                        if self.queued()? == 0 {
                            sleep(char_delay).await;
                        }
                        if self.queued()? > 0 {
                            Some(self.peek().await?)
                        } else {
                            None
                        }
                    };
                    match next {
                        Some(marker) if marker == CRC_MARKER as u8 => {
                            self.modes.short_code_detected();
                            crc_found = true;
                            if short_ok {
                                result_ok = true;
                                self.modes.crc_detected("checksum after short result code");
                            }
                            state = ParsingState::Crc;
                        }
                        Some(b'\n') => {}
                        Some(_) if !value_line => {}
                        _ => {
                            self.modes.short_code_detected();
                            if short_ok {
                                result_ok = true;
                                state = self.resolve_ok(pending, char_delay).await?;
                            } else {
                                state = self.resolve_error(char_delay).await?;
                            }
                        }
                    }
                }
                b'*' if state == ParsingState::Crc => crc_found = true,
                _ => {}
            }
        }

        if self.trace {
            debug!("Parsing complete: {}", printable(&self.rx_buffer));
        }

        if state == ParsingState::Error {
            self.rx_buffer.clear();
            if !self.modes.crc() && crc_found {
                warn!("CRC detected but not expected");
                self.modes.crc_detected("checksum on error response");
                return Ok(AtOutcome::CrcConfigMismatch);
            }
            return Ok(if invalid_crc {
                AtOutcome::InvalidCrc
            } else {
                AtOutcome::Error
            });
        }

        self.response = clean_response(&self.rx_buffer, prefix);
        self.rx_buffer.clear();
        if self.trace {
            debug!(
                "{} completed in {:?}",
                pending.text,
                pending.submitted.elapsed()
            );
        }
        Ok(AtOutcome::Ok)
    }

    fn timed_out(&mut self) -> AtOutcome {
        warn!("AT command timeout during parsing");
        if self.modes.verbose() && self.rx_buffer.last() == Some(&b'\r') {
            self.modes.bare_cr_timeout();
        }
        self.rx_buffer.clear();
        AtOutcome::Timeout
    }

    async fn resolve_ok(
        &mut self,
        pending: &PendingCommand,
        char_delay: Duration,
    ) -> Result<ParsingState, AtError> {
        if self.modes.crc() || pending.enables_crc() {
            self.modes.crc_detected("success response to CRC enable");
            return Ok(ParsingState::Crc);
        }
        if pending.crc_appended {
            if self.queued()? == 0 {
                sleep(char_delay).await;
            }
            if self.queued()? > 0 {
                return Ok(ParsingState::Crc);
            }
        }
        Ok(ParsingState::Ok)
    }

    async fn resolve_error(&mut self, char_delay: Duration) -> Result<ParsingState, AtError> {
        warn!("Parsing error");
        if self.modes.crc() || self.queued()? > 0 {
            return Ok(ParsingState::Crc);
        }
        sleep(char_delay).await;
        if self.queued()? > 0 {
            return Ok(ParsingState::Crc);
        }
        Ok(ParsingState::Error)
    }

    /// Peek the next byte, waiting for it until `deadline`
    async fn wait_for_byte(
        &mut self,
        deadline: Instant,
        char_delay: Duration,
    ) -> Result<Option<u8>, AtError> {
        while self.queued()? == 0 {
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(char_delay).await;
        }
        Ok(Some(self.peek().await?))
    }

    fn queued(&mut self) -> Result<usize, AtError> {
        let peeked = usize::from(self.lookahead.is_some());
        Ok(peeked + self.channel.bytes_available()?)
    }

    async fn read_next(&mut self) -> Result<u8, AtError> {
        match self.lookahead.take() {
            Some(byte) => Ok(byte),
            None => Ok(self.channel.read_byte().await?),
        }
    }

    /// Next byte without consuming it
    async fn peek(&mut self) -> Result<u8, AtError> {
        if let Some(byte) = self.lookahead {
            return Ok(byte);
        }
        let byte = self.channel.read_byte().await?;
        self.lookahead = Some(byte);
        Ok(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::MockChannel;

    fn transport() -> (AtCommandTransport<MockChannel>, MockChannel) {
        let mock = MockChannel::new(9600);
        (AtCommandTransport::new(mock.clone()), mock)
    }

    #[test]
    fn test_enables_crc() {
        let pending = PendingCommand {
            text: "AT%CRC=1".into(),
            framed: "AT%CRC=1\r".into(),
            crc_appended: false,
            submitted: Instant::now(),
        };
        assert!(pending.enables_crc());
    }

    #[tokio::test(start_paused = true)]
    async fn test_verbose_ok_with_echo() {
        let (mut at, mock) = transport();
        mock.expect(b"AT+GSN\r", b"AT+GSN\r\r\n+GSN: 01097623SKYEE3D\r\n\r\nOK\r\n");

        at.send("AT+GSN", false).await.unwrap();
        let outcome = at.parse(Some("+GSN:"), DEFAULT_AT_TIMEOUT, None).await.unwrap();
        assert_eq!(outcome, AtOutcome::Ok);
        assert_eq!(at.get_response(), "01097623SKYEE3D");
        assert!(at.gate().is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_until_parsed() {
        let (mut at, _mock) = transport();
        at.send("AT", false).await.unwrap();
        assert!(!at.gate().is_ready());
        assert!(matches!(at.send("AT", false).await, Err(AtError::Busy)));

        let outcome = at.parse(None, Duration::from_millis(50), None).await.unwrap();
        assert_eq!(outcome, AtOutcome::Timeout);
        assert!(at.gate().is_ready());
        at.send("AT", false).await.unwrap();
    }

    #[tokio::test]
    async fn test_parse_without_send() {
        let (mut at, _mock) = transport();
        let result = at.parse(None, DEFAULT_AT_TIMEOUT, None).await;
        assert!(matches!(result, Err(AtError::NoPendingCommand)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_releases_gate() {
        let (mut at, mock) = transport();
        mock.set_connected(false);
        assert!(matches!(at.send("AT", false).await, Err(AtError::Channel(_))));
        assert!(at.gate().is_ready());
        assert!(at.pending().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_crc_frame_appended() {
        let (mut at, mock) = transport();
        at.send("AT%CRC=0", true).await.unwrap();
        assert_eq!(mock.sent_data(), vec![b"AT%CRC=0*8AD5\r".to_vec()]);
        assert!(at.pending().unwrap().crc_appended);
    }
}
