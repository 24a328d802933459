//! Parser states, outcomes and the sticky protocol modes

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::core::constants::AtErrorCode;

/// Position of the response parser, ordered by progress
///
/// `Ok` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParsingState {
    /// Waiting for the command echo
    Echo,
    /// Accumulating response text
    Response,
    /// Waiting for the `*XXXX\r\n` checksum line
    Crc,
    /// Successful result code seen
    Ok,
    /// Error result code seen
    Error,
}

impl ParsingState {
    /// True for `Ok` and `Error`
    pub fn is_terminal(self) -> bool {
        self >= Self::Ok
    }
}

/// Classified result of parsing one command response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AtOutcome {
    /// Response complete and successful
    Ok,
    /// Modem reported an error
    Error,
    /// No terminal result code before the timeout
    Timeout,
    /// Response checksum did not match
    InvalidCrc,
    /// Modem appended a checksum the host was not expecting
    CrcConfigMismatch,
}

impl AtOutcome {
    /// True for [`AtOutcome::Ok`]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Matching device error code
    pub fn code(self) -> AtErrorCode {
        match self {
            Self::Ok => AtErrorCode::Ok,
            Self::Error => AtErrorCode::Error,
            Self::Timeout => AtErrorCode::Timeout,
            Self::InvalidCrc => AtErrorCode::InvalidCrc,
            Self::CrcConfigMismatch => AtErrorCode::CrcConfigMismatch,
        }
    }
}

impl fmt::Display for AtOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Error => write!(f, "ERROR"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::InvalidCrc => write!(f, "INVALID_CRC"),
            Self::CrcConfigMismatch => write!(f, "CRC_CONFIG_MISMATCH"),
        }
    }
}

/// Response conventions the modem is believed to be using
///
/// Both flags persist across commands. The parser only ever turns `verbose`
/// off and `crc` on; the opposite transitions need an explicit setter call
/// after the matching configuration command succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolModes {
    verbose: bool,
    crc: bool,
}

impl Default for ProtocolModes {
    fn default() -> Self {
        Self {
            verbose: true,
            crc: false,
        }
    }
}

impl ProtocolModes {
    /// Modes with explicit initial values
    pub fn new(verbose: bool, crc: bool) -> Self {
        Self { verbose, crc }
    }

    /// Result codes are `\r\nOK\r\n` / `\r\nERROR\r\n` rather than `0\r` / `4\r`
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Commands and responses carry a `*XXXX` checksum
    pub fn crc(&self) -> bool {
        self.crc
    }

    /// Set verbose mode explicitly
    pub fn set_verbose(&mut self, enable: bool) {
        if self.verbose != enable {
            info!("Verbose result codes {}", if enable { "enabled" } else { "disabled" });
        }
        self.verbose = enable;
    }

    /// Set checksum mode explicitly
    pub fn set_crc(&mut self, enable: bool) {
        if self.crc != enable {
            info!("CRC mode {}", if enable { "enabled" } else { "disabled" });
        }
        self.crc = enable;
    }

    /// A short numeric result code was recognized
    pub(crate) fn short_code_detected(&mut self) {
        if self.verbose {
            info!("Detected short result code - verbose off");
            self.verbose = false;
        }
    }

    /// A timeout left a bare trailing CR in the buffer
    pub(crate) fn bare_cr_timeout(&mut self) {
        if self.verbose {
            info!("Detected non-verbose response on timeout - verbose off");
            self.verbose = false;
        }
    }

    /// The modem is known to be appending checksums
    pub(crate) fn crc_detected(&mut self, reason: &str) {
        if !self.crc {
            info!("CRC mode on: {}", reason);
            self.crc = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_order() {
        assert!(ParsingState::Echo < ParsingState::Response);
        assert!(ParsingState::Response < ParsingState::Crc);
        assert!(!ParsingState::Crc.is_terminal());
        assert!(ParsingState::Ok.is_terminal());
        assert!(ParsingState::Error.is_terminal());
    }

    #[test]
    fn test_outcome_codes() {
        assert_eq!(AtOutcome::Ok.code(), AtErrorCode::Ok);
        assert_eq!(AtOutcome::Timeout.code() as i32, 255);
        assert_eq!(AtOutcome::CrcConfigMismatch.code() as i32, 254);
        assert_eq!(AtOutcome::InvalidCrc.to_string(), "INVALID_CRC");
    }

    #[test]
    fn test_mode_transitions() {
        let mut modes = ProtocolModes::default();
        assert!(modes.verbose());
        assert!(!modes.crc());

        modes.short_code_detected();
        modes.crc_detected("test");
        assert!(!modes.verbose());
        assert!(modes.crc());

        modes.set_verbose(true);
        modes.set_crc(false);
        assert_eq!(modes, ProtocolModes::default());
    }
}
