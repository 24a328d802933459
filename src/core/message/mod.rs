//! Message queue records
//!
//! Decodes the modem's comma-separated message state and retrieval lines
//! into [`MessageRecord`]s, and validates outgoing [`MoMessage`]s before any
//! byte is written to the modem.

mod decoder;
mod manufacturer;

pub use decoder::{decode_message, decode_message_line, decode_payload, decode_record, decode_records};
pub use manufacturer::{ColumnMap, Manufacturer, ManufacturerProfile};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::codec::{encode_payload, CodecError};
use crate::core::constants::{DataFormat, MessagePriority, MessageState, MIN_USER_SIN, MSG_MO_MAX_SIZE};

/// Which way a message travels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Device to network
    MobileOriginated,
    /// Network to device
    MobileTerminated,
}

/// Record could not be decoded
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Line has fewer columns than the layout needs
    #[error("Missing column {column} (index {index})")]
    MissingColumn {
        /// Field name
        column: &'static str,
        /// Expected position
        index: usize,
    },

    /// Column text is not a valid value
    #[error("Invalid {column}: {value:?}")]
    InvalidValue {
        /// Field name
        column: &'static str,
        /// Raw text
        value: String,
    },

    /// Payload data did not decode
    #[error("Payload error: {0}")]
    Payload(#[from] CodecError),
}

/// Mobile-originated message rejected before submission
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is the empty string
    #[error("Message name is empty")]
    EmptyName,

    /// Name exceeds the vendor limit
    #[error("Message name {name:?} longer than {max} characters")]
    NameTooLong {
        /// Rejected name
        name: String,
        /// Vendor limit
        max: usize,
    },

    /// Name has characters the command syntax cannot carry
    #[error("Message name {0:?} must be printable ASCII without quotes or commas")]
    InvalidName(String),

    /// SIN, MIN and payload together are too big
    #[error("Message size {size} exceeds {max} bytes")]
    TooLarge {
        /// Bytes on the air
        size: usize,
        /// Upper bound
        max: usize,
    },

    /// SIN is reserved or not a byte
    #[error("SIN {0} outside 16..=255")]
    InvalidSin(u32),

    /// MIN is not a byte
    #[error("MIN {0} outside 0..=255")]
    InvalidMin(u32),

    /// Priority left unset
    #[error("Priority must be set for mobile-originated messages")]
    InvalidPriority,
}

/// A message as reported in the modem's queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Queue name, quotes stripped
    pub name: String,
    /// Vendor sequence column (ORBCOMM only)
    pub sequence: Option<String>,
    /// Queue priority
    pub priority: MessagePriority,
    /// Which way the message travels
    pub direction: Direction,
    /// Queue state
    pub state: MessageState,
    /// Service identification number (first byte of the message)
    pub sin: u8,
    /// Declared size in bytes
    pub length: usize,
    /// Bytes sent or received so far
    pub bytes_delivered: usize,
    /// Message bytes after the SIN, empty for state-only records
    pub payload: Bytes,
}

impl MessageRecord {
    /// Transfer has ended one way or another
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Message identification number, the first payload byte
    pub fn codec_min(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Render as a JSON object
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Outgoing message, valid by construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoMessage {
    name: String,
    priority: MessagePriority,
    sin: u8,
    min: u8,
    format: DataFormat,
    payload: Bytes,
    manufacturer: Manufacturer,
}

impl MoMessage {
    /// Validate and build a message for `manufacturer`
    ///
    /// `payload` follows the SIN and MIN bytes on the air; the three together
    /// must fit [`MSG_MO_MAX_SIZE`].
    pub fn new(
        manufacturer: Manufacturer,
        name: &str,
        sin: u32,
        min: u32,
        payload: &[u8],
    ) -> Result<Self, ValidationError> {
        let profile = manufacturer.profile();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if name.len() > profile.name_max_len {
            return Err(ValidationError::NameTooLong {
                name: name.to_string(),
                max: profile.name_max_len,
            });
        }
        if !name.bytes().all(|b| b.is_ascii_graphic() && b != b'"' && b != b',') {
            return Err(ValidationError::InvalidName(name.to_string()));
        }
        let sin = u8::try_from(sin)
            .ok()
            .filter(|&s| s >= MIN_USER_SIN)
            .ok_or(ValidationError::InvalidSin(sin))?;
        let min = u8::try_from(min).map_err(|_| ValidationError::InvalidMin(min))?;
        let size = payload.len() + 2;
        if size > MSG_MO_MAX_SIZE {
            return Err(ValidationError::TooLarge {
                size,
                max: MSG_MO_MAX_SIZE,
            });
        }

        Ok(Self {
            name: name.to_string(),
            priority: MessagePriority::default(),
            sin,
            min,
            format: DataFormat::default(),
            payload: Bytes::copy_from_slice(payload),
            manufacturer,
        })
    }

    /// Set queue priority
    pub fn with_priority(mut self, priority: MessagePriority) -> Result<Self, ValidationError> {
        if priority == MessagePriority::None {
            return Err(ValidationError::InvalidPriority);
        }
        self.priority = priority;
        Ok(self)
    }

    /// Set payload encoding used in the submit command
    #[must_use]
    pub fn with_format(mut self, format: DataFormat) -> Self {
        self.format = format;
        self
    }

    /// Queue name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue priority
    pub fn priority(&self) -> MessagePriority {
        self.priority
    }

    /// Service identification number
    pub fn sin(&self) -> u8 {
        self.sin
    }

    /// Message identification number
    pub fn min(&self) -> u8 {
        self.min
    }

    /// Bytes following SIN and MIN
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Bytes on the air: SIN, MIN and payload
    pub fn size(&self) -> usize {
        self.payload.len() + 2
    }

    /// Submit command: `AT<submit>="<name>",<priority>,<sin>.<min>,<format>,<data>`
    pub fn submit_command(&self) -> String {
        let profile = self.manufacturer.profile();
        let args = format!(
            "\"{}\",{},{}.{},{},{}",
            self.name,
            self.priority as i32,
            self.sin,
            self.min,
            self.format as i32,
            encode_payload(self.format, &self.payload)
        );
        profile.command(profile.mo_submit, Some(&args))
    }
}
