//! Per-manufacturer record layouts and command names
//!
//! Both vendors report the same fields; they differ in name length limits,
//! an extra sequence column on ORBCOMM modems and the command set. Everything
//! that varies lives in one [`ManufacturerProfile`] selected once per modem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Modem vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Manufacturer {
    /// ORBCOMM ST2100 family
    #[default]
    Orbcomm,
    /// Quectel CC200A family
    Quectel,
}

impl Manufacturer {
    /// Every supported vendor
    pub const ALL: [Manufacturer; 2] = [Manufacturer::Orbcomm, Manufacturer::Quectel];

    /// Record layout and command names for this vendor
    pub fn profile(self) -> &'static ManufacturerProfile {
        match self {
            Self::Orbcomm => &ORBCOMM,
            Self::Quectel => &QUECTEL,
        }
    }

    /// Match the `ATI0`/`AT+GMI` identification text
    pub fn identify(text: &str) -> Option<Self> {
        let text = text.to_uppercase();
        Self::ALL
            .into_iter()
            .find(|m| text.contains(&m.to_string().to_uppercase()))
    }
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Orbcomm => write!(f, "ORBCOMM"),
            Self::Quectel => write!(f, "Quectel"),
        }
    }
}

impl FromStr for Manufacturer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "orbcomm" => Ok(Self::Orbcomm),
            "quectel" => Ok(Self::Quectel),
            other => Err(format!("unknown manufacturer: {other}")),
        }
    }
}

/// Column index of each field in a comma-separated record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    /// Quoted message name
    pub name: usize,
    /// Vendor sequence number, ORBCOMM only
    pub sequence: Option<usize>,
    /// Queue priority
    pub priority: usize,
    /// Service identification number
    pub sin: usize,
    /// Queue state
    pub state: usize,
    /// Declared size in bytes
    pub length: usize,
    /// Bytes sent or received so far, absent from retrieved messages
    pub bytes_delivered: Option<usize>,
    /// Payload encoding, retrieved messages only
    pub format: Option<usize>,
    /// Encoded payload, retrieved messages only
    pub data: Option<usize>,
}

impl ColumnMap {
    /// Number of columns the layout defines
    pub fn width(&self) -> usize {
        [
            Some(self.name),
            self.sequence,
            Some(self.priority),
            Some(self.sin),
            Some(self.state),
            Some(self.length),
            self.bytes_delivered,
            self.format,
            self.data,
        ]
        .into_iter()
        .flatten()
        .max()
        .map_or(0, |last| last + 1)
    }
}

/// Everything that differs between vendors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerProfile {
    /// Vendor this profile describes
    pub manufacturer: Manufacturer,
    /// Longest message name the modem accepts
    pub name_max_len: usize,
    /// Message state listing
    pub state_columns: ColumnMap,
    /// Message retrieval (metadata, format, data)
    pub message_columns: ColumnMap,
    /// Prefix of unsolicited result code lines, if the modem emits them
    pub urc_prefix: Option<&'static str>,
    /// Submit a mobile-originated message
    pub mo_submit: &'static str,
    /// List mobile-originated message states
    pub mo_states: &'static str,
    /// List mobile-terminated message states
    pub mt_states: &'static str,
    /// Retrieve a mobile-terminated message
    pub mt_get: &'static str,
    /// Delete a mobile-terminated message
    pub mt_delete: &'static str,
}

impl ManufacturerProfile {
    /// Command line for `command` with an optional `=args` tail
    pub fn command(&self, command: &str, args: Option<&str>) -> String {
        match args {
            Some(args) => format!("AT{command}={args}"),
            None => format!("AT{command}"),
        }
    }

    /// Response prefix of `command` (`%MGRS` answers `%MGRS:`)
    pub fn prefix(&self, command: &str) -> String {
        format!("{command}:")
    }
}

static ORBCOMM: ManufacturerProfile = ManufacturerProfile {
    manufacturer: Manufacturer::Orbcomm,
    name_max_len: 8,
    state_columns: ColumnMap {
        name: 0,
        sequence: Some(1),
        priority: 2,
        sin: 3,
        state: 4,
        length: 5,
        bytes_delivered: Some(6),
        format: None,
        data: None,
    },
    message_columns: ColumnMap {
        name: 0,
        sequence: Some(1),
        priority: 2,
        sin: 3,
        state: 4,
        length: 5,
        bytes_delivered: None,
        format: Some(6),
        data: Some(7),
    },
    urc_prefix: None,
    mo_submit: "%MGRT",
    mo_states: "%MGRS",
    mt_states: "%MGFN",
    mt_get: "%MGFG",
    mt_delete: "%MGFM",
};

static QUECTEL: ManufacturerProfile = ManufacturerProfile {
    manufacturer: Manufacturer::Quectel,
    name_max_len: 12,
    state_columns: ColumnMap {
        name: 0,
        sequence: None,
        priority: 1,
        sin: 2,
        state: 3,
        length: 4,
        bytes_delivered: Some(5),
        format: None,
        data: None,
    },
    message_columns: ColumnMap {
        name: 0,
        sequence: None,
        priority: 1,
        sin: 2,
        state: 3,
        length: 4,
        bytes_delivered: None,
        format: Some(5),
        data: Some(6),
    },
    urc_prefix: Some("+QURC:"),
    mo_submit: "+QSMGT",
    mo_states: "+QSMGS",
    mt_states: "+QRMGN",
    mt_get: "+QRMGR",
    mt_delete: "+QRMGD",
};
