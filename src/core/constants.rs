//! Protocol constants and closed enumerations shared by the transport and decoders
//!
//! Every enumeration that arrives on the wire as a raw integer implements
//! [`CodeEnum`], so membership checks go through one generic [`is_valid`]
//! instead of per-type helpers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum size of a mobile-originated message payload in bytes
pub const MSG_MO_MAX_SIZE: usize = 6400;

/// Maximum size of a mobile-terminated message payload in bytes
pub const MSG_MT_MAX_SIZE: usize = 10000;

/// Lowest service identifier available to applications (0-15 are reserved)
pub const MIN_USER_SIN: u8 = 16;

/// A closed set of integer-coded values
pub trait CodeEnum: Sized + Copy + 'static {
    /// Every member of the set
    const ALL: &'static [Self];

    /// Wire value of this member
    fn code(self) -> i32;

    /// Look up the member carrying `raw`
    fn from_code(raw: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|member| member.code() == raw)
    }
}

/// True if `raw` is the wire value of some member of `E`
pub fn is_valid<E: CodeEnum>(raw: i32) -> bool {
    E::from_code(raw).is_some()
}

macro_rules! code_enum {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        impl CodeEnum for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn code(self) -> i32 {
                self as i32
            }
        }
    };
}

/// Lifecycle of a message in the modem's queue, ordered by maturity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MessageState {
    /// Slot unused
    Unavailable = 0,
    /// Mobile-terminated message partially received
    RxPending = 1,
    /// Mobile-terminated message fully received
    RxComplete = 2,
    /// Mobile-terminated message read by the host
    RxRetrieved = 3,
    /// Mobile-originated message queued
    TxReady = 4,
    /// Mobile-originated message being transmitted
    TxSending = 5,
    /// Mobile-originated message acknowledged by the network
    TxComplete = 6,
    /// Mobile-originated message failed
    TxFailed = 7,
    /// Mobile-originated message cancelled by the host
    TxCancelled = 8,
}

code_enum!(MessageState {
    Unavailable,
    RxPending,
    RxComplete,
    RxRetrieved,
    TxReady,
    TxSending,
    TxComplete,
    TxFailed,
    TxCancelled,
});

impl MessageState {
    /// A mobile-originated message is finished once it completed, failed or was cancelled
    pub fn is_finished(self) -> bool {
        self >= Self::TxComplete
    }
}

/// Queue priority of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum MessagePriority {
    /// Unset (mobile-terminated messages report this)
    None = 0,
    /// Highest priority
    High = 1,
    /// Medium-high priority
    MediumHigh = 2,
    /// Medium-low priority
    MediumLow = 3,
    /// Lowest priority
    #[default]
    Low = 4,
}

code_enum!(MessagePriority {
    None,
    High,
    MediumHigh,
    MediumLow,
    Low,
});

/// Encoding of a message payload in a command or response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataFormat {
    /// Quoted text with `\hh` escapes for non-printable bytes
    Text = 1,
    /// ASCII hex pairs
    Hex = 2,
    /// Standard base64 alphabet, no line wrapping
    #[default]
    Base64 = 3,
}

code_enum!(DataFormat { Text, Hex, Base64 });

/// Error codes reported by the modem, plus local extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AtErrorCode {
    /// No error
    Ok = 0,
    /// Generic failure
    Error = 4,
    /// Command checksum did not match
    InvalidCrc = 100,
    /// Command not recognised
    UnknownCommand = 101,
    /// Parameters missing or out of range
    InvalidCommandParameters = 102,
    /// Payload longer than its declared format allows
    MessageLengthExceedsFormatSize = 103,
    /// Reserved
    Reserved104 = 104,
    /// Internal modem fault
    SystemError = 105,
    /// Queue full
    QueueInsufficientResources = 106,
    /// A queued message already uses this name
    DuplicateMessageName = 107,
    /// No GNSS fix in time
    GnssTimeout = 108,
    /// Named message not in the queue
    MessageUnavailable = 109,
    /// Reserved
    Reserved110 = 110,
    /// Reserved
    Reserved111 = 111,
    /// Parameter cannot be written
    ReadOnlyParameter = 112,
    /// Local: checksum mode of host and modem disagree
    CrcConfigMismatch = 254,
    /// Local: no terminal response within the timeout
    Timeout = 255,
}

code_enum!(AtErrorCode {
    Ok,
    Error,
    InvalidCrc,
    UnknownCommand,
    InvalidCommandParameters,
    MessageLengthExceedsFormatSize,
    Reserved104,
    SystemError,
    QueueInsufficientResources,
    DuplicateMessageName,
    GnssTimeout,
    MessageUnavailable,
    Reserved110,
    Reserved111,
    ReadOnlyParameter,
    CrcConfigMismatch,
    Timeout,
});

/// GNSS fix dimension reported by GSA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GnssFixType {
    /// No fix
    #[default]
    None = 1,
    /// Two-dimensional fix
    Fix2D = 2,
    /// Three-dimensional fix
    Fix3D = 3,
}

code_enum!(GnssFixType { None, Fix2D, Fix3D });

/// GNSS fix quality reported by GGA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GnssFixQuality {
    /// No position
    #[default]
    Invalid = 0,
    /// Standard GPS
    GpsSps = 1,
    /// Differential GPS
    Dgps = 2,
    /// Precise positioning service
    Pps = 3,
    /// Real-time kinematic, fixed integers
    Rtk = 4,
    /// Real-time kinematic, float
    FloatRtk = 5,
    /// Dead reckoning
    EstimatedDeadReckoning = 6,
    /// Entered by hand
    Manual = 7,
    /// Simulator output
    Simulation = 8,
}

code_enum!(GnssFixQuality {
    Invalid,
    GpsSps,
    Dgps,
    Pps,
    Rtk,
    FloatRtk,
    EstimatedDeadReckoning,
    Manual,
    Simulation,
});

/// Geostationary satellite hosting the network, by orbital slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GeoSatellite {
    /// Americas, 98W
    Amer,
    /// Atlantic Ocean Region West, regional service, 54W
    Aorwsc,
    /// Middle East and Asia, 64E
    Meas,
    /// Asia-Pacific, 143.5E
    Apac,
    /// Europe, Middle East and Africa, 24.9E
    Emea,
}

impl GeoSatellite {
    /// Every satellite
    pub const ALL: [GeoSatellite; 5] = [Self::Amer, Self::Aorwsc, Self::Meas, Self::Apac, Self::Emea];

    /// Sub-satellite longitude in degrees, negative west
    pub fn longitude(self) -> f64 {
        match self {
            Self::Amer => -98.0,
            Self::Aorwsc => -54.0,
            Self::Meas => 64.0,
            Self::Apac => 143.5,
            Self::Emea => 24.9,
        }
    }

    /// Satellite best placed to serve a terminal at `latitude`/`longitude`
    ///
    /// Starts from the nearest orbital slot, then moves terminals outside
    /// the lit coverage of the regional AORWSC and MEAS beams to a
    /// neighbouring global satellite.
    pub fn closest(latitude: f64, longitude: f64) -> Self {
        let nearest = Self::ALL
            .into_iter()
            .min_by(|a, b| {
                (a.longitude() - longitude)
                    .abs()
                    .total_cmp(&(b.longitude() - longitude).abs())
            })
            .unwrap_or(Self::Amer);

        match nearest {
            Self::Aorwsc if latitude >= 15.0 || latitude <= -45.0 => {
                if longitude >= -27.0 {
                    Self::Emea
                } else {
                    Self::Amer
                }
            }
            Self::Meas if latitude <= -4.5 => {
                if longitude >= 63.5 {
                    Self::Apac
                } else {
                    Self::Emea
                }
            }
            Self::Meas if latitude >= 40.9 && longitude <= 45.0 => Self::Emea,
            Self::Meas if latitude >= 40.9 && longitude >= 82.5 => Self::Apac,
            Self::Meas if latitude < 40.9
                && longitude >= 63.5
                && (latitude <= -4.0 || latitude >= 30.0) =>
            {
                Self::Apac
            }
            other => other,
        }
    }
}

impl fmt::Display for GeoSatellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Amer => "AMER",
            Self::Aorwsc => "AORWSC",
            Self::Meas => "MEAS",
            Self::Apac => "APAC",
            Self::Emea => "EMEA",
        };
        f.write_str(name)
    }
}

/// Satellite beam identifiers reported by the modem
///
/// `GlobalBb` is the global bulletin board beam; the others are regional
/// beams of one satellite.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeoBeam {
    GlobalBb = 0,
    AmerRb1 = 1,
    AmerRb2 = 2,
    AmerRb3 = 3,
    AmerRb4 = 4,
    AmerRb5 = 5,
    AmerRb6 = 6,
    AmerRb7 = 7,
    AmerRb8 = 8,
    AmerRb9 = 9,
    AmerRb10 = 10,
    AmerRb11 = 11,
    AmerRb12 = 12,
    AmerRb13 = 13,
    AmerRb14 = 14,
    AmerRb15 = 15,
    AmerRb16 = 16,
    AmerRb17 = 17,
    AmerRb18 = 18,
    AmerRb19 = 19,
    EmeaRb1 = 21,
    EmeaRb2 = 22,
    EmeaRb3 = 23,
    EmeaRb4 = 24,
    EmeaRb5 = 25,
    EmeaRb6 = 26,
    EmeaRb7 = 27,
    EmeaRb8 = 28,
    EmeaRb9 = 29,
    EmeaRb10 = 30,
    EmeaRb11 = 31,
    EmeaRb12 = 32,
    EmeaRb13 = 33,
    EmeaRb14 = 34,
    EmeaRb15 = 35,
    EmeaRb16 = 36,
    EmeaRb17 = 37,
    EmeaRb18 = 38,
    EmeaRb19 = 39,
    ApacRb1 = 41,
    ApacRb2 = 42,
    ApacRb3 = 43,
    ApacRb4 = 44,
    ApacRb5 = 45,
    ApacRb6 = 46,
    ApacRb7 = 47,
    ApacRb8 = 48,
    ApacRb9 = 49,
    ApacRb10 = 50,
    ApacRb11 = 51,
    ApacRb12 = 52,
    ApacRb13 = 53,
    ApacRb14 = 54,
    ApacRb15 = 55,
    ApacRb16 = 56,
    ApacRb17 = 57,
    ApacRb18 = 58,
    ApacRb19 = 59,
    AorwSc = 61,
    MeasRb10 = 90,
    MeasRb11 = 91,
    MeasRb12 = 92,
    MeasRb15 = 93,
}

code_enum!(GeoBeam { GlobalBb, AmerRb1, AmerRb2, AmerRb3, AmerRb4, AmerRb5, AmerRb6, AmerRb7, AmerRb8, AmerRb9, AmerRb10, AmerRb11, AmerRb12, AmerRb13, AmerRb14, AmerRb15, AmerRb16, AmerRb17, AmerRb18, AmerRb19, EmeaRb1, EmeaRb2, EmeaRb3, EmeaRb4, EmeaRb5, EmeaRb6, EmeaRb7, EmeaRb8, EmeaRb9, EmeaRb10, EmeaRb11, EmeaRb12, EmeaRb13, EmeaRb14, EmeaRb15, EmeaRb16, EmeaRb17, EmeaRb18, EmeaRb19, ApacRb1, ApacRb2, ApacRb3, ApacRb4, ApacRb5, ApacRb6, ApacRb7, ApacRb8, ApacRb9, ApacRb10, ApacRb11, ApacRb12, ApacRb13, ApacRb14, ApacRb15, ApacRb16, ApacRb17, ApacRb18, ApacRb19, AorwSc, MeasRb10, MeasRb11, MeasRb12, MeasRb15 });

impl GeoBeam {
    /// Satellite carrying this beam, `None` for the global beam
    pub fn satellite(self) -> Option<GeoSatellite> {
        match self.code() {
            0 => None,
            1..=19 => Some(GeoSatellite::Amer),
            21..=39 => Some(GeoSatellite::Emea),
            41..=59 => Some(GeoSatellite::Apac),
            61 => Some(GeoSatellite::Aorwsc),
            _ => Some(GeoSatellite::Meas),
        }
    }

    /// Beam label, e.g. `RB16`, `SC` or `BB`
    pub fn beam(self) -> String {
        match self {
            Self::GlobalBb => "BB".to_string(),
            Self::AorwSc => "SC".to_string(),
            Self::MeasRb10 => "RB10".to_string(),
            Self::MeasRb11 => "RB11".to_string(),
            Self::MeasRb12 => "RB12".to_string(),
            Self::MeasRb15 => "RB15".to_string(),
            other => format!("RB{}", other.code() % 20),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_per_enum() {
        assert!(is_valid::<MessageState>(6));
        assert!(!is_valid::<MessageState>(9));
        assert!(is_valid::<AtErrorCode>(254));
        assert!(!is_valid::<AtErrorCode>(113));
        assert!(!is_valid::<GnssFixType>(0));
        assert!(is_valid::<DataFormat>(3));
    }

    #[test]
    fn test_state_ordering() {
        assert!(MessageState::TxFailed.is_finished());
        assert!(MessageState::TxCancelled.is_finished());
        assert!(!MessageState::TxSending.is_finished());
        assert!(MessageState::RxComplete < MessageState::TxReady);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(MessagePriority::from_code(1), Some(MessagePriority::High));
        assert_eq!(GnssFixQuality::from_code(8), Some(GnssFixQuality::Simulation));
        assert_eq!(GnssFixQuality::from_code(9), None);
    }

    #[test]
    fn test_geo_beams() {
        assert_eq!(GeoBeam::from_code(16), Some(GeoBeam::AmerRb16));
        assert_eq!(GeoBeam::AmerRb16.satellite(), Some(GeoSatellite::Amer));
        assert_eq!(GeoBeam::AmerRb16.beam(), "RB16");
        assert_eq!(GeoBeam::EmeaRb19.beam(), "RB19");
        assert_eq!(GeoBeam::ApacRb1.satellite(), Some(GeoSatellite::Apac));
        assert_eq!(GeoBeam::MeasRb15.beam(), "RB15");
        assert_eq!(GeoBeam::AorwSc.satellite(), Some(GeoSatellite::Aorwsc));
        assert_eq!(GeoBeam::GlobalBb.satellite(), None);
        assert!(!is_valid::<GeoBeam>(20));
    }

    #[test]
    fn test_closest_satellite_regions() {
        // Ottawa: nearest slot is AORWSC, outside its lit latitudes
        assert_eq!(GeoSatellite::closest(45.0, -75.1), GeoSatellite::Amer);
        // Brazil is inside the regional beam
        assert_eq!(GeoSatellite::closest(-10.0, -50.0), GeoSatellite::Aorwsc);
        assert_eq!(GeoSatellite::closest(60.0, -20.0), GeoSatellite::Emea);
        assert_eq!(GeoSatellite::closest(51.5, 0.0), GeoSatellite::Emea);
        assert_eq!(GeoSatellite::closest(-30.0, 60.0), GeoSatellite::Emea);
        assert_eq!(GeoSatellite::closest(-30.0, 70.0), GeoSatellite::Apac);
        assert_eq!(GeoSatellite::closest(50.0, 85.0), GeoSatellite::Apac);
        assert_eq!(GeoSatellite::closest(35.0, 70.0), GeoSatellite::Apac);
        assert_eq!(GeoSatellite::closest(25.0, 55.0), GeoSatellite::Meas);
        assert_eq!(GeoSatellite::closest(-4.2, 70.0), GeoSatellite::Apac);
        assert_eq!(GeoSatellite::closest(10.0, 70.0), GeoSatellite::Meas);
        assert_eq!(GeoSatellite::closest(-33.9, 151.2), GeoSatellite::Apac);
        assert_eq!(GeoSatellite::Aorwsc.to_string(), "AORWSC");
    }
}
