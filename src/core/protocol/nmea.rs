//! NMEA 0183 location decoder
//!
//! Folds a batch of GNSS sentences reported by the modem into a single
//! [`LocationSnapshot`].
//!
//! Supported sentences:
//! - RMC: Recommended Minimum Navigation Information
//! - GGA: Global Positioning System Fix Data
//! - GSA: GPS DOP and Active Satellites
//! - GSV: Satellites in View (recognized, not modeled)

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::checksum::xor_checksum;
use crate::core::constants::{CodeEnum, GeoSatellite, GnssFixQuality, GnssFixType};

/// Latitude reported before any RMC sentence is applied
pub const UNKNOWN_LATITUDE: f64 = 90.0;
/// Longitude reported before any RMC sentence is applied
pub const UNKNOWN_LONGITUDE: f64 = 180.0;
/// Dilution of precision reported before any GGA/GSA sentence is applied
pub const UNKNOWN_DOP: f64 = 99.0;

/// NMEA sentence types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NmeaSentenceType {
    /// Recommended minimum
    RMC,
    /// Fix data
    GGA,
    /// DOP and active satellites
    GSA,
    /// Satellites in view
    GSV,
    /// Anything else, by its three-letter type
    Unknown(String),
}

impl NmeaSentenceType {
    /// Classify from the address field (`GPRMC`, `GNGGA`, ...) by its last three letters
    pub fn from_address(address: &str) -> Self {
        let kind = address
            .char_indices()
            .rev()
            .nth(2)
            .map_or(address, |(i, _)| &address[i..]);
        match kind.to_uppercase().as_str() {
            "RMC" => Self::RMC,
            "GGA" => Self::GGA,
            "GSA" => Self::GSA,
            "GSV" => Self::GSV,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// How the minutes part of a latitude/longitude field is converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateResolution {
    /// Whole degrees plus the leading minutes digit over 60
    #[default]
    Coarse,
    /// Whole degrees plus the full decimal minutes over 60
    Full,
}

/// Location derived from a batch of NMEA sentences
///
/// Latitude/longitude of 90/180 and DOP values of 99 mean "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    /// Decimal degrees, negative south
    pub latitude: f64,
    /// Decimal degrees, negative west
    pub longitude: f64,
    /// Metres above mean sea level
    pub altitude: f64,
    /// Knots
    pub speed: f64,
    /// Degrees true
    pub heading: f64,
    /// Seconds since 1970-01-01T00:00:00Z
    pub timestamp: i64,
    /// Satellites used in the fix
    pub satellites: u32,
    /// Fix dimension from GSA
    pub fix_type: GnssFixType,
    /// Fix quality from GGA
    pub fix_quality: GnssFixQuality,
    /// Position dilution of precision
    pub pdop: f64,
    /// Horizontal dilution of precision
    pub hdop: f64,
    /// Vertical dilution of precision
    pub vdop: f64,
}

impl Default for LocationSnapshot {
    fn default() -> Self {
        Self {
            latitude: UNKNOWN_LATITUDE,
            longitude: UNKNOWN_LONGITUDE,
            altitude: 0.0,
            speed: 0.0,
            heading: 0.0,
            timestamp: 0,
            satellites: 0,
            fix_type: GnssFixType::None,
            fix_quality: GnssFixQuality::Invalid,
            pdop: UNKNOWN_DOP,
            hdop: UNKNOWN_DOP,
            vdop: UNKNOWN_DOP,
        }
    }
}

impl LocationSnapshot {
    /// True once a position has been applied
    pub fn has_position(&self) -> bool {
        self.latitude != UNKNOWN_LATITUDE || self.longitude != UNKNOWN_LONGITUDE
    }

    /// Fix time as ISO 8601 (`2023-11-23T00:52:49Z`)
    pub fn time_iso(&self) -> String {
        DateTime::from_timestamp(self.timestamp, 0)
            .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_default()
    }

    /// Satellite best placed to serve this position, once one is known
    pub fn closest_satellite(&self) -> Option<GeoSatellite> {
        self.has_position()
            .then(|| GeoSatellite::closest(self.latitude, self.longitude))
    }

    /// Render as a JSON object
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Validates NMEA-0183 sentences and folds them into a [`LocationSnapshot`]
#[derive(Debug, Clone, Default)]
pub struct NmeaLocationDecoder {
    resolution: CoordinateResolution,
    trace: bool,
}

impl NmeaLocationDecoder {
    /// Decoder with coarse coordinates and no field tracing
    pub fn new() -> Self {
        Self::default()
    }

    /// Set coordinate resolution
    #[must_use]
    pub fn resolution(mut self, resolution: CoordinateResolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Log every decoded field at debug level
    #[must_use]
    pub fn trace(mut self, enable: bool) -> Self {
        self.trace = enable;
        self
    }

    /// Verify the XOR checksum of `$<data>*hh`
    ///
    /// Sentences without the leading `$` or the `*` separator fail.
    pub fn validate_checksum(sentence: &str) -> bool {
        let sentence = sentence.trim();
        let Some(body) = sentence.strip_prefix('$') else {
            return false;
        };
        let Some((data, checksum)) = body.rsplit_once('*') else {
            return false;
        };
        if checksum.len() != 2 {
            return false;
        }
        match u8::from_str_radix(checksum, 16) {
            Ok(expected) => xor_checksum(data.as_bytes()) == expected,
            Err(_) => false,
        }
    }

    /// Decode every valid sentence in `sentences` into a fresh snapshot
    ///
    /// Sentences failing the checksum are skipped.
    pub fn decode_batch<'a, I>(&self, sentences: I) -> LocationSnapshot
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut snapshot = LocationSnapshot::default();
        for sentence in sentences {
            let sentence = sentence.trim();
            if sentence.is_empty() {
                continue;
            }
            if !Self::validate_checksum(sentence) {
                warn!("Skipping invalid NMEA sentence: {}", sentence);
                continue;
            }
            self.apply_sentence(&mut snapshot, sentence);
        }
        snapshot
    }

    /// Decode newline-separated sentences
    pub fn decode_text(&self, text: &str) -> LocationSnapshot {
        self.decode_batch(text.lines())
    }

    /// Apply one sentence's fields to `snapshot`
    ///
    /// Fields that are empty or malformed leave the snapshot untouched.
    pub fn apply_sentence(&self, snapshot: &mut LocationSnapshot, sentence: &str) {
        let sentence = sentence.trim();
        let data = sentence
            .strip_prefix('$')
            .unwrap_or(sentence)
            .split('*')
            .next()
            .unwrap_or_default();
        let fields: Vec<&str> = data.split(',').collect();
        let Some(address) = fields.first() else {
            return;
        };

        match NmeaSentenceType::from_address(address) {
            NmeaSentenceType::GSV => debug!("No processing required for GSV sentence"),
            NmeaSentenceType::GSA if snapshot.vdop != UNKNOWN_DOP => {
                if self.trace {
                    debug!("Skipping redundant GSA data");
                }
            }
            NmeaSentenceType::RMC => self.apply_rmc(snapshot, &fields),
            NmeaSentenceType::GGA => self.apply_gga(snapshot, &fields),
            NmeaSentenceType::GSA => self.apply_gsa(snapshot, &fields),
            NmeaSentenceType::Unknown(kind) => debug!("Ignoring NMEA sentence type {}", kind),
        }
    }

    fn apply_rmc(&self, snapshot: &mut LocationSnapshot, fields: &[&str]) {
        let time = fields.get(1).and_then(|f| parse_time(f));
        if fields.get(2) == Some(&"V") {
            warn!("Fix Void");
        }
        if let Some(lat) = self.coordinate(fields, 3, 2) {
            snapshot.latitude = lat;
            if self.trace {
                debug!("Latitude: {:.5}", lat);
            }
        }
        if let Some(lon) = self.coordinate(fields, 5, 3) {
            snapshot.longitude = lon;
            if self.trace {
                debug!("Longitude: {:.5}", lon);
            }
        }
        if let Some(speed) = parse_field::<f64>(fields, 7) {
            snapshot.speed = speed;
        }
        if let Some(heading) = parse_field::<f64>(fields, 8) {
            snapshot.heading = heading;
        }
        let date = fields.get(9).and_then(|f| parse_date(f));
        if let (Some(date), Some(time)) = (date, time) {
            snapshot.timestamp = date.and_time(time).and_utc().timestamp();
            if self.trace {
                debug!("Fix time: {} ({})", snapshot.time_iso(), snapshot.timestamp);
            }
        }
    }

    fn apply_gga(&self, snapshot: &mut LocationSnapshot, fields: &[&str]) {
        if let Some(quality) = parse_field::<i32>(fields, 6).and_then(GnssFixQuality::from_code) {
            snapshot.fix_quality = quality;
        }
        if let Some(satellites) = parse_field::<u32>(fields, 7) {
            snapshot.satellites = satellites;
        }
        if let Some(hdop) = parse_field::<f64>(fields, 8) {
            snapshot.hdop = round1(hdop);
        }
        if let Some(altitude) = parse_field::<f64>(fields, 9) {
            snapshot.altitude = altitude;
        }
        if let Some(unit) = fields.get(10) {
            if *unit != "M" {
                warn!("Unexpected altitude units: {}", unit);
            }
        }
        if self.trace {
            debug!(
                "Fix quality {:?}, {} satellites, altitude {:.1}",
                snapshot.fix_quality, snapshot.satellites, snapshot.altitude
            );
        }
    }

    fn apply_gsa(&self, snapshot: &mut LocationSnapshot, fields: &[&str]) {
        if let Some(fix_type) = parse_field::<i32>(fields, 2).and_then(GnssFixType::from_code) {
            snapshot.fix_type = fix_type;
        }
        if let Some(pdop) = parse_field::<f64>(fields, 15) {
            snapshot.pdop = round1(pdop);
        }
        if let Some(vdop) = parse_field::<f64>(fields, 17) {
            snapshot.vdop = round1(vdop);
        }
        if self.trace {
            debug!("Fix type {:?}, PDOP {:.1}, VDOP {:.1}", snapshot.fix_type, snapshot.pdop, snapshot.vdop);
        }
    }

    /// Parse `(D)DDMM.MMMM` at `index` with its hemisphere letter at `index + 1`
    fn coordinate(&self, fields: &[&str], index: usize, degree_digits: usize) -> Option<f64> {
        let value = fields.get(index)?;
        let hemisphere = fields.get(index + 1)?;
        if value.len() <= degree_digits || !value.is_ascii() {
            return None;
        }
        let degrees: f64 = value[..degree_digits].parse().ok()?;
        let minutes: f64 = match self.resolution {
            CoordinateResolution::Coarse => value[degree_digits..=degree_digits].parse().ok()?,
            CoordinateResolution::Full => value[degree_digits..].parse().ok()?,
        };
        let decimal = degrees + minutes / 60.0;
        Some(match *hemisphere {
            "S" | "W" => -decimal,
            _ => decimal,
        })
    }
}

fn parse_field<T: std::str::FromStr>(fields: &[&str], index: usize) -> Option<T> {
    fields.get(index).and_then(|f| f.trim().parse().ok())
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Parse time from HHMMSS(.sss) format, dropping fractional seconds
fn parse_time(s: &str) -> Option<NaiveTime> {
    if s.len() < 6 || !s.is_ascii() {
        return None;
    }

    let hours: u32 = s[0..2].parse().ok()?;
    let minutes: u32 = s[2..4].parse().ok()?;
    let seconds: u32 = s[4..6].parse().ok()?;

    NaiveTime::from_hms_opt(hours, minutes, seconds)
}

/// Parse date from DDMMYY format
fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.len() < 6 || !s.is_ascii() {
        return None;
    }

    let day: u32 = s[0..2].parse().ok()?;
    let month: u32 = s[2..4].parse().ok()?;
    let year: i32 = s[4..6].parse().ok()?;

    // GPS week rollover era: 73-99 belong to the 1900s
    let full_year = if year >= 73 { 1900 + year } else { 2000 + year };

    NaiveDate::from_ymd_opt(full_year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RMC: &str = "$GPRMC,005249.000,A,4517.1082,N,07550.9113,W,0.24,0.00,231123,,,A,V*0B";
    const GGA: &str = "$GPGGA,005249.000,4517.1082,N,07550.9113,W,1,06,1.7,128.5,M,-34.3,M,,0000*62";
    const GSA: &str = "$GPGSA,A,3,02,07,21,14,08,27,,,,,,,2.8,1.7,2.2,1*2D";

    #[test]
    fn test_checksum() {
        let sentence = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
        assert!(NmeaLocationDecoder::validate_checksum(sentence));
        assert!(!NmeaLocationDecoder::validate_checksum(&sentence.replace("*6A", "*BB")));
        assert!(!NmeaLocationDecoder::validate_checksum(&sentence[..sentence.len() - 3]));
        assert!(!NmeaLocationDecoder::validate_checksum(&sentence[1..]));
    }

    #[test]
    fn test_sentence_type() {
        assert_eq!(NmeaSentenceType::from_address("GNRMC"), NmeaSentenceType::RMC);
        assert_eq!(NmeaSentenceType::from_address("GPGSV"), NmeaSentenceType::GSV);
        assert_eq!(NmeaSentenceType::from_address("GA"), NmeaSentenceType::Unknown("GA".into()));
    }

    #[test]
    fn test_batch_location() {
        let location = NmeaLocationDecoder::new().decode_batch([RMC, GGA, GSA]);
        assert!((location.latitude - 45.01667).abs() < 1e-5);
        assert!((location.longitude + 75.08333).abs() < 1e-5);
        assert_eq!(location.altitude, 128.5);
        assert_eq!(location.fix_type, GnssFixType::Fix3D);
        assert_eq!(location.fix_quality, GnssFixQuality::GpsSps);
        assert_eq!(round1(location.speed), 0.2);
        assert_eq!(location.heading, 0.0);
        assert_eq!(location.pdop, 2.8);
        assert_eq!(location.hdop, 1.7);
        assert_eq!(location.vdop, 2.2);
        assert_eq!(location.satellites, 6);
        assert_eq!(location.timestamp, 1700700769);
        assert_eq!(location.time_iso(), "2023-11-23T00:52:49Z");
        assert_eq!(location.closest_satellite(), Some(GeoSatellite::Amer));
    }

    #[test]
    fn test_no_satellite_without_position() {
        assert_eq!(LocationSnapshot::default().closest_satellite(), None);
    }

    #[test]
    fn test_gsv_ignored() {
        let gsv = "$GPGSV,3,1,11,02,48,298,24,07,19,177,28,08,13,063,,14,29,232,31*7A";
        let mut location = NmeaLocationDecoder::new().decode_batch([RMC, GGA]);
        let before = location.clone();
        NmeaLocationDecoder::new().apply_sentence(&mut location, gsv);
        assert_eq!(location, before);
    }

    #[test]
    fn test_altitude_units_not_metres() {
        let mut location = LocationSnapshot::default();
        NmeaLocationDecoder::new().apply_sentence(
            &mut location,
            "$GPGGA,005249.000,4517.1082,N,07550.9113,W,1,06,1.7,421.6,F,-34.3,M,,0000*00",
        );
        assert_eq!(location.altitude, 421.6);
        assert_eq!(location.satellites, 6);
    }

    #[test]
    fn test_full_resolution() {
        let decoder = NmeaLocationDecoder::new().resolution(CoordinateResolution::Full);
        let location = decoder.decode_batch([RMC]);
        assert!((location.latitude - 45.285137).abs() < 1e-5);
        assert!((location.longitude + 75.848522).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_sentence_skipped() {
        let corrupted = RMC.replace("*0B", "*0C");
        let location = NmeaLocationDecoder::new().decode_batch([corrupted.as_str(), GGA]);
        assert!(!location.has_position());
        assert_eq!(location.satellites, 6);
    }

    #[test]
    fn test_redundant_gsa_ignored() {
        let decoder = NmeaLocationDecoder::new();
        let mut location = LocationSnapshot::default();
        decoder.apply_sentence(&mut location, GSA);
        decoder.apply_sentence(&mut location, "$GNGSA,A,2,,,,,,,,,,,,,5.0,4.0,3.0,1*00");
        assert_eq!(location.fix_type, GnssFixType::Fix3D);
        assert_eq!(location.vdop, 2.2);
    }

    #[test]
    fn test_malformed_fields_leave_snapshot() {
        let decoder = NmeaLocationDecoder::new();
        let mut location = LocationSnapshot::default();
        decoder.apply_sentence(&mut location, "$GPGGA,005249.000,,,,,x,,,,M,,M,,*00");
        assert_eq!(location, LocationSnapshot::default());
    }

    #[test]
    fn test_two_digit_year() {
        assert_eq!(parse_date("010173").map(|d| d.to_string()), Some("1973-01-01".into()));
        assert_eq!(parse_date("311272").map(|d| d.to_string()), Some("2072-12-31".into()));
    }
}
