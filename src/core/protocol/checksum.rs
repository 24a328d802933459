//! Checksum algorithms used on the modem's command channel
//!
//! - CRC-16/XMODEM suffix (`*XXXX`) on AT commands and responses
//! - XOR checksum on NMEA-0183 sentences

use crc::{Crc, CRC_16_XMODEM};

/// Marker separating a frame from its checksum
pub const CRC_MARKER: char = '*';

/// Length of the trailing `*XXXX\r\n` checksum line on a response
pub const CRC_SUFFIX_LEN: usize = 7;

const XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// CRC-16/XMODEM codec for AT command frames
///
/// Polynomial 0x1021 without reflection. The seed is 0 for XMODEM proper;
/// some firmware computes the same polynomial from 0xFFFF, which
/// [`CrcXmodem::with_seed`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcXmodem {
    seed: u16,
}

impl Default for CrcXmodem {
    fn default() -> Self {
        Self::new()
    }
}

impl CrcXmodem {
    /// XMODEM with the standard zero seed
    pub const fn new() -> Self {
        Self { seed: 0 }
    }

    /// Same polynomial, custom initial register value
    pub const fn with_seed(seed: u16) -> Self {
        Self { seed }
    }

    /// Initial register value
    pub fn seed(&self) -> u16 {
        self.seed
    }

    /// Compute the CRC over raw bytes
    pub fn checksum(&self, data: &[u8]) -> u16 {
        let mut digest = XMODEM.digest_with_initial(self.seed);
        digest.update(data);
        digest.finalize()
    }

    /// Append `*` and four uppercase hex digits to `text`
    pub fn apply(&self, text: &str) -> String {
        format!("{}{}{:04X}", text, CRC_MARKER, self.checksum(text.as_bytes()))
    }

    /// Check a frame carrying a trailing checksum
    ///
    /// The CRC covers the raw bytes before the last `*`. Line separators after
    /// the hex digits are ignored and the comparison is case-insensitive.
    /// A frame without `*` is rejected.
    pub fn validate(&self, frame: impl AsRef<[u8]>) -> bool {
        let frame = frame.as_ref();
        let Some(marker) = frame.iter().rposition(|&b| b == CRC_MARKER as u8) else {
            return false;
        };
        let (data, suffix) = (&frame[..marker], &frame[marker + 1..]);
        let end = suffix
            .iter()
            .rposition(|&b| b != b'\r' && b != b'\n')
            .map_or(0, |i| i + 1);
        let Ok(suffix) = std::str::from_utf8(&suffix[..end]) else {
            return false;
        };
        if suffix.len() != 4 || !suffix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return false;
        }
        match u16::from_str_radix(suffix, 16) {
            Ok(expected) => expected == self.checksum(data),
            Err(_) => false,
        }
    }
}

/// Remove a trailing `*XXXX\r\n` checksum line, if one is present
pub fn strip_crc_suffix(text: &str) -> &str {
    if text.len() < CRC_SUFFIX_LEN || !text.is_char_boundary(text.len() - CRC_SUFFIX_LEN) {
        return text;
    }
    let (body, suffix) = text.split_at(text.len() - CRC_SUFFIX_LEN);
    let bytes = suffix.as_bytes();
    let is_crc = bytes[0] == b'*'
        && bytes[1..5].iter().all(u8::is_ascii_hexdigit)
        && &bytes[5..] == b"\r\n";
    if is_crc {
        body
    } else {
        text
    }
}

/// XOR checksum - XOR of all bytes
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_xmodem_check_value() {
        // Test vector: "123456789" should give 0x31C3
        assert_eq!(CrcXmodem::new().checksum(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_apply_uppercase_suffix() {
        let crc = CrcXmodem::new();
        assert_eq!(crc.apply("AT%CRC=0"), "AT%CRC=0*8AD5");
    }

    #[test]
    fn test_seeded_firmware_vectors() {
        let crc = CrcXmodem::with_seed(0xFFFF);
        assert_eq!(crc.apply("AT%CRC=0"), "AT%CRC=0*BBEB");
        assert!(crc.validate("AT%CRC=0*BBEB"));
        assert!(crc.validate("\r\nERROR\r\n*84D9\r\n"));
    }

    #[test]
    fn test_validate_round_trip_and_case() {
        let crc = CrcXmodem::new();
        for text in ["AT", "AT+GSN", "\r\nOK\r\n", "AT%MGRS"] {
            let framed = crc.apply(text);
            assert!(crc.validate(&framed), "{framed}");
        }
        assert!(crc.validate("AT%CRC=0*8ad5\r\n"));
    }

    #[test]
    fn test_validate_rejects_corruption() {
        let crc = CrcXmodem::new();
        assert!(!crc.validate("AT%CRC=0*8AD4"));
        assert!(!crc.validate("AT%CRC=0"));
        assert!(!crc.validate("AT%CRC=0*8AD"));
        assert!(!crc.validate("AT%CRC=0*ZZZZ"));
        assert!(!crc.validate("AT%CRC=0*+8AD"));
    }

    #[test]
    fn test_validate_raw_bytes() {
        let crc = CrcXmodem::new();
        let framed = crc.apply("\r\nCaf\u{e9}\r\n\r\nOK\r\n");
        let mut raw = framed.into_bytes();
        raw.extend_from_slice(b"\r\n");
        assert!(crc.validate(&raw));
        raw[4] = 0xE8;
        assert!(!crc.validate(&raw));
    }

    #[test]
    fn test_strip_crc_suffix() {
        assert_eq!(strip_crc_suffix("\r\n123\r\n*1A2B\r\n"), "\r\n123\r\n");
        assert_eq!(strip_crc_suffix("\r\n123\r\n"), "\r\n123\r\n");
        assert_eq!(strip_crc_suffix("*12"), "*12");
    }

    #[test]
    fn test_xor() {
        assert_eq!(xor_checksum(&[0x01, 0x02, 0x03]), 0x00);
        assert_eq!(xor_checksum(&[0xFF, 0x00]), 0xFF);
    }
}
