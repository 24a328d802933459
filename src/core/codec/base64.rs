//! Base64 payload codec (standard alphabet, padded, no line breaks)

use super::{Codec, CodecError};
use crate::core::constants::DataFormat;
use bytes::Bytes;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Base64 codec
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Codec;

impl Base64Codec {
    /// Create a new base64 codec
    pub fn new() -> Self {
        Self
    }
}

fn decode_char(position: usize, c: char) -> Result<u32, CodecError> {
    ALPHABET
        .iter()
        .position(|&b| char::from(b) == c)
        .map(|p| p as u32)
        .ok_or(CodecError::InvalidCharacter(position, c))
}

impl Codec for Base64Codec {
    fn encode(&self, data: &[u8]) -> String {
        let mut result = String::with_capacity(data.len().div_ceil(3) * 4);

        for chunk in data.chunks(3) {
            let b0 = u32::from(chunk[0]);
            let b1 = chunk.get(1).map_or(0, |&b| u32::from(b));
            let b2 = chunk.get(2).map_or(0, |&b| u32::from(b));

            let n = (b0 << 16) | (b1 << 8) | b2;

            result.push(char::from(ALPHABET[((n >> 18) & 0x3F) as usize]));
            result.push(char::from(ALPHABET[((n >> 12) & 0x3F) as usize]));

            if chunk.len() > 1 {
                result.push(char::from(ALPHABET[((n >> 6) & 0x3F) as usize]));
            } else {
                result.push('=');
            }

            if chunk.len() > 2 {
                result.push(char::from(ALPHABET[(n & 0x3F) as usize]));
            } else {
                result.push('=');
            }
        }

        result
    }

    fn decode(&self, text: &str) -> Result<Bytes, CodecError> {
        let text = text.trim().trim_matches('"');
        let data = text.trim_end_matches('=');
        if text.len() - data.len() > 2 {
            return Err(CodecError::InvalidFormat("Too much padding".to_string()));
        }

        let chars: Vec<char> = data.chars().collect();
        let mut result = Vec::with_capacity(chars.len() * 3 / 4);

        for (index, chunk) in chars.chunks(4).enumerate() {
            let base = index * 4;
            if chunk.len() < 2 {
                return Err(CodecError::InvalidFormat(format!(
                    "Truncated quantum at position {}",
                    base
                )));
            }

            let n0 = decode_char(base, chunk[0])?;
            let n1 = decode_char(base + 1, chunk[1])?;
            let n2 = chunk.get(2).map_or(Ok(0), |&c| decode_char(base + 2, c))?;
            let n3 = chunk.get(3).map_or(Ok(0), |&c| decode_char(base + 3, c))?;

            let n = (n0 << 18) | (n1 << 12) | (n2 << 6) | n3;

            result.push(((n >> 16) & 0xFF) as u8);
            if chunk.len() > 2 {
                result.push(((n >> 8) & 0xFF) as u8);
            }
            if chunk.len() > 3 {
                result.push((n & 0xFF) as u8);
            }
        }

        Ok(Bytes::from(result))
    }

    fn format(&self) -> DataFormat {
        DataFormat::Base64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_encode() {
        let codec = Base64Codec::new();
        assert_eq!(codec.encode(b"Man"), "TWFu");
        assert_eq!(codec.encode(b"Ma"), "TWE=");
        assert_eq!(codec.encode(b"M"), "TQ==");
        assert_eq!(codec.encode(b""), "");
    }

    #[test]
    fn test_base64_decode() {
        let codec = Base64Codec::new();
        assert_eq!(codec.decode("SGVsbG8gV29ybGQ=").unwrap(), &b"Hello World"[..]);
        assert_eq!(codec.decode("\"TQ==\"").unwrap(), &b"M"[..]);
        assert!(matches!(codec.decode("TW$u"), Err(CodecError::InvalidCharacter(2, '$'))));
        assert!(codec.decode("TWFuT").is_err());
    }
}
