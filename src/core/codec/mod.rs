//! Payload codecs for message data
//!
//! The modem moves message payloads as text in one of three formats:
//! - Text: quoted, non-printable bytes as `\hh`
//! - Hexadecimal pairs
//! - Base64

mod base64;
mod hex;
mod text;

pub use self::base64::Base64Codec;
pub use self::hex::HexCodec;
pub use text::TextCodec;

use crate::core::constants::DataFormat;
use bytes::Bytes;

/// Codec trait for payload transformation
pub trait Codec: Send + Sync {
    /// Encode bytes to their wire representation
    fn encode(&self, data: &[u8]) -> String;

    /// Decode a wire representation to bytes
    fn decode(&self, text: &str) -> Result<Bytes, CodecError>;

    /// Wire format handled
    fn format(&self) -> DataFormat;
}

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Invalid input format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Invalid character
    #[error("Invalid character at position {0}: {1}")]
    InvalidCharacter(usize, char),
}

/// Create a codec for a payload format
pub fn create_codec(format: DataFormat) -> Box<dyn Codec> {
    match format {
        DataFormat::Text => Box::new(TextCodec::new()),
        DataFormat::Hex => Box::new(HexCodec::new()),
        DataFormat::Base64 => Box::new(Base64Codec::new()),
    }
}

/// Decode `text` in `format`
pub fn decode_payload(format: DataFormat, text: &str) -> Result<Bytes, CodecError> {
    create_codec(format).decode(text)
}

/// Encode `data` in `format`
pub fn encode_payload(format: DataFormat, data: &[u8]) -> String {
    create_codec(format).encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_payload_every_format() {
        let payload = b"\x01\x02hi";
        assert_eq!(decode_payload(DataFormat::Text, "\"\\01\\02hi\"").unwrap(), &payload[..]);
        assert_eq!(decode_payload(DataFormat::Hex, "01026869").unwrap(), &payload[..]);
        assert_eq!(decode_payload(DataFormat::Base64, "AQJoaQ==").unwrap(), &payload[..]);
    }

    #[test]
    fn test_codec_format() {
        for format in [DataFormat::Text, DataFormat::Hex, DataFormat::Base64] {
            assert_eq!(create_codec(format).format(), format);
        }
    }
}
