//! Hexadecimal payload codec

use super::{Codec, CodecError};
use crate::core::constants::DataFormat;
use bytes::Bytes;

/// ASCII hex pairs, uppercase on encode, either case on decode
#[derive(Debug, Clone, Copy, Default)]
pub struct HexCodec;

impl HexCodec {
    /// Create a new hex codec
    pub fn new() -> Self {
        Self
    }
}

impl Codec for HexCodec {
    fn encode(&self, data: &[u8]) -> String {
        hex::encode_upper(data)
    }

    fn decode(&self, text: &str) -> Result<Bytes, CodecError> {
        let text = text.trim().trim_matches('"');
        hex::decode(text).map(Bytes::from).map_err(|e| match e {
            hex::FromHexError::InvalidHexCharacter { c, index } => {
                CodecError::InvalidCharacter(index, c)
            }
            other => CodecError::InvalidFormat(other.to_string()),
        })
    }

    fn format(&self) -> DataFormat {
        DataFormat::Hex
    }
}
