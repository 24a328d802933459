//! Quoted text payload codec

use super::{Codec, CodecError};
use crate::core::constants::DataFormat;
use bytes::Bytes;

/// Printable ASCII in double quotes, every other byte as `\hh`
///
/// `"` and `\` are escaped too so the quoted string parses unambiguously.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl TextCodec {
    /// Create a new text codec
    pub fn new() -> Self {
        Self
    }
}

impl Codec for TextCodec {
    fn encode(&self, data: &[u8]) -> String {
        let mut output = String::with_capacity(data.len() + 2);
        output.push('"');
        for &byte in data {
            match byte {
                b'"' | b'\\' => output.push_str(&format!("\\{:02X}", byte)),
                b if b.is_ascii_graphic() || b == b' ' => output.push(b as char),
                b => output.push_str(&format!("\\{:02X}", b)),
            }
        }
        output.push('"');
        output
    }

    fn decode(&self, text: &str) -> Result<Bytes, CodecError> {
        let text = text.trim();
        let text = text
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(text);

        let mut output = Vec::with_capacity(text.len());
        let mut chars = text.char_indices();

        while let Some((position, c)) = chars.next() {
            if c != '\\' {
                let mut utf8 = [0u8; 4];
                output.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
                continue;
            }
            let hex: String = chars.by_ref().take(2).map(|(_, c)| c).collect();
            if hex.len() != 2 {
                return Err(CodecError::InvalidFormat(format!(
                    "Incomplete escape at position {}",
                    position
                )));
            }
            let byte = u8::from_str_radix(&hex, 16).map_err(|_| {
                CodecError::InvalidFormat(format!("Invalid escape sequence: \\{}", hex))
            })?;
            output.push(byte);
        }

        Ok(Bytes::from(output))
    }

    fn format(&self) -> DataFormat {
        DataFormat::Text
    }
}
