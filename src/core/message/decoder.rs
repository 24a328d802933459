//! Comma-separated record decoding

use bytes::Bytes;
use std::str::FromStr;
use tracing::{debug, warn};

use super::{ColumnMap, DecodeError, Direction, Manufacturer, MessageRecord};
use crate::core::codec::decode_payload as decode_data;
use crate::core::constants::{CodeEnum, DataFormat, MessagePriority, MessageState};

fn column<'a>(fields: &[&'a str], index: usize, name: &'static str) -> Result<&'a str, DecodeError> {
    fields
        .get(index)
        .map(|f| f.trim())
        .ok_or(DecodeError::MissingColumn { column: name, index })
}

fn number<T: FromStr>(fields: &[&str], index: usize, name: &'static str) -> Result<T, DecodeError> {
    let raw = column(fields, index, name)?;
    raw.parse().map_err(|_| DecodeError::InvalidValue {
        column: name,
        value: raw.to_string(),
    })
}

fn code<E: CodeEnum>(fields: &[&str], index: usize, name: &'static str) -> Result<E, DecodeError> {
    let raw: i32 = number(fields, index, name)?;
    E::from_code(raw).ok_or(DecodeError::InvalidValue {
        column: name,
        value: raw.to_string(),
    })
}

fn decode_metadata(
    fields: &[&str],
    columns: &ColumnMap,
    direction: Direction,
    manufacturer: Manufacturer,
) -> Result<MessageRecord, DecodeError> {
    let name = column(fields, columns.name, "name")?.trim_matches('"').to_string();
    let max = manufacturer.profile().name_max_len;
    if name.len() > max {
        warn!("{} message name {} longer than {} characters", manufacturer, name, max);
    }
    let sequence = match columns.sequence {
        Some(index) => Some(column(fields, index, "sequence")?.to_string()),
        None => None,
    };
    let length: usize = number(fields, columns.length, "length")?;
    let bytes_delivered = match columns.bytes_delivered {
        Some(index) => number(fields, index, "bytes_delivered")?,
        None => 0,
    };

    Ok(MessageRecord {
        name,
        sequence,
        priority: code::<MessagePriority>(fields, columns.priority, "priority")?,
        direction,
        state: code::<MessageState>(fields, columns.state, "state")?,
        sin: number(fields, columns.sin, "sin")?,
        length,
        bytes_delivered,
        payload: Bytes::new(),
    })
}

/// Decode one message state record
pub fn decode_record(
    fields: &[&str],
    direction: Direction,
    manufacturer: Manufacturer,
) -> Result<MessageRecord, DecodeError> {
    let columns = &manufacturer.profile().state_columns;
    let record = decode_metadata(fields, columns, direction, manufacturer)?;
    let width = columns.width();
    if fields.len() > width {
        debug!("Ignoring {} extra columns: {:?}", fields.len() - width, &fields[width..]);
    }
    Ok(record)
}

/// Decode every state line in a cleaned response, skipping malformed lines
pub fn decode_records(
    text: &str,
    direction: Direction,
    manufacturer: Manufacturer,
) -> Vec<MessageRecord> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            match decode_record(&fields, direction, manufacturer) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping message record {:?}: {}", line, e);
                    None
                }
            }
        })
        .collect()
}

/// Decode the data column of a retrieval record in `format`
///
/// A decoded size differing from the length column is logged; the bytes are
/// returned as decoded.
pub fn decode_payload(
    fields: &[&str],
    format: DataFormat,
    manufacturer: Manufacturer,
) -> Result<Bytes, DecodeError> {
    let columns = &manufacturer.profile().message_columns;
    let data_index = columns.data.unwrap_or(columns.width());
    let data = column(fields, data_index, "data")?;
    let payload = decode_data(format, data)?;

    if let Ok(length) = number::<usize>(fields, columns.length, "length") {
        if payload.len() != length {
            warn!(
                "Payload size {} does not match declared length {}",
                payload.len(),
                length
            );
        }
    }
    Ok(payload)
}

/// Decode a full retrieval record: metadata, format and data
pub fn decode_message(
    fields: &[&str],
    direction: Direction,
    manufacturer: Manufacturer,
) -> Result<MessageRecord, DecodeError> {
    let columns = &manufacturer.profile().message_columns;
    let mut record = decode_metadata(fields, columns, direction, manufacturer)?;
    let format_index = columns.format.unwrap_or(columns.width());
    let format = code::<DataFormat>(fields, format_index, "format")?;
    record.payload = decode_payload(fields, format, manufacturer)?;
    record.bytes_delivered = record.length;
    Ok(record)
}

/// Split a retrieval line and decode it
///
/// The data column is last and may itself contain commas in text format.
pub fn decode_message_line(
    line: &str,
    direction: Direction,
    manufacturer: Manufacturer,
) -> Result<MessageRecord, DecodeError> {
    let width = manufacturer.profile().message_columns.width();
    let fields: Vec<&str> = line.trim().splitn(width, ',').collect();
    decode_message(&fields, direction, manufacturer)
}
