//! Decoding of `writeBLECharacteristicValue` payloads.
//!
//! Web content sends bytes in one of several encodings selected by
//! `valueType`. Typed arrays often arrive as index-keyed objects
//! (`{"0":1,"1":2}`) after JSON serialisation, so `BUFFER` accepts those too.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::BleError;

/// Encoding of a write payload's `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Standard base64 text.
    Base64,
    /// Byte list: array, index-keyed object, or string form of either.
    Buffer,
    /// Hex digits, spaces ignored.
    Hex,
    /// UTF-8 text.
    Utf8,
}

impl ValueType {
    /// Parses a `valueType` tag. Case-insensitive; unknown tags mean UTF-8.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_uppercase().as_str() {
            "BASE64" => Self::Base64,
            "BUFFER" => Self::Buffer,
            "HEX" | "16进制" => Self::Hex,
            "UTF8" | "TEXT" => Self::Utf8,
            other => {
                warn!("unknown valueType {other:?}, decoding as UTF-8");
                Self::Utf8
            }
        }
    }
}

/// A decoded write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// Target device.
    pub device_id: String,
    /// Service UUID as sent.
    pub service_id: String,
    /// Characteristic UUID as sent.
    pub characteristic_id: String,
    /// How `value` was encoded.
    pub value_type: ValueType,
    /// Bytes to write, never empty.
    pub data: Vec<u8>,
}

impl WriteRequest {
    /// Decodes a write request from bridge params.
    ///
    /// # Errors
    ///
    /// Returns [`BleError::InvalidData`] when an id is missing, the value does
    /// not decode under its `valueType`, or it decodes to no bytes.
    pub fn parse(params: &Map<String, Value>) -> Result<Self, BleError> {
        let device_id = string_field(params, "deviceId");
        let service_id = string_field(params, "serviceId");
        let characteristic_id = string_field(params, "characteristicId");
        if device_id.is_empty() || service_id.is_empty() || characteristic_id.is_empty() {
            return Err(BleError::InvalidData(format!(
                "deviceId, serviceId and characteristicId are required \
                 (deviceId={device_id:?}, serviceId={service_id:?}, characteristicId={characteristic_id:?})"
            )));
        }

        let value_type = params
            .get("valueType")
            .and_then(Value::as_str)
            .map_or(ValueType::Utf8, ValueType::from_tag);
        let value = params.get("value").unwrap_or(&Value::Null);
        let data = decode(value_type, value)?;
        if data.is_empty() {
            return Err(BleError::InvalidData(format!(
                "value decodes to no bytes ({value_type:?}: {value})"
            )));
        }
        debug!("decoded {} bytes of {value_type:?} for {characteristic_id}", data.len());

        Ok(Self {
            device_id,
            service_id,
            characteristic_id,
            value_type,
            data,
        })
    }
}

/// Decodes `value` as `value_type`.
///
/// # Errors
///
/// Returns [`BleError::InvalidData`] if `value` is malformed for the type.
pub fn decode(value_type: ValueType, value: &Value) -> Result<Vec<u8>, BleError> {
    match value_type {
        ValueType::Base64 => decode_base64(&text(value)),
        ValueType::Buffer => decode_buffer(value),
        ValueType::Hex => decode_hex(&text(value)),
        ValueType::Utf8 => Ok(text(value).into_bytes()),
    }
}

fn string_field(params: &Map<String, Value>, key: &str) -> String {
    params
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_owned()
}

fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, BleError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64_STANDARD
        .decode(compact)
        .map_err(|err| BleError::InvalidData(format!("invalid base64: {err}")))
}

fn decode_hex(encoded: &str) -> Result<Vec<u8>, BleError> {
    let compact = encoded.replace(' ', "");
    if compact.len() % 2 != 0 {
        return Err(BleError::InvalidData(format!(
            "hex string must have an even length, got {}",
            compact.len()
        )));
    }
    hex::decode(compact).map_err(|err| BleError::InvalidData(format!("invalid hex: {err}")))
}

fn decode_buffer(value: &Value) -> Result<Vec<u8>, BleError> {
    let items = match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => indexed_values(map)?,
        Value::String(s) => buffer_from_str(s)?,
        Value::Null => {
            return Err(BleError::InvalidData("BUFFER value is missing".into()));
        }
        other => {
            return Err(BleError::InvalidData(format!(
                "BUFFER value must be an array, object or string, got {other}"
            )));
        }
    };
    if items.is_empty() {
        return Err(BleError::InvalidData(
            "BUFFER is empty, send a non-empty byte array or use HEX".into(),
        ));
    }
    items
        .iter()
        .enumerate()
        .map(|(index, item)| byte_at(index, item))
        .collect()
}

fn buffer_from_str(raw: &str) -> Result<Vec<Value>, BleError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BleError::InvalidData("BUFFER string is empty".into()));
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|err| BleError::InvalidData(format!("invalid BUFFER array: {err}")));
    }
    if trimmed.starts_with('{') {
        let map: Map<String, Value> = serde_json::from_str(trimmed)
            .map_err(|err| BleError::InvalidData(format!("invalid BUFFER object: {err}")))?;
        return indexed_values(&map);
    }
    Ok(trimmed
        .split(',')
        .map(|part| Value::String(part.trim().to_owned()))
        .collect())
}

/// Orders an index-keyed object by numeric key. Non-numeric keys sort as 0.
fn indexed_values(map: &Map<String, Value>) -> Result<Vec<Value>, BleError> {
    if map.is_empty() {
        return Err(BleError::InvalidData(
            "BUFFER object is empty, the ArrayBuffer was probably not serialised".into(),
        ));
    }
    let mut entries: Vec<(i64, &Value)> = map
        .iter()
        .map(|(key, value)| (key.trim().parse().unwrap_or(0), value))
        .collect();
    entries.sort_by_key(|(index, _)| *index);
    Ok(entries.into_iter().map(|(_, value)| value.clone()).collect())
}

fn byte_at(index: usize, item: &Value) -> Result<u8, BleError> {
    let number = match item {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| BleError::InvalidData(format!("byte {index} is not an integer: {item}")))?;
    u8::try_from(number).map_err(|_| {
        BleError::InvalidData(format!("byte {index} is {number}, outside 0..=255"))
    })
}
