//! Column wrapper types for JSON text, gzip-compressed text and `BIT(1)`
//! flags

use std::fmt;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::traits::{FromValue, ToValue};
use crate::value::Value;

const EMPTY_JSON: &str = "{}";

fn conversion(expected: &'static str, actual: impl fmt::Display) -> Error {
    Error::TypeConversion {
        expected,
        actual: actual.to_string(),
    }
}

/// Raw JSON text that is known to parse.
///
/// The text is kept as written (key order, whitespace). Empty text and SQL
/// NULL read as `{}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonText(String);

impl JsonText {
    /// Wrap `text`, failing if it is not valid JSON.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if !text.is_empty() {
            serde_json::from_str::<serde::de::IgnoredAny>(&text)
                .map_err(|e| conversion("json", e))?;
        }
        Ok(JsonText(text))
    }

    /// Serialize `value` into JSON text.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_string(value)
            .map(JsonText)
            .map_err(|e| conversion("json", e))
    }

    /// Deserialize the text into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(self.as_str()).map_err(|e| conversion("json", e))
    }

    pub fn as_str(&self) -> &str {
        if self.0.is_empty() {
            EMPTY_JSON
        } else {
            &self.0
        }
    }

    pub fn into_string(self) -> String {
        if self.0.is_empty() {
            EMPTY_JSON.to_string()
        } else {
            self.0
        }
    }
}

impl fmt::Display for JsonText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromValue for JsonText {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(JsonText::default()),
            Value::String(text) => JsonText::new(text),
            Value::Bytes(bytes) => {
                let text = String::from_utf8(bytes).map_err(|e| conversion("json", e))?;
                JsonText::new(text)
            }
            Value::Json(json) => Ok(JsonText(json.to_string())),
            other => Err(conversion("json", other.type_name())),
        }
    }
}

impl ToValue for JsonText {
    fn to_value(&self) -> Value {
        Value::String(self.as_str().to_string())
    }
}

/// JSON text that may be NULL.
///
/// Unlike [`JsonText`], SQL NULL stays distinguishable from `{}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NullJsonText(pub Option<JsonText>);

impl NullJsonText {
    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    /// Deserialize the text, or `None` for NULL.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.0.as_ref().map(JsonText::decode).transpose()
    }
}

impl From<JsonText> for NullJsonText {
    fn from(text: JsonText) -> Self {
        NullJsonText(Some(text))
    }
}

impl FromValue for NullJsonText {
    fn from_value(value: Value) -> Result<Self> {
        Option::<JsonText>::from_value(value).map(NullJsonText)
    }
}

impl ToValue for NullJsonText {
    fn to_value(&self) -> Value {
        self.0.to_value()
    }
}

/// Text stored gzip-compressed in a binary column.
///
/// The compressed form is produced once, when the value is built, so
/// binding it cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzippedText {
    text: String,
    compressed: Vec<u8>,
}

impl GzippedText {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(text.as_bytes())
            .map_err(|e| Error::InvalidArgument(format!("gzip: {}", e)))?;
        let compressed = encoder
            .finish()
            .map_err(|e| Error::InvalidArgument(format!("gzip: {}", e)))?;
        Ok(Self { text, compressed })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The gzip stream sent to the database.
    pub fn compressed(&self) -> &[u8] {
        &self.compressed
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for GzippedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromValue for GzippedText {
    fn from_value(value: Value) -> Result<Self> {
        let compressed = match value {
            Value::Bytes(bytes) => bytes,
            // mysql hands back valid UTF-8 payloads as text
            Value::String(text) => text.into_bytes(),
            other => return Err(conversion("gzip data", other.type_name())),
        };
        let mut text = String::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_string(&mut text)
            .map_err(|e| conversion("gzip data", e))?;
        Ok(Self { text, compressed })
    }
}

impl ToValue for GzippedText {
    fn to_value(&self) -> Value {
        Value::Bytes(self.compressed.clone())
    }
}

/// A boolean stored in a MySQL `BIT(1)` column.
///
/// The server sends the bit as a single raw byte, `0x00` or `0x01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitBool(pub bool);

impl From<bool> for BitBool {
    fn from(v: bool) -> Self {
        BitBool(v)
    }
}

impl From<BitBool> for bool {
    fn from(v: BitBool) -> Self {
        v.0
    }
}

impl FromValue for BitBool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(bytes) => match bytes.as_slice() {
                [b] => Ok(BitBool(*b != 0)),
                _ => Err(conversion("bit(1)", format!("{} bytes", bytes.len()))),
            },
            Value::String(text) => match text.as_bytes() {
                b"0" => Ok(BitBool(false)),
                b"1" => Ok(BitBool(true)),
                [b] => Ok(BitBool(*b != 0)),
                _ => Err(conversion("bit(1)", &text)),
            },
            other => bool::from_value(other).map(BitBool),
        }
    }
}

impl ToValue for BitBool {
    fn to_value(&self) -> Value {
        Value::Bytes(vec![u8::from(self.0)])
    }
}
