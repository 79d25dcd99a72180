//! Log record wire model
//!
//! Producers send one JSON object per WebSocket frame. Every field is
//! optional; absent or `null` fields take their defaults. Keys are matched
//! without regard to ASCII case and the last occurrence of a key wins. The severity is
//! clamped rather than rejected so a forward-incompatible producer is
//! surfaced at maximum visibility instead of being silently dropped.

use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Raw payload requesting consumers to clear their display at session start
pub const CLEAR_ON_START: &[u8] = b"clears";

/// Raw payload requesting consumers to clear their display at session end
pub const CLEAR_ON_FINISH: &[u8] = b"clearf";

/// Wire value of the clear-on-start control message
const CLEAR_ON_START_LEVEL: i64 = -2;

/// Wire value of the clear-on-finish control message
const CLEAR_ON_FINISH_LEVEL: i64 = -1;

/// Severity of a log record, ascending restrictiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Level {
    #[default]
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    /// All levels in ascending order
    pub const ALL: [Level; 4] = [Level::Debug, Level::Info, Level::Warn, Level::Error];

    /// Exact conversion from the wire integer
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(Level::Debug),
            1 => Some(Level::Info),
            2 => Some(Level::Warn),
            3 => Some(Level::Error),
            _ => None,
        }
    }

    /// Conversion that coerces anything out of range to `Error`
    #[inline]
    pub fn from_raw_clamped(raw: i64) -> Self {
        Self::from_raw(raw).unwrap_or(Level::Error)
    }

    #[inline(always)]
    pub fn as_raw(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_raw())
    }
}

/// Producer payload could not be decoded
#[derive(Debug, thiserror::Error)]
#[error("malformed log record: {0}")]
pub struct ParseError(#[from] serde_json::Error);

/// A single log event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    /// Producer-supplied timestamp, unit is opaque to the relay
    pub time: i64,
    pub content: String,
    pub logger_name: String,
    /// Empty when unavailable
    pub file_name: String,
    /// -1 when unavailable
    pub line_num: i64,
    /// -1 when unavailable
    pub column_num: i64,
    pub level: Level,
}

/// Decoding shape; `None` covers both absent and `null`
#[derive(Debug, Default)]
struct RawRecord {
    time: Option<i64>,
    content: Option<String>,
    logger_name: Option<String>,
    file_name: Option<String>,
    line_num: Option<i64>,
    column_num: Option<i64>,
    level: Option<i64>,
}

/// A `null` value leaves the field as it was
fn assign<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Accepts only JSON objects. Keys match regardless of ASCII case and a
/// repeated key overwrites the earlier value.
struct RawRecordVisitor;

impl<'de> Visitor<'de> for RawRecordVisitor {
    type Value = RawRecord;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a log record object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawRecord, A::Error> {
        let mut raw = RawRecord::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.to_ascii_lowercase().as_str() {
                "time" => assign(&mut raw.time, map.next_value()?),
                "content" => assign(&mut raw.content, map.next_value()?),
                "logger_name" => assign(&mut raw.logger_name, map.next_value()?),
                "file_name" => assign(&mut raw.file_name, map.next_value()?),
                "line_num" => assign(&mut raw.line_num, map.next_value()?),
                "column_num" => assign(&mut raw.column_num, map.next_value()?),
                "level" => assign(&mut raw.level, map.next_value()?),
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(raw)
    }
}

impl<'de> Deserialize<'de> for RawRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RawRecordVisitor)
    }
}

impl LogRecord {
    /// Decode a producer payload, applying defaults and clamping the level
    ///
    /// A bare `null` payload decodes to the default record.
    ///
    /// # Errors
    /// Returns `ParseError` if the payload is not a JSON object whose fields
    /// have the expected types.
    pub fn parse(raw: &[u8]) -> Result<Self, ParseError> {
        let raw: RawRecord = serde_json::from_slice::<Option<RawRecord>>(raw)?.unwrap_or_default();
        Ok(Self {
            time: raw.time.unwrap_or(0),
            content: raw.content.unwrap_or_default(),
            logger_name: raw.logger_name.unwrap_or_default(),
            file_name: raw.file_name.unwrap_or_default(),
            line_num: raw.line_num.unwrap_or(-1),
            column_num: raw.column_num.unwrap_or(-1),
            level: Level::from_raw_clamped(raw.level.unwrap_or(0)),
        })
    }
}

impl Default for LogRecord {
    fn default() -> Self {
        Self {
            time: 0,
            content: String::new(),
            logger_name: String::new(),
            file_name: String::new(),
            line_num: -1,
            column_num: -1,
            level: Level::Debug,
        }
    }
}

/// Unit of work carried from producers to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// Consumers should clear their display at session start
    ClearOnStart,
    /// Consumers should clear their display at session end
    ClearOnFinish,
    /// An accepted log record
    Record(LogRecord),
}

/// Outbound shape of a control message: a blank record with a sentinel level
#[derive(Serialize)]
struct ControlWire {
    time: i64,
    content: &'static str,
    logger_name: &'static str,
    file_name: &'static str,
    line_num: i64,
    column_num: i64,
    level: i64,
}

impl ControlWire {
    fn new(level: i64) -> Self {
        Self {
            time: 0,
            content: "",
            logger_name: "",
            file_name: "",
            line_num: 0,
            column_num: 0,
            level,
        }
    }
}

impl Envelope {
    /// Classify a raw control payload, if it is one
    pub fn control(raw: &[u8]) -> Option<Self> {
        if raw == CLEAR_ON_START {
            Some(Envelope::ClearOnStart)
        } else if raw == CLEAR_ON_FINISH {
            Some(Envelope::ClearOnFinish)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_control(&self) -> bool {
        !matches!(self, Envelope::Record(_))
    }

    /// Integer carried in the outbound `level` field
    pub fn wire_level(&self) -> i64 {
        match self {
            Envelope::ClearOnStart => CLEAR_ON_START_LEVEL,
            Envelope::ClearOnFinish => CLEAR_ON_FINISH_LEVEL,
            Envelope::Record(record) => record.level.as_raw(),
        }
    }

    /// Serialize to the outbound JSON text sent to consumers
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        match self {
            Envelope::Record(record) => serde_json::to_string(record),
            Envelope::ClearOnStart | Envelope::ClearOnFinish => {
                serde_json::to_string(&ControlWire::new(self.wire_level()))
            }
        }
    }
}
