use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Access code identifying one anonymous submission channel.
///
/// A `Code` only wraps the normalised string; whether it matches the
/// configured alphabet and length is checked by the code format at the
/// edges where user input enters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A message as handed to a store, before it has been stamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub message: String,
    pub sensitivity: Option<String>,
    pub delivery: Option<String>,
    pub timestamp_utc: Option<DateTime<Utc>>,
}

impl NewMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sensitivity: None,
            delivery: None,
            timestamp_utc: None,
        }
    }

    pub fn with_sensitivity(mut self, sensitivity: Option<String>) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn with_delivery(mut self, delivery: Option<String>) -> Self {
        self.delivery = delivery;
        self
    }

    /// Stamp with the current time unless a timestamp is already present.
    pub fn stamped(self) -> Message {
        Message {
            message: self.message,
            sensitivity: self.sensitivity,
            delivery: self.delivery,
            timestamp_utc: self.timestamp_utc.unwrap_or_else(now_utc),
        }
    }
}

/// A stored, immutable anonymous message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
    pub sensitivity: Option<String>,
    pub delivery: Option<String>,
    #[serde(with = "timestamp")]
    pub timestamp_utc: DateTime<Utc>,
}

/// All messages recorded against one code, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeGroup {
    pub code: Code,
    pub messages: Vec<Message>,
}

/// Current UTC time at microsecond precision, which is what both stores
/// persist, so a stamped value survives a save/load unchanged.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// RFC 3339 with exactly six fractional digits and a `Z` suffix, so stored
/// and served timestamps are fixed width and sort lexically.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse(&value).map_err(D::Error::custom)
    }
}
