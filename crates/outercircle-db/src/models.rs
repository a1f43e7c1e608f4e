//! Row types that map directly to SQLite rows.
//! Converted into the shared models once the timestamp has been parsed.
use chrono::{DateTime, Utc};
use outercircle_types::models::{Code, Message, timestamp};

use crate::error::{Result, StoreError};

pub struct MessageRow {
    pub code: String,
    pub message: String,
    pub sensitivity: Option<String>,
    pub delivery: Option<String>,
    pub timestamp_utc: String,
}

impl MessageRow {
    pub fn into_message(self) -> Result<(Code, Message)> {
        let timestamp_utc = parse_timestamp(&self.timestamp_utc)?;
        Ok((
            Code::new(self.code),
            Message {
                message: self.message,
                sensitivity: self.sensitivity,
                delivery: self.delivery,
                timestamp_utc,
            },
        ))
    }
}

/// Fixed-width RFC 3339 so that lexical order in SQL is chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    timestamp::format(ts)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    timestamp::parse(value).map_err(|source| StoreError::Timestamp {
        value: value.to_string(),
        source,
    })
}
