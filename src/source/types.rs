//! Dose-rate sample type delivered by a subscription source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single dose-rate reading.
///
/// `value` is a rate in physical units per hour, `timestamp` is the source's
/// clock in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoseSample {
    pub value: f64,
    pub timestamp: f64,
}

impl DoseSample {
    /// Build a sample from a `timestamp, value` pair, the order the line
    /// format uses.
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { value, timestamp }
    }

    /// Interpret the timestamp as seconds since the Unix epoch.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        if !self.timestamp.is_finite() {
            return None;
        }
        let secs = self.timestamp.floor();
        let nanos = ((self.timestamp - secs) * 1e9) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
    }

    /// Parse a sample from one line of text.
    ///
    /// Accepts `timestamp value` (whitespace or comma separated) or a JSON
    /// object with `value` and `timestamp` fields.
    pub fn parse_line(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.starts_with('{') {
            return serde_json::from_str(line).map_err(|e| ParseError::Json(e.to_string()));
        }

        let mut fields = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty());

        let timestamp = parse_field(fields.next(), "timestamp")?;
        let value = parse_field(fields.next(), "value")?;
        if let Some(extra) = fields.next() {
            return Err(ParseError::TrailingField(extra.to_string()));
        }

        Ok(Self::new(timestamp, value))
    }
}

fn parse_field(field: Option<&str>, name: &'static str) -> Result<f64, ParseError> {
    let raw = field.ok_or(ParseError::MissingField(name))?;
    let parsed: f64 = raw
        .parse()
        .map_err(|_| ParseError::InvalidNumber(raw.to_string()))?;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(ParseError::InvalidNumber(raw.to_string()))
    }
}

/// Errors produced while decoding a sample line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    MissingField(&'static str),
    InvalidNumber(String),
    TrailingField(String),
    Json(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MissingField(name) => write!(f, "missing {name} field"),
            ParseError::InvalidNumber(raw) => write!(f, "invalid number: {raw}"),
            ParseError::TrailingField(raw) => write!(f, "unexpected trailing field: {raw}"),
            ParseError::Json(e) => write!(f, "invalid JSON sample: {e}"),
        }
    }
}

impl std::error::Error for ParseError {}
