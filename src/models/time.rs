//! Time instants and periods
//!
//! Connected Systems resources express time either as ISO-8601 instants or as
//! one of the indeterminate literals `now` and `latest`. Periods are encoded on
//! the wire as a two-element JSON array and in query strings as `start/end`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeTuple, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A point in time as understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInstant {
    /// A concrete UTC instant
    At(DateTime<Utc>),
    /// The current time at evaluation
    Now,
    /// The most recent available record
    Latest,
}

impl TimeInstant {
    /// Current time as a concrete instant
    pub fn now_utc() -> Self {
        TimeInstant::At(Utc::now())
    }

    /// Whether this instant is one of the indeterminate literals
    pub fn is_indeterminate(&self) -> bool {
        !matches!(self, TimeInstant::At(_))
    }

    /// Resolve to a concrete instant, evaluating `now`/`latest` against the clock
    pub fn resolve(&self) -> DateTime<Utc> {
        match self {
            TimeInstant::At(t) => *t,
            TimeInstant::Now | TimeInstant::Latest => Utc::now(),
        }
    }
}

impl fmt::Display for TimeInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInstant::At(t) => write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            TimeInstant::Now => write!(f, "now"),
            TimeInstant::Latest => write!(f, "latest"),
        }
    }
}

impl FromStr for TimeInstant {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "now" => Ok(TimeInstant::Now),
            "latest" => Ok(TimeInstant::Latest),
            other => DateTime::parse_from_rfc3339(other)
                .map(|t| TimeInstant::At(t.with_timezone(&Utc)))
                .map_err(|e| TimeParseError::InvalidInstant {
                    value: other.to_string(),
                    reason: e.to_string(),
                }),
        }
    }
}

impl From<DateTime<Utc>> for TimeInstant {
    fn from(t: DateTime<Utc>) -> Self {
        TimeInstant::At(t)
    }
}

impl Serialize for TimeInstant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeInstant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// A bounded interval between two instants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePeriod {
    pub start: TimeInstant,
    pub end: TimeInstant,
}

impl TimePeriod {
    /// Create a period, rejecting reversed bounds and fully indeterminate periods
    pub fn new(start: TimeInstant, end: TimeInstant) -> Result<Self, TimeParseError> {
        if start.is_indeterminate() && end.is_indeterminate() {
            return Err(TimeParseError::IndeterminatePeriod);
        }
        if let (TimeInstant::At(s), TimeInstant::At(e)) = (start, end) {
            if s > e {
                return Err(TimeParseError::ReversedPeriod);
            }
        }
        Ok(Self { start, end })
    }

    /// Parse a period from two ISO-8601 (or `now`/`latest`) strings
    pub fn parse(start: &str, end: &str) -> Result<Self, TimeParseError> {
        Self::new(start.parse()?, end.parse()?)
    }

    /// Check whether two periods share at least one instant
    pub fn overlaps(&self, other: &TimePeriod) -> bool {
        self.start.resolve() <= other.end.resolve() && other.start.resolve() <= self.end.resolve()
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

impl Serialize for TimePeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.start)?;
        tuple.serialize_element(&self.end)?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for TimePeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Server-provided periods are taken as-is; only locally built ones are checked
        let [start, end] = <[TimeInstant; 2]>::deserialize(deserializer)?;
        Ok(TimePeriod { start, end })
    }
}

/// Errors from parsing or constructing time values
#[derive(Debug, Error, PartialEq)]
pub enum TimeParseError {
    #[error("Invalid time instant '{value}': {reason}")]
    InvalidInstant { value: String, reason: String },

    #[error("Start time cannot be later than end time")]
    ReversedPeriod,

    #[error("Start and end time cannot both be indeterminate")]
    IndeterminatePeriod,
}
