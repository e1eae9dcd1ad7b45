use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

/// Naive local timestamp, second precision. The only time type.
pub type Ts = NaiveDateTime;

/// Wire format for every timestamp the service emits.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 style local timestamp, dropping sub-second precision.
pub fn parse_timestamp(s: &str) -> Option<Ts> {
    let s = s.trim();
    INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(truncate_seconds)
}

/// Parse a day. Accepts `YYYY-MM-DD` or a full timestamp, whose date is used.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(s).map(|ts| ts.date()))
}

pub fn format_timestamp(ts: &Ts) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn truncate_seconds(ts: Ts) -> Ts {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Serde adapter emitting `YYYY-MM-DDTHH:MM:SS`.
pub mod timestamp {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::Ts;

    pub fn serialize<S: Serializer>(ts: &Ts, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Ts, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_timestamp(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {s}")))
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    #[serde(with = "timestamp")]
    pub start: Ts,
    #[serde(with = "timestamp")]
    pub end: Ts,
}

/// A free interval of exactly the requested duration, as returned by the slot finder.
pub type TimeSlot = Span;

impl Span {
    pub fn new(start: Ts, end: Ts) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A booked calendar entry. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(with = "timestamp")]
    pub start: Ts,
    #[serde(with = "timestamp")]
    pub end: Ts,
    pub attendees: Vec<String>,
    pub created_by: String,
}

impl Event {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// Everything an insert needs except the id, which the store assigns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub start: Ts,
    pub end: Ts,
    pub attendees: Vec<String>,
    pub created_by: String,
}

/// Daily window in which bookings are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl WorkingHours {
    /// `None` unless `start < end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn window(&self, day: NaiveDate) -> Span {
        Span::new(day.and_time(self.start), day.and_time(self.end))
    }
}

/// All events whose start falls on one calendar day.
#[derive(Debug, Clone)]
pub struct DayState {
    pub day: NaiveDate,
    /// Sorted by `start`; equal starts keep insertion order.
    pub events: Vec<Event>,
}

impl DayState {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day,
            events: Vec::new(),
        }
    }

    /// Insert maintaining sort order by start, after any event with the same start.
    pub fn insert_event(&mut self, event: Event) {
        let pos = self.events.partition_point(|e| e.start <= event.start);
        self.events.insert(pos, event);
    }

    pub fn spans(&self) -> Vec<Span> {
        self.events.iter().map(Event::span).collect()
    }
}
