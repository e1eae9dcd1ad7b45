use chrono::NaiveDate;

use crate::model::{format_timestamp, Ts};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    InvalidDay(String),
    InvalidTimestamp(String),
    InvalidDuration(i64),
    InvalidSpan { start: Ts, end: Ts },
    LimitExceeded(&'static str),
    NoSlotAvailable {
        day: NaiveDate,
        duration_minutes: i64,
    },
}

impl EngineError {
    /// Caller supplied something malformed. Never retried.
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(self, EngineError::NoSlotAvailable { .. })
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidDay(s) => write!(f, "invalid day: {s:?}"),
            EngineError::InvalidTimestamp(s) => write!(f, "invalid timestamp: {s:?}"),
            EngineError::InvalidDuration(m) => {
                write!(f, "duration must be a positive number of minutes, got {m}")
            }
            EngineError::InvalidSpan { start, end } => write!(
                f,
                "end {} must be after start {}",
                format_timestamp(end),
                format_timestamp(start)
            ),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::NoSlotAvailable {
                day,
                duration_minutes,
            } => write!(f, "no free {duration_minutes} minute slot on {day}"),
        }
    }
}

impl std::error::Error for EngineError {}
