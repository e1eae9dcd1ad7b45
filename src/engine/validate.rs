use chrono::{NaiveDate, TimeDelta};

use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub fn parse_day_arg(s: &str) -> Result<NaiveDate, EngineError> {
    parse_day(s).ok_or_else(|| EngineError::InvalidDay(s.to_string()))
}

pub fn parse_timestamp_arg(s: &str) -> Result<Ts, EngineError> {
    parse_timestamp(s).ok_or_else(|| EngineError::InvalidTimestamp(s.to_string()))
}

pub(crate) fn validate_duration(minutes: i64) -> Result<TimeDelta, EngineError> {
    if minutes <= 0 {
        return Err(EngineError::InvalidDuration(minutes));
    }
    if minutes > MAX_DURATION_MINUTES {
        return Err(EngineError::LimitExceeded("duration longer than a day"));
    }
    Ok(TimeDelta::minutes(minutes))
}

pub(crate) fn validate_span(start: Ts, end: Ts) -> Result<(), EngineError> {
    if end <= start {
        return Err(EngineError::InvalidSpan { start, end });
    }
    Ok(())
}

pub(crate) fn validate_details(
    title: &str,
    attendees: &[String],
    created_by: &str,
) -> Result<(), EngineError> {
    if title.len() > MAX_TITLE_LEN {
        return Err(EngineError::LimitExceeded("title too long"));
    }
    if attendees.len() > MAX_ATTENDEES {
        return Err(EngineError::LimitExceeded("too many attendees"));
    }
    if attendees.iter().any(|a| a.len() > MAX_ATTENDEE_LEN) {
        return Err(EngineError::LimitExceeded("attendee too long"));
    }
    if created_by.len() > MAX_CREATED_BY_LEN {
        return Err(EngineError::LimitExceeded("created_by too long"));
    }
    Ok(())
}

pub(crate) fn validate_new_event(new: &NewEvent) -> Result<(), EngineError> {
    validate_span(new.start, new.end)?;
    validate_details(&new.title, &new.attendees, &new.created_by)
}
