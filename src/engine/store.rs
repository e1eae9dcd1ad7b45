use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::validate::validate_new_event;
use super::{EngineError, SharedDayState};

/// Process-lifetime event collection, bucketed by the calendar day an event starts on.
///
/// Each bucket carries its own lock, so writers on different days never contend.
pub struct EventStore {
    days: DashMap<NaiveDate, SharedDayState>,
    len: AtomicUsize,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            days: DashMap::new(),
            len: AtomicUsize::new(0),
        }
    }

    // ── Day buckets ──────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_day(&self, day: NaiveDate) -> Option<SharedDayState> {
        self.days.get(&day).map(|e| e.value().clone())
    }

    /// Bucket for `day`, created empty on first use. Callers only reach for
    /// this once they have something to insert.
    pub fn day(&self, day: NaiveDate) -> SharedDayState {
        self.days
            .entry(day)
            .or_insert_with(|| Arc::new(RwLock::new(DayState::new(day))))
            .value()
            .clone()
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days: Vec<NaiveDate> = self.days.iter().map(|e| *e.key()).collect();
        days.sort();
        days
    }

    // ── Reads ────────────────────────────────────────────────

    /// Events starting in `[day 00:00, next day 00:00)`, sorted by start.
    pub async fn events_for_day(&self, day: NaiveDate) -> Vec<Event> {
        match self.get_day(day) {
            Some(ds) => ds.read().await.events.clone(),
            None => Vec::new(),
        }
    }

    pub async fn all_events(&self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.len());
        // Collect the Arcs first so no map shard stays locked across an await.
        for day in self.days() {
            events.extend(self.events_for_day(day).await);
        }
        events
    }

    // ── Writes ───────────────────────────────────────────────

    pub async fn insert(&self, new: NewEvent) -> Result<Event, EngineError> {
        let new = normalize(new)?;
        let ds = self.day(new.start.date());
        let mut guard = ds.write().await;
        self.commit(&mut guard, new)
    }

    /// Insert into a bucket whose write lock the caller already holds.
    pub fn insert_locked(&self, ds: &mut DayState, new: NewEvent) -> Result<Event, EngineError> {
        let new = normalize(new)?;
        self.commit(ds, new)
    }

    fn commit(&self, ds: &mut DayState, new: NewEvent) -> Result<Event, EngineError> {
        debug_assert_eq!(ds.day, new.start.date(), "event filed under the wrong day");
        if ds.events.len() >= MAX_EVENTS_PER_DAY {
            return Err(EngineError::LimitExceeded("too many events on day"));
        }

        let event = Event {
            id: Ulid::new().to_string(),
            title: new.title,
            start: new.start,
            end: new.end,
            attendees: new.attendees,
            created_by: new.created_by,
        };
        ds.insert_event(event.clone());

        let len = self.len.fetch_add(1, Ordering::AcqRel) + 1;
        metrics::gauge!(crate::observability::EVENTS_STORED).set(len as f64);
        Ok(event)
    }
}

/// Truncate to whole seconds, then validate, so a span that collapses is rejected.
fn normalize(new: NewEvent) -> Result<NewEvent, EngineError> {
    let new = NewEvent {
        start: truncate_seconds(new.start),
        end: truncate_seconds(new.end),
        ..new
    };
    validate_new_event(&new)?;
    Ok(new)
}
