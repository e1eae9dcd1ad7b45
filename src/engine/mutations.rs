use chrono::NaiveDate;
use tracing::info;

use crate::model::*;

use super::availability::find_free_slot;
use super::validate::{validate_details, validate_duration};
use super::{Engine, EngineError};

impl Engine {
    /// Store an event at caller-chosen times. Overlap with existing events is allowed.
    pub async fn create_event(&self, new: NewEvent) -> Result<Event, EngineError> {
        let event = self.store.insert(new).await?;
        info!("created event {} [{}, {})", event.id, event.start, event.end);
        Ok(event)
    }

    /// Find the earliest free slot on `day` and book it, as one step.
    ///
    /// The day's write lock is held from the slot search through the insert, so
    /// concurrent bookings for the same day serialize and never share a gap.
    pub async fn book_slot(
        &self,
        day: NaiveDate,
        duration_minutes: i64,
        title: String,
        attendees: Vec<String>,
        created_by: String,
    ) -> Result<Event, EngineError> {
        let duration = validate_duration(duration_minutes)?;
        validate_details(&title, &attendees, &created_by)?;
        let window = self.hours.window(day);
        let no_slot = EngineError::NoSlotAvailable {
            day,
            duration_minutes,
        };

        // A day with no bucket is empty; don't create one just to fail.
        if self.store.get_day(day).is_none() && find_free_slot(&[], &window, duration).is_none() {
            return Err(no_slot);
        }

        let ds = self.store.day(day);
        let mut guard = ds.write().await;

        let slot = find_free_slot(&guard.spans(), &window, duration).ok_or(no_slot)?;

        let new = NewEvent {
            title,
            start: slot.start,
            end: slot.end,
            attendees,
            created_by,
        };
        let event = self.store.insert_locked(&mut guard, new)?;
        drop(guard);

        info!("booked event {} [{}, {})", event.id, event.start, event.end);
        Ok(event)
    }
}
