use chrono::NaiveDate;

use crate::model::*;

use super::availability::find_free_slot;
use super::validate::validate_duration;
use super::{Engine, EngineError};

impl Engine {
    pub async fn events_for_day(&self, day: NaiveDate) -> Vec<Event> {
        self.store.events_for_day(day).await
    }

    /// Every stored event, ordered by start.
    pub async fn list_events(&self) -> Vec<Event> {
        self.store.all_events().await
    }

    /// Earliest free slot of `duration_minutes` inside the working window of `day`.
    /// `Ok(None)` means the day is too full, not that anything went wrong.
    pub async fn find_free_slot(
        &self,
        day: NaiveDate,
        duration_minutes: i64,
    ) -> Result<Option<TimeSlot>, EngineError> {
        let duration = validate_duration(duration_minutes)?;
        let window = self.hours.window(day);

        let busy = match self.store.get_day(day) {
            Some(ds) => ds.read().await.spans(),
            None => Vec::new(),
        };
        Ok(find_free_slot(&busy, &window, duration))
    }
}
