mod availability;
mod error;
mod mutations;
mod queries;
mod store;
mod validate;

pub use availability::find_free_slot;
pub use error::EngineError;
pub use store::EventStore;
pub use validate::{parse_day_arg, parse_timestamp_arg};

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::model::*;

pub type SharedDayState = Arc<RwLock<DayState>>;

/// Single-calendar scheduler over an [`EventStore`].
///
/// Constructed once at startup and shared by reference; there is no global
/// event list. Booking holds the target day's write lock across slot search
/// and insert, so two bookers can never both claim the same gap.
pub struct Engine {
    pub store: EventStore,
    hours: WorkingHours,
}

impl Engine {
    pub fn new(hours: WorkingHours) -> Self {
        Self {
            store: EventStore::new(),
            hours,
        }
    }

    pub fn working_hours(&self) -> WorkingHours {
        self.hours
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(WorkingHours::default())
    }
}
