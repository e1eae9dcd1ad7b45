pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_ATTENDEES: usize = 64;
/// RFC 5321 upper bound on an address path.
pub const MAX_ATTENDEE_LEN: usize = 320;
pub const MAX_CREATED_BY_LEN: usize = 64;
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;
pub const MAX_EVENTS_PER_DAY: usize = 10_000;
