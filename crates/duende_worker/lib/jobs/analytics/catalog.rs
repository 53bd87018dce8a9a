use chrono::NaiveDate;
use duende_core::Event;

/// Upcoming events complete enough to be listed publicly.
pub fn total_events(events: &[Event], today: NaiveDate) -> u64 {
    events.iter().filter(|event| event.is_listable(today)).count() as u64
}
