pub mod db;
mod event;
mod interaction;
mod record_id;
pub mod time;

pub use event::{Artist, ContentStatus, Event, EventMetrics, UnknownContentStatus};
pub use interaction::{EventRef, Interaction, InteractionKind};
pub use record_id::{RecordId, RecordIdError};

/// Returns the trimmed value when it carries real content.
///
/// Upstream ingestion writes `""` and the `N/A` placeholder for fields it could not scrape, so
/// both count as missing everywhere a field must be "non-empty".
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "N/A" {
            None
        } else if trimmed.len() == raw.len() {
            Some(raw)
        } else {
            Some(trimmed.to_string())
        }
    })
}
