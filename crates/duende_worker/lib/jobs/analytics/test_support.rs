use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use duende_core::{ContentStatus, Event, EventMetrics, Interaction, InteractionKind, RecordId};
use serde_json::{json, Map, Value};

pub(crate) fn event_id(n: u64) -> RecordId {
    RecordId::from_timestamp(at(2024, 1, 1, 0, 0), n)
}

pub(crate) fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid test instant")
}

pub(crate) fn interaction(
    seq: u64,
    kind: InteractionKind,
    created_at: DateTime<Utc>,
    details: Value,
) -> Interaction {
    Interaction {
        id: RecordId::from_timestamp(created_at, seq),
        kind,
        session_id: format!("session-{seq}"),
        details: details.as_object().cloned().unwrap_or_else(Map::new),
    }
}

pub(crate) fn view_of(seq: u64, target: RecordId) -> Interaction {
    interaction(
        seq,
        InteractionKind::EventView,
        at(2024, 5, 1, 12, 0),
        json!({ "eventId": target.to_string() }),
    )
}

pub(crate) fn event(n: u64, artist: &str, city: Option<&str>) -> Event {
    Event {
        id: event_id(n),
        name: Some(format!("Show {n}")),
        artist: Some(artist.to_string()),
        description: None,
        time: Some("21:00".to_string()),
        venue: Some("Tablao".to_string()),
        city: city.map(str::to_string),
        country: Some("Spain".to_string()),
        date: NaiveDate::from_ymd_opt(2024, 6, 1),
        slug: None,
        image_url: Some(format!("https://img/{n}.jpg")),
        content_status: ContentStatus::Published,
        featured: false,
        created_at: None,
    }
}

pub(crate) fn metrics_for(n: u64, artist: Option<&str>) -> EventMetrics {
    EventMetrics {
        event_id: event_id(n),
        artist: artist.map(str::to_string),
        city: None,
        venue: None,
        event_date: None,
    }
}
