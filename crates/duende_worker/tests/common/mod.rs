#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use duende_core::{
    Artist, ContentStatus, Event, EventMetrics, Interaction, InteractionKind, RecordId,
};
use serde_json::{json, Value};

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid test instant")
}

pub fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub fn event_id(n: u64) -> RecordId {
    RecordId::from_timestamp(at(2024, 1, 1, 0), n)
}

pub fn interaction(seq: u64, kind: InteractionKind, details: Value) -> Interaction {
    Interaction {
        id: RecordId::from_timestamp(at(2024, 5, 1, 10), seq),
        kind,
        session_id: format!("session-{seq}"),
        details: details.as_object().cloned().unwrap_or_default(),
    }
}

pub fn view(seq: u64, target: u64) -> Interaction {
    interaction(
        seq,
        InteractionKind::EventView,
        json!({ "eventId": event_id(target).to_string() }),
    )
}

pub fn event(n: u64, artist: &str, city: &str, status: ContentStatus, date: NaiveDate) -> Event {
    Event {
        id: event_id(n),
        name: Some(format!("Show {n}")),
        artist: Some(artist.to_string()),
        description: Some("Cante jondo".to_string()),
        time: Some("21:30".to_string()),
        venue: Some("Peña".to_string()),
        city: Some(city.to_string()),
        country: Some("Spain".to_string()),
        date: Some(date),
        slug: Some(format!("show-{n}")),
        image_url: Some(format!("https://img/{n}.jpg")),
        content_status: status,
        featured: false,
        created_at: None,
    }
}

pub fn metrics(n: u64, artist: &str) -> EventMetrics {
    EventMetrics {
        event_id: event_id(n),
        artist: Some(artist.to_string()),
        city: None,
        venue: None,
        event_date: None,
    }
}

pub fn artist(id: i64, name: &str, event_count: i64) -> Artist {
    Artist {
        id,
        name: name.to_string(),
        event_count,
    }
}
