use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;
use thiserror::Error;

use super::schema::{artists, event_metrics, events, interactions};
use crate::{
    Artist, ContentStatus, Event, EventMetrics, Interaction, InteractionKind, RecordId,
    RecordIdError, UnknownContentStatus,
};

/// Why a stored row could not become a domain record.
///
/// Rows that fail to decode are excluded from a snapshot rather than failing the read.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowDecodeError {
    #[error("invalid record id `{raw}`: {source}")]
    Id {
        raw: String,
        #[source]
        source: RecordIdError,
    },
    #[error(transparent)]
    ContentStatus(#[from] UnknownContentStatus),
    #[error("interaction details must be a JSON object, got {0}")]
    Details(&'static str),
}

fn parse_id(raw: String) -> Result<RecordId, RowDecodeError> {
    raw.parse::<RecordId>()
        .map_err(|source| RowDecodeError::Id { raw, source })
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = interactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InteractionRow {
    pub id: String,
    pub kind: String,
    pub session_id: String,
    pub details: Value,
}

impl TryFrom<InteractionRow> for Interaction {
    type Error = RowDecodeError;

    fn try_from(row: InteractionRow) -> Result<Self, Self::Error> {
        let details = match row.details {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            Value::Bool(_) => return Err(RowDecodeError::Details("a boolean")),
            Value::Number(_) => return Err(RowDecodeError::Details("a number")),
            Value::String(_) => return Err(RowDecodeError::Details("a string")),
            Value::Array(_) => return Err(RowDecodeError::Details("an array")),
        };

        Ok(Self {
            id: parse_id(row.id)?,
            kind: InteractionKind::from_stored(&row.kind),
            session_id: row.session_id,
            details,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventRow {
    pub id: String,
    pub name: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub time: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub date: Option<NaiveDate>,
    pub slug: Option<String>,
    pub image_url: Option<String>,
    pub content_status: String,
    pub featured: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<EventRow> for Event {
    type Error = RowDecodeError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(row.id)?,
            name: row.name,
            artist: row.artist,
            description: row.description,
            time: row.time,
            venue: row.venue,
            city: row.city,
            country: row.country,
            date: row.date,
            slug: row.slug,
            image_url: row.image_url,
            content_status: row.content_status.parse::<ContentStatus>()?,
            featured: row.featured,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = event_metrics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventMetricsRow {
    pub event_id: String,
    pub artist: Option<String>,
    pub city: Option<String>,
    pub venue: Option<String>,
    pub event_date: Option<NaiveDate>,
}

impl TryFrom<EventMetricsRow> for EventMetrics {
    type Error = RowDecodeError;

    fn try_from(row: EventMetricsRow) -> Result<Self, Self::Error> {
        Ok(Self {
            event_id: parse_id(row.event_id)?,
            artist: row.artist,
            city: row.city,
            venue: row.venue,
            event_date: row.event_date,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = artists)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ArtistRow {
    pub id: i64,
    pub name: String,
    pub event_count: i64,
}

impl From<ArtistRow> for Artist {
    fn from(row: ArtistRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            event_count: row.event_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EventRow, InteractionRow, RowDecodeError};
    use crate::{ContentStatus, Event, Interaction, InteractionKind};
    use serde_json::json;

    fn event_row(id: &str, status: &str) -> EventRow {
        EventRow {
            id: id.to_string(),
            name: Some("Festival".to_string()),
            artist: Some("Paco".to_string()),
            description: None,
            time: None,
            venue: None,
            city: Some("Cadiz".to_string()),
            country: None,
            date: None,
            slug: None,
            image_url: None,
            content_status: status.to_string(),
            featured: true,
            created_at: None,
        }
    }

    #[test]
    fn event_row_decodes_status_and_id() {
        let event = Event::try_from(event_row("65a4d2c0000000000000abcd", "published"))
            .expect("row should decode");
        assert_eq!(event.content_status, ContentStatus::Published);
        assert_eq!(event.id.to_string(), "65a4d2c0000000000000abcd");
    }

    #[test]
    fn event_row_rejects_unknown_status_and_bad_id() {
        assert!(matches!(
            Event::try_from(event_row("65a4d2c0000000000000abcd", "draft")),
            Err(RowDecodeError::ContentStatus(_))
        ));
        assert!(matches!(
            Event::try_from(event_row("E1", "published")),
            Err(RowDecodeError::Id { .. })
        ));
    }

    #[test]
    fn interaction_row_accepts_null_details_and_rejects_scalars() {
        let row = InteractionRow {
            id: "65a4d2c0000000000000abcd".to_string(),
            kind: "nearMeSearch".to_string(),
            session_id: "s".to_string(),
            details: serde_json::Value::Null,
        };
        let interaction = Interaction::try_from(row.clone()).expect("null details decode");
        assert_eq!(interaction.kind, InteractionKind::NearMeSearch);
        assert!(interaction.details.is_empty());

        let scalar = InteractionRow {
            details: json!("eventId"),
            ..row
        };
        assert_eq!(
            Interaction::try_from(scalar),
            Err(RowDecodeError::Details("a string"))
        );
    }
}
