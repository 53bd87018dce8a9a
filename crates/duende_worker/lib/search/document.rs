use chrono::NaiveDate;
use duende_core::{ContentStatus, Event};
use serde::{Deserialize, Serialize};

/// Denormalized projection of one event as stored in the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    /// Hex form of the event id; the index primary key.
    pub id: String,
    pub name: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub venue: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub slug: Option<String>,
    pub image_url: Option<String>,
    pub featured: bool,
    pub content_status: ContentStatus,
}

impl From<&Event> for SearchDocument {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.to_string(),
            name: event.name.clone(),
            artist: event.artist.clone(),
            description: event.description.clone(),
            city: event.city.clone(),
            country: event.country.clone(),
            venue: event.venue.clone(),
            date: event.date,
            time: event.time.clone(),
            slug: event.slug.clone(),
            image_url: event.image_url.clone(),
            featured: event.featured,
            content_status: event.content_status,
        }
    }
}

/// Index-level settings declared before every upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    pub filterable_attributes: Vec<String>,
    pub sortable_attributes: Vec<String>,
    pub searchable_attributes: Vec<String>,
}

fn owned(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|field| field.to_string()).collect()
}

impl IndexSettings {
    /// Settings of the public events index.
    pub fn events() -> Self {
        Self {
            filterable_attributes: owned(&["city", "country", "artist"]),
            sortable_attributes: owned(&["date"]),
            searchable_attributes: owned(&["name", "artist", "description", "city", "venue"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{IndexSettings, SearchDocument};
    use chrono::NaiveDate;
    use duende_core::{ContentStatus, Event, RecordId};
    use serde_json::json;

    #[test]
    fn document_serializes_with_string_id_and_camel_case_keys() {
        let event = Event {
            id: "65a4d2c0000000000000abcd".parse::<RecordId>().unwrap(),
            name: Some("Noche flamenca".to_string()),
            artist: Some("Camaron".to_string()),
            description: None,
            time: Some("21:00".to_string()),
            venue: Some("Tablao".to_string()),
            city: Some("Sevilla".to_string()),
            country: Some("Spain".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 6, 10),
            slug: Some("noche-flamenca".to_string()),
            image_url: Some("https://img/1.jpg".to_string()),
            content_status: ContentStatus::Published,
            featured: true,
            created_at: None,
        };

        let value = serde_json::to_value(SearchDocument::from(&event)).unwrap();
        assert_eq!(value["id"], json!("65a4d2c0000000000000abcd"));
        assert_eq!(value["imageUrl"], json!("https://img/1.jpg"));
        assert_eq!(value["contentStatus"], json!("published"));
        assert_eq!(value["date"], json!("2025-06-10"));
        assert!(value.get("createdAt").is_none());
    }

    #[test]
    fn events_settings_use_backend_field_names() {
        let value = serde_json::to_value(IndexSettings::events()).unwrap();
        assert_eq!(value["filterableAttributes"], json!(["city", "country", "artist"]));
        assert_eq!(value["sortableAttributes"], json!(["date"]));
        assert_eq!(
            value["searchableAttributes"],
            json!(["name", "artist", "description", "city", "venue"])
        );
    }
}
