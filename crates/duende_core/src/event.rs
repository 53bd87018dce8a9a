use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{non_empty, RecordId};

/// Lifecycle of an event inside the content pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Pending,
    PendingEnrichment,
    EnrichmentFailed,
    ContentReady,
    Publishing,
    Published,
    PublishingFailed,
    Archived,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown content status `{0}`")]
pub struct UnknownContentStatus(pub String);

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingEnrichment => "pending_enrichment",
            Self::EnrichmentFailed => "enrichment_failed",
            Self::ContentReady => "content_ready",
            Self::Publishing => "publishing",
            Self::Published => "published",
            Self::PublishingFailed => "publishing_failed",
            Self::Archived => "archived",
        }
    }

    /// Statuses whose events may appear in search.
    pub fn is_indexable(self) -> bool {
        matches!(self, Self::ContentReady | Self::Published | Self::Archived)
    }
}

impl FromStr for ContentStatus {
    type Err = UnknownContentStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "pending" => Ok(Self::Pending),
            "pending_enrichment" => Ok(Self::PendingEnrichment),
            "enrichment_failed" => Ok(Self::EnrichmentFailed),
            "content_ready" => Ok(Self::ContentReady),
            "publishing" => Ok(Self::Publishing),
            "published" => Ok(Self::Published),
            "publishing_failed" => Ok(Self::PublishingFailed),
            "archived" => Ok(Self::Archived),
            other => Err(UnknownContentStatus(other.to_string())),
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical catalog entry for one live show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: RecordId,
    pub name: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub time: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    /// Calendar day of the show.
    pub date: Option<NaiveDate>,
    pub slug: Option<String>,
    pub image_url: Option<String>,
    pub content_status: ContentStatus,
    pub featured: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn is_upcoming(&self, today: NaiveDate) -> bool {
        self.date.is_some_and(|date| date >= today)
    }

    /// Search eligibility: indexable status and a show date of today or later.
    pub fn is_search_eligible(&self, today: NaiveDate) -> bool {
        self.content_status.is_indexable() && self.is_upcoming(today)
    }

    /// Whether the event counts towards the public "upcoming events" total.
    pub fn is_listable(&self, today: NaiveDate) -> bool {
        self.is_upcoming(today)
            && [&self.name, &self.artist, &self.time, &self.venue]
                .into_iter()
                .all(|field| non_empty(field.clone()).is_some())
    }
}

/// Per-event metrics record kept alongside the interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetrics {
    pub event_id: RecordId,
    pub artist: Option<String>,
    pub city: Option<String>,
    pub venue: Option<String>,
    pub event_date: Option<NaiveDate>,
}

/// Artist row carrying the denormalized event counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub event_count: i64,
}

#[cfg(test)]
mod tests {
    use super::{ContentStatus, Event};
    use crate::RecordId;
    use chrono::NaiveDate;

    fn event(status: ContentStatus, date: Option<NaiveDate>) -> Event {
        Event {
            id: "65a4d2c0000000000000abcd".parse::<RecordId>().unwrap(),
            name: Some("Noche flamenca".to_string()),
            artist: Some("Camaron".to_string()),
            description: None,
            time: Some("21:00".to_string()),
            venue: Some("Tablao".to_string()),
            city: Some("Sevilla".to_string()),
            country: Some("Spain".to_string()),
            date,
            slug: None,
            image_url: None,
            content_status: status,
            featured: false,
            created_at: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn content_status_parses_every_stored_value() {
        for status in [
            ContentStatus::Pending,
            ContentStatus::PendingEnrichment,
            ContentStatus::EnrichmentFailed,
            ContentStatus::ContentReady,
            ContentStatus::Publishing,
            ContentStatus::Published,
            ContentStatus::PublishingFailed,
            ContentStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<ContentStatus>(), Ok(status));
        }
        assert!("draft".parse::<ContentStatus>().is_err());
    }

    #[test]
    fn eligibility_requires_indexable_status_and_upcoming_date() {
        let today = day(10);
        assert!(event(ContentStatus::Published, Some(day(10))).is_search_eligible(today));
        assert!(event(ContentStatus::ContentReady, Some(day(11))).is_search_eligible(today));
        assert!(event(ContentStatus::Archived, Some(day(12))).is_search_eligible(today));
        assert!(!event(ContentStatus::Published, Some(day(9))).is_search_eligible(today));
        assert!(!event(ContentStatus::Pending, Some(day(11))).is_search_eligible(today));
        assert!(!event(ContentStatus::Publishing, Some(day(11))).is_search_eligible(today));
        assert!(!event(ContentStatus::Published, None).is_search_eligible(today));
    }

    #[test]
    fn listable_requires_all_display_fields() {
        let today = day(10);
        let mut listed = event(ContentStatus::Pending, Some(day(10)));
        assert!(listed.is_listable(today));

        listed.time = Some("N/A".to_string());
        assert!(!listed.is_listable(today));

        let mut no_venue = event(ContentStatus::Pending, Some(day(10)));
        no_venue.venue = Some(String::new());
        assert!(!no_venue.is_listable(today));

        assert!(!event(ContentStatus::Pending, Some(day(9))).is_listable(today));
    }
}
