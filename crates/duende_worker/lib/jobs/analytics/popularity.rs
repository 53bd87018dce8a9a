//! Pipelines joining event views against the catalog or the per-event metrics records.

use chrono::NaiveDate;
use duende_core::{Event, EventMetrics, Interaction, InteractionKind, RecordId};
use serde::Serialize;

use crate::pipeline::{pipeline, Pipeline};

pub const TOP_ARTISTS_LIMIT: usize = 5;
pub const TOP_EVENTS_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityViews {
    pub city: String,
    pub view_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistViews {
    pub artist: String,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEvent {
    pub event_id: String,
    pub view_count: u64,
    pub name: Option<String>,
    pub artist: Option<String>,
    pub image_url: Option<String>,
    pub date: Option<NaiveDate>,
    pub city: Option<String>,
}

/// Keeps stored values as-is; only null and `""` count as missing here.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.is_empty())
}

/// Event ids referenced by well-formed event views, in log order.
fn viewed_event_ids() -> Pipeline<Interaction, RecordId> {
    pipeline::<Interaction>()
        .filter(|interaction| interaction.kind == InteractionKind::EventView)
        .filter_map(|interaction| interaction.event_ref().valid())
}

/// Event views per city, most viewed first.
pub fn city_heatmap(interactions: Vec<Interaction>, events: Vec<Event>) -> Vec<CityViews> {
    viewed_event_ids()
        .join_equality(events, |id| Some(*id), |event: &Event| Some(event.id))
        .filter_map(|(_, event)| present(event.city))
        .group_count(|city| city.clone())
        .sort_by_value_desc()
        .project(|group| CityViews {
            city: group.key,
            view_count: group.value,
        })
        .run(interactions)
}

/// Most viewed artists, resolving each viewed event's artist from its metrics record.
pub fn top_artists(
    interactions: Vec<Interaction>,
    event_metrics: Vec<EventMetrics>,
) -> Vec<ArtistViews> {
    viewed_event_ids()
        .group_count(|id| *id)
        .join_equality(
            event_metrics,
            |group| Some(group.key),
            |metrics: &EventMetrics| Some(metrics.event_id),
        )
        .filter_map(|(group, metrics)| present(metrics.artist).map(|artist| (artist, group.value)))
        .group_sum(|(artist, _)| artist.clone(), |(_, views)| *views)
        .sort_by_value_desc()
        .limit(TOP_ARTISTS_LIMIT)
        .project(|group| ArtistViews {
            artist: group.key,
            views: group.value,
        })
        .run(interactions)
}

/// Most viewed events enriched with display fields. Ranked ids missing from the catalog are
/// dropped after ranking, so fewer than the limit may be returned.
pub fn top_events(interactions: Vec<Interaction>, events: Vec<Event>) -> Vec<TopEvent> {
    viewed_event_ids()
        .group_count(|id| *id)
        .sort_by_value_desc()
        .limit(TOP_EVENTS_LIMIT)
        .join_equality(events, |group| Some(group.key), |event: &Event| Some(event.id))
        .project(|(group, event)| TopEvent {
            event_id: group.key.to_string(),
            view_count: group.value,
            name: event.name,
            artist: event.artist,
            image_url: event.image_url,
            date: event.date,
            city: event.city,
        })
        .run(interactions)
}
