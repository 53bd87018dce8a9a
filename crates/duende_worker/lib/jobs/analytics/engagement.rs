//! Pipelines over the interaction log alone.

use duende_core::time::{reference_hour, reference_iso_weekday};
use duende_core::{Interaction, InteractionKind};
use serde::Serialize;

use crate::pipeline::{pipeline, Group};

/// Step counts of the discovery funnel. Every step is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionFunnel {
    pub near_me_search: u64,
    pub event_view: u64,
    pub plan_night_request: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayCount {
    /// ISO weekday, 1 = Monday.
    pub day_of_week: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyViews {
    /// UTC calendar day, `YYYY-MM-DD`.
    pub date: String,
    pub views: u64,
}

pub fn conversion_funnel(interactions: Vec<Interaction>) -> ConversionFunnel {
    let groups = pipeline::<Interaction>()
        .filter(|interaction| InteractionKind::FUNNEL.contains(&interaction.kind))
        .group_count(|interaction| interaction.kind)
        .run(interactions);

    groups
        .into_iter()
        .fold(ConversionFunnel::default(), |mut funnel, Group { key, value }| {
            match key {
                InteractionKind::NearMeSearch => funnel.near_me_search = value,
                InteractionKind::EventView => funnel.event_view = value,
                InteractionKind::PlanNightRequest => funnel.plan_night_request = value,
                InteractionKind::Other => {}
            }
            funnel
        })
}

/// Interactions per local hour of day, ascending. Hours without traffic are omitted.
pub fn peak_hours(interactions: Vec<Interaction>) -> Vec<HourCount> {
    pipeline::<Interaction>()
        .group_count(|interaction| reference_hour(interaction.created_at()))
        .sort_by(|a, b| a.key.cmp(&b.key))
        .project(|group| HourCount {
            hour: group.key,
            count: group.value,
        })
        .run(interactions)
}

/// Interactions per local ISO weekday, ascending. Days without traffic are omitted.
pub fn peak_weekdays(interactions: Vec<Interaction>) -> Vec<WeekdayCount> {
    pipeline::<Interaction>()
        .group_count(|interaction| reference_iso_weekday(interaction.created_at()))
        .sort_by(|a, b| a.key.cmp(&b.key))
        .project(|group| WeekdayCount {
            day_of_week: group.key,
            count: group.value,
        })
        .run(interactions)
}

pub fn views_over_time(interactions: Vec<Interaction>) -> Vec<DailyViews> {
    pipeline::<Interaction>()
        .filter(|interaction| interaction.kind == InteractionKind::EventView)
        .group_count(|interaction| interaction.created_at().date_naive())
        .sort_by(|a, b| a.key.cmp(&b.key))
        .project(|group| DailyViews {
            date: group.key.format("%Y-%m-%d").to_string(),
            views: group.value,
        })
        .run(interactions)
}

pub fn total_views(interactions: &[Interaction]) -> u64 {
    interactions
        .iter()
        .filter(|interaction| interaction.kind == InteractionKind::EventView)
        .count() as u64
}
