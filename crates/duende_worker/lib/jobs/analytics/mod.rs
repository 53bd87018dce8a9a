//! Read-only metric pipelines over the interaction log.
//!
//! Every pipeline loads its own snapshot and computes in memory, so any subset may run
//! concurrently. Pure computations live in the submodules; [`AnalyticsService`] wires them to
//! the stores and records run metrics.

mod catalog;
mod engagement;
mod popularity;
#[cfg(test)]
pub(crate) mod test_support;

use chrono::{NaiveDate, Utc};
use duende_core::time::today_in_reference_zone;
use duende_core::{Event, Interaction, InteractionKind};
use serde::Serialize;
use tracing::{debug, info};

use crate::jobs::JobError;
use crate::server::monitoring::{PipelineLabels, SourceLabels, JOB_METRICS};
use crate::store::{EventCatalog, InteractionLog};

pub use catalog::total_events;
pub use engagement::{
    conversion_funnel, peak_hours, peak_weekdays, total_views, views_over_time, ConversionFunnel,
    DailyViews, HourCount, WeekdayCount,
};
pub use popularity::{
    city_heatmap, top_artists, top_events, ArtistViews, CityViews, TopEvent, TOP_ARTISTS_LIMIT,
    TOP_EVENTS_LIMIT,
};

const EVENT_VIEWS: &[InteractionKind] = &[InteractionKind::EventView];

/// Selectable metric pipelines; `all` runs every one and returns a combined summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum MetricPipeline {
    All,
    CityHeatmap,
    ConversionFunnel,
    PeakHours,
    PeakWeekdays,
    TopArtists,
    TopEvents,
    ViewsOverTime,
    TotalViews,
    TotalEvents,
}

impl MetricPipeline {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::CityHeatmap => "city-heatmap",
            Self::ConversionFunnel => "conversion-funnel",
            Self::PeakHours => "peak-hours",
            Self::PeakWeekdays => "peak-weekdays",
            Self::TopArtists => "top-artists",
            Self::TopEvents => "top-events",
            Self::ViewsOverTime => "views-over-time",
            Self::TotalViews => "total-views",
            Self::TotalEvents => "total-events",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalViews {
    pub total_views: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalEvents {
    pub total_events: u64,
}

/// Every metric computed in one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub city_heatmap: Vec<CityViews>,
    pub conversion_funnel: ConversionFunnel,
    pub peak_hours: Vec<HourCount>,
    pub peak_weekdays: Vec<WeekdayCount>,
    pub top_artists: Vec<ArtistViews>,
    pub top_events: Vec<TopEvent>,
    pub views_over_time: Vec<DailyViews>,
    pub total_views: u64,
    pub total_events: u64,
}

/// Result of one pipeline selection, serialized exactly as the dashboards consume it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetricOutput {
    CityHeatmap(Vec<CityViews>),
    ConversionFunnel(ConversionFunnel),
    PeakHours(Vec<HourCount>),
    PeakWeekdays(Vec<WeekdayCount>),
    TopArtists(Vec<ArtistViews>),
    TopEvents(Vec<TopEvent>),
    ViewsOverTime(Vec<DailyViews>),
    TotalViews(TotalViews),
    TotalEvents(TotalEvents),
    Summary(Box<AnalyticsSummary>),
}

pub struct AnalyticsService<L, C> {
    log: L,
    catalog: C,
    today: Option<NaiveDate>,
}

fn record_run(pipeline: MetricPipeline, rows: usize) {
    if let Some(metrics) = JOB_METRICS.get() {
        metrics
            .pipeline_runs
            .get_or_create(&PipelineLabels {
                pipeline: pipeline.as_str(),
            })
            .inc();
    }
    info!(
        event = "metric_pipeline_completed",
        pipeline = pipeline.as_str(),
        rows,
        "metric pipeline completed"
    );
}

fn record_malformed(source: &'static str, malformed: usize) {
    if malformed == 0 {
        return;
    }
    if let Some(metrics) = JOB_METRICS.get() {
        metrics
            .malformed_records
            .get_or_create(&SourceLabels { source })
            .inc_by(malformed as u64);
    }
    debug!(
        event = "malformed_records_excluded",
        source,
        malformed,
        "excluded malformed records from snapshot"
    );
}

impl<L, C> AnalyticsService<L, C>
where
    L: InteractionLog,
    C: EventCatalog,
{
    pub fn new(log: L, catalog: C) -> Self {
        Self {
            log,
            catalog,
            today: None,
        }
    }

    /// Pins "today" instead of deriving it from the wall clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| today_in_reference_zone(Utc::now()))
    }

    async fn interactions(
        &self,
        kinds: Option<&[InteractionKind]>,
    ) -> Result<Vec<Interaction>, JobError> {
        let snapshot = self.log.load_interactions(kinds).await?;
        record_malformed("interactions", snapshot.malformed);
        Ok(snapshot.records)
    }

    async fn events(&self) -> Result<Vec<Event>, JobError> {
        let snapshot = self.catalog.load_events().await?;
        record_malformed("events", snapshot.malformed);
        Ok(snapshot.records)
    }

    pub async fn city_heatmap(&self) -> Result<Vec<CityViews>, JobError> {
        let (interactions, events) =
            futures::try_join!(self.interactions(Some(EVENT_VIEWS)), self.events())?;
        let rows = city_heatmap(interactions, events);
        record_run(MetricPipeline::CityHeatmap, rows.len());
        Ok(rows)
    }

    pub async fn conversion_funnel(&self) -> Result<ConversionFunnel, JobError> {
        let interactions = self.interactions(Some(&InteractionKind::FUNNEL[..])).await?;
        let funnel = conversion_funnel(interactions);
        record_run(MetricPipeline::ConversionFunnel, 1);
        Ok(funnel)
    }

    pub async fn peak_hours(&self) -> Result<Vec<HourCount>, JobError> {
        let rows = peak_hours(self.interactions(None).await?);
        record_run(MetricPipeline::PeakHours, rows.len());
        Ok(rows)
    }

    pub async fn peak_weekdays(&self) -> Result<Vec<WeekdayCount>, JobError> {
        let rows = peak_weekdays(self.interactions(None).await?);
        record_run(MetricPipeline::PeakWeekdays, rows.len());
        Ok(rows)
    }

    pub async fn top_artists(&self) -> Result<Vec<ArtistViews>, JobError> {
        let event_metrics = async {
            let snapshot = self.log.load_event_metrics().await?;
            record_malformed("event_metrics", snapshot.malformed);
            Ok::<_, JobError>(snapshot.records)
        };
        let (interactions, metrics) =
            futures::try_join!(self.interactions(Some(EVENT_VIEWS)), event_metrics)?;
        let rows = top_artists(interactions, metrics);
        record_run(MetricPipeline::TopArtists, rows.len());
        Ok(rows)
    }

    pub async fn top_events(&self) -> Result<Vec<TopEvent>, JobError> {
        let (interactions, events) =
            futures::try_join!(self.interactions(Some(EVENT_VIEWS)), self.events())?;
        let rows = top_events(interactions, events);
        record_run(MetricPipeline::TopEvents, rows.len());
        Ok(rows)
    }

    pub async fn views_over_time(&self) -> Result<Vec<DailyViews>, JobError> {
        let rows = views_over_time(self.interactions(Some(EVENT_VIEWS)).await?);
        record_run(MetricPipeline::ViewsOverTime, rows.len());
        Ok(rows)
    }

    pub async fn total_views(&self) -> Result<u64, JobError> {
        let total = total_views(&self.interactions(Some(EVENT_VIEWS)).await?);
        record_run(MetricPipeline::TotalViews, 1);
        Ok(total)
    }

    pub async fn total_events(&self) -> Result<u64, JobError> {
        let total = total_events(&self.events().await?, self.today());
        record_run(MetricPipeline::TotalEvents, 1);
        Ok(total)
    }

    /// Runs every pipeline concurrently. Fails as a whole if any pipeline fails.
    pub async fn summary(&self) -> Result<AnalyticsSummary, JobError> {
        let (
            city_heatmap,
            conversion_funnel,
            peak_hours,
            peak_weekdays,
            top_artists,
            top_events,
            views_over_time,
            total_views,
            total_events,
        ) = futures::try_join!(
            self.city_heatmap(),
            self.conversion_funnel(),
            self.peak_hours(),
            self.peak_weekdays(),
            self.top_artists(),
            self.top_events(),
            self.views_over_time(),
            self.total_views(),
            self.total_events(),
        )?;

        Ok(AnalyticsSummary {
            city_heatmap,
            conversion_funnel,
            peak_hours,
            peak_weekdays,
            top_artists,
            top_events,
            views_over_time,
            total_views,
            total_events,
        })
    }

    pub async fn run(&self, pipeline: MetricPipeline) -> Result<MetricOutput, JobError> {
        Ok(match pipeline {
            MetricPipeline::All => MetricOutput::Summary(Box::new(self.summary().await?)),
            MetricPipeline::CityHeatmap => MetricOutput::CityHeatmap(self.city_heatmap().await?),
            MetricPipeline::ConversionFunnel => {
                MetricOutput::ConversionFunnel(self.conversion_funnel().await?)
            }
            MetricPipeline::PeakHours => MetricOutput::PeakHours(self.peak_hours().await?),
            MetricPipeline::PeakWeekdays => {
                MetricOutput::PeakWeekdays(self.peak_weekdays().await?)
            }
            MetricPipeline::TopArtists => MetricOutput::TopArtists(self.top_artists().await?),
            MetricPipeline::TopEvents => MetricOutput::TopEvents(self.top_events().await?),
            MetricPipeline::ViewsOverTime => {
                MetricOutput::ViewsOverTime(self.views_over_time().await?)
            }
            MetricPipeline::TotalViews => MetricOutput::TotalViews(TotalViews {
                total_views: self.total_views().await?,
            }),
            MetricPipeline::TotalEvents => MetricOutput::TotalEvents(TotalEvents {
                total_events: self.total_events().await?,
            }),
        })
    }
}
