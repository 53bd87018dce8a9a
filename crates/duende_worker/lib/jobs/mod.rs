pub mod analytics;
mod error;
pub mod ranking;
pub mod search_sync;

pub use analytics::{AnalyticsService, MetricOutput, MetricPipeline};
pub use error::JobError;
pub use ranking::{RankingRecomputation, RankingReport, RankingSummary};
pub use search_sync::{SearchSynchronizer, SyncReport, TaskWait};
