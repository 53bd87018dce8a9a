use std::time::Duration;

use thiserror::Error;

use crate::search::SearchIndexError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[from] StoreError),

    #[error("search task {task_uid} not applied within {waited:?}")]
    IndexTimeout { task_uid: u64, waited: Duration },

    #[error("search index rejected the update: {0}")]
    IndexRejected(#[from] SearchIndexError),

    #[error("ranking rebuild failed; artist counts stay zeroed until the next successful run")]
    RankingRebuild(#[source] StoreError),
}

impl JobError {
    /// Whether re-running the job later may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::IndexTimeout { .. } | Self::SourceUnavailable(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::IndexTimeout { .. } => "index_timeout",
            Self::IndexRejected(_) => "index_rejected",
            Self::RankingRebuild(_) => "ranking_rebuild",
        }
    }
}
