//! Projects publishable catalog events into the search index.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use duende_core::time::today_in_reference_zone;
use duende_core::Event;
use serde::Serialize;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info};

use crate::jobs::JobError;
use crate::pipeline::pipeline;
use crate::search::{
    IndexSettings, SearchDocument, SearchIndex, SearchIndexError, TaskHandle, TaskStatus,
};
use crate::server::monitoring::JOB_METRICS;
use crate::store::EventCatalog;

pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskWait {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for TaskWait {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TASK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub documents_indexed: usize,
    /// Upsert task, absent when nothing was eligible.
    pub task_uid: Option<u64>,
    pub events_skipped: usize,
}

pub struct SearchSynchronizer<C, S> {
    catalog: C,
    index: S,
    wait: TaskWait,
}

/// Eligible events shaped as documents, in catalog order.
pub fn select_documents(events: Vec<Event>, today: NaiveDate) -> Vec<SearchDocument> {
    pipeline::<Event>()
        .filter(move |event| event.is_search_eligible(today))
        .project(|event| SearchDocument::from(&event))
        .run(events)
}

impl<C, S> SearchSynchronizer<C, S>
where
    C: EventCatalog,
    S: SearchIndex,
{
    pub fn new(catalog: C, index: S, wait: TaskWait) -> Self {
        Self {
            catalog,
            index,
            wait,
        }
    }

    pub async fn sync(&self) -> Result<SyncReport, JobError> {
        self.sync_as_of(today_in_reference_zone(Utc::now())).await
    }

    /// Syncs with `today` as the cut-off for upcoming events.
    pub async fn sync_as_of(&self, today: NaiveDate) -> Result<SyncReport, JobError> {
        let snapshot = self.catalog.load_events().await?;
        let total = snapshot.records.len();
        let documents = select_documents(snapshot.records, today);
        let events_skipped = total - documents.len();

        if documents.is_empty() {
            info!(
                event = "search_sync_nothing_eligible",
                events_skipped,
                "no eligible events; index left untouched"
            );
            return Ok(SyncReport {
                documents_indexed: 0,
                task_uid: None,
                events_skipped,
            });
        }

        let settings_task = self.index.update_settings(&IndexSettings::events()).await?;
        debug!(
            event = "search_settings_declared",
            task_uid = settings_task.uid,
            "index settings declared"
        );

        let task = self.index.upsert_documents(&documents).await?;
        info!(
            event = "search_upsert_submitted",
            task_uid = task.uid,
            documents = documents.len(),
            "submitted document batch"
        );
        self.wait_for_task(task).await?;

        if let Some(metrics) = JOB_METRICS.get() {
            metrics.documents_indexed.inc_by(documents.len() as u64);
        }
        info!(
            event = "search_sync_completed",
            task_uid = task.uid,
            documents_indexed = documents.len(),
            events_skipped,
            "search index synchronized"
        );
        Ok(SyncReport {
            documents_indexed: documents.len(),
            task_uid: Some(task.uid),
            events_skipped,
        })
    }

    /// Polls `task` until the backend reports a terminal status or the timeout elapses.
    ///
    /// The deadline also bounds each status call, so a backend that never answers still
    /// ends in `IndexTimeout`.
    async fn wait_for_task(&self, task: TaskHandle) -> Result<(), JobError> {
        let started = Instant::now();
        loop {
            let remaining = self.wait.timeout.saturating_sub(started.elapsed());
            let status = match timeout(remaining, self.index.task_status(task)).await {
                Ok(status) => status?,
                Err(_) => {
                    return Err(JobError::IndexTimeout {
                        task_uid: task.uid,
                        waited: started.elapsed(),
                    })
                }
            };
            match status {
                TaskStatus::Succeeded => return Ok(()),
                TaskStatus::Failed { message } => {
                    return Err(SearchIndexError::TaskFailed {
                        task_uid: task.uid,
                        message,
                    }
                    .into())
                }
                TaskStatus::Canceled => {
                    return Err(SearchIndexError::TaskFailed {
                        task_uid: task.uid,
                        message: "task was canceled".to_string(),
                    }
                    .into())
                }
                TaskStatus::Enqueued | TaskStatus::Processing => {}
            }

            let waited = started.elapsed();
            if waited >= self.wait.timeout {
                return Err(JobError::IndexTimeout {
                    task_uid: task.uid,
                    waited,
                });
            }
            sleep(self.wait.poll_interval.min(self.wait.timeout.saturating_sub(waited))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::select_documents;
    use crate::jobs::analytics::test_support::event;
    use chrono::NaiveDate;
    use duende_core::ContentStatus;

    #[test]
    fn selection_keeps_indexable_upcoming_events_in_order() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut draft = event(2, "Paco", None);
        draft.content_status = ContentStatus::PendingEnrichment;
        let mut ready = event(3, "Rocio", None);
        ready.content_status = ContentStatus::ContentReady;
        let mut past = event(4, "Paco", None);
        past.date = NaiveDate::from_ymd_opt(2024, 5, 1);

        let documents = select_documents(
            vec![event(1, "Camaron", None), draft, ready, past],
            today,
        );

        let names: Vec<Option<&str>> = documents
            .iter()
            .map(|document| document.artist.as_deref())
            .collect();
        assert_eq!(names, vec![Some("Camaron"), Some("Rocio")]);
    }
}
