use std::time::Duration;

use futures::future::BoxFuture;
use log::debug;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;

use super::{IndexSettings, SearchDocument, SearchIndex, SearchIndexError, TaskHandle, TaskStatus};

/// Upper bound for any single HTTP call to the search backend.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Meilisearch index reached over its HTTP API.
pub struct MeiliSearchIndex {
    client: reqwest::Client,
    host: String,
    api_key: Option<String>,
    index_uid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskAccepted {
    task_uid: u64,
}

#[derive(Debug, Deserialize)]
struct TaskView {
    status: String,
    error: Option<TaskErrorView>,
}

#[derive(Debug, Deserialize)]
struct TaskErrorView {
    message: String,
}

impl MeiliSearchIndex {
    pub fn new(
        host: &str,
        api_key: Option<String>,
        index_uid: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, SearchIndexError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            api_key,
            index_uid: index_uid.into(),
        })
    }

    pub fn index_uid(&self) -> &str {
        &self.index_uid
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn expect_success(
        response: Response,
        operation: &'static str,
    ) -> Result<Response, SearchIndexError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SearchIndexError::UnexpectedStatus {
            operation,
            status: status.as_u16(),
            body,
        })
    }
}

fn parse_task_status(view: TaskView) -> Result<TaskStatus, SearchIndexError> {
    match view.status.as_str() {
        "enqueued" => Ok(TaskStatus::Enqueued),
        "processing" => Ok(TaskStatus::Processing),
        "succeeded" => Ok(TaskStatus::Succeeded),
        "failed" => Ok(TaskStatus::Failed {
            message: view
                .error
                .map(|error| error.message)
                .unwrap_or_else(|| "no error message reported".to_string()),
        }),
        "canceled" => Ok(TaskStatus::Canceled),
        other => Err(SearchIndexError::Backend(format!(
            "unknown task status `{other}`"
        ))),
    }
}

impl SearchIndex for MeiliSearchIndex {
    fn update_settings<'a>(
        &'a self,
        settings: &'a IndexSettings,
    ) -> BoxFuture<'a, Result<TaskHandle, SearchIndexError>> {
        Box::pin(async move {
            let url = format!("{}/indexes/{}/settings", self.host, self.index_uid);
            let response = self
                .authorized(self.client.patch(&url).json(settings))
                .send()
                .await?;
            let accepted: TaskAccepted = Self::expect_success(response, "update settings")
                .await?
                .json()
                .await?;
            debug!("settings task {} enqueued for {}", accepted.task_uid, self.index_uid);
            Ok(TaskHandle {
                uid: accepted.task_uid,
            })
        })
    }

    fn upsert_documents<'a>(
        &'a self,
        documents: &'a [SearchDocument],
    ) -> BoxFuture<'a, Result<TaskHandle, SearchIndexError>> {
        Box::pin(async move {
            let url = format!("{}/indexes/{}/documents", self.host, self.index_uid);
            let response = self
                .authorized(
                    self.client
                        .post(&url)
                        .query(&[("primaryKey", "id")])
                        .json(documents),
                )
                .send()
                .await?;
            let accepted: TaskAccepted = Self::expect_success(response, "add documents")
                .await?
                .json()
                .await?;
            debug!(
                "document task {} enqueued with {} documents",
                accepted.task_uid,
                documents.len()
            );
            Ok(TaskHandle {
                uid: accepted.task_uid,
            })
        })
    }

    fn task_status(&self, task: TaskHandle) -> BoxFuture<'_, Result<TaskStatus, SearchIndexError>> {
        Box::pin(async move {
            let url = format!("{}/tasks/{}", self.host, task.uid);
            let response = self.authorized(self.client.get(&url)).send().await?;
            let view: TaskView = Self::expect_success(response, "get task")
                .await?
                .json()
                .await?;
            parse_task_status(view)
        })
    }
}
