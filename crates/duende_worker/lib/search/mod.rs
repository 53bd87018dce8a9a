//! Search backend seam: settings, batch upserts and pollable tasks.

mod document;
mod error;
pub mod meili;
pub mod memory;

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;

pub use document::{IndexSettings, SearchDocument};
pub use error::SearchIndexError;
pub use meili::MeiliSearchIndex;
pub use memory::{MemorySearchIndex, TaskScript};

/// Handle to an asynchronous operation accepted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaskHandle {
    pub uid: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed { message: String },
    Canceled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Enqueued | Self::Processing)
    }
}

/// One named index in a search backend.
pub trait SearchIndex: Send + Sync {
    /// Declares index settings. Declaring identical settings again is harmless.
    fn update_settings<'a>(
        &'a self,
        settings: &'a IndexSettings,
    ) -> BoxFuture<'a, Result<TaskHandle, SearchIndexError>>;

    /// Submits one upsert batch keyed by `SearchDocument::id`.
    fn upsert_documents<'a>(
        &'a self,
        documents: &'a [SearchDocument],
    ) -> BoxFuture<'a, Result<TaskHandle, SearchIndexError>>;

    fn task_status(&self, task: TaskHandle) -> BoxFuture<'_, Result<TaskStatus, SearchIndexError>>;
}

impl<T> SearchIndex for Arc<T>
where
    T: SearchIndex + ?Sized,
{
    fn update_settings<'a>(
        &'a self,
        settings: &'a IndexSettings,
    ) -> BoxFuture<'a, Result<TaskHandle, SearchIndexError>> {
        (**self).update_settings(settings)
    }

    fn upsert_documents<'a>(
        &'a self,
        documents: &'a [SearchDocument],
    ) -> BoxFuture<'a, Result<TaskHandle, SearchIndexError>> {
        (**self).upsert_documents(documents)
    }

    fn task_status(&self, task: TaskHandle) -> BoxFuture<'_, Result<TaskStatus, SearchIndexError>> {
        (**self).task_status(task)
    }
}
