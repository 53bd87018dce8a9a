use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;

use super::{IndexSettings, SearchDocument, SearchIndex, SearchIndexError, TaskHandle, TaskStatus};

/// How scripted upsert tasks progress when polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskScript {
    /// Reports `processing` for this many polls, then succeeds and applies the batch.
    SucceedAfter(u32),
    /// Never leaves `processing`.
    NeverComplete,
    /// Status calls never return, like a backend that stopped answering.
    Stall,
    /// Fails on the first poll with this message; nothing is applied.
    Fail(String),
    /// The upsert call itself is refused.
    Refuse(String),
}

/// In-process search index with scriptable task outcomes.
pub struct MemorySearchIndex {
    state: Mutex<IndexState>,
}

struct IndexState {
    script: TaskScript,
    next_uid: u64,
    documents: BTreeMap<String, SearchDocument>,
    settings: Option<IndexSettings>,
    settings_declarations: usize,
    upsert_calls: usize,
    pending: HashMap<u64, PendingTask>,
}

struct PendingTask {
    documents: Vec<SearchDocument>,
    polls: u32,
}

impl Default for MemorySearchIndex {
    fn default() -> Self {
        Self::with_script(TaskScript::SucceedAfter(0))
    }
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: TaskScript) -> Self {
        Self {
            state: Mutex::new(IndexState {
                script,
                next_uid: 1,
                documents: BTreeMap::new(),
                settings: None,
                settings_declarations: 0,
                upsert_calls: 0,
                pending: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applied documents, ordered by id.
    pub fn documents(&self) -> Vec<SearchDocument> {
        self.lock().documents.values().cloned().collect()
    }

    pub fn settings(&self) -> Option<IndexSettings> {
        self.lock().settings.clone()
    }

    pub fn settings_declarations(&self) -> usize {
        self.lock().settings_declarations
    }

    pub fn upsert_calls(&self) -> usize {
        self.lock().upsert_calls
    }
}

impl IndexState {
    fn allocate_uid(&mut self) -> u64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }
}

impl SearchIndex for MemorySearchIndex {
    fn update_settings<'a>(
        &'a self,
        settings: &'a IndexSettings,
    ) -> BoxFuture<'a, Result<TaskHandle, SearchIndexError>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.settings = Some(settings.clone());
            state.settings_declarations += 1;
            Ok(TaskHandle {
                uid: state.allocate_uid(),
            })
        })
    }

    fn upsert_documents<'a>(
        &'a self,
        documents: &'a [SearchDocument],
    ) -> BoxFuture<'a, Result<TaskHandle, SearchIndexError>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.upsert_calls += 1;
            if let TaskScript::Refuse(message) = &state.script {
                return Err(SearchIndexError::Backend(message.clone()));
            }
            let uid = state.allocate_uid();
            state.pending.insert(
                uid,
                PendingTask {
                    documents: documents.to_vec(),
                    polls: 0,
                },
            );
            Ok(TaskHandle { uid })
        })
    }

    fn task_status(&self, task: TaskHandle) -> BoxFuture<'_, Result<TaskStatus, SearchIndexError>> {
        Box::pin(async move {
            if self.lock().script == TaskScript::Stall {
                return futures::future::pending().await;
            }
            let mut state = self.lock();
            let script = state.script.clone();
            let Some(pending) = state.pending.get_mut(&task.uid) else {
                // Settings tasks and already-applied batches.
                return Ok(TaskStatus::Succeeded);
            };
            pending.polls += 1;

            match script {
                TaskScript::SucceedAfter(processing_polls) if pending.polls > processing_polls => {
                    if let Some(applied) = state.pending.remove(&task.uid) {
                        for document in applied.documents {
                            state.documents.insert(document.id.clone(), document);
                        }
                    }
                    Ok(TaskStatus::Succeeded)
                }
                TaskScript::SucceedAfter(_) | TaskScript::NeverComplete | TaskScript::Stall => {
                    Ok(TaskStatus::Processing)
                }
                TaskScript::Fail(message) => {
                    state.pending.remove(&task.uid);
                    Ok(TaskStatus::Failed { message })
                }
                TaskScript::Refuse(message) => Err(SearchIndexError::Backend(message)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{MemorySearchIndex, TaskScript};
    use crate::search::{SearchDocument, SearchIndex, TaskStatus};
    use duende_core::ContentStatus;

    fn document(id: &str, name: &str) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            name: Some(name.to_string()),
            artist: None,
            description: None,
            city: None,
            country: None,
            venue: None,
            date: None,
            time: None,
            slug: None,
            image_url: None,
            featured: false,
            content_status: ContentStatus::Published,
        }
    }

    #[tokio::test]
    async fn batch_applies_only_after_task_succeeds() {
        let index = MemorySearchIndex::with_script(TaskScript::SucceedAfter(1));
        let task = index
            .upsert_documents(&[document("a", "first")])
            .await
            .unwrap();

        assert_eq!(index.task_status(task).await.unwrap(), TaskStatus::Processing);
        assert!(index.documents().is_empty());
        assert_eq!(index.task_status(task).await.unwrap(), TaskStatus::Succeeded);
        assert_eq!(index.documents(), vec![document("a", "first")]);
    }

    #[tokio::test]
    async fn upsert_replaces_documents_by_id() {
        let index = MemorySearchIndex::new();
        for name in ["first", "second"] {
            let task = index.upsert_documents(&[document("a", name)]).await.unwrap();
            index.task_status(task).await.unwrap();
        }
        assert_eq!(index.documents(), vec![document("a", "second")]);
    }
}
