use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchIndexError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("unexpected HTTP status during {operation}: {status}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("search task {task_uid} did not apply: {message}")]
    TaskFailed { task_uid: u64, message: String },

    #[error("search backend error: {0}")]
    Backend(String),
}
