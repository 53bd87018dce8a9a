use diesel::result::Error as DieselError;
use diesel_async::pooled_connection::deadpool::PoolError;
use thiserror::Error;

/// Failure talking to a backing store.
///
/// Any of these makes the store unavailable for the current invocation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("could not check out a database connection: {0}")]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Query(#[from] DieselError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
