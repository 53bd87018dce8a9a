//! Read and write seams over the analytics and catalog databases.
//!
//! Jobs only see these traits; production wires the Postgres adapters in [`pg`], tests and dry
//! runs use [`memory::MemoryStore`].

mod error;
pub mod memory;
pub mod pg;

use std::fmt::Display;
use std::sync::Arc;

use duende_core::{Artist, Event, EventMetrics, Interaction, InteractionKind};
use futures::future::BoxFuture;
use tracing::warn;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use pg::{PgAnalyticsStore, PgCatalogStore};

/// Records read in one pass, in primary-key order, plus how many stored rows were dropped
/// because they could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub records: Vec<T>,
    pub malformed: usize,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            malformed: 0,
        }
    }
}

impl<T> Snapshot<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            malformed: 0,
        }
    }

    /// Decodes raw rows, excluding and counting the ones that fail.
    pub fn decode<R>(rows: Vec<R>, source: &'static str) -> Self
    where
        T: TryFrom<R>,
        T::Error: Display,
    {
        let mut snapshot = Self::new(Vec::with_capacity(rows.len()));
        for row in rows {
            match T::try_from(row) {
                Ok(record) => snapshot.records.push(record),
                Err(err) => {
                    snapshot.malformed += 1;
                    warn!(
                        event = "store_row_excluded",
                        source,
                        error = %err,
                        "excluding row that failed to decode"
                    );
                }
            }
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Append-only log of user interactions plus the per-event metrics records kept beside it.
pub trait InteractionLog: Send + Sync {
    /// Loads interactions, optionally only those of the given kinds.
    fn load_interactions<'a>(
        &'a self,
        kinds: Option<&'a [InteractionKind]>,
    ) -> BoxFuture<'a, Result<Snapshot<Interaction>, StoreError>>;

    fn load_event_metrics(&self) -> BoxFuture<'_, Result<Snapshot<EventMetrics>, StoreError>>;
}

impl<T> InteractionLog for Arc<T>
where
    T: InteractionLog + ?Sized,
{
    fn load_interactions<'a>(
        &'a self,
        kinds: Option<&'a [InteractionKind]>,
    ) -> BoxFuture<'a, Result<Snapshot<Interaction>, StoreError>> {
        (**self).load_interactions(kinds)
    }

    fn load_event_metrics(&self) -> BoxFuture<'_, Result<Snapshot<EventMetrics>, StoreError>> {
        (**self).load_event_metrics()
    }
}

/// Canonical event catalog. Read-only from this crate.
pub trait EventCatalog: Send + Sync {
    fn load_events(&self) -> BoxFuture<'_, Result<Snapshot<Event>, StoreError>>;
}

impl<T> EventCatalog for Arc<T>
where
    T: EventCatalog + ?Sized,
{
    fn load_events(&self) -> BoxFuture<'_, Result<Snapshot<Event>, StoreError>> {
        (**self).load_events()
    }
}

/// Artist records and their denormalized event counters.
pub trait ArtistStore: Send + Sync {
    fn load_artists(&self) -> BoxFuture<'_, Result<Vec<Artist>, StoreError>>;

    /// Sets every artist's counter to zero. Returns the number of rows touched.
    fn reset_event_counts(&self) -> BoxFuture<'_, Result<usize, StoreError>>;

    /// Writes `(artist id, count)` pairs. Ids without a row are ignored, never inserted.
    /// Returns the number of rows updated.
    fn write_event_counts<'a>(
        &'a self,
        counts: &'a [(i64, i64)],
    ) -> BoxFuture<'a, Result<usize, StoreError>>;
}

impl<T> ArtistStore for Arc<T>
where
    T: ArtistStore + ?Sized,
{
    fn load_artists(&self) -> BoxFuture<'_, Result<Vec<Artist>, StoreError>> {
        (**self).load_artists()
    }

    fn reset_event_counts(&self) -> BoxFuture<'_, Result<usize, StoreError>> {
        (**self).reset_event_counts()
    }

    fn write_event_counts<'a>(
        &'a self,
        counts: &'a [(i64, i64)],
    ) -> BoxFuture<'a, Result<usize, StoreError>> {
        (**self).write_event_counts(counts)
    }
}
