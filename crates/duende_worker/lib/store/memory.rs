use std::sync::{Mutex, MutexGuard, PoisonError};

use duende_core::{Artist, Event, EventMetrics, Interaction, InteractionKind};
use futures::future::BoxFuture;

use super::{ArtistStore, EventCatalog, InteractionLog, Snapshot, StoreError};

/// Process-local store implementing every store trait.
///
/// Reads return records sorted by primary key, like the Postgres adapters. Failures can be
/// scripted per operation to exercise error paths.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    interactions: Vec<Interaction>,
    event_metrics: Vec<EventMetrics>,
    events: Vec<Event>,
    artists: Vec<Artist>,
    malformed_interactions: usize,
    read_failure: Option<String>,
    count_write_failure: Option<String>,
    reset_calls: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interactions(self, interactions: Vec<Interaction>) -> Self {
        self.lock().interactions = interactions;
        self
    }

    pub fn with_event_metrics(self, event_metrics: Vec<EventMetrics>) -> Self {
        self.lock().event_metrics = event_metrics;
        self
    }

    pub fn with_events(self, events: Vec<Event>) -> Self {
        self.lock().events = events;
        self
    }

    pub fn with_artists(self, artists: Vec<Artist>) -> Self {
        self.lock().artists = artists;
        self
    }

    /// Pretends `count` stored interaction rows failed to decode.
    pub fn with_malformed_interactions(self, count: usize) -> Self {
        self.lock().malformed_interactions = count;
        self
    }

    /// Every read fails with [`StoreError::Unavailable`].
    pub fn failing_reads(self, message: impl Into<String>) -> Self {
        self.lock().read_failure = Some(message.into());
        self
    }

    /// `write_event_counts` fails; resets still succeed.
    pub fn failing_count_writes(self, message: impl Into<String>) -> Self {
        self.lock().count_write_failure = Some(message.into());
        self
    }

    /// Current artist rows, sorted by id.
    pub fn artists(&self) -> Vec<Artist> {
        sorted_artists(&self.lock().artists)
    }

    pub fn reset_calls(&self) -> usize {
        self.lock().reset_calls
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        match &self.lock().read_failure {
            Some(message) => Err(StoreError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

fn sorted_artists(artists: &[Artist]) -> Vec<Artist> {
    let mut sorted = artists.to_vec();
    sorted.sort_by_key(|artist| artist.id);
    sorted
}

impl InteractionLog for MemoryStore {
    fn load_interactions<'a>(
        &'a self,
        kinds: Option<&'a [InteractionKind]>,
    ) -> BoxFuture<'a, Result<Snapshot<Interaction>, StoreError>> {
        Box::pin(async move {
            self.check_reads()?;
            let state = self.lock();
            let mut records: Vec<Interaction> = state
                .interactions
                .iter()
                .filter(|interaction| {
                    kinds.map_or(true, |kinds| kinds.contains(&interaction.kind))
                })
                .cloned()
                .collect();
            records.sort_by_key(|interaction| interaction.id);
            Ok(Snapshot {
                records,
                malformed: state.malformed_interactions,
            })
        })
    }

    fn load_event_metrics(&self) -> BoxFuture<'_, Result<Snapshot<EventMetrics>, StoreError>> {
        Box::pin(async move {
            self.check_reads()?;
            let mut records = self.lock().event_metrics.clone();
            records.sort_by_key(|metrics| metrics.event_id);
            Ok(Snapshot::new(records))
        })
    }
}

impl EventCatalog for MemoryStore {
    fn load_events(&self) -> BoxFuture<'_, Result<Snapshot<Event>, StoreError>> {
        Box::pin(async move {
            self.check_reads()?;
            let mut records = self.lock().events.clone();
            records.sort_by_key(|event| event.id);
            Ok(Snapshot::new(records))
        })
    }
}

impl ArtistStore for MemoryStore {
    fn load_artists(&self) -> BoxFuture<'_, Result<Vec<Artist>, StoreError>> {
        Box::pin(async move {
            self.check_reads()?;
            Ok(sorted_artists(&self.lock().artists))
        })
    }

    fn reset_event_counts(&self) -> BoxFuture<'_, Result<usize, StoreError>> {
        Box::pin(async move {
            let mut state = self.lock();
            state.reset_calls += 1;
            for artist in state.artists.iter_mut() {
                artist.event_count = 0;
            }
            Ok(state.artists.len())
        })
    }

    fn write_event_counts<'a>(
        &'a self,
        counts: &'a [(i64, i64)],
    ) -> BoxFuture<'a, Result<usize, StoreError>> {
        Box::pin(async move {
            let mut state = self.lock();
            if let Some(message) = &state.count_write_failure {
                return Err(StoreError::Unavailable(message.clone()));
            }
            let mut updated = 0usize;
            for &(artist_id, count) in counts {
                if let Some(artist) = state.artists.iter_mut().find(|artist| artist.id == artist_id)
                {
                    artist.event_count = count;
                    updated += 1;
                }
            }
            Ok(updated)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::store::{ArtistStore, StoreError};
    use duende_core::Artist;

    fn artist(id: i64, name: &str, event_count: i64) -> Artist {
        Artist {
            id,
            name: name.to_string(),
            event_count,
        }
    }

    #[tokio::test]
    async fn count_writes_never_create_rows() {
        let store =
            MemoryStore::new().with_artists(vec![artist(2, "Paco", 7), artist(1, "Rocio", 0)]);

        let updated = store
            .write_event_counts(&[(1, 4), (99, 3)])
            .await
            .expect("write should succeed");

        assert_eq!(updated, 1);
        assert_eq!(
            store.artists(),
            vec![artist(1, "Rocio", 4), artist(2, "Paco", 7)]
        );
    }

    #[tokio::test]
    async fn scripted_read_failure_surfaces_as_unavailable() {
        let store = MemoryStore::new().failing_reads("connection refused");
        let err = store.load_artists().await.expect_err("read should fail");
        assert!(matches!(err, StoreError::Unavailable(message) if message == "connection refused"));
    }
}
