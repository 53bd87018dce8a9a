use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use duende_core::db::models::{ArtistRow, EventMetricsRow, EventRow, InteractionRow};
use duende_core::db::schema::{artists, event_metrics, events, interactions};
use duende_core::{Artist, Event, EventMetrics, Interaction, InteractionKind};
use futures::future::BoxFuture;
use tracing::debug;

use super::{ArtistStore, EventCatalog, InteractionLog, Snapshot, StoreError};

/// Interaction log and event metrics in the analytics database.
#[derive(Clone)]
pub struct PgAnalyticsStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgAnalyticsStore {
    pub fn new(pool: Pool<AsyncPgConnection>) -> Self {
        Self { pool }
    }
}

/// Stored kind strings for a pushed-down filter.
///
/// `other` covers every unknown string, so a filter naming it cannot be expressed as an
/// equality set and is applied after decoding instead.
fn stored_kinds(kinds: &[InteractionKind]) -> Option<Vec<&'static str>> {
    if kinds.contains(&InteractionKind::Other) {
        return None;
    }
    Some(kinds.iter().map(|kind| kind.as_str()).collect())
}

impl InteractionLog for PgAnalyticsStore {
    fn load_interactions<'a>(
        &'a self,
        kinds: Option<&'a [InteractionKind]>,
    ) -> BoxFuture<'a, Result<Snapshot<Interaction>, StoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            let mut query = interactions::table
                .select(InteractionRow::as_select())
                .order(interactions::id.asc())
                .into_boxed();
            if let Some(stored) = kinds.and_then(stored_kinds) {
                query = query.filter(interactions::kind.eq_any(stored));
            }
            let rows: Vec<InteractionRow> = query.load(&mut conn).await?;

            let mut snapshot: Snapshot<Interaction> = Snapshot::decode(rows, "interactions");
            if let Some(kinds) = kinds {
                snapshot
                    .records
                    .retain(|interaction| kinds.contains(&interaction.kind));
            }
            debug!(
                event = "interactions_loaded",
                rows = snapshot.len(),
                malformed = snapshot.malformed,
                "loaded interaction snapshot"
            );
            Ok(snapshot)
        })
    }

    fn load_event_metrics(&self) -> BoxFuture<'_, Result<Snapshot<EventMetrics>, StoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            let rows: Vec<EventMetricsRow> = event_metrics::table
                .select(EventMetricsRow::as_select())
                .order(event_metrics::event_id.asc())
                .load(&mut conn)
                .await?;
            Ok(Snapshot::decode(rows, "event_metrics"))
        })
    }
}

/// Event catalog and artist records in the main database.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgCatalogStore {
    pub fn new(pool: Pool<AsyncPgConnection>) -> Self {
        Self { pool }
    }
}

impl EventCatalog for PgCatalogStore {
    fn load_events(&self) -> BoxFuture<'_, Result<Snapshot<Event>, StoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            let rows: Vec<EventRow> = events::table
                .select(EventRow::as_select())
                .order(events::id.asc())
                .load(&mut conn)
                .await?;
            let snapshot: Snapshot<Event> = Snapshot::decode(rows, "events");
            debug!(
                event = "events_loaded",
                rows = snapshot.len(),
                malformed = snapshot.malformed,
                "loaded event catalog snapshot"
            );
            Ok(snapshot)
        })
    }
}

impl ArtistStore for PgCatalogStore {
    fn load_artists(&self) -> BoxFuture<'_, Result<Vec<Artist>, StoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            let rows: Vec<ArtistRow> = artists::table
                .select(ArtistRow::as_select())
                .order(artists::id.asc())
                .load(&mut conn)
                .await?;
            Ok(rows.into_iter().map(Artist::from).collect())
        })
    }

    fn reset_event_counts(&self) -> BoxFuture<'_, Result<usize, StoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            let touched = diesel::update(artists::table)
                .set(artists::event_count.eq(0_i64))
                .execute(&mut conn)
                .await?;
            Ok(touched)
        })
    }

    fn write_event_counts<'a>(
        &'a self,
        counts: &'a [(i64, i64)],
    ) -> BoxFuture<'a, Result<usize, StoreError>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            let mut updated = 0usize;
            for &(artist_id, count) in counts {
                updated += diesel::update(artists::table.find(artist_id))
                    .set(artists::event_count.eq(count))
                    .execute(&mut conn)
                    .await?;
            }
            Ok(updated)
        })
    }
}
