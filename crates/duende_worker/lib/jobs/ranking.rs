//! Two-phase recomputation of the denormalized `artists.event_count` column.
//!
//! Phase one zeroes every counter, phase two recounts events per artist and writes the counts
//! back. Between the phases every counter reads zero; a failure in phase two leaves them zeroed
//! until the next successful run. Re-running always converges.

use duende_core::{Artist, Event};
use serde::Serialize;
use tracing::{info, warn};

use crate::jobs::JobError;
use crate::pipeline::pipeline;
use crate::server::monitoring::JOB_METRICS;
use crate::store::{ArtistStore, EventCatalog, StoreError};

pub const DEFAULT_REPORT_LIMIT: usize = 100;

/// Proof that the reset phase completed. Only [`RankingRecomputation::reset`] creates one.
#[must_use = "a completed reset must be followed by a rebuild"]
#[derive(Debug)]
pub struct ResetPhase {
    artists_reset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingSummary {
    pub artists_reset: usize,
    pub artists_updated: usize,
    pub events_matched: u64,
    pub events_unmatched: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedArtist {
    pub rank: usize,
    pub name: String,
    pub event_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingReport {
    pub entries: Vec<RankedArtist>,
    /// Count an artist needs to enter the list; only set when the list is full.
    pub threshold: Option<i64>,
}

/// Counts catalog events per artist id, matching `event.artist` to `artist.name` exactly.
///
/// Returns `(artist id, count)` pairs in first-seen order and the number of matched events.
pub fn count_events_per_artist(
    events: Vec<Event>,
    artists: Vec<Artist>,
) -> (Vec<(i64, i64)>, u64) {
    let groups = pipeline::<Event>()
        .join_equality(
            artists,
            |event| event.artist.clone(),
            |artist: &Artist| Some(artist.name.clone()),
        )
        .group_count(|(_, artist)| artist.id)
        .run(events);

    let matched: u64 = groups.iter().map(|group| group.value).sum();
    let counts = groups
        .into_iter()
        .map(|group| (group.key, i64::try_from(group.value).unwrap_or(i64::MAX)))
        .collect();
    (counts, matched)
}

/// Top `limit` artists with at least one event, by count then name.
pub fn rank_artists(artists: Vec<Artist>, limit: usize) -> RankingReport {
    let entries: Vec<RankedArtist> = pipeline::<Artist>()
        .filter(|artist| artist.event_count > 0 && !artist.name.is_empty())
        .project(|artist| (artist.name, artist.event_count))
        .sort_by(|(a_name, a_count), (b_name, b_count)| {
            b_count.cmp(a_count).then_with(|| a_name.cmp(b_name))
        })
        .limit(limit)
        .run(artists)
        .into_iter()
        .enumerate()
        .map(|(position, (name, event_count))| RankedArtist {
            rank: position + 1,
            name,
            event_count,
        })
        .collect();

    let threshold = if limit > 0 && entries.len() == limit {
        entries.last().map(|entry| entry.event_count)
    } else {
        None
    };
    RankingReport { entries, threshold }
}

pub struct RankingRecomputation<E, A> {
    catalog: E,
    artists: A,
}

impl<E, A> RankingRecomputation<E, A>
where
    E: EventCatalog,
    A: ArtistStore,
{
    pub fn new(catalog: E, artists: A) -> Self {
        Self { catalog, artists }
    }

    /// Phase one: zero every artist counter.
    pub async fn reset(&self) -> Result<ResetPhase, JobError> {
        let artists_reset = self.artists.reset_event_counts().await?;
        info!(
            event = "ranking_reset_completed",
            artists_reset,
            "artist event counts reset"
        );
        Ok(ResetPhase { artists_reset })
    }

    /// Phase two: recount and write back. Any failure here is a [`JobError::RankingRebuild`].
    pub async fn rebuild(&self, reset: ResetPhase) -> Result<RankingSummary, JobError> {
        let rebuilt = async {
            let events = self.catalog.load_events().await?;
            let artists = self.artists.load_artists().await?;
            let total_events = events.records.len() as u64;
            let (counts, events_matched) = count_events_per_artist(events.records, artists);
            let artists_updated = self.artists.write_event_counts(&counts).await?;
            Ok::<_, StoreError>((artists_updated, events_matched, total_events))
        }
        .await;

        let (artists_updated, events_matched, total_events) = rebuilt.map_err(|err| {
            warn!(
                event = "ranking_rebuild_failed",
                artists_reset = reset.artists_reset,
                error = %err,
                "rebuild failed after reset; artist event counts stay zeroed"
            );
            JobError::RankingRebuild(err)
        })?;

        if let Some(metrics) = JOB_METRICS.get() {
            metrics.artists_updated.inc_by(artists_updated as u64);
        }

        let summary = RankingSummary {
            artists_reset: reset.artists_reset,
            artists_updated,
            events_matched,
            events_unmatched: total_events.saturating_sub(events_matched),
        };
        info!(
            event = "ranking_rebuild_completed",
            artists_updated,
            events_matched,
            events_unmatched = summary.events_unmatched,
            "artist event counts rebuilt"
        );
        Ok(summary)
    }

    pub async fn run(&self) -> Result<RankingSummary, JobError> {
        let reset = self.reset().await?;
        self.rebuild(reset).await
    }

    pub async fn report(&self, limit: usize) -> Result<RankingReport, JobError> {
        let artists = self.artists.load_artists().await?;
        Ok(rank_artists(artists, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::{count_events_per_artist, rank_artists, RankedArtist};
    use crate::jobs::analytics::test_support::event;
    use duende_core::Artist;

    fn artist(id: i64, name: &str, event_count: i64) -> Artist {
        Artist {
            id,
            name: name.to_string(),
            event_count,
        }
    }

    #[test]
    fn counts_match_artist_names_exactly() {
        let (counts, matched) = count_events_per_artist(
            vec![
                event(1, "Paco", None),
                event(2, "Camaron", None),
                event(3, "paco", None),
                event(4, "Camaron", None),
            ],
            vec![artist(10, "Camaron", 0), artist(11, "Paco", 0), artist(12, "Rocio", 0)],
        );

        assert_eq!(counts, vec![(11, 1), (10, 2)]);
        assert_eq!(matched, 3);
    }

    #[test]
    fn report_orders_by_count_then_name_and_skips_empty() {
        let report = rank_artists(
            vec![
                artist(1, "Paco", 2),
                artist(2, "Camaron", 5),
                artist(3, "Antonio", 2),
                artist(4, "Nobody", 0),
                artist(5, "", 9),
                artist(6, "N/A", 1),
            ],
            10,
        );

        let names: Vec<&str> = report
            .entries
            .iter()
            .map(|entry| entry.name.as_str())
            .collect();
        assert_eq!(names, vec!["Camaron", "Antonio", "Paco", "N/A"]);
        assert_eq!(report.threshold, None);
    }

    #[test]
    fn full_report_carries_entry_threshold() {
        let report = rank_artists(
            vec![artist(1, "Paco", 2), artist(2, "Camaron", 5), artist(3, "Rocio", 1)],
            2,
        );

        assert_eq!(
            report.entries,
            vec![
                RankedArtist { rank: 1, name: "Camaron".to_string(), event_count: 5 },
                RankedArtist { rank: 2, name: "Paco".to_string(), event_count: 2 },
            ]
        );
        assert_eq!(report.threshold, Some(2));
    }
}
