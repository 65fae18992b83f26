//!
//! src/catalog.rs  Andrew Belles  Oct 18th, 2026
//!
//! Walks an artist's albums and singles page by page and collects
//! unique tracks up to a cap, then fills in full track metadata
//!
//!

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::fetch::CatalogSource;
use crate::types::{Outcome, ReleaseSummary, TrackMetadata, TrackRef, TrackSummary};

/// One page of releases; a failed page contributes nothing
fn fetch_page(source: &dyn CatalogSource, artist_id: &str, page_size: u32, offset: u32) ->
    Outcome<Vec<ReleaseSummary>> {
    match source.artist_releases(artist_id, page_size, offset) {
        Ok(items) => Outcome::Ok(items),
        Err(e) => {
            warn!(artist = artist_id, offset, error = %e, "catalog.page.failed");
            Outcome::Degraded(Vec::new())
        }
    }
}

/// Track listing of one release; a failed release contributes nothing
fn fetch_release(source: &dyn CatalogSource, release: &ReleaseSummary) ->
    Outcome<Vec<TrackSummary>> {
    match source.release_tracks(&release.id) {
        Ok(items) => Outcome::Ok(items),
        Err(e) => {
            warn!(release = %release.id, error = %e, "catalog.release.failed");
            Outcome::Degraded(Vec::new())
        }
    }
}

/// Ordered unique tracks of an artist, release order then in-release order,
/// never more than `cap`. Ends at the first page with no releases, which
/// includes a page that failed.
pub fn enumerate(source: &dyn CatalogSource, artist_id: &str, cap: usize, page_size: u32) ->
    Vec<TrackRef> {

    let mut tracks = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut offset = 0_u32;

    if cap == 0 || page_size == 0 {
        return tracks;
    }

    loop {
        let page = match fetch_page(source, artist_id, page_size, offset) {
            Outcome::Ok(items) | Outcome::Degraded(items) => items,
            Outcome::Fatal(_) => break,
        };
        if page.is_empty() {
            break;
        }
        debug!(artist = artist_id, offset, releases = page.len(), "catalog.page");

        for release in &page {
            let listing = match fetch_release(source, release) {
                Outcome::Ok(items) | Outcome::Degraded(items) => items,
                Outcome::Fatal(_) => continue,
            };

            for summary in &listing {
                let Some(track) = TrackRef::from_summary(summary, &release.name) else {
                    continue;
                };
                if !seen.insert(track.id.clone()) {
                    continue;
                }
                tracks.push(track);
                if tracks.len() >= cap {
                    info!(artist = artist_id, tracks = tracks.len(), "catalog.cap.reached");
                    return tracks;
                }
            }
        }
        offset += page.len() as u32;
    }

    info!(artist = artist_id, tracks = tracks.len(), "catalog.done");
    tracks
}

fn fetch_metadata(source: &dyn CatalogSource, ids: &[String]) ->
    Outcome<Vec<Option<TrackMetadata>>> {
    match source.tracks_metadata(ids) {
        Ok(records) => Outcome::Ok(records),
        Err(e) => {
            let head: Vec<&String> = ids.iter().take(5).collect();
            warn!(batch = ?head, error = %e, "metadata.batch.failed");
            Outcome::Degraded(Vec::new())
        }
    }
}

/// Completes enumerated tracks with the bulk tracks lookup. Records are
/// joined by id so a failed batch or a null slot leaves the partial
/// track as it was, rows are never dropped or shifted.
pub fn complete_metadata(source: &dyn CatalogSource, tracks: Vec<TrackRef>, batch_size: usize) ->
    Vec<TrackRef> {

    let batch_size = batch_size.max(1);
    let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();

    let mut by_id: HashMap<String, TrackMetadata> = HashMap::new();
    for chunk in ids.chunks(batch_size) {
        let records = match fetch_metadata(source, chunk) {
            Outcome::Ok(r) | Outcome::Degraded(r) => r,
            Outcome::Fatal(_) => continue,
        };
        for record in records.into_iter().flatten() {
            by_id.insert(record.id.clone(), record);
        }
    }

    tracks.into_iter()
        .map(|mut track| {
            if let Some(meta) = by_id.remove(&track.id) {
                track.name = meta.name;
                if !meta.artists.is_empty() {
                    track.artists = meta.artists.into_iter().map(|a| a.name).collect();
                }
                track.album = meta.album.name;
                track.preview_url = meta.preview_url;
            }
            track
        })
        .collect()
}
