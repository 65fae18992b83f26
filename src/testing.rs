//!
//! src/testing.rs  Andrew Belles  Oct 18th, 2026
//!
//! In-memory catalog with scripted responses and failures, used by the
//! unit tests of every stage
//!

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use crate::fetch::CatalogSource;
use crate::types::{
    AlbumRef, ArtistRef, ArtistSummary, AudioFeatures, ReleaseSummary, TrackMetadata, TrackSummary
};
use crate::SimilarError;

#[derive(Default)]
pub struct ScriptedCatalog {
    track_search: HashMap<String, String>,
    artist_search: HashMap<String, String>,
    search_fails: bool,
    releases: Vec<ReleaseSummary>,
    failing_pages: HashSet<u32>,
    release_tracks: HashMap<String, Vec<TrackSummary>>,
    failing_releases: HashSet<String>,
    metadata: HashMap<String, TrackMetadata>,
    metadata_fails: bool,
    features: HashMap<String, AudioFeatures>,
    failing_feature_ids: HashSet<String>,
    calls: Cell<usize>,
    feature_batches: RefCell<Vec<Vec<String>>>,
}

fn upstream_down(what: &str) -> SimilarError {
    SimilarError::Http(format!("{what}: status 503 Service Unavailable"))
}

impl ScriptedCatalog {
    pub fn with_track_search(mut self, query: &str, id: &str) -> Self {
        self.track_search.insert(query.to_string(), id.to_string());
        self
    }

    pub fn with_artist_search(mut self, query: &str, id: &str) -> Self {
        self.artist_search.insert(query.to_string(), id.to_string());
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.search_fails = true;
        self
    }

    /// Adds a release with (id, name) tracks; metadata for each track is
    /// registered too
    pub fn with_release(mut self, id: &str, tracks: &[(&str, &str)]) -> Self {
        let album = format!("Album {id}");
        self.releases.push(ReleaseSummary { id: id.to_string(), name: album.clone() });

        let summaries = tracks.iter()
            .map(|(track_id, name)| TrackSummary {
                id: Some(track_id.to_string()),
                name: name.to_string(),
                artists: vec![ArtistRef { name: "Artist".to_string() }]
            })
            .collect();
        self.release_tracks.insert(id.to_string(), summaries);

        for (track_id, name) in tracks {
            self.metadata.insert(track_id.to_string(), TrackMetadata {
                id: track_id.to_string(),
                name: format!("{name} (Remastered)"),
                artists: vec![
                    ArtistRef { name: "Artist".to_string() },
                    ArtistRef { name: "Guest".to_string() }
                ],
                album: AlbumRef { name: album.clone() },
                preview_url: Some(format!("https://p.scdn.co/mp3-preview/{track_id}"))
            });
        }
        self
    }

    /// Release list entry whose track listing is a raw summary list
    pub fn with_raw_release(mut self, id: &str, tracks: Vec<TrackSummary>) -> Self {
        self.releases.push(ReleaseSummary { id: id.to_string(), name: format!("Album {id}") });
        self.release_tracks.insert(id.to_string(), tracks);
        self
    }

    pub fn failing_page(mut self, offset: u32) -> Self {
        self.failing_pages.insert(offset);
        self
    }

    pub fn failing_release(mut self, id: &str) -> Self {
        self.failing_releases.insert(id.to_string());
        self
    }

    pub fn failing_metadata(mut self) -> Self {
        self.metadata_fails = true;
        self
    }

    pub fn with_features(mut self, id: &str, values: [f64; 7]) -> Self {
        self.features.insert(id.to_string(), features(id, values));
        self
    }

    /// Any feature batch containing this id fails as a whole
    pub fn failing_features_for(mut self, id: &str) -> Self {
        self.failing_feature_ids.insert(id.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn feature_batches(&self) -> Vec<Vec<String>> {
        self.feature_batches.borrow().clone()
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

pub fn features(id: &str, v: [f64; 7]) -> AudioFeatures {
    AudioFeatures {
        id: id.to_string(),
        danceability: Some(v[0]),
        energy: Some(v[1]),
        valence: Some(v[2]),
        tempo: Some(v[3]),
        acousticness: Some(v[4]),
        instrumentalness: Some(v[5]),
        liveness: Some(v[6])
    }
}

impl CatalogSource for ScriptedCatalog {
    fn search_track(&self, query: &str, _limit: u32) -> Result<Vec<TrackSummary>, SimilarError> {
        self.tick();
        if self.search_fails {
            return Err(upstream_down("search"));
        }
        Ok(self.track_search.get(query)
            .map(|id| vec![TrackSummary { id: Some(id.clone()), name: query.to_string(), artists: vec![] }])
            .unwrap_or_default())
    }

    fn search_artist(&self, query: &str, _limit: u32) -> Result<Vec<ArtistSummary>, SimilarError> {
        self.tick();
        if self.search_fails {
            return Err(upstream_down("search"));
        }
        Ok(self.artist_search.get(query)
            .map(|id| vec![ArtistSummary { id: id.clone(), name: query.to_string() }])
            .unwrap_or_default())
    }

    fn artist_releases(&self, _artist_id: &str, page_size: u32, offset: u32) ->
        Result<Vec<ReleaseSummary>, SimilarError> {
        self.tick();
        if self.failing_pages.contains(&offset) {
            return Err(upstream_down("artist albums"));
        }
        Ok(self.releases.iter()
            .skip(offset as usize)
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    fn release_tracks(&self, release_id: &str) -> Result<Vec<TrackSummary>, SimilarError> {
        self.tick();
        if self.failing_releases.contains(release_id) {
            return Err(upstream_down("album tracks"));
        }
        Ok(self.release_tracks.get(release_id).cloned().unwrap_or_default())
    }

    fn tracks_metadata(&self, ids: &[String]) ->
        Result<Vec<Option<TrackMetadata>>, SimilarError> {
        self.tick();
        if self.metadata_fails {
            return Err(upstream_down("tracks"));
        }
        Ok(ids.iter().map(|id| self.metadata.get(id).cloned()).collect())
    }

    fn audio_features(&self, ids: &[String]) ->
        Result<Vec<Option<AudioFeatures>>, SimilarError> {
        self.tick();
        self.feature_batches.borrow_mut().push(ids.to_vec());
        if ids.iter().any(|id| self.failing_feature_ids.contains(id)) {
            return Err(upstream_down("audio features"));
        }
        Ok(ids.iter().map(|id| self.features.get(id).cloned()).collect())
    }
}
