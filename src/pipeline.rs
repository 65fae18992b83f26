//!
//! src/pipeline.rs  Andrew Belles  Oct 18th, 2026
//!
//! Runs one recommendation end to end: resolve, enumerate, complete,
//! fetch features, rank. Only the terminal conditions stop a run,
//! every other upstream failure just thins out the data
//!

use serde::Serialize;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::catalog;
use crate::config::{RecommendConfig, clamp_top_k};
use crate::features;
use crate::fetch::CatalogSource;
use crate::rank;
use crate::resolve;
use crate::types::{EntityKind, ScoredCandidate};
use crate::SimilarError;

pub const MAX_SEEDS: usize = 2;

/// What the user typed, before any resolution
#[derive(Debug, Clone)]
pub struct RecommendRequest {
    pub seeds: Vec<String>,
    pub artist: String,
    pub top_k: usize
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub artist_id: String,
    pub seed_ids: Vec<String>,
    pub candidates: usize,
    pub results: Vec<ScoredCandidate>
}

pub fn recommend(
    source: &dyn CatalogSource,
    request: &RecommendRequest,
    settings: &RecommendConfig
) -> Result<Recommendation, SimilarError> {

    let run_id = Uuid::new_v4();
    let span = info_span!("recommend", run_id = %run_id);
    let _entered = span.enter();

    if request.seeds.is_empty() || request.seeds.len() > MAX_SEEDS {
        return Err(SimilarError::InvalidInput(
            format!("expected 1 to {MAX_SEEDS} seed tracks, got {}", request.seeds.len())
        ));
    }

    let seed_ids = request.seeds.iter()
        .map(|query| resolve::resolve(source, query, EntityKind::Track))
        .collect::<Result<Vec<_>, _>>()?;
    let artist_id = resolve::resolve(source, &request.artist, EntityKind::Artist)?;
    info!(seeds = ?seed_ids, artist = %artist_id, "pipeline.resolved");

    let tracks = catalog::enumerate(source, &artist_id, settings.track_cap, settings.page_size);
    if tracks.is_empty() {
        return Err(SimilarError::EmptyCatalog(artist_id));
    }
    let tracks = catalog::complete_metadata(source, tracks, settings.metadata_batch);
    let candidates = tracks.len();

    let track_ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
    let candidate_features = features::fetch_features(source, &track_ids, settings.feature_batch);
    let seed_features = features::fetch_features(source, &seed_ids, settings.feature_batch);

    let pool = rank::join_pool(tracks, candidate_features);
    let results = rank::rank(pool, &seed_features, clamp_top_k(request.top_k))?;
    info!(candidates, results = results.len(), "pipeline.ranked");

    Ok( Recommendation { artist_id, seed_ids, candidates, results } )
}
