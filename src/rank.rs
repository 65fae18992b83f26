//!
//! src/rank.rs  Andrew Belles  Oct 18th, 2026
//!
//! Joint min-max normalization of candidates and seeds, a seed-average
//! target vector, and cosine ranking with top-k selection
//!

use std::collections::HashMap;

use tracing::debug;

use crate::types::{FEATURE_COUNT, Feature, FeatureVector, ScoredCandidate, TrackRef};
use crate::SimilarError;

/// Guards zero-range columns and zero-norm vectors
pub const EPSILON: f64 = 1e-9;

type Row = [f64; FEATURE_COUNT];

/// Catalog tracks joined with their features, enumeration order
pub type CandidatePool = Vec<(TrackRef, FeatureVector)>;

/// Joins tracks with feature vectors by id. A track with no vector gets
/// a sentinel one, so it is filtered out later rather than misaligned.
pub fn join_pool(tracks: Vec<TrackRef>, features: Vec<FeatureVector>) -> CandidatePool {
    let mut by_id: HashMap<String, FeatureVector> = features.into_iter()
        .map(|f| (f.id.clone(), f))
        .collect();

    tracks.into_iter()
        .map(|track| {
            let features = by_id.remove(&track.id)
                .unwrap_or_else(|| FeatureVector::missing(track.id.as_str()));
            (track, features)
        })
        .collect()
}

/// Per-column min and max over every present value
#[derive(Debug, Clone, Copy, PartialEq)]
struct ColumnRange {
    min: Row,
    max: Row
}

impl ColumnRange {
    fn over(rows: &[Row], seeds: &[FeatureVector]) -> Self {
        let mut min = [f64::INFINITY; FEATURE_COUNT];
        let mut max = [f64::NEG_INFINITY; FEATURE_COUNT];

        let mut observe = |col: usize, v: f64| {
            min[col] = min[col].min(v);
            max[col] = max[col].max(v);
        };
        for row in rows {
            for (col, v) in row.iter().enumerate() {
                observe(col, *v);
            }
        }
        for seed in seeds {
            for (col, v) in seed.values().iter().enumerate() {
                if let Some(v) = v.value() {
                    observe(col, v);
                }
            }
        }

        // a column nobody reported normalizes against [0, 0]
        for col in 0..FEATURE_COUNT {
            if min[col] > max[col] {
                min[col] = 0.0;
                max[col] = 0.0;
            }
        }
        Self { min, max }
    }

    fn normalize(&self, col: usize, v: f64) -> f64 {
        (v - self.min[col]) / (self.max[col] - self.min[col] + EPSILON)
    }

    fn normalize_row(&self, row: &Row) -> Row {
        let mut out = [0.0; FEATURE_COUNT];
        for (col, slot) in out.iter_mut().enumerate() {
            *slot = self.normalize(col, row[col]);
        }
        out
    }
}

/// Column-wise mean of the normalized seed values present in that column.
/// A column no seed reports stays at 0 and so does not contribute.
fn target_vector(seeds: &[FeatureVector], range: &ColumnRange) -> Row {
    let mut sum = [0.0; FEATURE_COUNT];
    let mut count = [0_usize; FEATURE_COUNT];

    for seed in seeds {
        for (col, v) in seed.values().iter().enumerate() {
            if let Some(v) = v.value() {
                sum[col] += range.normalize(col, v);
                count[col] += 1;
            }
        }
    }

    let mut target = [0.0; FEATURE_COUNT];
    for col in 0..FEATURE_COUNT {
        if count[col] > 0 {
            target[col] = sum[col] / count[col] as f64;
        }
    }
    target
}

pub fn cosine(a: &Row, b: &Row) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    dot / (na * nb + EPSILON)
}

/// Top `k` candidates by cosine similarity to the seed target.
///
/// Incomplete candidate rows are dropped first. Seed rows are not
/// pre-filtered; only a seed set with no values at all is an error. Ties
/// keep pool order.
pub fn rank(pool: CandidatePool, seeds: &[FeatureVector], k: usize) ->
    Result<Vec<ScoredCandidate>, SimilarError> {

    let before = pool.len();
    let complete: Vec<(TrackRef, Row)> = pool.into_iter()
        .filter_map(|(track, features)| features.dense().map(|row| (track, row)))
        .collect();
    debug!(pool = before, complete = complete.len(), "rank.filtered");

    if seeds.iter().all(FeatureVector::is_entirely_missing) {
        return Err(SimilarError::EmptySeedFeatures);
    }
    if complete.is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    let rows: Vec<Row> = complete.iter().map(|(_, row)| *row).collect();
    let range = ColumnRange::over(&rows, seeds);
    let target = target_vector(seeds, &range);
    let named: Vec<(&str, f64)> = Feature::ALL.iter()
        .map(|f| (f.as_str(), target[f.index()]))
        .collect();
    debug!(target = ?named, "rank.target");

    let mut scored: Vec<ScoredCandidate> = complete.into_iter()
        .map(|(track, row)| {
            let similarity = cosine(&range.normalize_row(&row), &target);
            ScoredCandidate { track, similarity }
        })
        .collect();

    // sort_by is stable, equal scores stay in enumeration order
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(k);
    Ok(scored)
}
