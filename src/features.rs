//!
//! src/features.rs  Andrew Belles  Oct 18th, 2026
//!
//! Batched audio feature lookup. Output is always one vector per input
//! id in input order; anything upstream could not supply becomes the
//! missing sentinel
//!

use tracing::{debug, warn};

use crate::fetch::CatalogSource;
use crate::types::{AudioFeatures, FeatureVector, Outcome};

/// Realigns one batch response to the ids that were requested. Upstream
/// answers positionally; if the slot count is off we fall back to matching
/// records by id.
fn align(requested: &[String], records: Vec<Option<AudioFeatures>>) -> Vec<Option<AudioFeatures>> {
    if records.len() == requested.len() {
        return records;
    }

    warn!(requested = requested.len(), returned = records.len(), "features.batch.misaligned");
    let mut pool: Vec<AudioFeatures> = records.into_iter().flatten().collect();
    requested.iter()
        .map(|id| {
            let pos = pool.iter().position(|f| &f.id == id)?;
            Some(pool.swap_remove(pos))
        })
        .collect()
}

/// One batch. Empty ids are never sent; they, null slots and every id of a
/// failed call come back as sentinels.
fn fetch_batch(source: &dyn CatalogSource, batch: &[String]) -> Outcome<Vec<FeatureVector>> {
    let requested: Vec<String> = batch.iter()
        .filter(|id| !id.trim().is_empty())
        .cloned()
        .collect();

    let sentinels = || batch.iter().map(FeatureVector::missing).collect::<Vec<_>>();
    if requested.is_empty() {
        return Outcome::Degraded(sentinels());
    }

    let records = match source.audio_features(&requested) {
        Ok(records) => align(&requested, records),
        Err(e) => {
            let head: Vec<&String> = requested.iter().take(5).collect();
            warn!(batch = ?head, size = requested.len(), error = %e, "features.batch.failed");
            return Outcome::Degraded(sentinels());
        }
    };

    let mut returned = records.into_iter();
    let mut degraded = false;
    let vectors = batch.iter()
        .map(|id| {
            if id.trim().is_empty() {
                degraded = true;
                return FeatureVector::missing(id.as_str());
            }
            match returned.next().flatten() {
                Some(record) => {
                    // upstream echoes ids, keep ours as the key either way
                    let mut vector = FeatureVector::from(record);
                    vector.id = id.clone();
                    vector
                }
                None => {
                    degraded = true;
                    FeatureVector::missing(id.as_str())
                }
            }
        })
        .collect();

    if degraded { Outcome::Degraded(vectors) } else { Outcome::Ok(vectors) }
}

/// Feature vectors for `ids`, same length and order
pub fn fetch_features(source: &dyn CatalogSource, ids: &[String], batch_size: usize) ->
    Vec<FeatureVector> {

    let batch_size = batch_size.max(1);
    let mut vectors = Vec::with_capacity(ids.len());
    let mut degraded_batches = 0_usize;

    for batch in ids.chunks(batch_size) {
        let outcome = fetch_batch(source, batch);
        if outcome.is_degraded() {
            degraded_batches += 1;
        }
        match outcome.into_result() {
            Ok(batch_vectors) => vectors.extend(batch_vectors),
            Err(_) => vectors.extend(batch.iter().map(FeatureVector::missing)),
        }
    }

    let complete = vectors.iter().filter(|v| v.is_complete()).count();
    debug!(ids = ids.len(), complete, batch_size, degraded_batches, "features.done");
    vectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedCatalog, features};
    use crate::types::{Feature, FeatureValue};

    fn owned(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn catalog_with(ids: &[&str]) -> ScriptedCatalog {
        ids.iter().enumerate().fold(ScriptedCatalog::default(), |c, (i, id)| {
            c.with_features(id, [i as f64 / 10.0, 0.5, 0.5, 120.0, 0.1, 0.0, 0.2])
        })
    }

    #[test]
    fn batches_preserve_length_and_order() {
        let known: Vec<String> = (0..45).map(|i| format!("t{i}")).collect();
        let known_refs: Vec<&str> = known.iter().map(String::as_str).collect();
        let catalog = catalog_with(&known_refs);

        let vectors = fetch_features(&catalog, &known, 20);
        assert_eq!(vectors.len(), 45);
        assert!(vectors.iter().zip(&known).all(|(v, id)| &v.id == id));
        assert!(vectors.iter().all(FeatureVector::is_complete));

        let sizes: Vec<usize> = catalog.feature_batches().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![20, 20, 5]);
    }

    #[test]
    fn unknown_ids_become_sentinels_in_place() {
        let catalog = catalog_with(&["a", "c"]);
        let vectors = fetch_features(&catalog, &owned(&["a", "b", "c"]), 20);

        assert_eq!(vectors.len(), 3);
        assert!(vectors[0].is_complete());
        assert_eq!(vectors[1].id, "b");
        assert!(vectors[1].is_entirely_missing());
        assert_eq!(vectors[2].values()[Feature::Danceability.index()], FeatureValue::Present(0.1));
    }

    #[test]
    fn empty_ids_are_stripped_but_keep_their_slot() {
        let catalog = catalog_with(&["a", "b"]);
        let vectors = fetch_features(&catalog, &owned(&["a", "", "b"]), 20);

        assert_eq!(vectors.len(), 3);
        assert!(vectors[1].is_entirely_missing());
        assert!(vectors[2].is_complete());
        assert_eq!(catalog.feature_batches(), vec![owned(&["a", "b"])]);
    }

    #[test]
    fn failed_batch_degrades_to_sentinels_only_for_that_batch() {
        let catalog = catalog_with(&["a", "b", "c", "d"]).failing_features_for("c");
        let vectors = fetch_features(&catalog, &owned(&["a", "b", "c", "d"]), 2);

        assert_eq!(vectors.len(), 4);
        assert!(vectors[0].is_complete() && vectors[1].is_complete());
        assert!(vectors[2].is_entirely_missing() && vectors[3].is_entirely_missing());
        assert_eq!(vectors[3].id, "d");
    }

    #[test]
    fn misaligned_response_matches_by_id() {
        let requested = owned(&["a", "b", "c"]);
        let records = vec![Some(features("c", [0.3; 7])), Some(features("a", [0.1; 7]))];

        let aligned = align(&requested, records);
        assert_eq!(aligned.len(), 3);
        assert_eq!(aligned[0].as_ref().map(|f| f.id.as_str()), Some("a"));
        assert!(aligned[1].is_none());
        assert_eq!(aligned[2].as_ref().map(|f| f.id.as_str()), Some("c"));
    }

    #[test]
    fn empty_input_makes_no_calls() {
        let catalog = ScriptedCatalog::default();
        assert!(fetch_features(&catalog, &[], 20).is_empty());
        assert_eq!(catalog.calls(), 0);
    }
}
