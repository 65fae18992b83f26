//!
//! src/types.rs  Andrew Belles  Oct 18th, 2026
//!
//! Records exchanged between the catalog client and the pipeline stages,
//! and the per-call outcome type every stage reports through
//!
//!

use serde::{Deserialize, Serialize};

use crate::errors::SimilarError;

/// Kind of catalog entity a free-form query should resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Track,
    Artist,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Track  => "track",
            EntityKind::Artist => "artist"
        }
    }
}

/// Result of a single upstream call as seen by the stage that made it.
///
/// `Degraded` carries the fallback value the stage substituted, so the
/// pipeline keeps going with less data. `Fatal` ends the run.
#[derive(Debug)]
pub enum Outcome<T> {
    Ok(T),
    Degraded(T),
    Fatal(SimilarError),
}

impl<T> Outcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }

    /// Collapses Ok and Degraded into the value, Fatal into its error
    pub fn into_result(self) -> Result<T, SimilarError> {
        match self {
            Outcome::Ok(v) | Outcome::Degraded(v) => Ok(v),
            Outcome::Fatal(e) => Err(e),
        }
    }
}

///
/// Upstream summaries, shaped after the Spotify Web API payloads
///

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub name: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    // local files come back with a null id
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseSummary {
    pub id: String,
    pub name: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub name: String
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: AlbumRef,
    #[serde(default)]
    pub preview_url: Option<String>
}

/// Audio features record as returned upstream; any field may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub id: String,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>
}

///
/// Domain records
///

/// A track of the target artist's catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRef {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub preview_url: Option<String>
}

impl TrackRef {
    pub fn from_summary(summary: &TrackSummary, album: &str) -> Option<Self> {
        let id = summary.id.as_deref().filter(|id| !id.is_empty())?;
        Some( Self {
            id: id.to_string(),
            name: summary.name.clone(),
            artists: summary.artists.iter().map(|a| a.name.clone()).collect(),
            album: album.to_string(),
            preview_url: None
        })
    }

    pub fn artists_joined(&self) -> String {
        self.artists.join(", ")
    }
}

/// The seven acoustic descriptors, in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Danceability,
    Energy,
    Valence,
    Tempo,
    Acousticness,
    Instrumentalness,
    Liveness,
}

pub const FEATURE_COUNT: usize = 7;

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Danceability,
        Feature::Energy,
        Feature::Valence,
        Feature::Tempo,
        Feature::Acousticness,
        Feature::Instrumentalness,
        Feature::Liveness,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Danceability     => "danceability",
            Feature::Energy           => "energy",
            Feature::Valence          => "valence",
            Feature::Tempo            => "tempo",
            Feature::Acousticness     => "acousticness",
            Feature::Instrumentalness => "instrumentalness",
            Feature::Liveness         => "liveness"
        }
    }
}

/// A single feature cell, never an ambient NaN
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Present(f64),
    Missing,
}

impl FeatureValue {
    pub fn value(self) -> Option<f64> {
        match self {
            FeatureValue::Present(v) => Some(v),
            FeatureValue::Missing => None,
        }
    }
}

impl From<Option<f64>> for FeatureValue {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(x) if x.is_finite() => FeatureValue::Present(x),
            _ => FeatureValue::Missing,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub id: String,
    values: [FeatureValue; FEATURE_COUNT]
}

impl FeatureVector {
    pub fn new(id: impl Into<String>, values: [FeatureValue; FEATURE_COUNT]) -> Self {
        Self { id: id.into(), values }
    }

    /// All seven fields set to the missing sentinel
    pub fn missing(id: impl Into<String>) -> Self {
        Self::new(id, [FeatureValue::Missing; FEATURE_COUNT])
    }

    pub fn values(&self) -> &[FeatureValue; FEATURE_COUNT] {
        &self.values
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| v.value().is_some())
    }

    pub fn is_entirely_missing(&self) -> bool {
        self.values.iter().all(|v| v.value().is_none())
    }

    /// Dense row, only meaningful for complete vectors
    pub fn dense(&self) -> Option<[f64; FEATURE_COUNT]> {
        let mut row = [0.0; FEATURE_COUNT];
        for (slot, value) in row.iter_mut().zip(self.values.iter()) {
            *slot = value.value()?;
        }
        Some(row)
    }
}

impl From<AudioFeatures> for FeatureVector {
    fn from(f: AudioFeatures) -> Self {
        let values = [
            f.danceability.into(),
            f.energy.into(),
            f.valence.into(),
            f.tempo.into(),
            f.acousticness.into(),
            f.instrumentalness.into(),
            f.liveness.into(),
        ];
        Self::new(f.id, values)
    }
}

/// A candidate after ranking
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub track: TrackRef,
    pub similarity: f64
}
