//!
//! src/errors.rs  Andrew Belles  Oct 18th, 2026
//!
//! Defines enums and methods of error conversion
//! for errors the recommender uses
//!
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimilarError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no tracks found for artist {0}")]
    EmptyCatalog(String),
    #[error("no audio features available for the seed tracks")]
    EmptySeedFeatures,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl SimilarError {
    /// Conditions that end a run with a message for the user rather than
    /// a degraded result.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SimilarError::NotFound(_)
                | SimilarError::EmptyCatalog(_)
                | SimilarError::EmptySeedFeatures
                | SimilarError::InvalidInput(_)
        )
    }
}

impl From<reqwest::Error> for SimilarError {
    fn from(e: reqwest::Error) -> Self { SimilarError::Http(e.to_string()) }
}

impl From<serde_json::Error> for SimilarError {
    fn from(e: serde_json::Error) -> Self { SimilarError::Parse(e.to_string()) }
}

impl From<url::ParseError> for SimilarError {
    fn from(e: url::ParseError) -> Self { SimilarError::Config(e.to_string()) }
}
