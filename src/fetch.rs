//!
//! src/fetch.rs  Andrew Belles  Oct 18th, 2026
//!
//! Defines the catalog boundary the pipeline consumes and the blocking
//! Spotify client behind it: token handling, retries and decoding
//!

use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::{rngs::SmallRng, Rng, SeedableRng};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{header, redirect, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::{FEATURE_BATCH_MAX, HttpConfig, METADATA_BATCH, RetryConfig, SpotifyConfig};
use crate::types::{
    ArtistSummary, AudioFeatures, EntityKind, ReleaseSummary, TrackMetadata, TrackSummary
};
use crate::SimilarError;

/// Tracks per album-tracks page, the upstream maximum
const RELEASE_TRACKS_LIMIT: u32 = 50;

/// Refresh the bearer this long before upstream says it expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Longest Retry-After we are willing to sleep through
const RETRY_AFTER_CAP: Duration = Duration::from_secs(30);

///
/// The five read operations the recommender needs from a music catalog.
/// Every call either succeeds with data or fails; stages decide how a
/// failure degrades.
///
pub trait CatalogSource {
    fn search_track(&self, query: &str, limit: u32) -> Result<Vec<TrackSummary>, SimilarError>;

    fn search_artist(&self, query: &str, limit: u32) -> Result<Vec<ArtistSummary>, SimilarError>;

    /// One page of the artist's albums and singles
    fn artist_releases(&self, artist_id: &str, page_size: u32, offset: u32) ->
        Result<Vec<ReleaseSummary>, SimilarError>;

    fn release_tracks(&self, release_id: &str) -> Result<Vec<TrackSummary>, SimilarError>;

    /// At most 50 ids per call, one slot per id, null for unknown ids
    fn tracks_metadata(&self, ids: &[String]) ->
        Result<Vec<Option<TrackMetadata>>, SimilarError>;

    /// At most 100 ids per call, positionally aligned with `ids`
    fn audio_features(&self, ids: &[String]) ->
        Result<Vec<Option<AudioFeatures>>, SimilarError>;
}

// Wire envelopes

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next: Option<String>
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<Paging<TrackSummary>>,
    artists: Option<Paging<ArtistSummary>>
}

#[derive(Debug, Deserialize)]
struct TracksResponse {
    #[serde(default)]
    tracks: Vec<Option<TrackMetadata>>
}

#[derive(Debug, Deserialize)]
struct AudioFeaturesResponse {
    #[serde(default)]
    audio_features: Vec<Option<AudioFeatures>>
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64
}

fn default_expires_in() -> u64 { 3600 }

#[derive(Debug, Clone)]
struct BearerToken {
    access: String,
    expires_at: Instant
}

impl BearerToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_EXPIRY_MARGIN < self.expires_at
    }
}

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::blocking::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

pub fn base_client(http: &HttpConfig) -> Result<Client, SimilarError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    client_helper(http)
        .default_headers(h)
        .build()
        .map_err(|e| SimilarError::Http(format!("build client: {e}")))
}

/// Exponential backoff with optional jitter for http_with_retry
fn generate_backoff(retry: &RetryConfig, attempt: u8, rng: &mut SmallRng) -> Duration {
    let base = retry.base_backoff.as_millis() as u64;
    let exp = (1_u64 << attempt.min(6)) * base;
    let jitter = if retry.jitter { rng.gen_range(50..=200) } else { 0 };
    Duration::from_millis(exp + jitter)
}

fn retry_after(resp: &Response) -> Option<Duration> {
    let secs = resp.headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;
    Some(Duration::from_secs(secs).min(RETRY_AFTER_CAP))
}

#[derive(Debug)]
pub struct SpotifyClient {
    http: Client,
    cfg: SpotifyConfig,
    retry: RetryConfig,
    token: Mutex<Option<BearerToken>>
}

impl SpotifyClient {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyConfig) ->
        Result<Self, SimilarError> {

        let http = base_client(http_config)?;
        Ok( Self {
            http,
            cfg: cfg.clone(),
            retry: http_config.retry.clone(),
            token: Mutex::new(None)
        })
    }

    pub fn token_request(&self) -> RequestBuilder {
        self.http
            .post(self.cfg.token_url.clone())
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
    }

    /// Client credentials bearer, fetched lazily and reused until close to expiry
    fn bearer(&self) -> Result<String, SimilarError> {
        let mut slot = self.token.lock()
            .map_err(|_| SimilarError::Http("token cache poisoned".to_string()))?;

        if let Some(token) = slot.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access.clone());
        }

        let resp = self.http_with_retry(self.token_request())?;
        let token: TokenResponse = Self::decode(resp, "token")?;
        debug!(expires_in = token.expires_in, "spotify.token.refreshed");

        let fresh = BearerToken {
            access: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in)
        };
        let access = fresh.access.clone();
        *slot = Some(fresh);
        Ok(access)
    }

    fn clear_token(&self) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
    }

    fn api(&self, path: &str) -> Result<Url, SimilarError> {
        self.cfg.api_base.join(path)
            .map_err(|e| SimilarError::Config(format!("bad api path {path}: {e}")))
    }

    fn http_with_retry(&self, request: RequestBuilder) -> Result<Response, SimilarError> {
        let mut rng = SmallRng::from_entropy();
        let mut attempt = 0_u8;
        loop {
            let response = request.try_clone()
                .ok_or_else(|| SimilarError::Http("non-cloneable request".to_string()))?
                .send();
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let retryable = self.retry.retryable_statuses.contains(&status.as_u16());
                    if !retryable || attempt >= self.retry.max_attempts {
                        return Ok(resp);
                    }
                    let backoff = retry_after(&resp)
                        .unwrap_or_else(|| generate_backoff(&self.retry, attempt, &mut rng));
                    warn!(status = %status, backoff = ?backoff.as_millis(), attempt, "http.retry");
                    std::thread::sleep(backoff);
                    attempt += 1;
                },
                Err(e) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(e.into());
                    }
                    let backoff = generate_backoff(&self.retry, attempt, &mut rng);
                    warn!(error = %e, backoff = ?backoff.as_millis(), attempt, "http.retry.error");
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
            }
        }
    }

    fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T, SimilarError> {
        let status = resp.status();
        if status.is_success() {
            return resp.json::<T>()
                .map_err(|e| SimilarError::Parse(format!("{what}: {e}")));
        }

        let body = resp.text().unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => SimilarError::NotFound(what.to_string()),
            StatusCode::TOO_MANY_REQUESTS => SimilarError::RateLimited(what.to_string()),
            _ => SimilarError::Http(format!("{what}: status {status}: {body}")),
        })
    }

    /// Authenticated GET, refreshing the bearer once if upstream rejects it
    fn get_json<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)], what: &str) ->
        Result<T, SimilarError> {

        let mut refreshed = false;
        loop {
            let bearer = self.bearer()?;
            let request = self.http.get(url.clone()).bearer_auth(&bearer).query(query);
            let resp = self.http_with_retry(request)?;

            if resp.status() == StatusCode::UNAUTHORIZED && !refreshed {
                warn!(what, "spotify.token.rejected");
                self.clear_token();
                refreshed = true;
                continue;
            }
            return Self::decode(resp, what);
        }
    }

    /// GET /v1/search?type=...&q=...&limit=
    fn search(&self, kind: EntityKind, query: &str, limit: u32) ->
        Result<SearchResponse, SimilarError> {
        let url = self.api("search")?;
        self.get_json(url, &[
            ("q", query.to_string()),
            ("type", kind.as_str().to_string()),
            ("limit", limit.to_string())
        ], "search")
    }
}

impl CatalogSource for SpotifyClient {
    fn search_track(&self, query: &str, limit: u32) -> Result<Vec<TrackSummary>, SimilarError> {
        let resp = self.search(EntityKind::Track, query, limit)?;
        Ok(resp.tracks.map(|p| p.items).unwrap_or_default())
    }

    fn search_artist(&self, query: &str, limit: u32) -> Result<Vec<ArtistSummary>, SimilarError> {
        let resp = self.search(EntityKind::Artist, query, limit)?;
        Ok(resp.artists.map(|p| p.items).unwrap_or_default())
    }

    /// GET /v1/artists/{id}/albums?include_groups=album,single&limit=&offset=
    fn artist_releases(&self, artist_id: &str, page_size: u32, offset: u32) ->
        Result<Vec<ReleaseSummary>, SimilarError> {
        let url = self.api(&format!("artists/{artist_id}/albums"))?;
        let page: Paging<ReleaseSummary> = self.get_json(url, &[
            ("include_groups", "album,single".to_string()),
            ("limit", page_size.to_string()),
            ("offset", offset.to_string())
        ], "artist albums")?;
        Ok(page.items)
    }

    /// GET /v1/albums/{id}/tracks?limit=&offset=, following `next`
    fn release_tracks(&self, release_id: &str) -> Result<Vec<TrackSummary>, SimilarError> {
        let url = self.api(&format!("albums/{release_id}/tracks"))?;
        let mut tracks = Vec::new();
        let mut offset = 0_u32;
        loop {
            let page: Paging<TrackSummary> = self.get_json(url.clone(), &[
                ("limit", RELEASE_TRACKS_LIMIT.to_string()),
                ("offset", offset.to_string())
            ], "album tracks")?;

            let fetched = page.items.len() as u32;
            tracks.extend(page.items);
            if page.next.is_none() || fetched == 0 {
                return Ok(tracks);
            }
            offset += fetched;
        }
    }

    /// GET /v1/tracks?ids=...
    fn tracks_metadata(&self, ids: &[String]) ->
        Result<Vec<Option<TrackMetadata>>, SimilarError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > METADATA_BATCH {
            return Err(SimilarError::InvalidInput(
                format!("{} ids exceeds tracks batch of {METADATA_BATCH}", ids.len())
            ));
        }
        let url = self.api("tracks")?;
        let resp: TracksResponse = self.get_json(url, &[("ids", ids.join(","))], "tracks")?;
        Ok(resp.tracks)
    }

    /// GET /v1/audio-features?ids=...
    fn audio_features(&self, ids: &[String]) ->
        Result<Vec<Option<AudioFeatures>>, SimilarError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > FEATURE_BATCH_MAX {
            return Err(SimilarError::InvalidInput(
                format!("{} ids exceeds audio features batch of {FEATURE_BATCH_MAX}", ids.len())
            ));
        }
        let url = self.api("audio-features")?;
        let resp: AudioFeaturesResponse =
            self.get_json(url, &[("ids", ids.join(","))], "audio features")?;
        Ok(resp.audio_features)
    }
}
