//!
//! src/config.rs  Andrew Belles  Oct 18th, 2026
//!
//! Loads credentials, endpoints and pipeline limits from the environment
//!

use url::Url;
use std::time;
use crate::SimilarError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 4;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

pub const RETRY_MAX_ATTEMPTS: u8 = 3;
pub const RETRY_BASE_BACKOFF: u64 = 250;
pub const RETRY_JITTER: bool = true;
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Constants for the recommender itself
pub const RELEASE_PAGE_SIZE: u32 = 50;
pub const METADATA_BATCH: usize = 50;
pub const FEATURE_BATCH: usize = 20;
pub const FEATURE_BATCH_MAX: usize = 100;
pub const TRACK_CAP: usize = 300;
pub const TOP_K: usize = 10;
pub const TOP_K_MAX: usize = 50;

/// Wrapper over env::var to return an invalid enviroment var error
fn env_check(s: &str) -> Result<String, SimilarError> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(SimilarError::Config(format!("{s} was not set"))),
    }
}

/// Parses an optional raw value, falling back to default when absent or bad
fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|s| s.trim().parse::<T>().ok()).unwrap_or(default)
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

/// Configuration that Spotify expects when hitting endpoints
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: Url,
    pub api_base: Url,
}

fn parse_endpoint(raw: &str, name: &str, host: &str) -> Result<Url, SimilarError> {
    let url = Url::parse(raw)
        .map_err(|e| SimilarError::Config(format!("{name} invalid {e}")))?;

    // ensure valid https and hostname
    ensure_https(&url).map_err(SimilarError::Config)?;
    ensure_host(&url, host).map_err(SimilarError::Config)?;
    Ok(url)
}

fn build_spotify() -> Result<SpotifyConfig, SimilarError> {
    let client_id     = env_check("SPOTIFY_CLIENT_ID")?;
    let client_secret = env_check("SPOTIFY_CLIENT_SECRET")?;

    let token_url = std::env::var("SPOTIFY_TOKEN_URL")
        .unwrap_or_else(|_| "https://accounts.spotify.com/api/token".to_string());
    let api_base  = std::env::var("SPOTIFY_API_BASE")
        .unwrap_or_else(|_| "https://api.spotify.com/v1/".to_string());

    let token_url    = parse_endpoint(&token_url, "SPOTIFY_TOKEN_URL", "accounts.spotify.com")?;
    let mut api_base = parse_endpoint(&api_base, "SPOTIFY_API_BASE", "api.spotify.com")?;
    ensure_trailing_slash(&mut api_base);

    Ok( SpotifyConfig { client_id, client_secret, token_url, api_base })
}

///
/// Configuration for Http timeouts, retries, etc.
///
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u8,
    pub base_backoff: time::Duration,
    pub jitter: bool,
    pub retryable_statuses: Vec<u16>
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_backoff: time::Duration::from_millis(RETRY_BASE_BACKOFF),
            jitter: RETRY_JITTER,
            retryable_statuses: RETRYABLE_STATUSES.to_vec()
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
    pub retry: RetryConfig
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
            retry: RetryConfig::default()
        }
    }
}

///
/// Limits for catalog enumeration, batching and result size
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendConfig {
    pub track_cap: usize,       // unique catalog tracks to consider
    pub page_size: u32,         // releases per page
    pub feature_batch: usize,   // ids per audio-features call
    pub metadata_batch: usize,  // ids per tracks call
    pub top_k: usize,           // default result count
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            track_cap: TRACK_CAP,
            page_size: RELEASE_PAGE_SIZE,
            feature_batch: FEATURE_BATCH,
            metadata_batch: METADATA_BATCH,
            top_k: TOP_K
        }
    }
}

impl RecommendConfig {
    /// Builds limits from a variable lookup so tests need not touch the
    /// process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            track_cap: parse_or(lookup("SIMILAR_TRACK_CAP"), defaults.track_cap),
            feature_batch: parse_or(lookup("SIMILAR_FEATURE_BATCH"), defaults.feature_batch)
                .clamp(1, FEATURE_BATCH_MAX),
            top_k: clamp_top_k(parse_or(lookup("SIMILAR_TOP_K"), defaults.top_k)),
            ..defaults
        }
    }
}

/// Top-K is caller configurable but capped
pub fn clamp_top_k(k: usize) -> usize {
    k.clamp(1, TOP_K_MAX)
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

impl LogFormat {
    fn parse(s: &str) -> Option<LogFormat> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json"   => Some(LogFormat::Json),
            _ => None
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "warn,similar_tracks=info,reqwest=warn".to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: true,
        }
    }
}

fn build_logging() -> LoggingConfig {
    let defaults = LoggingConfig::default();
    let format = std::env::var("SIMILAR_LOG_FORMAT")
        .ok()
        .and_then(|s| LogFormat::parse(&s))
        .unwrap_or(defaults.format);

    LoggingConfig {
        format,
        with_ansi: format == LogFormat::Pretty,
        include_file_line: format == LogFormat::Json,
        ..defaults
    }
}

///
/// AppConfig which holds everything the client and pipeline need
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub spotify: SpotifyConfig,
    pub http: HttpConfig,
    pub recommend: RecommendConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, SimilarError> {
    dotenvy::dotenv().ok();

    let spotify   = build_spotify()?;
    let http      = HttpConfig::default();
    let recommend = RecommendConfig::from_lookup(|key| std::env::var(key).ok());
    let logging   = build_logging();

    Ok( AppConfig { spotify, http, recommend, logging } )
}
