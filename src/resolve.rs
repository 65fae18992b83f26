//!
//! src/resolve.rs  Andrew Belles  Oct 18th, 2026
//!
//! Turns a shareable link, a catalog URI or a plain name into a
//! catalog id. Links and URIs are parsed locally, anything else
//! goes through a top-1 search
//!

use tracing::{debug, warn};
use url::Url;

use crate::fetch::CatalogSource;
use crate::types::{EntityKind, Outcome};
use crate::SimilarError;

const SHARE_HOST: &str = "open.spotify.com";
const URI_SCHEME: &str = "spotify:";

/// Raw ids are base62, reject anything else so they are safe in paths
fn is_raw_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Extracts the id from a shareable link or a `spotify:` URI.
///
/// Returns None for anything that is not one of those two forms, including
/// bare ids and plain names. Never touches the network.
pub fn extract_id(s: &str) -> Option<String> {
    let s = s.trim().trim_end_matches('/');
    if s.is_empty() {
        return None;
    }

    if let Some(rest) = s.strip_prefix(URI_SCHEME) {
        let id = rest.rsplit(':').next()?;
        return is_raw_id(id).then(|| id.to_string());
    }

    if s.contains(SHARE_HOST) {
        return id_from_link(s);
    }
    None
}

fn id_from_link(s: &str) -> Option<String> {
    let with_scheme = if s.contains("://") { s.to_string() } else { format!("https://{s}") };
    let url = Url::parse(&with_scheme).ok()?;
    if !url.host_str()?.eq_ignore_ascii_case(SHARE_HOST) {
        return None;
    }

    // /intl-ja/track/{id} or /track/{id}
    let segments: Vec<&str> = url.path_segments()?
        .filter(|seg| !seg.is_empty())
        .skip_while(|seg| seg.starts_with("intl-"))
        .collect();

    match segments.as_slice() {
        [_resource, id, ..] if is_raw_id(id) => Some(id.to_string()),
        _ => None
    }
}

/// Canonical URI for an id, parses back to the same id
pub fn canonical_uri(kind: EntityKind, id: &str) -> String {
    format!("{URI_SCHEME}{}:{id}", kind.as_str())
}

/// Shareable link for an id, parses back to the same id
pub fn share_link(kind: EntityKind, id: &str) -> String {
    format!("https://{SHARE_HOST}/{}/{id}", kind.as_str())
}

/// Top-1 search. An empty result set or a failed call are both NotFound,
/// failures are logged and never propagated raw.
fn search_top(source: &dyn CatalogSource, query: &str, kind: EntityKind) -> Outcome<String> {
    let found = match kind {
        EntityKind::Track => source.search_track(query, 1)
            .map(|items| items.into_iter().find_map(|t| t.id)),
        EntityKind::Artist => source.search_artist(query, 1)
            .map(|items| items.into_iter().next().map(|a| a.id)),
    };

    match found {
        Ok(Some(id)) if !id.is_empty() => Outcome::Ok(id),
        Ok(_) => Outcome::Fatal(SimilarError::NotFound(
            format!("{} \"{query}\"", kind.as_str())
        )),
        Err(e) => {
            warn!(kind = kind.as_str(), query, error = %e, "resolve.search.failed");
            Outcome::Fatal(SimilarError::NotFound(
                format!("{} \"{query}\" (search failed)", kind.as_str())
            ))
        }
    }
}

pub fn resolve(source: &dyn CatalogSource, query: &str, kind: EntityKind) ->
    Result<String, SimilarError> {

    if query.trim().is_empty() {
        return Err(SimilarError::NotFound(format!("empty {} query", kind.as_str())));
    }

    if let Some(id) = extract_id(query) {
        debug!(uri = %canonical_uri(kind, &id), "resolve.parsed");
        return Ok(id);
    }

    let id = search_top(source, query.trim(), kind).into_result()?;
    debug!(uri = %canonical_uri(kind, &id), "resolve.searched");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCatalog;

    #[test]
    fn extracts_from_share_links() {
        let id = "6GtOsEzNUhJghrIf6UTbRV";
        for link in [
            format!("https://open.spotify.com/track/{id}"),
            format!("https://open.spotify.com/track/{id}/"),
            format!("https://open.spotify.com/track/{id}?si=abc123"),
            format!("https://open.spotify.com/intl-ja/track/{id}?si=abc123"),
            format!("open.spotify.com/track/{id}"),
            format!("  https://open.spotify.com/artist/{id}  "),
        ] {
            assert_eq!(extract_id(&link).as_deref(), Some(id), "{link}");
        }
    }

    #[test]
    fn extracts_from_uris() {
        assert_eq!(extract_id("spotify:track:abc123").as_deref(), Some("abc123"));
        assert_eq!(extract_id("spotify:artist:XyZ").as_deref(), Some("XyZ"));
        assert_eq!(extract_id("spotify:track:"), None);
    }

    #[test]
    fn plain_text_and_malformed_links_are_not_ids() {
        assert_eq!(extract_id(""), None);
        assert_eq!(extract_id("   "), None);
        assert_eq!(extract_id("Breathe Deeper"), None);
        assert_eq!(extract_id("6GtOsEzNUhJghrIf6UTbRV"), None);
        assert_eq!(extract_id("https://open.spotify.com/"), None);
        assert_eq!(extract_id("https://open.spotify.com/track"), None);
        assert_eq!(extract_id("https://example.com/track/abc"), None);
        assert_eq!(extract_id("https://open.spotify.com/track/ab%2Fcd"), None);
    }

    #[test]
    fn extraction_is_idempotent_through_canonical_forms() {
        for input in [
            "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=x",
            "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
        ] {
            let id = extract_id(input).unwrap();
            assert_eq!(extract_id(&canonical_uri(EntityKind::Track, &id)), Some(id.clone()));
            assert_eq!(extract_id(&share_link(EntityKind::Track, &id)), Some(id));
        }
    }

    #[test]
    fn links_resolve_without_network() {
        let catalog = ScriptedCatalog::default();
        let id = resolve(&catalog, "spotify:track:abc", EntityKind::Track).unwrap();
        assert_eq!(id, "abc");
        assert_eq!(catalog.calls(), 0);
    }

    #[test]
    fn names_fall_back_to_search() {
        let catalog = ScriptedCatalog::default()
            .with_track_search("Breathe Deeper", "t-breathe")
            .with_artist_search("Tame Impala", "a-tame");

        assert_eq!(resolve(&catalog, "Breathe Deeper", EntityKind::Track).unwrap(), "t-breathe");
        assert_eq!(resolve(&catalog, " Tame Impala ", EntityKind::Artist).unwrap(), "a-tame");
    }

    #[test]
    fn empty_results_and_failures_are_not_found() {
        let catalog = ScriptedCatalog::default().failing_search();
        let err = resolve(&catalog, "anything", EntityKind::Artist).unwrap_err();
        assert!(matches!(err, SimilarError::NotFound(_)));

        let catalog = ScriptedCatalog::default();
        let err = resolve(&catalog, "nobody", EntityKind::Track).unwrap_err();
        assert!(matches!(err, SimilarError::NotFound(_)));

        let err = resolve(&catalog, "", EntityKind::Track).unwrap_err();
        assert!(matches!(err, SimilarError::NotFound(_)));
    }
}
