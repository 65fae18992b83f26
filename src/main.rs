//!
//! src/main.rs  Andrew Belles  Oct 18th, 2026
//!
//! Entry point of the recommender: parses the command line, loads
//! configuration, runs one recommendation and prints the result
//!
//!

mod config;
mod errors;
mod logging;

mod types;
mod fetch;
mod resolve;
mod catalog;
mod features;
mod rank;
mod pipeline;

#[cfg(test)]
mod testing;

use clap::Parser;

use crate::errors::SimilarError;
use crate::pipeline::{Recommendation, RecommendRequest};
use crate::types::EntityKind;

#[derive(Debug, Parser)]
#[command(name = "similar-tracks", version, about = "Find tracks by an artist that sound like your favourites")]
struct Cli {
    /// One or two seed tracks, as a name, share link or spotify: URI
    #[arg(required = true, num_args = 1..=2)]
    seeds: Vec<String>,

    /// Artist whose catalog is searched, as a name, share link or URI
    #[arg(long, short)]
    artist: String,

    /// Number of results (1 to 50, default from SIMILAR_TOP_K or 10)
    #[arg(long, short = 'k')]
    top_k: Option<usize>,

    /// Print the recommendation as JSON
    #[arg(long)]
    json: bool,
}

fn render(out: &Recommendation) {
    for candidate in &out.results {
        let track = &candidate.track;
        println!(
            "{} — {} — {} (similarity: {:.3})",
            track.name, track.artists_joined(), track.album, candidate.similarity
        );
        println!("  {}", resolve::share_link(EntityKind::Track, &track.id));
        if let Some(preview) = &track.preview_url {
            println!("  preview: {preview}");
        }
    }
}

/// Message shown for conditions that end a run without results
fn user_message(e: &SimilarError) -> String {
    match e {
        SimilarError::NotFound(what) => format!("Could not find {what}. Check your input."),
        SimilarError::EmptyCatalog(_) => "No tracks found for that artist.".to_string(),
        SimilarError::EmptySeedFeatures =>
            "Audio features for the seed tracks are unavailable.".to_string(),
        other => other.to_string(),
    }
}

fn main() -> Result<(), SimilarError> {
    let cli  = Cli::parse();
    let cfgs = config::load_config()?;
    let log_guard = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service = "similar-tracks",
        version = %env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let spotify = fetch::SpotifyClient::new(&cfgs.http, &cfgs.spotify)?;
    let request = RecommendRequest {
        seeds: cli.seeds,
        artist: cli.artist,
        top_k: cli.top_k.unwrap_or(cfgs.recommend.top_k)
    };

    match pipeline::recommend(&spotify, &request, &cfgs.recommend) {
        Ok(out) if cli.json => {
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Ok(out) => {
            if out.results.is_empty() {
                println!("No tracks with usable audio features were found.");
            }
            render(&out);
            Ok(())
        }
        Err(e) if e.is_terminal() => {
            tracing::warn!(error = %e, "run.stopped");
            eprintln!("{}", user_message(&e));
            drop(log_guard);
            std::process::exit(2);
        }
        Err(e) => Err(e),
    }
}
