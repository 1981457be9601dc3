//! Shuffle a Spotify playlist from the command line
//!
//! Reads a bearer token from `SPOTIFY_ACCESS_TOKEN` (obtain one with the
//! playlist-read and playlist-modify scopes). Without an argument the user's
//! playlists are listed; with one, the playlist is shuffled. The argument may
//! be a listing index, a playlist ID or a `spotify:playlist:` URI.
//!
//! Run with:
//! ```bash
//! # List playlists
//! SPOTIFY_ACCESS_TOKEN=BQDx0... cargo run -p core-service --example shuffle_playlist
//!
//! # Shuffle the third listed playlist
//! SPOTIFY_ACCESS_TOKEN=BQDx0... cargo run -p core-service --example shuffle_playlist -- 2
//!
//! # Shuffle by URI with JSON logs
//! SPOTIFY_ACCESS_TOKEN=BQDx0... cargo run -p core-service --example shuffle_playlist -- \
//!     spotify:playlist:37i9dQZF1DXcBWIGoYBM5M json
//! ```

use anyhow::{bail, Context};
use bridge_traits::SystemClock;
use core_auth::REQUIRED_SCOPES;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{
    bootstrap_desktop, AccessToken, CoreEvent, ResyncEvent, ServiceConfig, StaticTokenProvider,
};
use std::env;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(2).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };
    init_logging(LoggingConfig::default().with_format(format))?;

    let secret = env::var("SPOTIFY_ACCESS_TOKEN").context("SPOTIFY_ACCESS_TOKEN is not set")?;
    let expires_in: i64 = env::var("SPOTIFY_TOKEN_EXPIRES_IN")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(3600);
    let token = AccessToken::expiring_in(
        &SystemClock,
        secret,
        expires_in,
        REQUIRED_SCOPES.iter().map(|scope| scope.to_string()).collect(),
    );

    let service = bootstrap_desktop(
        Arc::new(StaticTokenProvider::new(token)),
        ServiceConfig::default(),
    )?;

    info!(
        seconds_remaining = service.token_seconds_remaining().await?,
        "Session ready"
    );

    let playlists = service.list_playlists().await?;

    let Some(selection) = args.get(1) else {
        for (index, playlist) in playlists.iter().enumerate() {
            match playlist.declared_total {
                Some(total) => println!("{index:>3}  {} ({total} tracks)", playlist.name),
                None => println!("{index:>3}  {} [INVALID]", playlist.name),
            }
        }
        return Ok(());
    };

    let mut events = service.subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let CoreEvent::Resync(ResyncEvent::ChunkCommitted {
                phase,
                chunk_index,
                chunk_count,
                ..
            }) = &event
            {
                println!("{phase}: {chunk_index}/{chunk_count}");
            }
            if matches!(
                event,
                CoreEvent::Resync(ResyncEvent::Completed { .. } | ResyncEvent::Failed { .. })
            ) {
                break;
            }
        }
    });

    let result = match selection.parse::<usize>() {
        Ok(index) => service.shuffle_selection(index).await,
        Err(_) => service.shuffle_playlist(selection).await,
    };
    progress.abort();

    match result {
        Ok(summary) => {
            println!(
                "Shuffled {} tracks ({} local moved, {} unavailable skipped) in {} ms",
                summary.added_count,
                summary.local_reordered_count,
                summary.skipped_count,
                summary.duration_ms
            );
            Ok(())
        }
        Err(err) if err.remote_modified() => {
            error!("The playlist was left partially rewritten; run the shuffle again");
            bail!(err)
        }
        Err(err) => bail!(err),
    }
}
