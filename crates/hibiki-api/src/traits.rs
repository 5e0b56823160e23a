//! Trait definitions for the external playback services.
//!
//! The HTTP clients in this crate implement these traits, and the session
//! controller is generic over them, so tests can substitute in-process fakes.

use std::future::Future;

use hibiki_core::models::{EpisodeInfo, SkipBoundary, SourceDescriptor};

/// Resolves playable sources for one episode of a series.
pub trait SourceResolver: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn resolve(
        &self,
        series_id: &str,
        episode: u32,
    ) -> impl Future<Output = Result<SourceDescriptor, Self::Error>> + Send;
}

/// Lists the episodes the provider knows for a series.
pub trait EpisodeCatalog: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn episodes(
        &self,
        anilist_id: u64,
    ) -> impl Future<Output = Result<Vec<EpisodeInfo>, Self::Error>> + Send;
}

/// Fetches typed skip boundaries for one episode.
pub trait SkipTimeService: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn skip_times(
        &self,
        anilist_id: u64,
        episode: u32,
    ) -> impl Future<Output = Result<Vec<SkipBoundary>, Self::Error>> + Send;
}
