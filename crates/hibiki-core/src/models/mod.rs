mod episode;
mod skip;
mod source;
mod watch;

pub use episode::{EpisodeIdentity, EpisodeInfo, SeriesIds};
pub use skip::{pair_segments, SkipBoundary, SkipKind, SkipSegment};
pub use source::{SourceDescriptor, SourceVariant};
pub use watch::WatchState;
