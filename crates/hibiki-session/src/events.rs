use hibiki_core::models::EpisodeIdentity;

/// Notifications the controller publishes for the surrounding UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Stored progress overrode the requested episode number.
    EpisodeRedirected { requested: u32, resolved: u32 },
    /// A source was loaded into the player for this identity.
    SourceLoaded { identity: EpisodeIdentity },
    /// A download link accompanied the resolved sources.
    DownloadAvailable { url: String },
    /// Skip boundaries are known for the active episode: the ordered
    /// opening and ending boundary times.
    SegmentsChanged {
        openings: Vec<f64>,
        endings: Vec<f64>,
    },
}
