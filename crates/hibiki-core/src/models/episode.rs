use serde::{Deserialize, Serialize};

/// Cross-service identifiers for a series.
///
/// The provider keys episodes by its own string id; the skip-time service is
/// keyed by the AniList id. Either external id may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesIds {
    pub anilist: Option<u64>,
    pub mal: Option<u64>,
}

/// The tuple that uniquely determines which source and progress record apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeIdentity {
    pub series: String,
    pub episode: u32,
}

impl EpisodeIdentity {
    pub fn new(series: impl Into<String>, episode: u32) -> Self {
        Self {
            series: series.into(),
            episode,
        }
    }
}

impl std::fmt::Display for EpisodeIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ep {}", self.series, self.episode)
    }
}

/// One row of the provider's episode catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub number: u32,
    pub title: Option<String>,
    pub image: Option<String>,
}
