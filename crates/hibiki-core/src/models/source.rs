use serde::{Deserialize, Serialize};

/// A single playable rendition of an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVariant {
    pub quality: String,
    pub url: String,
}

/// Resolved sources for one episode. Immutable once resolved; re-resolved on
/// episode change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub sources: Vec<SourceVariant>,
    pub download: Option<String>,
}

impl SourceDescriptor {
    pub const DEFAULT_QUALITY: &'static str = "default";

    /// Exact-label lookup. A missing label is a hard miss, never substituted.
    pub fn select(&self, quality: &str) -> Option<&SourceVariant> {
        self.sources.iter().find(|src| src.quality == quality)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
