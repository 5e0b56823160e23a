use serde::Deserialize;

use hibiki_core::models::{EpisodeInfo, SourceDescriptor, SourceVariant};

/// Wire shape of `GET /sources/{series_id}/{episode}`.
#[derive(Debug, Deserialize)]
pub struct SourcesResponse {
    #[serde(default)]
    pub sources: Vec<WireSource>,
    #[serde(default)]
    pub download: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireSource {
    pub quality: String,
    pub url: String,
}

impl SourcesResponse {
    pub fn into_descriptor(self) -> SourceDescriptor {
        SourceDescriptor {
            sources: self
                .sources
                .into_iter()
                .map(|src| SourceVariant {
                    quality: src.quality,
                    url: src.url,
                })
                .collect(),
            download: self.download,
        }
    }
}

/// Wire shape of one entry of `GET /episodes/{anilist_id}`.
#[derive(Debug, Deserialize)]
pub struct WireEpisode {
    pub number: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl From<WireEpisode> for EpisodeInfo {
    fn from(ep: WireEpisode) -> Self {
        EpisodeInfo {
            number: ep.number,
            title: ep.title,
            image: ep.image,
        }
    }
}
