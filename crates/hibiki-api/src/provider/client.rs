use reqwest::Client;
use serde::de::DeserializeOwned;

use hibiki_core::models::{EpisodeInfo, SourceDescriptor};

use super::error::ProviderError;
use super::types::{SourcesResponse, WireEpisode};
use crate::traits::{EpisodeCatalog, SourceResolver};

/// Client for the streaming provider's episode and source endpoints.
pub struct ProviderClient {
    base_url: String,
    http: Client,
}

impl ProviderClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "provider request");

        let resp = self.http.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(path, status = status_code, "provider API error");
            return Err(ProviderError::Api {
                status: status_code,
                message: body,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

impl SourceResolver for ProviderClient {
    type Error = ProviderError;

    async fn resolve(
        &self,
        series_id: &str,
        episode: u32,
    ) -> Result<SourceDescriptor, ProviderError> {
        let resp: SourcesResponse = self
            .get_json(&format!("/sources/{series_id}/{episode}"))
            .await?;
        Ok(resp.into_descriptor())
    }
}

impl EpisodeCatalog for ProviderClient {
    type Error = ProviderError;

    async fn episodes(&self, anilist_id: u64) -> Result<Vec<EpisodeInfo>, ProviderError> {
        let episodes: Vec<WireEpisode> =
            self.get_json(&format!("/episodes/{anilist_id}")).await?;
        Ok(episodes.into_iter().map(Into::into).collect())
    }
}
