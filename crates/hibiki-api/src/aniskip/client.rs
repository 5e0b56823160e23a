use reqwest::Client;

use hibiki_core::models::SkipBoundary;

use super::error::AniSkipError;
use super::types::SkipTimesResponse;
use crate::traits::SkipTimeService;

const API_URL: &str = "https://api.aniskip.com";

/// Skip types requested from the service. We only overlay op/ed, but the
/// upstream endpoint is queried with its full type list.
const SKIP_TYPES_QUERY: &str =
    "types=op&types=recap&types=mixed-op&types=ed&types=mixed-ed&episodeLength";

/// Client for the AniSkip skip-times API.
pub struct AniSkipClient {
    base_url: String,
    http: Client,
}

impl AniSkipClient {
    pub fn new() -> Self {
        Self::with_base_url(API_URL)
    }

    /// Point the client at a non-default host (tests, mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
        }
    }
}

impl Default for AniSkipClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SkipTimeService for AniSkipClient {
    type Error = AniSkipError;

    async fn skip_times(
        &self,
        anilist_id: u64,
        episode: u32,
    ) -> Result<Vec<SkipBoundary>, AniSkipError> {
        let url = format!(
            "{}/v2/skip-times/{anilist_id}/{episode}?{SKIP_TYPES_QUERY}",
            self.base_url
        );
        tracing::debug!(anilist_id, episode, "fetching skip times");

        let resp = self.http.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(anilist_id, episode, status = status_code, "skip-times error");
            return Err(AniSkipError::Api {
                status: status_code,
                message: body,
            });
        }

        let body = resp
            .json::<SkipTimesResponse>()
            .await
            .map_err(|e| AniSkipError::Parse(e.to_string()))?;

        Ok(body.into_boundaries())
    }
}
