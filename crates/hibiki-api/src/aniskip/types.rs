use serde::Deserialize;

use hibiki_core::models::{SkipBoundary, SkipKind};

/// Wire shape of `GET /v2/skip-times/{anilist_id}/{episode}`.
///
/// The body carries its own `statusCode`; only 200 bodies hold usable
/// results, anything else means "no segments known".
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipTimesResponse {
    pub status_code: u16,
    #[serde(default)]
    pub results: Vec<SkipResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipResult {
    pub skip_type: String,
    #[serde(default)]
    pub interval: SkipInterval,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipInterval {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

impl SkipTimesResponse {
    /// Flatten into typed boundary events. Skip types we don't overlay
    /// (recap, mixed-op, ...) are ignored here, not treated as errors.
    pub fn into_boundaries(self) -> Vec<SkipBoundary> {
        if self.status_code != 200 {
            tracing::debug!(status = self.status_code, "skip-times body not OK");
            return Vec::new();
        }

        self.results
            .into_iter()
            .filter_map(|result| {
                let kind = SkipKind::from_wire(&result.skip_type)?;
                Some(SkipBoundary {
                    kind,
                    start: result.interval.start_time,
                    end: result.interval.end_time,
                })
            })
            .collect()
    }
}
