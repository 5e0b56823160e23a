use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-watched record for a series, owned by the progress store.
///
/// Invariants: `episode >= 1`, `position_seconds >= 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchState {
    pub series_id: String,
    pub episode: u32,
    pub position_seconds: f64,
    pub updated_at: DateTime<Utc>,
}
