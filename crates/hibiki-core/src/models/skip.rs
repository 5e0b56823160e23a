use serde::{Deserialize, Serialize};

/// Kind of skippable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipKind {
    Opening,
    Ending,
}

impl SkipKind {
    /// Parse the skip-time service's wire value. Other types the service
    /// reports (recap, mixed-op, ...) are not offered as skip affordances.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "op" => Some(Self::Opening),
            "ed" => Some(Self::Ending),
            _ => None,
        }
    }

    /// Marker label shown on the progress bar.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Opening => "OP",
            Self::Ending => "ED",
        }
    }
}

/// A single typed boundary event as the skip-time service reports it.
/// Either bound may be missing; pairing sorts that out.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipBoundary {
    pub kind: SkipKind,
    pub start: Option<f64>,
    pub end: Option<f64>,
}

/// A paired skip interval within an episode.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipSegment {
    pub kind: SkipKind,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// Pair flat boundary events into segments.
///
/// Pairing is positional per kind: the n-th start of a kind pairs with the
/// n-th end of that kind. Unpaired boundaries are dropped, never invented,
/// and one malformed record does not discard the rest.
pub fn pair_segments(boundaries: &[SkipBoundary]) -> Vec<SkipSegment> {
    let mut segments = Vec::new();
    let mut dropped = 0usize;

    for kind in [SkipKind::Opening, SkipKind::Ending] {
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        for b in boundaries.iter().filter(|b| b.kind == kind) {
            if b.start.is_none() && b.end.is_none() {
                dropped += 1;
                continue;
            }
            if let Some(s) = b.start {
                starts.push(s);
            }
            if let Some(e) = b.end {
                ends.push(e);
            }
        }

        let paired = starts.len().min(ends.len());
        dropped += starts.len().max(ends.len()) - paired;
        for (start_seconds, end_seconds) in starts.into_iter().zip(ends) {
            segments.push(SkipSegment {
                kind,
                start_seconds,
                end_seconds,
            });
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, "dropped unpaired skip boundaries");
    }

    segments
}
