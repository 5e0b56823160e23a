use std::future::Future;

use tokio::sync::mpsc;

use crate::controls::{ControlDescriptor, Highlight};
use crate::events::PlayerEvent;

/// Metadata attached to a source load.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLoad {
    pub src: String,
    pub poster: Option<String>,
    pub title: String,
}

/// Creation-time configuration for a player instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub autoplay: bool,
    pub playback_rate: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            autoplay: false,
            playback_rate: 1.0,
        }
    }
}

/// One live player instance.
///
/// Only the session controller creates, rebinds and destroys instances; all
/// event handling is read/react-only with respect to the instance's internal
/// state.
pub trait PlayerHandle: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Take the instance's event stream. The stream closes when the instance
    /// is destroyed, which is how listeners are released on rebind.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<PlayerEvent>;

    /// Load a new source. Resolves once the load has been accepted.
    fn change_source(
        &self,
        load: SourceLoad,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn seek(&self, seconds: f64);

    fn current_time(&self) -> f64;

    /// Replace the progress-bar markers.
    fn set_highlights(&self, highlights: Vec<Highlight>);

    /// Attach custom controls. Called exactly once per instance.
    fn install_controls(&self, controls: Vec<ControlDescriptor>);

    /// Tear the instance down. Emits `Destroyed` and closes the event stream.
    fn destroy(&self);
}

/// Creates player instances bound to the host surface.
pub trait PlayerFactory: Send + Sync + 'static {
    type Player: PlayerHandle;
    type Error: std::error::Error + Send + Sync + 'static;

    fn create(&self, config: PlayerConfig) -> Result<Self::Player, Self::Error>;
}
