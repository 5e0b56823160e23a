use crate::controls::ControlAction;

/// Lifecycle and interaction events emitted by a player instance.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Playback position advanced.
    TimeUpdate { seconds: f64 },
    Pause,
    Ended,
    /// The media load was aborted (navigation, source torn down).
    Abort,
    /// The instance was destroyed. Always the last event on the stream.
    Destroyed,
    /// A custom control was activated by the user.
    ControlActivated(ControlAction),
    /// The user picked a new rate from the playback-rate menu.
    RateChanged(f64),
}
