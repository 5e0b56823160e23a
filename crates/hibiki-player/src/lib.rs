//! Interface boundary to the externally owned player engine.
//!
//! The engine itself (decoding, rendering, chrome, gestures) lives outside
//! this workspace; these types pin down the exact surface the session
//! controller is allowed to touch.

pub mod controls;
pub mod events;
pub mod handle;

pub use controls::{seek_controls, ControlAction, ControlDescriptor, Highlight};
pub use events::PlayerEvent;
pub use handle::{PlayerConfig, PlayerFactory, PlayerHandle, SourceLoad};
