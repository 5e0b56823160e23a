mod controller;
mod db;
mod events;

pub use controller::{BindRequest, SessionController, SessionError};
pub use db::DbHandle;
pub use events::SessionEvent;
