pub mod client;
pub mod error;
pub mod types;

pub use client::AniSkipClient;
pub use error::AniSkipError;
