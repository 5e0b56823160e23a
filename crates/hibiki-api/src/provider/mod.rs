pub mod client;
pub mod error;
pub mod types;

pub use client::ProviderClient;
pub use error::ProviderError;
