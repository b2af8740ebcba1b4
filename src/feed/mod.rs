pub mod client; // HTTP client for /api/state and /api/mappings
pub mod error;
pub mod schema; // Response shape + consistency checks
pub mod sync; // Paired fetch with fixed-delay retry
pub mod wire; // Delimited payload decoding

pub use client::{FeedSource, HttpFeedClient};
pub use error::FetchError;
pub use schema::{MappingsResponse, StateResponse, SyncedPayload};
pub use sync::SynchronizedFetcher;
