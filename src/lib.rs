//! Odds feed ingest backend
//!
//! Polls an upstream odds feed, resolves its opaque ids through a
//! separately published mapping table and serves the reconciled set of
//! current events over HTTP.

pub mod api;
pub mod config;
pub mod events;
pub mod feed;
pub mod mapping;
pub mod middleware;
pub mod models;
pub mod pipeline;
