//! Maintenance API: wire types, the HTTP client and its cached front.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod transport;
pub mod types;
