//! Sluice - client-side admission control for outbound API requests
//!
//! This crate caps the rate at which callers may hit an external API using a
//! sliding window limiter shared across threads and tasks. Callers block until
//! admitted (or cancelled) and only then perform the gated request.

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod ratelimit;
