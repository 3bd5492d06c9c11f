//! Network client for swkit.
//!
//! This crate provides the HTTP fetch pipeline behind a trait seam so the
//! engine's strategies and lifecycle can be exercised against scripted
//! fakes as well as the real network.

pub mod fetch;

pub use fetch::{Fetch, FetchClient, FetchConfig, FetchResponse, WebRequest};
