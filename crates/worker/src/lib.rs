//! The offline-support engine.
//!
//! Classifies intercepted requests, serves them cache-first or
//! network-first, rotates cache generations across deployments, and
//! coordinates with page contexts over a message protocol. The binary
//! drives the engine from a JSON-line host transport on stdio; embedding
//! hosts can use [`engine::Engine`] directly.

pub mod classifier;
pub mod engine;
pub mod lifecycle;
pub mod messages;
pub mod notify;
pub mod strategy;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutil;

pub use engine::{Engine, Event, Phase};
