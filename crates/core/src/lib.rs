//! Core types and shared functionality for swkit.
//!
//! This crate provides:
//! - The versioned cache store (SQLite-backed, generation-scoped)
//! - Unified error types
//! - Layered engine configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, GenerationStore};
pub use config::AppConfig;
pub use error::Error;
