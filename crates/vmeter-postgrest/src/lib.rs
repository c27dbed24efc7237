//! PostgREST client for the presets table.
//!
//! This crate provides:
//! - A small REST client with apikey auth, tracing spans and metrics
//! - Retry with exponential backoff and jitter
//! - The `PresetRepository` trait with PostgREST and in-memory backends

pub mod client;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod repository;
pub mod retry;

#[cfg(test)]
mod client_tests;

pub use client::{PostgrestClient, PostgrestConfig};
pub use error::{PostgrestError, PostgrestResult};
pub use memory::InMemoryPresetRepository;
pub use repository::{PostgrestPresetRepository, PresetRepository, PresetRow};
pub use retry::RetryConfig;
