//! Object storage for uploaded videos.
//!
//! Talks to the Supabase storage REST API. Objects are written under the
//! `videos/` prefix of one bucket and exposed through public URLs.

pub mod client;
pub mod error;

pub use client::{StorageClient, StorageConfig, VideoStore, DEFAULT_BUCKET};
pub use error::{StorageError, StorageResult};
