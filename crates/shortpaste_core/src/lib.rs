//! Core domain library for shortpaste (keys, rate limits, storage, documents).

/// Configuration loading and defaults.
pub mod config;
/// Shared default values.
pub mod constants;
/// Application error types (storage/domain).
pub mod error;
/// Short key generation strategies.
pub mod keygen;
/// Data models for API requests and persistence.
pub mod models;
/// Per-client admission control for the write path.
pub mod ratelimit;
/// Pluggable document storage backends.
pub mod storage;
/// Document save/load orchestration.
pub mod store;

pub use config::Config;
pub use constants::DEFAULT_PORT;
pub use error::{AppError, StorageError};
pub use keygen::{KeyGenerator, KeyGeneratorKind};
pub use ratelimit::{RateDecision, RateLimiter};
pub use storage::{StorageBackend, StorageKind};
pub use store::DocumentStore;
