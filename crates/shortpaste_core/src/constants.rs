//! Shared constants used across shortpaste crates.

/// Default API port.
pub const DEFAULT_PORT: u16 = 7777;

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default length of keys assigned to regular documents.
pub const DEFAULT_KEY_LENGTH: usize = 10;

/// Default length of keys assigned to URL aliases.
pub const DEFAULT_URL_KEY_LENGTH: usize = 7;

/// Default maximum document size in bytes.
pub const DEFAULT_MAX_DOCUMENT_LENGTH: usize = 400_000;

/// Candidate keys tried before a save gives up with key-space exhaustion.
pub const DEFAULT_MAX_KEY_ATTEMPTS: usize = 10;

/// Rate-limit category applied to document writes.
pub const NORMAL_CATEGORY: &str = "normal";

/// Default quota for the `normal` category.
pub const DEFAULT_NORMAL_TOTAL_REQUESTS: u32 = 500;
/// Default window length for the `normal` category, in milliseconds.
pub const DEFAULT_NORMAL_EVERY_MS: u64 = 60_000;

/// Default on-disk location for stored documents.
pub const DEFAULT_STORAGE_PATH: &str = "./data";

/// Upper bound on a single storage call before the request gives up.
pub const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;

/// Minimum length accepted for caller-requested slugs.
pub const MIN_SLUG_LENGTH: usize = 3;

/// Environment variable naming a JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "SHORTPASTE_CONFIG";
