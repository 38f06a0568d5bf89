//! Document save/load orchestration.
//!
//! A save runs admission control, picks or validates a key, and persists the
//! content through the configured backend. Loads go straight to the backend.

use crate::config::Config;
use crate::constants::{MIN_SLUG_LENGTH, NORMAL_CATEGORY};
use crate::error::{AppError, StorageError};
use crate::keygen::KeyGenerator;
use crate::models::document::{is_url, Document, SaveOutcome};
use crate::ratelimit::RateLimiter;
use crate::storage::{is_storable_key, StorageBackend};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Key spaces below this size get a startup warning.
const SMALL_KEY_SPACE: u128 = 1_000_000;

/// Coordinates key generation, rate limiting and storage.
pub struct DocumentStore {
    backend: Arc<dyn StorageBackend>,
    limiter: Arc<RateLimiter>,
    content_keys: KeyGenerator,
    url_keys: KeyGenerator,
    max_key_attempts: usize,
    max_document_length: usize,
}

impl DocumentStore {
    /// Build a store over `backend` using the key and quota settings in `config`.
    pub fn new(config: &Config, backend: Arc<dyn StorageBackend>) -> Self {
        let limiter = Arc::new(RateLimiter::new(&config.rate_limits.categories));
        tracing::debug!("Document store using {} backend", backend.kind());
        let store = Self {
            backend,
            limiter,
            content_keys: config.content_keys(),
            url_keys: config.url_keys(),
            max_key_attempts: config.max_key_attempts,
            max_document_length: config.max_document_length,
        };
        for (label, keys) in [("document", store.content_keys), ("url", store.url_keys)] {
            let space = keys.key_space();
            if space < SMALL_KEY_SPACE {
                tracing::warn!(
                    "{} keys ({} x {}) only allow {} distinct values",
                    label,
                    keys.kind,
                    keys.length,
                    space
                );
            }
        }
        store
    }

    /// Shared rate limiter, for periodic pruning.
    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }

    /// Save a new document on behalf of `client`.
    ///
    /// # Arguments
    /// - `content`: Raw document bytes.
    /// - `requested_slug`: Caller-chosen key; blank values are ignored.
    /// - `client`: Identity used for rate limiting.
    ///
    /// # Returns
    /// The assigned key and whether the content is a URL alias.
    ///
    /// # Errors
    /// - [`AppError::RateLimitExceeded`] when the client is over quota.
    /// - [`AppError::BadRequest`] for empty/oversized content or a bad slug.
    /// - [`AppError::KeyConflict`] when the requested slug is taken.
    /// - [`AppError::KeySpaceExhausted`] when every generated key collided.
    /// - [`AppError::Storage`] for backend failures.
    pub fn save(
        &self,
        content: &[u8],
        requested_slug: Option<&str>,
        client: &str,
    ) -> Result<SaveOutcome, AppError> {
        let decision = self.limiter.check(client, NORMAL_CATEGORY);
        if !decision.admitted {
            tracing::info!("Rejected write from {}: rate limit exceeded", client);
            return Err(AppError::RateLimitExceeded {
                retry_after: decision.reset_after,
            });
        }

        self.validate_content(content)?;
        let is_url = std::str::from_utf8(content).is_ok_and(is_url);

        let slug = requested_slug.map(str::trim).filter(|slug| !slug.is_empty());
        let key = match slug {
            Some(slug) => self.save_with_slug(slug, content)?,
            None => {
                let keys = if is_url { self.url_keys } else { self.content_keys };
                self.save_with_generated_key(keys, content)?
            }
        };

        tracing::info!(
            "Added {} {}",
            if is_url { "url" } else { "document" },
            key
        );
        Ok(SaveOutcome { key, is_url })
    }

    /// Load the document stored under `key`.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when no such document exists, otherwise
    /// [`AppError::Storage`].
    pub fn load(&self, key: &str) -> Result<Document, AppError> {
        match self.backend.get(key) {
            Ok(document) => Ok(document),
            Err(StorageError::NotFound(_)) => {
                tracing::debug!("Document not found: {}", key);
                Err(AppError::NotFound)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Store static documents under fixed keys, bypassing rate limits.
    ///
    /// Keys that already hold identical content are skipped. Keys holding
    /// different content are left as they are, since documents are immutable.
    ///
    /// # Returns
    /// Number of documents newly written.
    ///
    /// # Errors
    /// Returns an error when a file cannot be read, a key is not storable, or
    /// the backend fails.
    pub fn preload(&self, documents: &BTreeMap<String, PathBuf>) -> Result<usize, AppError> {
        let mut written = 0;
        for (key, path) in documents {
            if !is_storable_key(key) {
                return Err(AppError::Config(format!(
                    "static document key '{}' may only contain letters, digits, '_' and '-'",
                    key
                )));
            }
            let content = std::fs::read(path).map_err(|err| {
                AppError::Config(format!(
                    "cannot read static document {}: {}",
                    path.display(),
                    err
                ))
            })?;
            tracing::info!("Loading static document {} from {}", key, path.display());

            match self.backend.put(key, &content) {
                Ok(()) => written += 1,
                Err(StorageError::AlreadyExists(_)) => {
                    let existing = self.backend.get(key)?;
                    if existing.content != content {
                        tracing::warn!(
                            "Static document {} differs from stored content; keeping stored version",
                            key
                        );
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(written)
    }

    fn validate_content(&self, content: &[u8]) -> Result<(), AppError> {
        if content.is_empty() {
            return Err(AppError::BadRequest(
                "Document content must not be empty".to_string(),
            ));
        }
        if content.len() > self.max_document_length {
            tracing::warn!(
                "Rejected document of {} bytes (max {})",
                content.len(),
                self.max_document_length
            );
            return Err(AppError::BadRequest(
                "Content exceeds maximum length.".to_string(),
            ));
        }
        Ok(())
    }

    fn save_with_slug(&self, slug: &str, content: &[u8]) -> Result<String, AppError> {
        validate_slug(slug)?;
        if self.backend.exists(slug)? {
            return Err(AppError::KeyConflict(slug.to_string()));
        }
        match self.backend.put(slug, content) {
            Ok(()) => Ok(slug.to_string()),
            // Another writer claimed the slug after our existence check.
            Err(StorageError::AlreadyExists(_)) => Err(AppError::KeyConflict(slug.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    fn save_with_generated_key(
        &self,
        keys: KeyGenerator,
        content: &[u8],
    ) -> Result<String, AppError> {
        self.claim_generated_key(content, || keys.generate())
    }

    /// Try candidates from `next_candidate` until one is stored.
    fn claim_generated_key<F>(
        &self,
        content: &[u8],
        mut next_candidate: F,
    ) -> Result<String, AppError>
    where
        F: FnMut() -> String,
    {
        for attempt in 1..=self.max_key_attempts {
            let candidate = next_candidate();
            if self.backend.exists(&candidate)? {
                tracing::debug!("Key {} taken (attempt {})", candidate, attempt);
                continue;
            }
            match self.backend.put(&candidate, content) {
                Ok(()) => return Ok(candidate),
                Err(StorageError::AlreadyExists(_)) => {
                    tracing::debug!("Lost race for key {} (attempt {})", candidate, attempt);
                }
                Err(err) => return Err(err.into()),
            }
        }

        tracing::error!(
            "Key space exhausted after {} attempts; key length is likely too short",
            self.max_key_attempts
        );
        Err(AppError::KeySpaceExhausted {
            attempts: self.max_key_attempts,
        })
    }
}

/// Check a caller-requested slug.
///
/// # Errors
/// [`AppError::BadRequest`] when the slug is shorter than three characters or
/// contains anything but letters, digits, `_` and `-`.
pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.chars().count() < MIN_SLUG_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Custom URLs need to be at least {} characters long",
            MIN_SLUG_LENGTH
        )));
    }
    if !is_storable_key(slug) {
        return Err(AppError::BadRequest(
            "Custom URLs must be alphanumeric and cannot contain spaces".to_string(),
        ));
    }
    Ok(())
}
