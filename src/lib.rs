//! Root crate facade for the shortpaste server.

pub use shortpaste_server::{
    config, create_app, error, handlers, models, resolve_bind_address, serve_router, storage,
    AppError, AppState, Config, DocumentStore, RateLimiter, DEFAULT_PORT,
};
