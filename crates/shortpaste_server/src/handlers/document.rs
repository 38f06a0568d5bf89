//! Document HTTP handlers.

use super::client::client_identity;
use crate::{error::HttpError, AppState};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use shortpaste_core::models::{DocumentView, SaveOutcome, SaveRequest};
use shortpaste_core::{AppError, DocumentStore};
use std::net::SocketAddr;

/// Optional slug for raw-body submissions.
#[derive(Debug, Default, Deserialize)]
pub struct SlugQuery {
    pub slug: Option<String>,
}

/// Strip a trailing `.ext` used by clients to hint a language.
fn key_from_path(raw: &str) -> &str {
    raw.split('.').next().unwrap_or(raw)
}

/// How a `POST /documents` body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Raw,
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .unwrap_or_default();
    if mime.eq_ignore_ascii_case("application/json") {
        BodyKind::Json
    } else if mime.eq_ignore_ascii_case("multipart/form-data") {
        BodyKind::Form
    } else {
        BodyKind::Raw
    }
}

fn body_error(status: StatusCode, detail: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::BadRequest("Content exceeds maximum length.".to_string())
    } else {
        AppError::BadRequest(detail)
    }
}

async fn read_body(request: Request, state: &AppState) -> Result<Bytes, AppError> {
    Bytes::from_request(request, state)
        .await
        .map_err(|rejection| body_error(rejection.status(), rejection.body_text()))
}

/// Read the `data` and `slug` fields of a form submission.
async fn read_form(
    request: Request,
    state: &AppState,
) -> Result<(Vec<u8>, Option<String>), AppError> {
    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|rejection| body_error(rejection.status(), rejection.body_text()))?;

    let mut content = None;
    let mut slug = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| body_error(err.status(), format!("Invalid form body: {}", err)))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("data") => {
                let bytes = field.bytes().await.map_err(|err| {
                    body_error(err.status(), format!("Invalid form body: {}", err))
                })?;
                content = Some(bytes.to_vec());
            }
            Some("slug") => {
                let text = field.text().await.map_err(|err| {
                    body_error(err.status(), format!("Invalid form body: {}", err))
                })?;
                slug = Some(text);
            }
            _ => {}
        }
    }

    let content = content
        .ok_or_else(|| AppError::BadRequest("Form field 'data' is required".to_string()))?;
    Ok((content, slug))
}

/// Run a store operation on the blocking pool, bounded by the storage timeout.
///
/// A timed-out write keeps running in the background; the atomic `put`
/// contract means it either lands whole or not at all.
async fn run_store<T, F>(state: &AppState, op: F) -> Result<T, AppError>
where
    F: FnOnce(&DocumentStore) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    let limit = state.config.storage_timeout();
    let task = tokio::task::spawn_blocking(move || op(store.as_ref()));
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => {
            tracing::error!("Storage task failed: {}", join_err);
            Err(AppError::Internal)
        }
        Err(_) => {
            tracing::warn!("Storage call exceeded {}ms", limit.as_millis());
            Err(AppError::StorageTimeout(limit))
        }
    }
}

/// Create a new document.
///
/// Accepts `{ "content": ..., "slug": ... }` as JSON, a `multipart/form-data`
/// form with `data` and `slug` fields, or the raw document as the request body.
/// Forms and raw bodies may also name the slug with a `?slug=` query parameter.
///
/// # Returns
/// `{ "key": ..., "isUrl": ... }`.
///
/// # Errors
/// Rate limiting, validation, slug conflicts and storage failures.
pub async fn create_document(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Query(query): Query<SlugQuery>,
    request: Request,
) -> Result<Json<SaveOutcome>, HttpError> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let client = client_identity(request.headers(), peer, state.config.trust_proxy);

    let (content, slug) = match body_kind(request.headers()) {
        BodyKind::Json => {
            let body = read_body(request, &state).await?;
            let payload: SaveRequest = serde_json::from_slice(&body)
                .map_err(|err| AppError::BadRequest(format!("Invalid JSON body: {}", err)))?;
            (payload.content.into_bytes(), payload.slug)
        }
        BodyKind::Form => {
            let (content, slug) = read_form(request, &state).await?;
            (content, slug.or(query.slug))
        }
        BodyKind::Raw => (read_body(request, &state).await?.to_vec(), query.slug),
    };

    let outcome = run_store(&state, move |store| {
        store.save(&content, slug.as_deref(), &client)
    })
    .await?;
    Ok(Json(outcome))
}

/// Fetch a document as JSON.
///
/// # Errors
/// [`AppError::NotFound`] when the key is unknown.
pub async fn get_document(
    State(state): State<AppState>,
    Path(raw_key): Path<String>,
) -> Result<Json<DocumentView>, HttpError> {
    let key = key_from_path(&raw_key).to_string();
    let document = run_store(&state, move |store| store.load(&key)).await?;
    tracing::info!("Retrieved document {}", document.key);
    Ok(Json(DocumentView::from(&document)))
}

/// Fetch a document's raw bytes as plain text.
///
/// # Errors
/// [`AppError::NotFound`] when the key is unknown.
pub async fn get_raw_document(
    State(state): State<AppState>,
    Path(raw_key): Path<String>,
) -> Result<Response, HttpError> {
    let key = key_from_path(&raw_key).to_string();
    let document = run_store(&state, move |store| store.load(&key)).await?;
    Ok((
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        document.content,
    )
        .into_response())
}

/// Follow a short key: URL aliases redirect to their target, other
/// documents redirect to their raw view.
///
/// # Errors
/// [`AppError::NotFound`] when the key is unknown.
pub async fn resolve_document(
    State(state): State<AppState>,
    Path(raw_key): Path<String>,
) -> Result<Response, HttpError> {
    let key = key_from_path(&raw_key).to_string();
    let document = run_store(&state, move |store| store.load(&key)).await?;

    let raw_location = format!("/raw/{}", document.key);
    let location = match document.url() {
        Some(url) => match HeaderValue::from_str(url.as_str()) {
            Ok(value) => {
                tracing::info!("Redirecting {} to {}", document.key, url);
                value
            }
            Err(_) => {
                tracing::warn!("URL in {} is not a valid Location header", document.key);
                HeaderValue::from_str(&raw_location).map_err(|_| AppError::Internal)?
            }
        },
        None => HeaderValue::from_str(&raw_location).map_err(|_| AppError::Internal)?,
    };
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}
