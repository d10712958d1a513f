//! Strict JSON request bodies.
//!
//! Bodies are buffered in full once, then decoded from the buffer, which is
//! handed on alongside the decoded value. Decoding rejects fields the target
//! type does not know about and anything after the first complete JSON value.
//! Every failure is reported as the same malformed-input rejection.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::FromRequest;
use axum::extract::Request;
use axum::http::header;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::handlers::ApiError;

/// Largest body that will be buffered.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StrictJsonRejection {
    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,

    #[error("invalid json")]
    Malformed,
}

impl IntoResponse for StrictJsonRejection {
    fn into_response(self) -> Response {
        match self {
            StrictJsonRejection::UnsupportedMediaType => {
                ApiError::UnsupportedMediaType(self.to_string())
            }
            StrictJsonRejection::Malformed => ApiError::BadRequest(self.to_string()),
        }
        .into_response()
    }
}

/// Request body decoded with [`decode_strict`], together with the raw bytes
/// it was decoded from.
///
/// Requires an `application/json` content type (parameters such as
/// `charset` are allowed).
#[derive(Debug, Clone, Default)]
pub struct StrictJson<T>(pub T, pub Bytes);

#[async_trait]
impl<T, S> FromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = StrictJsonRejection;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(req.headers()) {
            return Err(StrictJsonRejection::UnsupportedMediaType);
        }

        let body = buffer_body(req).await?;
        let value = decode_strict(&body)?;

        Ok(StrictJson(value, body))
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false)
}

/// Read the whole body once, up to [`MAX_BODY_BYTES`].
async fn buffer_body(req: Request) -> Result<Bytes, StrictJsonRejection> {
    axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "Failed to buffer request body");
            StrictJsonRejection::Malformed
        })
}

/// Decode exactly one JSON value of type `T` from `body`.
///
/// Fails on syntax errors, type mismatches, missing required fields,
/// unknown fields at any depth and trailing non-whitespace content.
pub fn decode_strict<T: DeserializeOwned>(body: &[u8]) -> Result<T, StrictJsonRejection> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    let mut unknown_fields = Vec::new();

    let value: T = serde_ignored::deserialize(&mut deserializer, |path| {
        unknown_fields.push(path.to_string());
    })
    .map_err(|e| {
        tracing::debug!(error = %e, "Rejected request body");
        StrictJsonRejection::Malformed
    })?;

    deserializer.end().map_err(|e| {
        tracing::debug!(error = %e, "Rejected request body: trailing data");
        StrictJsonRejection::Malformed
    })?;

    if !unknown_fields.is_empty() {
        tracing::debug!(fields = ?unknown_fields, "Rejected request body: unknown fields");
        return Err(StrictJsonRejection::Malformed);
    }

    Ok(value)
}
