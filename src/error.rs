use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Crate-wide error type.
///
/// Covers the full failure taxonomy of the gateway and the API surface:
/// missing upstream configuration, transport failures, application-level
/// GraphQL errors, and the usual not-found / validation cases. Implements
/// [`IntoResponse`] so handlers can bubble errors with `?`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The upstream GraphQL endpoint or token is missing. Checked before
    /// any network call is attempted.
    #[error("GraphQL endpoint or token is not configured")]
    Configuration,

    /// The upstream returned a non-success status code.
    #[error("GraphQL request failed ({status}): {body}")]
    Transport {
        /// HTTP status code from the upstream.
        status: u16,
        /// Raw response body for diagnostics.
        body: String,
    },

    /// The HTTP round trip itself failed (network, DNS, TLS, timeout).
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport succeeded but the GraphQL envelope carried errors.
    #[error("upstream returned GraphQL errors")]
    Upstream { errors: Vec<serde_json::Value> },

    /// The upstream payload did not match the expected shape.
    #[error("malformed upstream payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Error::Configuration => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
            // Propagate the upstream's status where we have one.
            Error::Transport { status, body } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({ "error": "GraphQL request failed", "details": body }),
            ),
            Error::Http(err) => {
                tracing::error!(error = %err, "upstream request error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
            Error::Upstream { errors } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "GraphQL errors", "errors": errors }),
            ),
            Error::Decode(err) => {
                tracing::error!(error = %err, "malformed upstream payload");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal server error" }),
                )
            }
            Error::NotFound { entity } => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{entity} not found") }),
            ),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
        };

        (status, axum::Json(body)).into_response()
    }
}
