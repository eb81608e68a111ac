//! HTTP error contract.
//!
//! Every failure leaves the service as a JSON body of the form:
//!
//! ```json
//! { "error": { "code": "validation_error", "message": "group_id must not be empty" } }
//! ```
//!
//! | Code | Status | Raised by |
//! |------|--------|-----------|
//! | `unauthenticated` | 401 | missing or malformed `Authorization` header |
//! | `forbidden` | 403 | bearer token does not match the configured secret |
//! | `validation_error` | 422 | request body or query string rejected |
//! | `unknown_recipe` | 400 | search recipe name outside the allowed set |
//! | `engine_error` | 500 | the graph engine returned an error |
//! | `worker_unavailable` | 503 | the write worker is not accepting jobs |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::recipes::UnknownRecipe;
use crate::worker::WorkerError;

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type returned by every handler and by the auth middleware.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "unauthenticated".to_string(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: "forbidden".to_string(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "validation_error".to_string(),
            message: message.into(),
        }
    }

    /// Wraps a graph engine failure. The full error chain is logged; only
    /// the top-level message reaches the caller.
    pub fn engine(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{:#}", err), "graph engine call failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "engine_error".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<UnknownRecipe> for AppError {
    fn from(err: UnknownRecipe) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "unknown_recipe".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<WorkerError> for AppError {
    fn from(err: WorkerError) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "worker_unavailable".to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_recipe_maps_to_bad_request() {
        let err: AppError = UnknownRecipe {
            name: "NOPE".to_string(),
            expected: "A, B".to_string(),
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "unknown_recipe");
        assert!(err.message.contains("NOPE"));
    }

    #[test]
    fn test_worker_error_maps_to_service_unavailable() {
        let err: AppError = WorkerError::NotRunning.into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code, "worker_unavailable");
    }

    #[test]
    fn test_engine_error_keeps_top_level_message() {
        let err = AppError::engine(anyhow::anyhow!("neo4j unreachable"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "neo4j unreachable");
    }
}
