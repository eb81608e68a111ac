//! HTTP server.
//!
//! Builds the Axum router, applies the bearer-token gate to every route and
//! runs the server until Ctrl-C or SIGTERM, after which the write worker is
//! stopped.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/text` | Queue a text episode |
//! | `POST` | `/conversation` | Flatten messages and queue one message episode |
//! | `POST` | `/document` | Chunk a document and queue one text episode per part |
//! | `DELETE` | `/group/{group_id}` | Delete a group |
//! | `POST` | `/clear` | Clear the graph and rebuild indices |
//! | `POST` | `/retrieve/search` | Fact search |
//! | `POST` | `/retrieve/search/centered` | Fact search reranked around a node |
//! | `POST` | `/retrieve/search/advanced` | Fact search with an edge recipe |
//! | `POST` | `/retrieve/search/advanced-v2` | Fact and node search with a combined recipe |
//! | `GET`  | `/retrieve/episodes/{group_id}?last_n=N` | Most recent episodes of a group |
//!
//! Errors follow the contract documented in [`crate::error`].

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{FromRequest, Request},
    middleware,
    routing::{delete, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{self, AuthGate};
use crate::config::Config;
use crate::engine::GraphEngine;
use crate::error::AppError;
use crate::ingest;
use crate::models::Validate;
use crate::retrieve;
use crate::worker::SerialWorker;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Graph engine client, shared by reads and by queued writes.
    pub engine: Arc<dyn GraphEngine>,
    /// Serializes every episode write.
    pub worker: Arc<SerialWorker>,
    /// Maximum characters per document part.
    pub chunk_size: usize,
}

/// JSON body extractor that also runs [`Validate`].
///
/// Malformed JSON, missing fields and failed constraints all surface as
/// `validation_error` (422) before the handler body runs.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        value.validate().map_err(AppError::validation)?;
        Ok(ValidJson(value))
    }
}

/// Build the full router. The auth gate wraps every route.
pub fn router(state: AppState, gate: AuthGate) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/text", post(ingest::add_text_episode))
        .route("/conversation", post(ingest::add_conversation))
        .route("/document", post(ingest::add_document))
        .route("/group/{group_id}", delete(ingest::delete_group))
        .route("/clear", post(ingest::clear))
        .nest("/retrieve", retrieve::routes())
        .layer(middleware::from_fn_with_state(gate, auth::require_bearer))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the write worker and serve until a shutdown signal arrives.
///
/// Jobs still queued when the signal arrives are discarded.
pub async fn run_server(
    config: &Config,
    engine: Arc<dyn GraphEngine>,
    gate: AuthGate,
) -> anyhow::Result<()> {
    let worker = Arc::new(SerialWorker::new());
    worker.start()?;

    let state = AppState {
        engine,
        worker: worker.clone(),
        chunk_size: config.ingest.document_chunk_size,
    };
    let app = router(state, gate);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!("graph service listening on http://{}", config.server.bind);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    worker.stop().await;
    served?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
