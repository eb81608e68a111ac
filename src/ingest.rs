//! Ingestion routes.
//!
//! Episode routes validate, transform and queue their writes on the
//! [`SerialWorker`](crate::worker::SerialWorker), answering `201` as soon as
//! every job is queued. Delete and clear call the engine directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::chunk::{chunk_document, part_name};
use crate::conversation::flatten_conversation;
use crate::engine::{EpisodeType, NewEpisode};
use crate::error::AppError;
use crate::models::{
    AddConversationEpisodeRequest, AddDocumentRequest, AddTextEpisodeRequest, OperationResult,
};
use crate::server::{AppState, ValidJson};

type Created = (StatusCode, Json<OperationResult>);

fn created(message: impl Into<String>) -> Created {
    (StatusCode::CREATED, Json(OperationResult::ok(message)))
}

/// Queue one `add_episode` call on the write worker.
fn enqueue_episode(state: &AppState, episode: NewEpisode) -> Result<(), AppError> {
    let engine = state.engine.clone();
    let label = format!("add_episode {}/{}", episode.group_id, episode.name);
    state
        .worker
        .submit(label, async move { engine.add_episode(episode).await })?;
    Ok(())
}

/// Handler for `POST /text`.
pub async fn add_text_episode(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<AddTextEpisodeRequest>,
) -> Result<Created, AppError> {
    enqueue_episode(
        &state,
        NewEpisode {
            name: request.name,
            episode_body: request.content,
            source: EpisodeType::Text,
            source_description: request.source_description,
            reference_time: request.reference_time,
            group_id: request.group_id,
        },
    )?;
    Ok(created("Text episode added successfully"))
}

/// Handler for `POST /conversation`.
///
/// The whole conversation becomes a single message-typed episode.
pub async fn add_conversation(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<AddConversationEpisodeRequest>,
) -> Result<Created, AppError> {
    let transcript = flatten_conversation(&request.messages);
    enqueue_episode(
        &state,
        NewEpisode {
            name: request.name,
            episode_body: transcript,
            source: EpisodeType::Message,
            source_description: request.source_description,
            reference_time: request.reference_time,
            group_id: request.group_id,
        },
    )?;
    Ok(created("Conversation episode added successfully"))
}

/// Handler for `POST /document`.
///
/// Each part is queued as its own text episode, in document order.
pub async fn add_document(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<AddDocumentRequest>,
) -> Result<Created, AppError> {
    let parts = chunk_document(&request.content, state.chunk_size);
    for (i, part) in parts.iter().enumerate() {
        enqueue_episode(
            &state,
            NewEpisode {
                name: part_name(&request.name, i + 1),
                episode_body: part.to_string(),
                source: EpisodeType::Text,
                source_description: request.source_description.clone(),
                reference_time: request.reference_time,
                group_id: request.group_id.clone(),
            },
        )?;
    }
    tracing::debug!(
        group_id = %request.group_id,
        parts = parts.len(),
        "queued document parts"
    );
    Ok(created(format!(
        "{} parts of the document added successfully to group {}.",
        parts.len(),
        request.group_id
    )))
}

/// Handler for `DELETE /group/{group_id}`.
pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Json<OperationResult>, AppError> {
    state
        .engine
        .delete_group(&group_id)
        .await
        .map_err(AppError::engine)?;
    Ok(Json(OperationResult::ok("Group deleted")))
}

/// Handler for `POST /clear`.
///
/// Deletes the whole graph, then rebuilds indices and constraints.
pub async fn clear(State(state): State<AppState>) -> Result<Json<OperationResult>, AppError> {
    state.engine.clear_data().await.map_err(AppError::engine)?;
    state
        .engine
        .build_indices_and_constraints()
        .await
        .map_err(AppError::engine)?;
    Ok(Json(OperationResult::ok("Graph cleared")))
}
