//! Retrieval routes, mounted under `/retrieve`.
//!
//! Every route calls the engine synchronously and maps engine edges to
//! [`FactResult`]s and engine nodes to [`NodeResult`]s. A read may not see
//! writes that are still queued on the worker.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use crate::engine::EpisodicNode;
use crate::error::AppError;
use crate::models::{
    group_id_list, AdvancedSearchRequest, AdvancedSearchV2Request, AdvancedSearchV2Response,
    CenteredSearchQuery, EpisodesQuery, FactResult, NodeResult, SearchQuery, SearchResults,
    Validate,
};
use crate::recipes::{CombinedRecipe, EdgeRecipe};
use crate::server::{AppState, ValidJson};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/search", post(search))
        .route("/search/centered", post(search_centered))
        .route("/search/advanced", post(advanced_search))
        .route("/search/advanced-v2", post(advanced_search_v2))
        .route("/episodes/{group_id}", get(get_episodes))
}

fn facts(edges: &[crate::engine::EntityEdge]) -> Vec<FactResult> {
    edges.iter().map(FactResult::from).collect()
}

/// Handler for `POST /retrieve/search`.
pub async fn search(
    State(state): State<AppState>,
    ValidJson(query): ValidJson<SearchQuery>,
) -> Result<Json<SearchResults>, AppError> {
    let group_ids = group_id_list(&query.group_ids);
    let edges = state
        .engine
        .search(&query.query, group_ids.as_deref(), query.max_facts, None)
        .await
        .map_err(AppError::engine)?;
    Ok(Json(SearchResults {
        facts: facts(&edges),
    }))
}

/// Handler for `POST /retrieve/search/centered`.
pub async fn search_centered(
    State(state): State<AppState>,
    ValidJson(query): ValidJson<CenteredSearchQuery>,
) -> Result<Json<SearchResults>, AppError> {
    let group_ids = group_id_list(&query.search.group_ids);
    let edges = state
        .engine
        .search(
            &query.search.query,
            group_ids.as_deref(),
            query.search.max_facts,
            Some(&query.center_node_uuid),
        )
        .await
        .map_err(AppError::engine)?;
    Ok(Json(SearchResults {
        facts: facts(&edges),
    }))
}

/// Handler for `POST /retrieve/search/advanced`.
///
/// Only edge recipes are accepted. The recipe's own result limit applies.
pub async fn advanced_search(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<AdvancedSearchRequest>,
) -> Result<Json<SearchResults>, AppError> {
    let recipe: EdgeRecipe = request.recipe.parse()?;
    let config = recipe.config();
    let group_ids = group_id_list(&request.group_ids);

    tracing::debug!(recipe = %recipe, "advanced search");
    let results = state
        .engine
        .search_with_config(&request.query, group_ids.as_deref(), &config)
        .await
        .map_err(AppError::engine)?;
    Ok(Json(SearchResults {
        facts: facts(&results.edges),
    }))
}

/// Handler for `POST /retrieve/search/advanced-v2`.
///
/// Only combined recipes are accepted; `max_facts` replaces the recipe limit.
pub async fn advanced_search_v2(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<AdvancedSearchV2Request>,
) -> Result<Json<AdvancedSearchV2Response>, AppError> {
    let recipe: CombinedRecipe = request.recipe.parse()?;
    let mut config = recipe.config();
    config.limit = request.max_facts;
    let group_ids = group_id_list(&request.group_ids);

    tracing::debug!(recipe = %recipe, limit = config.limit, "advanced search v2");
    let results = state
        .engine
        .search_with_config(&request.query, group_ids.as_deref(), &config)
        .await
        .map_err(AppError::engine)?;
    Ok(Json(AdvancedSearchV2Response {
        facts: facts(&results.edges),
        nodes: results.nodes.iter().map(NodeResult::from).collect(),
    }))
}

/// Handler for `GET /retrieve/episodes/{group_id}?last_n=N`.
///
/// Returns the engine's episode representation unchanged. The reference
/// time is the current UTC instant.
pub async fn get_episodes(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    query: Result<Query<EpisodesQuery>, QueryRejection>,
) -> Result<Json<Vec<EpisodicNode>>, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    query.validate().map_err(AppError::validation)?;

    let episodes = state
        .engine
        .retrieve_episodes(&[group_id], query.last_n, Utc::now())
        .await
        .map_err(AppError::engine)?;
    Ok(Json(episodes))
}
