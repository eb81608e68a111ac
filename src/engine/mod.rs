//! Graph engine abstraction.
//!
//! The [`GraphEngine`] trait is the only seam between this service and the
//! temporal knowledge-graph engine that owns episode ingestion, entity and
//! fact extraction, storage, and hybrid ranking. Handlers hold an
//! `Arc<dyn GraphEngine>` and never see a concrete backend.
//!
//! The types in this module mirror the engine's native representation.
//! The HTTP layer translates them into its own response DTOs
//! (see [`crate::models`]).
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`add_episode`](GraphEngine::add_episode) | Ingest one episode |
//! | [`delete_group`](GraphEngine::delete_group) | Remove everything in a group |
//! | [`clear_data`](GraphEngine::clear_data) | Remove the whole graph |
//! | [`build_indices_and_constraints`](GraphEngine::build_indices_and_constraints) | (Re)create indices |
//! | [`search`](GraphEngine::search) | Default hybrid search over facts |
//! | [`search_with_config`](GraphEngine::search_with_config) | Search driven by a [`SearchConfig`] |
//! | [`retrieve_episodes`](GraphEngine::retrieve_episodes) | Most recent episodes before a point in time |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recipes::SearchConfig;

/// The source type of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeType {
    Message,
    Json,
    Text,
}

/// Everything the engine needs to ingest one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEpisode {
    pub name: String,
    pub episode_body: String,
    pub source: EpisodeType,
    pub source_description: String,
    pub reference_time: DateTime<Utc>,
    pub group_id: String,
}

/// A fact: a relationship between two entity nodes with bi-temporal metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityEdge {
    pub uuid: String,
    pub group_id: String,
    pub source_node_uuid: String,
    pub target_node_uuid: String,
    pub name: String,
    pub fact: String,
    pub episodes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub valid_at: Option<DateTime<Utc>>,
    pub invalid_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
}

/// An entity extracted from one or more episodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityNode {
    pub uuid: String,
    pub group_id: String,
    pub name: String,
    pub labels: Vec<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Free-form attributes. `None` when the engine attached none.
    pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
}

/// An ingested episode as stored by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicNode {
    pub uuid: String,
    pub name: String,
    pub group_id: String,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub source: EpisodeType,
    pub source_description: String,
    pub content: String,
    pub valid_at: DateTime<Utc>,
    pub entity_edges: Vec<String>,
}

/// Edges and nodes returned by a configured search.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub edges: Vec<EntityEdge>,
    pub nodes: Vec<EntityNode>,
}

/// Client interface of the temporal knowledge-graph engine.
///
/// Implementations must be `Send + Sync`; a single handle is shared by every
/// request. Reads may run concurrently with each other and with the one
/// write the [`SerialWorker`](crate::worker::SerialWorker) is executing.
#[async_trait]
pub trait GraphEngine: Send + Sync {
    /// Ingest an episode. Entity and fact extraction happen inside the engine.
    async fn add_episode(&self, episode: NewEpisode) -> Result<()>;

    /// Delete every episode, node and edge belonging to `group_id`.
    async fn delete_group(&self, group_id: &str) -> Result<()>;

    /// Delete the entire graph.
    async fn clear_data(&self) -> Result<()>;

    /// Create the indices and constraints the engine relies on.
    async fn build_indices_and_constraints(&self) -> Result<()>;

    /// Default hybrid search over facts, optionally reranked by graph
    /// distance from `center_node_uuid`.
    async fn search(
        &self,
        query: &str,
        group_ids: Option<&[String]>,
        num_results: usize,
        center_node_uuid: Option<&str>,
    ) -> Result<Vec<EntityEdge>>;

    /// Lower-level search driven by an explicit ranking configuration.
    async fn search_with_config(
        &self,
        query: &str,
        group_ids: Option<&[String]>,
        config: &SearchConfig,
    ) -> Result<SearchResults>;

    /// The `last_n` most recent episodes of the given groups whose valid time
    /// is at or before `reference_time`.
    async fn retrieve_episodes(
        &self,
        group_ids: &[String],
        last_n: usize,
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<EpisodicNode>>;
}
