//! In-process [`GraphEngine`] for local runs and tests.
//!
//! Uses `Vec`s behind `std::sync::RwLock`. There is no extraction step:
//! each ingested episode becomes one entity node named after the episode and
//! one fact whose text is the episode body. Search is a case-insensitive
//! term match over fact text (and node name/summary), ordered by the number
//! of matching terms, then by recency. Rerankers in a [`SearchConfig`] are
//! ignored; only `limit` and the presence of the edge/node sub-configs are
//! honoured.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::recipes::SearchConfig;

use super::{
    EntityEdge, EntityNode, EpisodicNode, GraphEngine, NewEpisode, SearchResults,
};

#[derive(Default)]
struct Graph {
    episodes: Vec<EpisodicNode>,
    nodes: Vec<EntityNode>,
    edges: Vec<EntityEdge>,
}

/// In-memory graph engine.
pub struct InMemoryEngine {
    graph: RwLock<Graph>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self {
            graph: RwLock::new(Graph::default()),
        }
    }

    pub fn episode_count(&self) -> usize {
        self.graph.read().unwrap().episodes.len()
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

fn match_score(terms: &[String], haystack: &str) -> usize {
    let haystack = haystack.to_lowercase();
    terms.iter().filter(|t| haystack.contains(t.as_str())).count()
}

fn in_groups(group_id: &str, group_ids: Option<&[String]>) -> bool {
    match group_ids {
        Some(ids) => ids.iter().any(|g| g == group_id),
        None => true,
    }
}

impl Graph {
    fn matching_edges(
        &self,
        query: &str,
        group_ids: Option<&[String]>,
        limit: usize,
    ) -> Vec<EntityEdge> {
        let terms = terms(query);
        let mut scored: Vec<(usize, &EntityEdge)> = self
            .edges
            .iter()
            .filter(|e| in_groups(&e.group_id, group_ids))
            .map(|e| (match_score(&terms, &e.fact), e))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.created_at.cmp(&a.1.created_at)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect()
    }

    fn matching_nodes(
        &self,
        query: &str,
        group_ids: Option<&[String]>,
        limit: usize,
    ) -> Vec<EntityNode> {
        let terms = terms(query);
        let mut scored: Vec<(usize, &EntityNode)> = self
            .nodes
            .iter()
            .filter(|n| in_groups(&n.group_id, group_ids))
            .map(|n| {
                let text = format!("{} {}", n.name, n.summary.as_deref().unwrap_or(""));
                (match_score(&terms, &text), n)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.created_at.cmp(&a.1.created_at)));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, n)| n.clone())
            .collect()
    }
}

#[async_trait]
impl GraphEngine for InMemoryEngine {
    async fn add_episode(&self, episode: NewEpisode) -> Result<()> {
        let now = Utc::now();
        let episode_uuid = Uuid::new_v4().to_string();
        let node_uuid = Uuid::new_v4().to_string();
        let edge_uuid = Uuid::new_v4().to_string();

        let node = EntityNode {
            uuid: node_uuid.clone(),
            group_id: episode.group_id.clone(),
            name: episode.name.clone(),
            labels: vec!["Entity".to_string()],
            summary: Some(episode.source_description.clone()),
            created_at: now,
            attributes: None,
        };
        let edge = EntityEdge {
            uuid: edge_uuid.clone(),
            group_id: episode.group_id.clone(),
            source_node_uuid: node_uuid.clone(),
            target_node_uuid: node_uuid,
            name: "MENTIONS".to_string(),
            fact: episode.episode_body.clone(),
            episodes: vec![episode_uuid.clone()],
            created_at: now,
            valid_at: Some(episode.reference_time),
            invalid_at: None,
            expired_at: None,
        };
        let stored = EpisodicNode {
            uuid: episode_uuid,
            name: episode.name,
            group_id: episode.group_id,
            labels: vec!["Episodic".to_string()],
            created_at: now,
            source: episode.source,
            source_description: episode.source_description,
            content: episode.episode_body,
            valid_at: episode.reference_time,
            entity_edges: vec![edge_uuid],
        };

        let mut graph = self.graph.write().unwrap();
        graph.nodes.push(node);
        graph.edges.push(edge);
        graph.episodes.push(stored);
        Ok(())
    }

    async fn delete_group(&self, group_id: &str) -> Result<()> {
        let mut graph = self.graph.write().unwrap();
        graph.episodes.retain(|e| e.group_id != group_id);
        graph.nodes.retain(|n| n.group_id != group_id);
        graph.edges.retain(|e| e.group_id != group_id);
        Ok(())
    }

    async fn clear_data(&self) -> Result<()> {
        *self.graph.write().unwrap() = Graph::default();
        Ok(())
    }

    async fn build_indices_and_constraints(&self) -> Result<()> {
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        group_ids: Option<&[String]>,
        num_results: usize,
        _center_node_uuid: Option<&str>,
    ) -> Result<Vec<EntityEdge>> {
        let graph = self.graph.read().unwrap();
        Ok(graph.matching_edges(query, group_ids, num_results))
    }

    async fn search_with_config(
        &self,
        query: &str,
        group_ids: Option<&[String]>,
        config: &SearchConfig,
    ) -> Result<SearchResults> {
        let graph = self.graph.read().unwrap();
        let edges = match config.edge_config {
            Some(_) => graph.matching_edges(query, group_ids, config.limit),
            None => Vec::new(),
        };
        let nodes = match config.node_config {
            Some(_) => graph.matching_nodes(query, group_ids, config.limit),
            None => Vec::new(),
        };
        Ok(SearchResults { edges, nodes })
    }

    async fn retrieve_episodes(
        &self,
        group_ids: &[String],
        last_n: usize,
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<EpisodicNode>> {
        let graph = self.graph.read().unwrap();
        let mut episodes: Vec<EpisodicNode> = graph
            .episodes
            .iter()
            .filter(|e| group_ids.contains(&e.group_id) && e.valid_at <= reference_time)
            .cloned()
            .collect();
        episodes.sort_by(|a, b| b.valid_at.cmp(&a.valid_at));
        episodes.truncate(last_n);
        // Oldest first, as the engine returns them.
        episodes.reverse();
        Ok(episodes)
    }
}
