//! Named search recipes.
//!
//! A recipe is a predefined [`SearchConfig`] selected by name from a fixed
//! set. The advanced search routes accept only the names of one family:
//! [`EdgeRecipe`] for `/retrieve/search/advanced` and [`CombinedRecipe`] for
//! `/retrieve/search/advanced-v2`. Resolution never falls back to a default:
//! an unrecognised name is an [`UnknownRecipe`] error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Result count used by every recipe unless a caller overrides it.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Candidate retrieval channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Bm25,
    CosineSimilarity,
    Bfs,
}

/// Reranker applied to fact (edge) candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeReranker {
    Rrf,
    Mmr,
    NodeDistance,
    EpisodeMentions,
    CrossEncoder,
}

/// Reranker applied to entity (node) candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeReranker {
    Rrf,
    Mmr,
    NodeDistance,
    EpisodeMentions,
    CrossEncoder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSearchConfig {
    pub search_methods: Vec<SearchMethod>,
    pub reranker: EdgeReranker,
    pub mmr_lambda: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSearchConfig {
    pub search_methods: Vec<SearchMethod>,
    pub reranker: NodeReranker,
    pub mmr_lambda: f64,
}

/// Ranking configuration handed to [`GraphEngine::search_with_config`](crate::engine::GraphEngine::search_with_config).
///
/// A `None` sub-config means that kind of result is not searched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub edge_config: Option<EdgeSearchConfig>,
    pub node_config: Option<NodeSearchConfig>,
    pub limit: usize,
    pub reranker_min_score: f64,
}

/// Returned when a recipe name is not in the family a route accepts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown search recipe '{name}'; expected one of: {expected}")]
pub struct UnknownRecipe {
    pub name: String,
    pub expected: String,
}

const HYBRID: [SearchMethod; 2] = [SearchMethod::Bm25, SearchMethod::CosineSimilarity];
const HYBRID_BFS: [SearchMethod; 3] = [
    SearchMethod::Bm25,
    SearchMethod::CosineSimilarity,
    SearchMethod::Bfs,
];

fn edge_config(methods: &[SearchMethod], reranker: EdgeReranker) -> EdgeSearchConfig {
    EdgeSearchConfig {
        search_methods: methods.to_vec(),
        reranker,
        mmr_lambda: 1.0,
    }
}

fn node_config(methods: &[SearchMethod], reranker: NodeReranker) -> NodeSearchConfig {
    NodeSearchConfig {
        search_methods: methods.to_vec(),
        reranker,
        mmr_lambda: 1.0,
    }
}

// ============ Edge-only recipes ============

/// Recipes that search facts only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRecipe {
    HybridRrf,
    HybridMmr,
    HybridNodeDistance,
    HybridEpisodeMentions,
    HybridCrossEncoder,
}

impl EdgeRecipe {
    pub const ALL: [EdgeRecipe; 5] = [
        EdgeRecipe::HybridRrf,
        EdgeRecipe::HybridMmr,
        EdgeRecipe::HybridNodeDistance,
        EdgeRecipe::HybridEpisodeMentions,
        EdgeRecipe::HybridCrossEncoder,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EdgeRecipe::HybridRrf => "EDGE_HYBRID_SEARCH_RRF",
            EdgeRecipe::HybridMmr => "EDGE_HYBRID_SEARCH_MMR",
            EdgeRecipe::HybridNodeDistance => "EDGE_HYBRID_SEARCH_NODE_DISTANCE",
            EdgeRecipe::HybridEpisodeMentions => "EDGE_HYBRID_SEARCH_EPISODE_MENTIONS",
            EdgeRecipe::HybridCrossEncoder => "EDGE_HYBRID_SEARCH_CROSS_ENCODER",
        }
    }

    pub fn config(self) -> SearchConfig {
        let edge = match self {
            EdgeRecipe::HybridRrf => edge_config(&HYBRID, EdgeReranker::Rrf),
            EdgeRecipe::HybridMmr => edge_config(&HYBRID, EdgeReranker::Mmr),
            EdgeRecipe::HybridNodeDistance => edge_config(&HYBRID, EdgeReranker::NodeDistance),
            EdgeRecipe::HybridEpisodeMentions => {
                edge_config(&HYBRID, EdgeReranker::EpisodeMentions)
            }
            EdgeRecipe::HybridCrossEncoder => {
                edge_config(&HYBRID_BFS, EdgeReranker::CrossEncoder)
            }
        };
        SearchConfig {
            edge_config: Some(edge),
            node_config: None,
            limit: DEFAULT_SEARCH_LIMIT,
            reranker_min_score: 0.0,
        }
    }
}

impl fmt::Display for EdgeRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EdgeRecipe {
    type Err = UnknownRecipe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EdgeRecipe::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| UnknownRecipe {
                name: s.to_string(),
                expected: join_names(EdgeRecipe::ALL.iter().map(|r| r.name())),
            })
    }
}

// ============ Combined (edge + node) recipes ============

/// Recipes that search both facts and entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinedRecipe {
    HybridRrf,
    HybridMmr,
    HybridCrossEncoder,
}

impl CombinedRecipe {
    pub const ALL: [CombinedRecipe; 3] = [
        CombinedRecipe::HybridRrf,
        CombinedRecipe::HybridMmr,
        CombinedRecipe::HybridCrossEncoder,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CombinedRecipe::HybridRrf => "COMBINED_HYBRID_SEARCH_RRF",
            CombinedRecipe::HybridMmr => "COMBINED_HYBRID_SEARCH_MMR",
            CombinedRecipe::HybridCrossEncoder => "COMBINED_HYBRID_SEARCH_CROSS_ENCODER",
        }
    }

    pub fn config(self) -> SearchConfig {
        let (edge, node) = match self {
            CombinedRecipe::HybridRrf => (
                edge_config(&HYBRID, EdgeReranker::Rrf),
                node_config(&HYBRID, NodeReranker::Rrf),
            ),
            CombinedRecipe::HybridMmr => (
                edge_config(&HYBRID, EdgeReranker::Mmr),
                node_config(&HYBRID, NodeReranker::Mmr),
            ),
            CombinedRecipe::HybridCrossEncoder => (
                edge_config(&HYBRID_BFS, EdgeReranker::CrossEncoder),
                node_config(&HYBRID_BFS, NodeReranker::CrossEncoder),
            ),
        };
        SearchConfig {
            edge_config: Some(edge),
            node_config: Some(node),
            limit: DEFAULT_SEARCH_LIMIT,
            reranker_min_score: 0.0,
        }
    }
}

impl fmt::Display for CombinedRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CombinedRecipe {
    type Err = UnknownRecipe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CombinedRecipe::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| UnknownRecipe {
                name: s.to_string(),
                expected: join_names(CombinedRecipe::ALL.iter().map(|r| r.name())),
            })
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_edge_recipe_resolves_by_name() {
        for recipe in EdgeRecipe::ALL {
            assert_eq!(recipe.name().parse::<EdgeRecipe>(), Ok(recipe));
        }
    }

    #[test]
    fn test_every_combined_recipe_resolves_by_name() {
        for recipe in CombinedRecipe::ALL {
            assert_eq!(recipe.name().parse::<CombinedRecipe>(), Ok(recipe));
        }
    }

    #[test]
    fn test_families_do_not_overlap() {
        let err = "COMBINED_HYBRID_SEARCH_RRF".parse::<EdgeRecipe>().unwrap_err();
        assert_eq!(err.name, "COMBINED_HYBRID_SEARCH_RRF");
        assert!(err.expected.contains("EDGE_HYBRID_SEARCH_RRF"));

        assert!("EDGE_HYBRID_SEARCH_MMR".parse::<CombinedRecipe>().is_err());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert!("edge_hybrid_search_rrf".parse::<EdgeRecipe>().is_err());
    }

    #[test]
    fn test_edge_recipes_search_edges_only() {
        for recipe in EdgeRecipe::ALL {
            let config = recipe.config();
            assert!(config.edge_config.is_some(), "{}", recipe);
            assert!(config.node_config.is_none(), "{}", recipe);
            assert_eq!(config.limit, DEFAULT_SEARCH_LIMIT);
        }
    }

    #[test]
    fn test_combined_recipes_search_edges_and_nodes() {
        for recipe in CombinedRecipe::ALL {
            let config = recipe.config();
            assert!(config.edge_config.is_some(), "{}", recipe);
            assert!(config.node_config.is_some(), "{}", recipe);
        }
    }

    #[test]
    fn test_cross_encoder_adds_bfs() {
        let config = EdgeRecipe::HybridCrossEncoder.config();
        let edge = config.edge_config.unwrap();
        assert_eq!(edge.reranker, EdgeReranker::CrossEncoder);
        assert!(edge.search_methods.contains(&SearchMethod::Bfs));
    }
}
