//! Request and response DTOs.
//!
//! Requests are deserialized with `serde` and then checked with
//! [`Validate`]; both steps happen before any graph engine call. Responses
//! carry timestamps normalized to UTC ISO-8601 (`2024-01-01T12:00:00+00:00`,
//! or six fractional digits when the sub-second part is non-zero).

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::engine::{EntityEdge, EntityNode};
use crate::recipes::DEFAULT_SEARCH_LIMIT;

/// Constraint checks that serde alone cannot express.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} must not be empty", field))
    } else {
        Ok(())
    }
}

fn require_positive(field: &str, value: usize) -> Result<(), String> {
    if value == 0 {
        Err(format!("{} must be greater than 0", field))
    } else {
        Ok(())
    }
}

// ============ Timestamps ============

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A point in time as the client submitted it.
///
/// RFC 3339 values keep their offset. ISO 8601 values without an offset
/// (`2024-01-02T03:04:05`, `2024-01-02 03:04:05.5`, `2024-01-02`) are read as
/// UTC but remember that they had none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl Timestamp {
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(Timestamp::Zoned(dt));
        }
        for format in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(Timestamp::Naive(dt));
            }
        }
        if let Some(dt) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(Timestamp::Naive(dt));
        }
        Err(format!(
            "invalid timestamp '{}': expected ISO 8601, e.g. 2024-01-02T03:04:05Z",
            input
        ))
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Timestamp::Zoned(dt) => dt.with_timezone(&Utc),
            Timestamp::Naive(dt) => Utc.from_utc_datetime(dt),
        }
    }

    /// ISO 8601 text in the submitted form: with its offset, or without one.
    pub fn to_iso(&self) -> String {
        match self {
            Timestamp::Zoned(dt) => dt.to_rfc3339_opts(seconds_format(dt.nanosecond()), false),
            Timestamp::Naive(dt) => match seconds_format(dt.nanosecond()) {
                SecondsFormat::Secs => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
                _ => dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            },
        }
    }
}

/// Whole seconds, or microseconds when there is a sub-second part.
fn seconds_format(nanos: u32) -> SecondsFormat {
    if nanos / 1_000 == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso())
    }
}

fn deserialize_instant<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    Timestamp::deserialize(deserializer).map(|t| t.to_utc())
}

// ============ Common ============

/// Outcome envelope returned by every mutating route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub message: String,
    pub success: bool,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleType {
    User,
    Assistant,
    System,
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoleType::User => "user",
            RoleType::Assistant => "assistant",
            RoleType::System => "system",
        })
    }
}

/// One message of a conversation episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub name: String,
    pub role_type: RoleType,
    /// Custom role shown alongside `role_type` (user name, bot name).
    #[serde(default)]
    pub role: Option<String>,
    /// Kept in its submitted form for the transcript.
    pub timestamp: Timestamp,
    #[serde(default)]
    pub source_description: String,
}

// ============ Ingestion ============

fn default_text_source() -> String {
    "Text content".to_string()
}

fn default_conversation_source() -> String {
    "Conversation".to_string()
}

fn default_document_source() -> String {
    "Document ingestion".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTextEpisodeRequest {
    pub group_id: String,
    pub name: String,
    pub content: String,
    #[serde(default = "default_text_source")]
    pub source_description: String,
    #[serde(deserialize_with = "deserialize_instant")]
    pub reference_time: DateTime<Utc>,
}

impl Validate for AddTextEpisodeRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("group_id", &self.group_id)?;
        require_non_empty("name", &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddConversationEpisodeRequest {
    pub group_id: String,
    pub name: String,
    pub messages: Vec<Message>,
    #[serde(default = "default_conversation_source")]
    pub source_description: String,
    #[serde(deserialize_with = "deserialize_instant")]
    pub reference_time: DateTime<Utc>,
}

impl Validate for AddConversationEpisodeRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("group_id", &self.group_id)?;
        require_non_empty("name", &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddDocumentRequest {
    pub group_id: String,
    /// Base name; each part is named `<name> - Part <n>`.
    pub name: String,
    pub content: String,
    #[serde(default = "default_document_source")]
    pub source_description: String,
    #[serde(deserialize_with = "deserialize_instant")]
    pub reference_time: DateTime<Utc>,
}

impl Validate for AddDocumentRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_empty("group_id", &self.group_id)?;
        require_non_empty("name", &self.name)
    }
}

// ============ Retrieval ============

fn default_max_facts() -> usize {
    DEFAULT_SEARCH_LIMIT
}

/// Group filter shared by every search request. Duplicates collapse on
/// deserialization and order carries no meaning.
pub type GroupIds = Option<BTreeSet<String>>;

/// Flatten a group filter into the slice form the engine takes.
pub fn group_id_list(group_ids: &GroupIds) -> Option<Vec<String>> {
    group_ids
        .as_ref()
        .map(|ids| ids.iter().cloned().collect())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub group_ids: GroupIds,
    pub query: String,
    #[serde(default = "default_max_facts")]
    pub max_facts: usize,
}

impl Validate for SearchQuery {
    fn validate(&self) -> Result<(), String> {
        require_positive("max_facts", self.max_facts)
    }
}

/// Search reranked by graph distance from a focal node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CenteredSearchQuery {
    #[serde(flatten)]
    pub search: SearchQuery,
    pub center_node_uuid: String,
}

impl Validate for CenteredSearchQuery {
    fn validate(&self) -> Result<(), String> {
        self.search.validate()?;
        require_non_empty("center_node_uuid", &self.center_node_uuid)
    }
}

/// Search using a named edge-only recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedSearchRequest {
    pub query: String,
    #[serde(default = "default_max_facts")]
    pub max_facts: usize,
    #[serde(default)]
    pub group_ids: GroupIds,
    /// Resolved against [`EdgeRecipe`](crate::recipes::EdgeRecipe) by the handler.
    pub recipe: String,
}

impl Validate for AdvancedSearchRequest {
    fn validate(&self) -> Result<(), String> {
        require_positive("max_facts", self.max_facts)
    }
}

/// Search using a named combined (edge + node) recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedSearchV2Request {
    pub query: String,
    #[serde(default = "default_max_facts")]
    pub max_facts: usize,
    #[serde(default)]
    pub group_ids: GroupIds,
    /// Resolved against [`CombinedRecipe`](crate::recipes::CombinedRecipe) by the handler.
    pub recipe: String,
}

impl Validate for AdvancedSearchV2Request {
    fn validate(&self) -> Result<(), String> {
        require_positive("max_facts", self.max_facts)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EpisodesQuery {
    pub last_n: usize,
}

impl Validate for EpisodesQuery {
    fn validate(&self) -> Result<(), String> {
        require_positive("last_n", self.last_n)
    }
}

// ============ Results ============

fn utc_iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(seconds_format(dt.nanosecond()), false)
}

fn serialize_utc<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&utc_iso(dt))
}

fn serialize_opt_utc<S: Serializer>(
    dt: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match dt {
        Some(dt) => serializer.serialize_str(&utc_iso(dt)),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FactResult {
    pub uuid: String,
    pub name: String,
    pub fact: String,
    #[serde(serialize_with = "serialize_opt_utc")]
    pub valid_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_opt_utc")]
    pub invalid_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_utc")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_opt_utc")]
    pub expired_at: Option<DateTime<Utc>>,
}

impl From<&EntityEdge> for FactResult {
    fn from(edge: &EntityEdge) -> Self {
        Self {
            uuid: edge.uuid.clone(),
            name: edge.name.clone(),
            fact: edge.fact.clone(),
            valid_at: edge.valid_at,
            invalid_at: edge.invalid_at,
            created_at: edge.created_at,
            expired_at: edge.expired_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeResult {
    pub uuid: String,
    pub name: String,
    pub summary: Option<String>,
    pub labels: Vec<String>,
    #[serde(serialize_with = "serialize_utc")]
    pub created_at: DateTime<Utc>,
    pub attributes: Option<HashMap<String, String>>,
}

impl From<&EntityNode> for NodeResult {
    fn from(node: &EntityNode) -> Self {
        // An empty attribute map is reported the same as no map at all.
        let attributes = node
            .attributes
            .as_ref()
            .filter(|attrs| !attrs.is_empty())
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(k, v)| {
                        let value = match v {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), value)
                    })
                    .collect()
            });
        Self {
            uuid: node.uuid.clone(),
            name: node.name.clone(),
            summary: node.summary.clone(),
            labels: node.labels.clone(),
            created_at: node.created_at,
            attributes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub facts: Vec<FactResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvancedSearchV2Response {
    pub facts: Vec<FactResult>,
    pub nodes: Vec<NodeResult>,
}
