use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Who created a category or assigned it to a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    #[default]
    Admin,
    Llm,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Llm => write!(f, "llm"),
        }
    }
}

// ============================================================================
// Ask / saved queries
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    pub question: String,
    pub language: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skip_similarity_check: bool,
}

/// Answer to an ask, also the shape of a saved query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskResponse {
    /// Answer HTML keyed by language code
    #[serde(default)]
    pub response: HashMap<String, String>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub saved_query_url: Option<String>,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default)]
    pub similar_queries: Option<SimilarQueries>,
    #[serde(default)]
    pub message: Option<String>,
    /// Question text, present on saved queries
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub label: HashMap<String, String>,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub hyperlink: HashMap<String, String>,
    /// Offset into the episode, in seconds
    #[serde(default)]
    pub time: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimilarQueries {
    #[serde(default)]
    pub high: Vec<SimilarQuery>,
    #[serde(default)]
    pub medium: Vec<SimilarQuery>,
    #[serde(default)]
    pub low: Vec<SimilarQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarQuery {
    pub uuid: String,
    pub query_text: String,
    pub similarity: f64,
    #[serde(default)]
    pub url: String,
}

// ============================================================================
// Admin: queries and categories
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub id: i64,
    pub uuid: Uuid,
    #[serde(default)]
    pub query_text: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, rename = "likes")]
    pub like_count: i64,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub assigned_by: Origin,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueriesResponse {
    #[serde(default)]
    pub queries: Vec<Query>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToggleFeaturedResponse {
    pub featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub created_by: Origin,
    #[serde(default)]
    pub query_count: i64,
    #[serde(default)]
    pub children: Vec<Category>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoriesResponse {
    #[serde(default)]
    pub tree: Vec<Category>,
    #[serde(default)]
    pub flat: Vec<Category>,
}

/// Body of a category create/update
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent_id: Option<i64>,
    pub is_primary: bool,
    pub display_order: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentRequest {
    pub query_id: i64,
    pub category_id: i64,
}

// ============================================================================
// Admin: LLM proposals
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmProposal {
    #[serde(default)]
    pub categories: Vec<ProposedCategory>,
    #[serde(default)]
    pub assignments: Vec<ProposedAssignment>,
    #[serde(default)]
    pub reparents: Vec<ProposedReparent>,
    #[serde(default)]
    pub usage: Option<LlmUsage>,
}

/// Proposed category; only two levels are meaningful (root and children).
/// Fields the client does not know are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedCategory {
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub children: Vec<ProposedCategory>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAssignment {
    pub query_id: i64,
    #[serde(default)]
    pub category_slugs: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedReparent {
    pub category_slug: String,
    #[serde(default)]
    pub new_parent_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub cost_usd: f64,
    #[serde(default)]
    pub model_used: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SuggestRequest<'a> {
    pub model: &'a str,
}

/// Subset of a proposal selected for persistence
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyRequest {
    pub categories: Vec<ProposedCategory>,
    pub assignments: Vec<ProposedAssignment>,
    pub reparents: Vec<ProposedReparent>,
}

impl ApplyRequest {
    pub fn total(&self) -> usize {
        self.categories.len() + self.assignments.len() + self.reparents.len()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    #[serde(default)]
    pub created_categories: u64,
    #[serde(default)]
    pub applied_assignments: u64,
    #[serde(default)]
    pub applied_reparents: u64,
}

// ============================================================================
// Speaker statistics
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct GenStatsRequest {
    pub fromdate: String,
    pub todate: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SpeakerStatsRequest<'a> {
    pub tags: &'a [String],
    pub fromdate: String,
    pub todate: String,
}

/// Period overview returned by `gen_stats`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenStats {
    #[serde(default)]
    pub total_episodes: u64,
    /// Seconds
    #[serde(default)]
    pub total_duration: f64,
    #[serde(default)]
    pub speakers: Vec<SpeakerSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerSummary {
    pub tag: String,
    #[serde(default)]
    pub total_episodes: u64,
    #[serde(default)]
    pub total_duration: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpeakerStatsResponse {
    pub stats: Option<Vec<SpeakerStat>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerStat {
    pub tag: String,
    /// Seconds spoken over the period, as reported by the backend
    #[serde(default)]
    pub total_duration: f64,
    #[serde(default)]
    pub total_episodes: Option<u64>,
    #[serde(default)]
    pub episodes: Vec<SpeakerEpisode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerEpisode {
    pub name: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// Seconds this speaker talked in the episode
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub total_episode_duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ask_request_omits_skip_flag_when_false() {
        let req = AskRequest {
            question: "q".into(),
            language: "es".into(),
            skip_similarity_check: false,
        };
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body, json!({"question": "q", "language": "es"}));

        let req = AskRequest {
            skip_similarity_check: true,
            ..req
        };
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["skip_similarity_check"], json!(true));
    }

    #[test]
    fn test_proposal_keeps_unknown_fields() {
        let raw = json!({
            "categories": [{"name": "Ciencia", "slug": "ciencia", "is_primary": true,
                            "icon": "atom", "children": []}],
            "assignments": [{"query_id": 4, "category_slugs": ["ciencia"],
                             "confidence": 0.8, "rationale": "obvious"}],
            "reparents": []
        });
        let proposal: LlmProposal = serde_json::from_value(raw).unwrap();
        assert_eq!(proposal.categories[0].extra["icon"], json!("atom"));

        let back = serde_json::to_value(&proposal.assignments[0]).unwrap();
        assert_eq!(back["rationale"], json!("obvious"));
        assert_eq!(back["category_slugs"], json!(["ciencia"]));
    }

    #[test]
    fn test_query_parses_backend_shape() {
        let raw = json!({
            "id": 7,
            "uuid": "6f1c1f9e-3c8e-4a53-9d7e-2a4b9b1a0c11",
            "query_text": "¿Qué es un agujero negro?",
            "created_at": "2024-05-01T10:30:00",
            "likes": 3,
            "featured": true,
            "categories": [{"id": 1, "name": "Astronomía", "assigned_by": "llm"}]
        });
        let q: Query = serde_json::from_value(raw).unwrap();
        assert_eq!(q.like_count, 3);
        assert_eq!(q.categories[0].assigned_by, Origin::Llm);
    }
}
