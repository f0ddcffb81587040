//! Multi-signal match engine
//!
//! Ranks tools against a natural-language query with a fused confidence
//! score: a weighted sum of four independently computed signals, each
//! normalized to [0, 1].
//!
//! | signal   | weight | source                                          |
//! |----------|--------|-------------------------------------------------|
//! | semantic | 0.4    | cosine similarity via embeddings + vector store |
//! | keyword  | 0.3    | query-token overlap with the tool's keyword set |
//! | intent   | 0.2    | CRUD verb classification vs. HTTP method        |
//! | path     | 0.1    | query-token overlap with endpoint path segments |
//!
//! The semantic signal degrades to a neutral 0.5 when no embedding backend
//! is configured or the provider is unavailable, so matching keeps working
//! on the remaining signals. Ranking is deterministic: a stable sort with
//! ties broken by compile order.

use crate::index::{tokenize, ToolIndex};
use crate::intent::{Intent, IntentClassifier, RegexIntentClassifier};
use embeddings::{EmbeddingProvider, VectorStore};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use toolbridge_spec::ToolDescriptor;
use tracing::{debug, warn};

/// Weight of the semantic (embedding) signal
pub const SEMANTIC_WEIGHT: f32 = 0.4;
/// Weight of the keyword-overlap signal
pub const KEYWORD_WEIGHT: f32 = 0.3;
/// Weight of the intent signal
pub const INTENT_WEIGHT: f32 = 0.2;
/// Weight of the path-overlap signal
pub const PATH_WEIGHT: f32 = 0.1;

/// Semantic score used when embeddings are unavailable
pub const NEUTRAL_SEMANTIC: f32 = 0.5;

/// Per-signal contributions of a scored tool
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub semantic: f32,
    pub keyword: f32,
    pub intent: f32,
    pub path: f32,
}

/// One ranked candidate: a tool reference with its fused score
#[derive(Debug, Clone)]
pub struct ScoredTool {
    /// The matched tool
    pub tool: Arc<ToolDescriptor>,
    /// Fused confidence in [0, 1]
    pub score: f32,
    /// Individual signal values before weighting
    pub breakdown: ScoreBreakdown,
}

struct SemanticBackend {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

/// Ranks tools against free-form queries
pub struct MatchEngine {
    index: Arc<ToolIndex>,
    classifier: Box<dyn IntentClassifier>,
    semantic: Option<SemanticBackend>,
}

impl MatchEngine {
    /// Create an engine over an index, with the default regex intent
    /// classifier and no semantic backend
    pub fn new(index: Arc<ToolIndex>) -> Self {
        Self {
            index,
            classifier: Box::new(RegexIntentClassifier::new()),
            semantic: None,
        }
    }

    /// Substitute a different intent classifier
    pub fn with_classifier(mut self, classifier: Box<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Attach an embedding provider and vector store for the semantic signal
    pub fn with_semantic(
        mut self,
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        self.semantic = Some(SemanticBackend { provider, store });
        self
    }

    /// The index this engine ranks over
    pub fn index(&self) -> &Arc<ToolIndex> {
        &self.index
    }

    /// Embed every indexed tool and push the vectors to the store
    ///
    /// Returns the number of tools embedded. Call once after building the
    /// index; a failure leaves the store partially filled, which is safe
    /// because queries fall back to the neutral semantic score.
    pub async fn index_embeddings(&self) -> embeddings::Result<usize> {
        let backend = match &self.semantic {
            Some(backend) => backend,
            None => return Ok(0),
        };
        let mut count = 0;
        for tool in self.index.tools() {
            let vector = backend.provider.embed(&tool.index_text()).await?;
            backend
                .store
                .upsert(&tool.name, vector, json!({ "name": tool.name }))
                .await?;
            count += 1;
        }
        debug!(count, "indexed tool embeddings");
        Ok(count)
    }

    /// Best-scoring tool for the query, or `None` when no tools are loaded
    ///
    /// A merely low score is still returned; the caller decides whether to
    /// ask for clarification or reject.
    pub async fn find_best_match(&self, query: &str) -> Option<ScoredTool> {
        self.find_similar(query, 1).await.into_iter().next()
    }

    /// Up to `k` tools ranked descending by fused score
    pub async fn find_similar(&self, query: &str, k: usize) -> Vec<ScoredTool> {
        if self.index.is_empty() {
            return Vec::new();
        }

        let query_tokens = tokenize(query);
        let intent = self.classifier.classify(query);
        let semantic_scores = self.semantic_scores(query).await;

        let mut scored: Vec<ScoredTool> = self
            .index
            .tools()
            .iter()
            .enumerate()
            .map(|(position, tool)| {
                let semantic = semantic_scores
                    .as_ref()
                    .and_then(|scores| scores.get(&tool.name).copied())
                    .unwrap_or(NEUTRAL_SEMANTIC);
                let keyword = keyword_score(&query_tokens, self.index.keywords(position));
                let intent_score = intent_score(intent, tool);
                let path = path_score(&query_tokens, &tool.endpoint.path);

                let score = SEMANTIC_WEIGHT * semantic
                    + KEYWORD_WEIGHT * keyword
                    + INTENT_WEIGHT * intent_score
                    + PATH_WEIGHT * path;

                ScoredTool {
                    tool: Arc::clone(tool),
                    score,
                    breakdown: ScoreBreakdown {
                        semantic,
                        keyword,
                        intent: intent_score,
                        path,
                    },
                }
            })
            .collect();

        // Stable sort: ties keep compile order, so ranking is deterministic.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        if let Some(best) = scored.first() {
            debug!(
                query,
                tool = %best.tool.name,
                score = best.score,
                ?intent,
                "ranked tool candidates"
            );
        }
        scored
    }

    /// Per-tool semantic similarity, or `None` for the neutral fallback
    async fn semantic_scores(&self, query: &str) -> Option<HashMap<String, f32>> {
        let backend = self.semantic.as_ref()?;
        let vector = match backend.provider.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "embedding provider unavailable, using neutral semantic score");
                return None;
            }
        };
        let matches = match backend.store.query(&vector, self.index.len()).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "vector store query failed, using neutral semantic score");
                return None;
            }
        };
        Some(
            matches
                .into_iter()
                .map(|m| (m.id, (1.0 - m.distance).clamp(0.0, 1.0)))
                .collect(),
        )
    }
}

/// Fraction of query tokens that appear in, or are substrings of, the
/// tool's keyword set
fn keyword_score(query_tokens: &[String], keywords: &std::collections::HashSet<String>) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let hits = query_tokens
        .iter()
        .filter(|token| keywords.iter().any(|kw| kw.contains(token.as_str())))
        .count();
    hits as f32 / query_tokens.len() as f32
}

/// 1.0 when the tool's method is canonical for the query intent, 0.0
/// otherwise; `Other` is neutral for every tool
fn intent_score(intent: Intent, tool: &ToolDescriptor) -> f32 {
    match intent {
        Intent::Other => 0.5,
        _ => {
            if intent.matches_method(tool.endpoint.method) {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Fraction of query tokens matching path segments, `{param}` placeholders
/// and empty segments excluded
fn path_score(query_tokens: &[String], path: &str) -> f32 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with('{'))
        .map(str::to_lowercase)
        .collect();
    if segments.is_empty() {
        return 0.0;
    }
    let hits = query_tokens
        .iter()
        .filter(|token| {
            segments
                .iter()
                .any(|seg| seg.contains(token.as_str()) || token.contains(seg.as_str()))
        })
        .count();
    hits as f32 / query_tokens.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use embeddings::{EmbeddingError, InMemoryVectorStore};
    use serde_json::json;
    use toolbridge_spec::SpecCompiler;

    fn pet_tools() -> Vec<ToolDescriptor> {
        SpecCompiler::compile(&json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets": {
                    "post": { "operationId": "createPet", "summary": "Add a new pet to the store" }
                },
                "/pets/{id}": {
                    "get": { "operationId": "getPet", "summary": "Find pet by ID" }
                }
            }
        }))
    }

    fn engine() -> MatchEngine {
        MatchEngine::new(Arc::new(ToolIndex::build(pet_tools())))
    }

    #[tokio::test]
    async fn test_create_intent_ranks_post_tool_first() {
        let engine = engine();
        let best = engine.find_best_match("create a pet named Leo").await.unwrap();

        assert_eq!(best.tool.name, "createPet");
        assert_eq!(best.breakdown.intent, 1.0);

        let ranked = engine.find_similar("create a pet named Leo", 2).await;
        assert_eq!(ranked[1].tool.name, "getPet");
        assert_eq!(ranked[1].breakdown.intent, 0.0);
    }

    #[tokio::test]
    async fn test_match_is_deterministic() {
        let engine = engine();
        let first = engine.find_best_match("find my pet").await.unwrap();
        let second = engine.find_best_match("find my pet").await.unwrap();

        assert_eq!(first.tool.name, second.tool.name);
        assert_eq!(first.score, second.score);
    }

    #[tokio::test]
    async fn test_empty_tool_set_returns_none() {
        let engine = MatchEngine::new(Arc::new(ToolIndex::build(Vec::new())));
        assert!(engine.find_best_match("anything").await.is_none());
    }

    #[tokio::test]
    async fn test_low_score_still_returned() {
        let engine = engine();
        let best = engine.find_best_match("zebra xylophone").await.unwrap();
        // Nothing overlaps, but a candidate is still surfaced.
        assert!(best.score < 0.5);
    }

    #[tokio::test]
    async fn test_neutral_semantic_without_backend() {
        let engine = engine();
        let best = engine.find_best_match("list pets").await.unwrap();
        assert_eq!(best.breakdown.semantic, NEUTRAL_SEMANTIC);
    }

    #[test]
    fn test_keyword_score_substring_match() {
        let keywords: std::collections::HashSet<String> =
            ["createpet".to_string(), "store".to_string()].into_iter().collect();
        let tokens = vec!["create".to_string(), "leo".to_string()];
        // "create" is a substring of "createpet"; "leo" matches nothing.
        assert_eq!(keyword_score(&tokens, &keywords), 0.5);
    }

    #[test]
    fn test_path_score_ignores_placeholders() {
        let tokens = vec!["pets".to_string()];
        assert_eq!(path_score(&tokens, "/pets/{id}"), 1.0);
        assert_eq!(path_score(&tokens, "/{id}"), 0.0);
    }

    struct StubEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, text: &str) -> embeddings::Result<Vec<f32>> {
            if self.fail {
                return Err(EmbeddingError::ProviderUnavailable("stub down".into()));
            }
            // Orthogonal axes for "pet"-ish and anything else.
            if text.contains("pet") || text.contains("Pet") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_semantic_signal_from_store() {
        let store = Arc::new(InMemoryVectorStore::new(2));
        let engine = MatchEngine::new(Arc::new(ToolIndex::build(pet_tools())))
            .with_semantic(Arc::new(StubEmbedder { fail: false }), store);
        engine.index_embeddings().await.unwrap();

        let best = engine.find_best_match("my pet please").await.unwrap();
        assert!(best.breakdown.semantic > 0.99);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_to_neutral() {
        let store = Arc::new(InMemoryVectorStore::new(2));
        let engine = MatchEngine::new(Arc::new(ToolIndex::build(pet_tools())))
            .with_semantic(Arc::new(StubEmbedder { fail: true }), store);

        let best = engine.find_best_match("create a pet").await.unwrap();
        assert_eq!(best.breakdown.semantic, NEUTRAL_SEMANTIC);
    }
}
