//! In-memory tool index
//!
//! Built once per loaded tool set and read-only afterwards: an exact
//! lowercase-name lookup plus an inverted keyword index over each tool's
//! name, description, and tags. The keyword index doubles as the scoring
//! substrate for the match engine and as a zero-dependency fallback when no
//! embedding provider is configured.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use toolbridge_spec::ToolDescriptor;
use tracing::debug;

/// Tokens too generic to discriminate between tools
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "are", "was", "has", "have", "api",
    "get", "set", "all", "any", "can", "will", "its", "our", "your", "their", "not", "but",
];

/// Split text on non-alphanumeric boundaries, lowercase, and drop tokens of
/// length ≤ 2 and stop words
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() > 2 && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Read-only lookup structures over a compiled tool set
pub struct ToolIndex {
    /// Tools in compile order; positions are the index's tool ids
    tools: Vec<Arc<ToolDescriptor>>,
    /// Lowercased tool name to position
    by_name: HashMap<String, usize>,
    /// Keyword token to positions of tools containing it
    by_keyword: HashMap<String, Vec<usize>>,
    /// Per-tool keyword sets, for fraction-of-query scoring
    keywords: Vec<HashSet<String>>,
}

impl ToolIndex {
    /// Build the index from compiled descriptors
    pub fn build(tools: Vec<ToolDescriptor>) -> Self {
        let tools: Vec<Arc<ToolDescriptor>> = tools.into_iter().map(Arc::new).collect();
        let mut by_name = HashMap::new();
        let mut by_keyword: HashMap<String, Vec<usize>> = HashMap::new();
        let mut keywords = Vec::with_capacity(tools.len());

        for (position, tool) in tools.iter().enumerate() {
            by_name.insert(tool.name.to_lowercase(), position);

            let tokens: HashSet<String> = tokenize(&tool.index_text()).into_iter().collect();
            for token in &tokens {
                by_keyword.entry(token.clone()).or_default().push(position);
            }
            keywords.push(tokens);
        }

        debug!(
            tools = tools.len(),
            keywords = by_keyword.len(),
            "built tool index"
        );
        Self {
            tools,
            by_name,
            by_keyword,
            keywords,
        }
    }

    /// Exact name lookup, case-insensitive
    pub fn by_name(&self, name: &str) -> Option<&Arc<ToolDescriptor>> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&position| &self.tools[position])
    }

    /// Tools containing the given keyword token
    pub fn by_keyword(&self, token: &str) -> &[usize] {
        self.by_keyword
            .get(token)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All tools in compile order
    pub fn tools(&self) -> &[Arc<ToolDescriptor>] {
        &self.tools
    }

    /// Keyword set of the tool at `position`
    pub fn keywords(&self, position: usize) -> &HashSet<String> {
        &self.keywords[position]
    }

    /// Number of indexed tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the index holds no tools
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
