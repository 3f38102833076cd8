//! Completion configuration

use serde::Deserialize;

/// Completion configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// How many record levels a generated snippet may nest
    pub max_snippet_depth: usize,
    /// Whether snippets also spell out optional fields
    pub include_optional_in_snippets: bool,
    /// Upper bound on returned items; the list is marked incomplete when hit
    pub max_items: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_snippet_depth: 3,
            include_optional_in_snippets: false,
            max_items: 100,
        }
    }
}

impl CompletionConfig {
    #[must_use]
    pub fn with_max_snippet_depth(mut self, depth: usize) -> Self {
        self.max_snippet_depth = depth;
        self
    }

    #[must_use]
    pub fn with_optional_in_snippets(mut self, include: bool) -> Self {
        self.include_optional_in_snippets = include;
        self
    }

    #[must_use]
    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = max;
        self
    }
}
