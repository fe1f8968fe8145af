use serde::{Deserialize, Serialize};

/// Section assigned to documents that sit directly under the docs root.
pub const ROOT_SECTION: &str = "root";

/// Metadata read from a document's frontmatter.
///
/// `title` is always populated: when the frontmatter has none, the parser
/// derives one from the file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub description: Option<String>,
    /// Display ordering hint (`weight` or `order`). Never used for ranking.
    pub weight: Option<i64>,
    pub license: Option<String>,
}

impl DocumentMetadata {
    /// Metadata carrying only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            weight: None,
            license: None,
        }
    }
}

/// A parsed documentation page.
///
/// `path` is relative to the docs root, always `/`-separated, and is the
/// unique key across the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
    pub metadata: DocumentMetadata,
    pub content: String,
    pub section: String,
    pub url: String,
}

impl Document {
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata.description.as_deref()
    }
}

/// A single ranked hit produced by a search. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub path: String,
    pub title: String,
    pub url: String,
    pub section: String,
    /// Excerpt of the content with matched terms wrapped in `<mark>`.
    pub snippet: String,
    /// Engine-defined BM25 score; higher is more relevant.
    pub relevance_score: f32,
}
