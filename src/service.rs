//! The two retrieval operations exposed to callers, with request validation.

use serde::Serialize;

use crate::{
    document::SearchHit,
    error::{Result, ValidationError},
    store::{DocumentStore, validate_limit},
};

/// Result count used when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 10;

/// Payload of `search_documentation`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub section_filter: Option<String>,
    pub result_count: usize,
    pub results: Vec<SearchHit>,
}

/// A stored page as returned by `read_documentation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentView {
    pub path: String,
    pub title: String,
    pub description: Option<String>,
    pub section: String,
    pub url: String,
    pub content: String,
}

/// Outcome of `read_documentation`. A missing page is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReadOutcome {
    Found(DocumentView),
    NotFound { path: String },
}

/// Query side of the system, owning the store handle.
#[derive(Debug)]
pub struct DocsService {
    store: DocumentStore,
}

impl DocsService {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Keyword search, optionally restricted to one section.
    ///
    /// `limit` defaults to [`DEFAULT_LIMIT`]. Blank queries and limits
    /// outside `1..=50` are rejected rather than corrected. A blank section
    /// means no filter.
    pub fn search_documentation(
        &self,
        query: &str,
        section: Option<&str>,
        limit: Option<usize>,
    ) -> Result<SearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        let limit = validate_limit(limit.unwrap_or(DEFAULT_LIMIT))?;
        let section = section.map(str::trim).filter(|s| !s.is_empty());

        let results = self.store.search(query, section, limit)?;
        tracing::debug!(query, ?section, hits = results.len(), "search");

        Ok(SearchResponse {
            query: query.to_string(),
            section_filter: section.map(str::to_string),
            result_count: results.len(),
            results,
        })
    }

    /// Fetch one page by its path relative to the documentation root.
    pub fn read_documentation(&self, path: &str) -> Result<ReadOutcome> {
        let path = path.trim();
        if path.is_empty() {
            return Err(ValidationError::EmptyPath.into());
        }

        let outcome = match self.store.get_by_path(path)? {
            Some(doc) => ReadOutcome::Found(DocumentView {
                title: doc.metadata.title,
                description: doc.metadata.description,
                path: doc.path,
                section: doc.section,
                url: doc.url,
                content: doc.content,
            }),
            None => ReadOutcome::NotFound {
                path: path.to_string(),
            },
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, parser::DocumentParser};

    fn service(files: &[(&str, &str)]) -> DocsService {
        let store = DocumentStore::open_in_ram().unwrap();
        let parser = DocumentParser::default();
        for (path, raw) in files {
            let doc = parser.parse_str(path, raw).into_result().unwrap();
            store.upsert(&doc).unwrap();
        }
        DocsService::new(store)
    }

    fn sample() -> DocsService {
        service(&[
            (
                "docs/concepts/provisioning.md",
                "---\ntitle: Provisioning\ndescription: How nodes appear\n---\n\
                 Karpenter provisions nodes for pending pods.\n",
            ),
            (
                "docs/concepts/disruption.md",
                "---\ntitle: Disruption\n---\nNodes are removed when empty.\n",
            ),
            (
                "blog/launch.md",
                "---\ntitle: Launch\n---\nWe now provision nodes faster.\n",
            ),
        ])
    }

    fn assert_validation(err: Error, expected: ValidationError) {
        match err {
            Error::Validation(got) => assert_eq!(got, expected),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn search_echoes_request() {
        let svc = sample();
        let response = svc
            .search_documentation("  provisioning ", Some("docs"), Some(5))
            .unwrap();

        assert_eq!(response.query, "provisioning");
        assert_eq!(response.section_filter.as_deref(), Some("docs"));
        assert_eq!(response.result_count, response.results.len());
        assert_eq!(
            response.results[0].path,
            "docs/concepts/provisioning.md"
        );
    }

    #[test]
    fn search_section_filter_is_strict() {
        let svc = sample();
        let response =
            svc.search_documentation("nodes", Some("docs"), None).unwrap();

        assert!(!response.results.is_empty());
        assert!(response.results.iter().all(|hit| hit.section == "docs"));
    }

    #[test]
    fn blank_section_means_no_filter() {
        let svc = sample();
        let unfiltered =
            svc.search_documentation("nodes", None, None).unwrap();
        assert_eq!(unfiltered.result_count, 3);

        for section in ["", "   "] {
            let response = svc
                .search_documentation("nodes", Some(section), None)
                .unwrap();
            assert_eq!(response.section_filter, None);
            assert_eq!(response.result_count, unfiltered.result_count);
        }
    }

    #[test]
    fn section_is_trimmed() {
        let svc = sample();
        let response = svc
            .search_documentation("nodes", Some(" docs "), None)
            .unwrap();

        assert_eq!(response.section_filter.as_deref(), Some("docs"));
        assert_eq!(response.result_count, 2);
        assert!(response.results.iter().all(|hit| hit.section == "docs"));
    }

    #[test]
    fn search_default_limit() {
        let files: Vec<(String, String)> = (0..15)
            .map(|i| {
                (
                    format!("docs/page-{i}.md"),
                    format!("---\ntitle: Page {i}\n---\nKarpenter node {i}\n"),
                )
            })
            .collect();
        let refs: Vec<(&str, &str)> = files
            .iter()
            .map(|(p, c)| (p.as_str(), c.as_str()))
            .collect();
        let svc = service(&refs);

        let response = svc.search_documentation("node", None, None).unwrap();
        assert_eq!(response.result_count, DEFAULT_LIMIT);
    }

    #[test]
    fn search_rejects_blank_query() {
        let svc = sample();
        for query in ["", "   "] {
            let err = svc.search_documentation(query, None, None).unwrap_err();
            assert_validation(err, ValidationError::EmptyQuery);
        }
    }

    #[test]
    fn search_rejects_out_of_range_limit() {
        let svc = sample();
        for limit in [0, 51] {
            let err = svc
                .search_documentation("nodes", None, Some(limit))
                .unwrap_err();
            assert_validation(
                err,
                ValidationError::LimitOutOfRange {
                    limit,
                    min: 1,
                    max: 50,
                },
            );
        }
    }

    #[test]
    fn search_with_no_match_is_empty_success() {
        let svc = sample();
        let response =
            svc.search_documentation("kubernetes", None, None).unwrap();
        assert_eq!(response.result_count, 0);
        assert!(response.results.is_empty());
    }

    #[test]
    fn read_existing_document() {
        let svc = sample();
        let outcome = svc
            .read_documentation("docs/concepts/provisioning.md")
            .unwrap();

        let ReadOutcome::Found(view) = outcome else {
            panic!("expected document");
        };
        assert_eq!(view.title, "Provisioning");
        assert_eq!(view.description.as_deref(), Some("How nodes appear"));
        assert_eq!(view.section, "docs");
        assert_eq!(
            view.url,
            "https://karpenter.sh/docs/concepts/provisioning"
        );
        assert_eq!(
            view.content,
            "Karpenter provisions nodes for pending pods."
        );
    }

    #[test]
    fn read_missing_document_is_not_found() {
        let svc = sample();
        let outcome = svc.read_documentation("nonexistent/path.md").unwrap();
        assert_eq!(
            outcome,
            ReadOutcome::NotFound {
                path: "nonexistent/path.md".to_string()
            }
        );
    }

    #[test]
    fn read_rejects_blank_path() {
        let svc = sample();
        let err = svc.read_documentation(" ").unwrap_err();
        assert_validation(err, ValidationError::EmptyPath);
    }

    #[test]
    fn read_outcome_serializes_with_status() {
        let outcome = ReadOutcome::NotFound {
            path: "a.md".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "not_found");
        assert_eq!(json["path"], "a.md");
    }
}
