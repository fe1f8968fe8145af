//! karpdocs - a local full-text index over the Karpenter documentation.
//!
//! karpdocs walks a tree of Markdown pages with YAML frontmatter, stores
//! them in a [Tantivy](https://github.com/quickwit-oss/tantivy) index with
//! English stemming, and answers two questions: which pages match a keyword
//! query, and what does the page at a given path say. Both are available
//! from the CLI and as MCP tools.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use karpdocs::{DocsService, DocumentStore, IndexMode, Indexer};
//!
//! let store = DocumentStore::open(Path::new("/tmp/karpdocs-index")).unwrap();
//! let root = Path::new("./website/content/en");
//! let report = Indexer::new(&store)
//!     .index_from_path(root, IndexMode::Rebuild)
//!     .unwrap();
//! println!("indexed {} of {}", report.indexed, report.discovered);
//!
//! let service = DocsService::new(store);
//! let response = service
//!     .search_documentation("disruption budgets", Some("docs"), Some(5))
//!     .unwrap();
//! for hit in &response.results {
//!     println!("{:.3} {} {}", hit.relevance_score, hit.path, hit.url);
//! }
//! ```

pub mod cli;
pub mod data_dir;
pub mod document;
pub mod error;
pub mod fetch;
pub mod indexer;
pub mod mcp;
pub mod meta_db;
pub mod parser;
pub mod service;
pub mod store;
pub mod text_util;
pub mod walker;

pub use data_dir::DataDir;
pub use document::{Document, DocumentMetadata, SearchHit};
pub use error::{Error, Result, ValidationError};
pub use indexer::{IndexMode, IndexReport, Indexer};
pub use meta_db::MetaDb;
pub use parser::{DocumentParser, ParseFailure, ParseOutcome};
pub use service::{DocsService, ReadOutcome, SearchResponse};
pub use store::DocumentStore;
