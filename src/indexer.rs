use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::{
    error::{Error, Result},
    parser::{DocumentParser, ParseFailure, ParseOutcome},
    store::DocumentStore,
    walker,
};

/// How an indexing run treats documents already in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexMode {
    /// Overwrite matching paths and leave everything else alone. Documents
    /// whose source file disappeared stay in the store.
    #[default]
    Upsert,
    /// Replace the store content with the documents of this run.
    Rebuild,
}

impl IndexMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::Rebuild => "rebuild",
        }
    }
}

/// A file that was discovered but could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub relative_path: PathBuf,
    pub reason: ParseFailure,
}

/// Outcome of an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Number of documentation files found under the root.
    pub discovered: usize,
    /// Number of documents written to the store.
    pub indexed: usize,
    pub failures: Vec<FailedFile>,
}

impl IndexReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Walks a documentation tree and feeds every page into a store.
#[derive(Debug)]
pub struct Indexer<'a> {
    store: &'a DocumentStore,
    parser: DocumentParser,
}

impl<'a> Indexer<'a> {
    pub fn new(store: &'a DocumentStore) -> Self {
        Self::with_parser(store, DocumentParser::default())
    }

    pub fn with_parser(
        store: &'a DocumentStore,
        parser: DocumentParser,
    ) -> Self {
        Self { store, parser }
    }

    /// Index every documentation file under `root`.
    ///
    /// Files that fail to parse are recorded in the report and skipped; only
    /// store failures abort the run. All documents of a run are written in a
    /// single commit, so readers never see a half-indexed tree.
    pub fn index_from_path(
        &self,
        root: &Path,
        mode: IndexMode,
    ) -> Result<IndexReport> {
        if !root.is_dir() {
            return Err(Error::RootNotFound(root.to_path_buf()));
        }
        let root = root.canonicalize()?;

        let files = walker::discover_files(&root)?;
        tracing::info!(count = files.len(), "found markdown files to index");

        // Parse in parallel, then hand everything to the store as one batch.
        let parser = &self.parser;
        let parsed: Vec<_> = files
            .par_iter()
            .map(|file| {
                (
                    &file.relative_path,
                    parser.parse_file(&file.absolute_path, &root),
                )
            })
            .collect();

        let mut report = IndexReport {
            discovered: files.len(),
            ..IndexReport::default()
        };

        let mut documents = Vec::with_capacity(parsed.len());
        for (relative_path, outcome) in parsed {
            match outcome {
                ParseOutcome::Parsed(document) => {
                    tracing::debug!(path = %document.path, "parsed");
                    documents.push(document);
                }
                ParseOutcome::Failed(reason) => {
                    tracing::warn!(
                        path = %relative_path.display(),
                        %reason,
                        "failed to parse"
                    );
                    report.failures.push(FailedFile {
                        relative_path: relative_path.clone(),
                        reason,
                    });
                }
            }
        }

        match mode {
            IndexMode::Upsert => self.store.upsert_all(&documents)?,
            IndexMode::Rebuild => {
                tracing::info!("replacing existing index content");
                self.store.replace_all(&documents)?;
            }
        }
        report.indexed = documents.len();

        tracing::info!(
            indexed = report.indexed,
            failed = report.failed(),
            "indexing finished"
        );
        Ok(report)
    }
}
