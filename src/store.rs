use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
    sync::Mutex,
};

use tantivy::{
    Index,
    IndexReader,
    IndexWriter,
    Searcher,
    TantivyDocument,
    Term,
    collector::TopDocs,
    query::{
        AllQuery,
        BooleanQuery,
        BoostQuery,
        ConstScoreQuery,
        Occur,
        Query,
        TermQuery,
    },
    schema::*,
    snippet::SnippetGenerator,
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        Stemmer,
        TextAnalyzer,
        TokenStream,
    },
};

use crate::{
    document::{Document, DocumentMetadata, SearchHit},
    error::{Error, Result, ValidationError},
    text_util,
};

/// Smallest accepted search limit.
pub const MIN_LIMIT: usize = 1;

/// Largest accepted search limit.
pub const MAX_LIMIT: usize = 50;

/// Memory budget handed to the tantivy writer.
pub const WRITER_MEMORY_BUDGET: usize = 15_000_000;

const TITLE_BOOST: f32 = 4.0;
const DESCRIPTION_BOOST: f32 = 2.0;
const CONTENT_BOOST: f32 = 1.0;

const STEM_TOKENIZER: &str = "en_stem";

/// Field names used in the schema.
pub mod fields {
    pub const PATH: &str = "path";
    pub const SECTION: &str = "section";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const CONTENT: &str = "content";
    pub const URL: &str = "url";
    pub const WEIGHT: &str = "weight";
    pub const LICENSE: &str = "license";
    pub const SEQ: &str = "seq";
}

/// Resolved field handles for the schema.
#[derive(Clone, Copy)]
struct SchemaFields {
    path: Field,
    section: Field,
    title: Field,
    description: Field,
    content: Field,
    url: Field,
    weight: Field,
    license: Field,
    seq: Field,
}

impl SchemaFields {
    fn resolve(schema: &Schema) -> Result<Self> {
        Ok(Self {
            path: schema.get_field(fields::PATH)?,
            section: schema.get_field(fields::SECTION)?,
            title: schema.get_field(fields::TITLE)?,
            description: schema.get_field(fields::DESCRIPTION)?,
            content: schema.get_field(fields::CONTENT)?,
            url: schema.get_field(fields::URL)?,
            weight: schema.get_field(fields::WEIGHT)?,
            license: schema.get_field(fields::LICENSE)?,
            seq: schema.get_field(fields::SEQ)?,
        })
    }
}

fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    builder.add_text_field(fields::PATH, STRING | STORED);
    builder.add_text_field(fields::SECTION, STRING | STORED);

    let stemmed = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(STEM_TOKENIZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();
    builder.add_text_field(fields::TITLE, stemmed.clone());
    builder.add_text_field(fields::DESCRIPTION, stemmed.clone());
    builder.add_text_field(fields::CONTENT, stemmed);

    builder.add_text_field(fields::URL, STORED);
    builder.add_i64_field(fields::WEIGHT, STORED);
    builder.add_text_field(fields::LICENSE, STORED);
    builder.add_u64_field(fields::SEQ, STORED | FAST);

    builder.build()
}

fn register_tokenizers(index: &Index) {
    let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(Stemmer::new(tantivy::tokenizer::Language::English))
        .build();
    index.tokenizers().register(STEM_TOKENIZER, en_stem);
}

/// Check a requested result count against `MIN_LIMIT..=MAX_LIMIT`.
pub fn validate_limit(
    limit: usize,
) -> std::result::Result<usize, ValidationError> {
    if (MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(ValidationError::LimitOutOfRange {
            limit,
            min: MIN_LIMIT,
            max: MAX_LIMIT,
        })
    }
}

/// Writer side of the store, created on first mutation.
#[derive(Default)]
struct WriterState {
    writer: Option<IndexWriter>,
    next_seq: u64,
}

/// Durable full-text store of documentation pages, keyed by path.
///
/// Every mutation commits before returning, so readers only ever see whole
/// documents. Reads reload the reader first, which lets a long-running
/// process observe a rebuild done by another process.
pub struct DocumentStore {
    index: Index,
    reader: IndexReader,
    fields: SchemaFields,
    state: Mutex<WriterState>,
}

impl DocumentStore {
    /// Open the store at `dir`, creating an empty index if none exists.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let mmap_dir = tantivy::directory::MmapDirectory::open(dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?;
        let index = if Index::exists(&mmap_dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?
        {
            Index::open(mmap_dir)?
        } else {
            Index::create(
                mmap_dir,
                build_schema(),
                tantivy::IndexSettings::default(),
            )?
        };

        Self::from_index(index)
    }

    /// Open a store that must already exist.
    ///
    /// Query-side callers use this so a missing index surfaces as
    /// [`Error::IndexMissing`] instead of silently serving nothing.
    pub fn open_existing(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::IndexMissing(dir.to_path_buf()));
        }
        let mmap_dir = tantivy::directory::MmapDirectory::open(dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?;
        if !Index::exists(&mmap_dir)
            .map_err(|e| tantivy::TantivyError::SystemError(e.to_string()))?
        {
            return Err(Error::IndexMissing(dir.to_path_buf()));
        }

        Self::from_index(Index::open(mmap_dir)?)
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_ram() -> Result<Self> {
        Self::from_index(Index::create_in_ram(build_schema()))
    }

    fn from_index(index: Index) -> Result<Self> {
        register_tokenizers(&index);
        let fields = SchemaFields::resolve(&index.schema())?;
        let reader = index.reader()?;

        Ok(Self {
            index,
            reader,
            fields,
            state: Mutex::new(WriterState::default()),
        })
    }

    /// Insert `document`, replacing any stored document with the same path.
    ///
    /// A replaced document keeps its original insertion position.
    pub fn upsert(&self, document: &Document) -> Result<()> {
        self.upsert_all(std::slice::from_ref(document))
    }

    /// Upsert every document under a single commit: either all of them
    /// become visible or none do.
    pub fn upsert_all(&self, documents: &[Document]) -> Result<()> {
        self.write_batch(documents, false)
    }

    /// Replace the whole store content with `documents` in one commit.
    pub fn replace_all(&self, documents: &[Document]) -> Result<()> {
        self.write_batch(documents, true)
    }

    fn write_batch(&self, documents: &[Document], clear: bool) -> Result<()> {
        let searcher = self.searcher()?;
        let mut seqs: HashMap<&str, u64> = HashMap::new();
        if !clear {
            for document in documents {
                let path = document.path.as_str();
                if let Some(doc) = self.find_by_path(&searcher, path)? {
                    seqs.insert(path, extract_u64(&doc, self.fields.seq));
                }
            }
        }

        self.with_writer(|writer, next_seq| {
            if clear {
                writer.delete_all_documents()?;
                *next_seq = 0;
            }
            for document in documents {
                let path = document.path.as_str();
                let seq = *seqs.entry(path).or_insert_with(|| {
                    let seq = *next_seq;
                    *next_seq += 1;
                    seq
                });
                writer
                    .delete_term(Term::from_field_text(self.fields.path, path));
                writer.add_document(self.to_tantivy(document, seq))?;
            }
            writer.commit()?;
            Ok(())
        })?;

        self.reader.reload()?;
        tracing::debug!(documents = documents.len(), clear, "committed batch");
        Ok(())
    }

    /// Exact, case-sensitive lookup by path.
    pub fn get_by_path(&self, path: &str) -> Result<Option<Document>> {
        let searcher = self.searcher()?;
        Ok(self
            .find_by_path(&searcher, path)?
            .map(|doc| self.from_tantivy(&doc)))
    }

    /// Ranked search over title, description and content.
    ///
    /// `section` is a hard filter that does not contribute to scores.
    /// Equal scores are ordered by insertion order.
    pub fn search(
        &self,
        query: &str,
        section: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let limit = validate_limit(limit)?;
        let Some(user_query) = self.keyword_query(query)? else {
            return Err(ValidationError::EmptyQuery.into());
        };

        let f = self.fields;
        let searcher = self.searcher()?;
        let total = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
        if total == 0 {
            return Ok(vec![]);
        }

        let mut snippets =
            SnippetGenerator::create(&searcher, &*user_query, f.content)?;
        snippets.set_max_num_chars(text_util::DEFAULT_SNIPPET_MAX_CHARS);

        let final_query: Box<dyn Query> = match section {
            Some(section) => {
                let filter = TermQuery::new(
                    Term::from_field_text(f.section, section),
                    IndexRecordOption::Basic,
                );
                Box::new(BooleanQuery::new(vec![
                    (Occur::Must, user_query),
                    (
                        Occur::Must,
                        Box::new(ConstScoreQuery::new(Box::new(filter), 0.0)),
                    ),
                ]))
            }
            None => user_query,
        };

        // Collect every match so ties at the cut-off are broken by
        // insertion order rather than by segment layout.
        let matches =
            searcher.search(&*final_query, &TopDocs::with_limit(total))?;
        let mut ranked = Vec::with_capacity(matches.len());
        for (score, address) in matches {
            let doc: TantivyDocument = searcher.doc(address)?;
            ranked.push((score, extract_u64(&doc, f.seq), doc));
        }
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        ranked.truncate(limit);

        Ok(ranked
            .into_iter()
            .map(|(score, _, doc)| {
                let content = extract_text(&doc, f.content);
                let snippet = snippets.snippet(&content);
                let snippet = if snippet.is_empty() {
                    text_util::leading_excerpt(
                        &content,
                        text_util::DEFAULT_SNIPPET_MAX_CHARS,
                    )
                } else {
                    text_util::mark_ranges(
                        snippet.fragment(),
                        snippet.highlighted(),
                    )
                };

                SearchHit {
                    path: extract_text(&doc, f.path),
                    title: extract_text(&doc, f.title),
                    url: extract_text(&doc, f.url),
                    section: extract_text(&doc, f.section),
                    snippet,
                    relevance_score: score,
                }
            })
            .collect())
    }

    /// Total number of stored documents.
    pub fn count(&self) -> Result<u64> {
        Ok(self.searcher()?.num_docs())
    }

    /// Number of searchable index segments. Each commit that writes
    /// documents adds one until tantivy merges them.
    pub fn segment_count(&self) -> Result<usize> {
        Ok(self.index.searchable_segment_ids()?.len())
    }

    /// Remove every document.
    pub fn clear(&self) -> Result<()> {
        self.with_writer(|writer, next_seq| {
            writer.delete_all_documents()?;
            writer.commit()?;
            *next_seq = 0;
            Ok(())
        })?;

        self.reader.reload()?;
        Ok(())
    }

    /// Number of documents per section, sorted by section name.
    pub fn list_sections(&self) -> Result<Vec<(String, u64)>> {
        let searcher = self.searcher()?;
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for doc in all_documents(&searcher)? {
            *counts
                .entry(extract_text(&doc, self.fields.section))
                .or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    /// Plain keyword query: the text is run through the stemming analyzer
    /// and every resulting term may match title, description or content.
    /// No query syntax is interpreted. `None` when the text has no terms.
    fn keyword_query(&self, text: &str) -> Result<Option<Box<dyn Query>>> {
        let f = self.fields;
        let mut analyzer = self.index.tokenizer_for_field(f.content)?;
        let mut terms: Vec<String> = Vec::new();
        let mut stream = analyzer.token_stream(text);
        while let Some(token) = stream.next() {
            if !terms.contains(&token.text) {
                terms.push(token.text.clone());
            }
        }
        if terms.is_empty() {
            return Ok(None);
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in [
            (f.title, TITLE_BOOST),
            (f.description, DESCRIPTION_BOOST),
            (f.content, CONTENT_BOOST),
        ] {
            for term in &terms {
                let query = TermQuery::new(
                    Term::from_field_text(field, term),
                    IndexRecordOption::WithFreqs,
                );
                clauses.push((
                    Occur::Should,
                    Box::new(BoostQuery::new(Box::new(query), boost)),
                ));
            }
        }
        Ok(Some(Box::new(BooleanQuery::new(clauses))))
    }

    fn searcher(&self) -> Result<Searcher> {
        self.reader.reload()?;
        Ok(self.reader.searcher())
    }

    fn find_by_path(
        &self,
        searcher: &Searcher,
        path: &str,
    ) -> Result<Option<TantivyDocument>> {
        let query = TermQuery::new(
            Term::from_field_text(self.fields.path, path),
            IndexRecordOption::Basic,
        );
        match searcher.search(&query, &TopDocs::with_limit(1))?.first() {
            Some((_, address)) => Ok(Some(searcher.doc(*address)?)),
            None => Ok(None),
        }
    }

    /// Run `f` against the writer, creating it on first use. Uncommitted
    /// operations are rolled back if `f` fails.
    fn with_writer<T>(
        &self,
        f: impl FnOnce(&mut IndexWriter, &mut u64) -> Result<T>,
    ) -> Result<T> {
        let mut guard =
            self.state.lock().map_err(|_| Error::WriterPoisoned)?;
        let state = &mut *guard;

        let writer = match state.writer.take() {
            Some(writer) => writer,
            None => {
                state.next_seq = self.max_seq()?.map_or(0, |seq| seq + 1);
                self.index.writer(WRITER_MEMORY_BUDGET)?
            }
        };
        let writer = state.writer.insert(writer);

        let result = f(writer, &mut state.next_seq);
        if result.is_err()
            && let Err(e) = writer.rollback()
        {
            tracing::warn!(error = %e, "failed to roll back index writer");
        }
        result
    }

    fn max_seq(&self) -> Result<Option<u64>> {
        let searcher = self.searcher()?;
        Ok(all_documents(&searcher)?
            .iter()
            .map(|doc| extract_u64(doc, self.fields.seq))
            .max())
    }

    fn to_tantivy(&self, document: &Document, seq: u64) -> TantivyDocument {
        let f = self.fields;
        let meta = &document.metadata;

        let mut doc = TantivyDocument::default();
        doc.add_text(f.path, &document.path);
        doc.add_text(f.section, &document.section);
        doc.add_text(f.title, &meta.title);
        if let Some(description) = &meta.description {
            doc.add_text(f.description, description);
        }
        doc.add_text(f.content, &document.content);
        doc.add_text(f.url, &document.url);
        if let Some(weight) = meta.weight {
            doc.add_i64(f.weight, weight);
        }
        if let Some(license) = &meta.license {
            doc.add_text(f.license, license);
        }
        doc.add_u64(f.seq, seq);
        doc
    }

    fn from_tantivy(&self, doc: &TantivyDocument) -> Document {
        let f = self.fields;
        Document {
            path: extract_text(doc, f.path),
            metadata: DocumentMetadata {
                title: extract_text(doc, f.title),
                description: extract_optional_text(doc, f.description),
                weight: doc.get_first(f.weight).and_then(|v| v.as_i64()),
                license: extract_optional_text(doc, f.license),
            },
            content: extract_text(doc, f.content),
            section: extract_text(doc, f.section),
            url: extract_text(doc, f.url),
        }
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore").finish_non_exhaustive()
    }
}

fn all_documents(searcher: &Searcher) -> Result<Vec<TantivyDocument>> {
    let total = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
    if total == 0 {
        return Ok(vec![]);
    }
    searcher
        .search(&AllQuery, &TopDocs::with_limit(total))?
        .into_iter()
        .map(|(_, address)| Ok(searcher.doc(address)?))
        .collect()
}

fn extract_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn extract_optional_text(
    doc: &TantivyDocument,
    field: Field,
) -> Option<String> {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn extract_u64(doc: &TantivyDocument, field: Field) -> u64 {
    doc.get_first(field).and_then(|v| v.as_u64()).unwrap_or(0)
}
