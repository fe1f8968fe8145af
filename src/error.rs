use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("search index error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("database storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("database transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("database table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("database commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error(
        "no documentation index found at {}; run `karpdocs index` to build it",
        .0.display()
    )]
    IndexMissing(PathBuf),

    #[error("failed to fetch documentation: {0}")]
    Fetch(String),

    #[error("documentation root {} is not a directory", .0.display())]
    RootNotFound(PathBuf),

    #[error("index writer lock poisoned")]
    WriterPoisoned,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("data directory does not exist and could not be created: {0}")]
    DataDir(PathBuf),
}

/// A caller-supplied argument was rejected before touching the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("path must not be empty")]
    EmptyPath,

    #[error("limit must be between {min} and {max}, got {limit}")]
    LimitOutOfRange { limit: usize, min: usize, max: usize },
}
