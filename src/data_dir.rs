use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable that overrides the default data directory.
pub const DATA_DIR_ENV: &str = "KARPDOCS_DATA_DIR";

/// Where karpdocs keeps its index and run bookkeeping.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The KARPDOCS_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/karpdocs/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var(DATA_DIR_ENV)
            && !val.is_empty()
        {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("karpdocs")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default location of the tantivy index. Not created here: the query
    /// side must be able to tell that no index was ever built.
    pub fn index_dir(&self) -> PathBuf {
        self.root.join("index")
    }

    pub fn meta_db(&self) -> PathBuf {
        self.root.join("meta.redb")
    }
}
