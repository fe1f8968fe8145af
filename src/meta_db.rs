use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use crate::error::Result;

const SETTINGS: TableDefinition<&str, &str> = TableDefinition::new("settings");
const FAILURES: TableDefinition<&str, &str> = TableDefinition::new("failures");

mod keys {
    pub const SOURCE: &str = "last_run.source";
    pub const MODE: &str = "last_run.mode";
    pub const FINISHED_AT: &str = "last_run.finished_at";
    pub const DISCOVERED: &str = "last_run.discovered";
    pub const INDEXED: &str = "last_run.indexed";
    pub const FAILED: &str = "last_run.failed";
}

/// Summary of one indexing run, persisted for `karpdocs stats`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    /// Where the files came from: a local path or `git:<branch>`.
    pub source: String,
    /// `rebuild` or `upsert`.
    pub mode: String,
    /// Seconds since the Unix epoch.
    pub finished_at: u64,
    pub discovered: usize,
    pub indexed: usize,
    /// `(path, reason)` for every file that failed to parse.
    pub failures: Vec<(String, String)>,
}

/// Small redb database recording the outcome of the last indexing run.
pub struct MetaDb {
    db: Database,
}

impl MetaDb {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(redb::Error::from)?;

        // Ensure all tables exist by opening them in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(SETTINGS)?;
        txn.open_table(FAILURES)?;
        txn.commit()?;

        Ok(Self { db })
    }

    // -- Settings --

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SETTINGS)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    // -- Runs --

    /// Store `run` as the latest run, replacing the previous failure log.
    /// Everything is written in a single transaction.
    pub fn record_run(&self, run: &RunRecord) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut settings = txn.open_table(SETTINGS)?;
            settings.insert(keys::SOURCE, run.source.as_str())?;
            settings.insert(keys::MODE, run.mode.as_str())?;
            for (key, value) in [
                (keys::FINISHED_AT, run.finished_at),
                (keys::DISCOVERED, run.discovered as u64),
                (keys::INDEXED, run.indexed as u64),
                (keys::FAILED, run.failures.len() as u64),
            ] {
                settings.insert(key, value.to_string().as_str())?;
            }

            let mut failures = txn.open_table(FAILURES)?;
            let stale = failures
                .iter()?
                .map(|entry| entry.map(|(k, _)| k.value().to_string()))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            for path in &stale {
                failures.remove(path.as_str())?;
            }
            for (path, reason) in &run.failures {
                failures.insert(path.as_str(), reason.as_str())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// The latest recorded run, if any run was ever recorded.
    pub fn last_run(&self) -> Result<Option<RunRecord>> {
        let Some(source) = self.get_setting(keys::SOURCE)? else {
            return Ok(None);
        };
        let number = |key: &str| -> Result<u64> {
            Ok(self
                .get_setting(key)?
                .and_then(|v| v.parse().ok())
                .unwrap_or(0))
        };

        Ok(Some(RunRecord {
            source,
            mode: self.get_setting(keys::MODE)?.unwrap_or_default(),
            finished_at: number(keys::FINISHED_AT)?,
            discovered: number(keys::DISCOVERED)? as usize,
            indexed: number(keys::INDEXED)? as usize,
            failures: self.failures()?,
        }))
    }

    /// Failures of the latest run, sorted by path.
    pub fn failures(&self) -> Result<Vec<(String, String)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(FAILURES)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, v) = entry?;
            result.push((k.value().to_string(), v.value().to_string()));
        }
        Ok(result)
    }
}

impl std::fmt::Debug for MetaDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaDb").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, MetaDb) {
        let tmp = tempfile::tempdir().unwrap();
        let db = MetaDb::open(&tmp.path().join("meta.redb")).unwrap();
        (tmp, db)
    }

    fn run(failures: &[(&str, &str)]) -> RunRecord {
        RunRecord {
            source: "git:main".to_string(),
            mode: "rebuild".to_string(),
            finished_at: 1_700_000_000,
            discovered: 4,
            indexed: 4 - failures.len(),
            failures: failures
                .iter()
                .map(|(p, r)| (p.to_string(), r.to_string()))
                .collect(),
        }
    }

    #[test]
    fn no_run_recorded() {
        let (_tmp, db) = test_db();
        assert_eq!(db.last_run().unwrap(), None);
        assert!(db.failures().unwrap().is_empty());
    }

    #[test]
    fn record_and_read_run() {
        let (_tmp, db) = test_db();
        let record = run(&[("docs/bad.md", "frontmatter never closed")]);
        db.record_run(&record).unwrap();

        assert_eq!(db.last_run().unwrap(), Some(record));
    }

    #[test]
    fn new_run_replaces_failures() {
        let (_tmp, db) = test_db();
        db.record_run(&run(&[("docs/a.md", "x"), ("docs/b.md", "y")]))
            .unwrap();
        db.record_run(&run(&[("docs/c.md", "z")])).unwrap();

        assert_eq!(
            db.failures().unwrap(),
            vec![("docs/c.md".to_string(), "z".to_string())]
        );
        assert_eq!(db.last_run().unwrap().unwrap().indexed, 3);
    }

    #[test]
    fn reopen_preserves_data() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("meta.redb");

        {
            let db = MetaDb::open(&path).unwrap();
            db.record_run(&run(&[])).unwrap();
        }

        {
            let db = MetaDb::open(&path).unwrap();
            let last = db.last_run().unwrap().unwrap();
            assert_eq!(last.source, "git:main");
            assert_eq!(last.indexed, 4);
        }
    }
}
