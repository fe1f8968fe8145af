use std::path::{Path, PathBuf};

use crate::{error::Result, parser::DOC_EXTENSIONS};

/// A discovered documentation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Path relative to the documentation root.
    pub relative_path: PathBuf,
    /// The root joined with `relative_path`. Symlinks are not resolved so
    /// the file stays addressable under the root.
    pub absolute_path: PathBuf,
}

/// Recursively walk a directory and discover documentation files.
///
/// Skips hidden files/directories (names starting with `.`) and only
/// returns files with a documentation extension (.md, .markdown).
/// Results are sorted by relative path.
pub fn discover_files(root: &Path) -> Result<Vec<DiscoveredFile>> {
    let canonical_root = root.canonicalize()?;
    let mut results = Vec::new();
    walk_dir(&canonical_root, &canonical_root, &mut results)?;
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    results: &mut Vec<DiscoveredFile>,
) -> Result<()> {
    let entries = std::fs::read_dir(current)?;

    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        // Skip hidden files and directories.
        if name.starts_with('.') {
            continue;
        }

        let file_type = entry.file_type()?;
        let path = entry.path();

        if file_type.is_dir() {
            walk_dir(root, &path, results)?;
        } else if file_type.is_symlink() {
            // Skip broken symlinks.
            let Ok(resolved) = path.canonicalize() else {
                continue;
            };
            // Directory links are never followed (cycle prevention).
            if resolved.is_file() && is_supported(&path) {
                results.push(discovered(root, &path));
            }
        } else if file_type.is_file() && is_supported(&path) {
            results.push(discovered(root, &path));
        }
    }

    Ok(())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            DOC_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
        })
}

fn discovered(root: &Path, path: &Path) -> DiscoveredFile {
    let relative_path =
        path.strip_prefix(root).unwrap_or(path).to_path_buf();
    DiscoveredFile {
        absolute_path: root.join(&relative_path),
        relative_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "---\ntitle: x\n---\n").unwrap();
    }

    fn names(files: &[DiscoveredFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.relative_path.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn only_documentation_extensions() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "docs/nodepools.md");
        touch(tmp.path(), "docs/faq.markdown");
        touch(tmp.path(), "docs/UPGRADE.MD");
        touch(tmp.path(), "docs/config.toml");
        touch(tmp.path(), "static/banner.svg");

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(
            names(&files),
            vec!["docs/UPGRADE.MD", "docs/faq.markdown", "docs/nodepools.md"]
        );
    }

    #[test]
    fn hidden_entries_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), ".github/pull_request_template.md");
        touch(tmp.path(), "docs/.draft.md");
        touch(tmp.path(), "docs/concepts/scheduling.md");

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["docs/concepts/scheduling.md"]);
    }

    #[test]
    fn absolute_paths_stay_under_root() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "content/en/docs/concepts/disruption.md");
        touch(tmp.path(), "README.md");

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(
            names(&files),
            vec!["README.md", "content/en/docs/concepts/disruption.md"]
        );

        let root = tmp.path().canonicalize().unwrap();
        for file in &files {
            assert_eq!(file.absolute_path, root.join(&file.relative_path));
            assert!(file.absolute_path.is_file());
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_keep_their_link_path() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        touch(outside.path(), "shared.md");
        std::fs::create_dir(tmp.path().join("docs")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("shared.md"),
            tmp.path().join("docs/shared.md"),
        )
        .unwrap();
        std::os::unix::fs::symlink(
            outside.path(),
            tmp.path().join("docs/linked-dir"),
        )
        .unwrap();
        std::os::unix::fs::symlink(
            tmp.path().join("missing.md"),
            tmp.path().join("docs/broken.md"),
        )
        .unwrap();

        let files = discover_files(tmp.path()).unwrap();
        assert_eq!(names(&files), vec!["docs/shared.md"]);
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover_files(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover_files(&tmp.path().join("nope")).is_err());
    }
}
