use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::error::{Error, Result};

/// Repository that hosts the Karpenter documentation site.
pub const REPO_URL: &str = "https://github.com/aws/karpenter-provider-aws.git";

/// Directory inside the repository that holds the site sources.
pub const DOCS_SUBDIR: &str = "website";

/// Hugo content directory of the English site, relative to [`DOCS_SUBDIR`].
/// Page paths, sections and URLs are all relative to it.
pub const CONTENT_SUBDIR: &str = "content/en";

pub const DEFAULT_BRANCH: &str = "main";

/// Shallow, sparse checkout of the documentation tree of `branch` into
/// `dest`, which must not exist yet or be empty.
///
/// Returns the directory to index (`dest/website/content/en`).
pub fn clone_docs(branch: &str, dest: &Path) -> Result<PathBuf> {
    clone_docs_from(REPO_URL, branch, dest)
}

/// Same as [`clone_docs`] against an arbitrary repository URL or local path.
pub fn clone_docs_from(
    repo: &str,
    branch: &str,
    dest: &Path,
) -> Result<PathBuf> {
    if branch.trim().is_empty() {
        return Err(Error::Config("branch must not be empty".into()));
    }

    tracing::info!(repo, branch, dest = %dest.display(), "cloning docs");
    let dest_arg = dest.to_string_lossy();
    run_git(
        None,
        &[
            "clone",
            "--depth",
            "1",
            "--filter=blob:none",
            "--sparse",
            "--branch",
            branch,
            repo,
            &dest_arg,
        ],
    )?;
    run_git(Some(dest), &["sparse-checkout", "set", DOCS_SUBDIR])?;

    let docs = docs_root(dest);
    if !docs.is_dir() {
        return Err(Error::Fetch(format!(
            "branch {branch} has no {DOCS_SUBDIR}/{CONTENT_SUBDIR}/ directory"
        )));
    }
    Ok(docs)
}

/// Content root of a repository checkout.
pub fn docs_root(checkout: &Path) -> PathBuf {
    checkout.join(DOCS_SUBDIR).join(CONTENT_SUBDIR)
}

/// Content root for a user-supplied tree: a repository checkout, its
/// `website/` directory, or the content root itself. Anything else is
/// returned unchanged.
pub fn resolve_docs_root(path: &Path) -> PathBuf {
    [docs_root(path), path.join(CONTENT_SUBDIR)]
        .into_iter()
        .find(|candidate| candidate.is_dir())
        .unwrap_or_else(|| path.to_path_buf())
}

fn run_git(cwd: Option<&Path>, args: &[&str]) -> Result<()> {
    let mut command = Command::new("git");
    if let Some(dir) = cwd {
        command.arg("-C").arg(dir);
    }
    command.args(args);
    tracing::debug!(?args, "running git");

    let output = command.output().map_err(|e| {
        Error::Fetch(format!("could not run git (is it installed?): {e}"))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Fetch(format!(
            "git {} failed ({}): {}",
            args.first().copied().unwrap_or_default(),
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}
