//! Current commit and branch of the repository a site lives in

use camino::Utf8Path;
use eyre::{Result, WrapErr};
use git2::{ErrorCode, Repository};
use serde::Serialize;

/// Repository state at build time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GitInfo {
    /// Commit HEAD points at; `None` on a branch without commits
    pub sha: Option<String>,
    /// Checked out branch; `None` when HEAD is detached
    pub branch: Option<String>,
}

impl GitInfo {
    /// Find the repository containing `dir` and read its HEAD.
    ///
    /// Returns `Ok(None)` when `dir` is not inside a repository.
    pub fn discover(dir: &Utf8Path) -> Result<Option<Self>> {
        let repo = match Repository::discover(dir) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).wrap_err_with(|| format!("Failed to open git repository at {dir}"));
            }
        };
        tracing::debug!("Reading git HEAD from {}", repo.path().display());
        Self::read(&repo).map(Some)
    }

    /// Read HEAD of an open repository
    pub fn read(repo: &Repository) -> Result<Self> {
        let head = match repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                return Ok(Self {
                    sha: None,
                    branch: unborn_branch(repo)?,
                });
            }
            Err(e) => return Err(e).wrap_err("Failed to resolve git HEAD"),
        };

        let sha = head
            .peel_to_commit()
            .wrap_err("HEAD does not point at a commit")?
            .id()
            .to_string();
        let branch = if repo.head_detached()? {
            None
        } else {
            head.shorthand().map(str::to_string)
        };
        Ok(Self {
            sha: Some(sha),
            branch,
        })
    }
}

/// Branch HEAD names before its first commit exists
fn unborn_branch(repo: &Repository) -> Result<Option<String>> {
    let head = repo.find_reference("HEAD")?;
    Ok(head
        .symbolic_target()
        .map(|target| target.strip_prefix("refs/heads/").unwrap_or(target).to_string()))
}
