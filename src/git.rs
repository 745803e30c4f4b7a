//! Working-copy lifecycle: acquire, branch, commit, push, return to base.
//!
//! Every operation shells out to `git` with a bounded wait. One working copy
//! is reused for the whole run, so each step must settle before the next.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::provider;
use crate::runner::{self, CommandOutput, ProcessError};

pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum GitError {
    #[error("git command failed: {0}")]
    Command(#[from] ProcessError),
    #[error("repository has not been cloned yet")]
    NotCloned,
    #[error("failed to prepare work directory {}: {source}", path.display())]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of a step whose failure is logged but never escalated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort {
    Settled,
    Swallowed(String),
}

impl BestEffort {
    pub fn is_settled(&self) -> bool {
        matches!(self, BestEffort::Settled)
    }
}

/// The branch/commit/push operations the publish pipeline needs.
pub trait VersionControl {
    fn create_branch(&mut self, branch: &str, base: &str) -> Result<(), GitError>;
    fn commit_and_push(&mut self, branch: &str, message: &str) -> Result<(), GitError>;
    fn checkout(&mut self, branch: &str) -> Result<(), GitError>;

    /// Check out `base`, swallowing any failure.
    fn return_to_base(&mut self, base: &str) -> BestEffort {
        match self.checkout(base) {
            Ok(()) => BestEffort::Settled,
            Err(e) => {
                tracing::warn!(base, error = %e, "could not return to base branch");
                BestEffort::Swallowed(e.to_string())
            }
        }
    }
}

pub struct RepositoryManager {
    work_dir: PathBuf,
    token: String,
    repo_path: Option<PathBuf>,
    timeout: Duration,
}

impl RepositoryManager {
    pub fn new(work_dir: impl Into<PathBuf>, token: impl Into<String>) -> Self {
        RepositoryManager {
            work_dir: work_dir.into(),
            token: token.into(),
            repo_path: None,
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn repo_path(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }

    /// Clone `repo_url`, or reset an existing clone to `origin/<branch>`.
    pub fn clone_or_update(&mut self, repo_url: &str, branch: &str) -> Result<PathBuf, GitError> {
        std::fs::create_dir_all(&self.work_dir).map_err(|source| GitError::WorkDir {
            path: self.work_dir.clone(),
            source,
        })?;
        let repo_name = extract_repo_name(repo_url);
        let repo_path = self.work_dir.join(&repo_name);

        if repo_path.join(".git").exists() {
            tracing::info!(path = %repo_path.display(), branch, "refreshing existing clone");
            self.repo_path = Some(repo_path.clone());
            self.git(&["fetch", "origin"])?;
            self.git(&["checkout", branch])?;
            self.git(&["reset", "--hard", &format!("origin/{branch}")])?;
            self.git(&["clean", "-fd"])?;
        } else {
            tracing::info!(path = %repo_path.display(), branch, "cloning repository");
            let auth_url = provider::inject_auth(repo_url, &self.token);
            let work_dir = self.work_dir.clone();
            self.git_in(&work_dir, &["clone", "--branch", branch, &auth_url, &repo_name])?;
            self.repo_path = Some(repo_path.clone());
        }
        Ok(repo_path)
    }

    fn git(&self, args: &[&str]) -> Result<CommandOutput, GitError> {
        let repo = self.repo_path.as_deref().ok_or(GitError::NotCloned)?;
        self.git_in(repo, args)
    }

    fn git_in(&self, dir: &Path, args: &[&str]) -> Result<CommandOutput, GitError> {
        let envs = [("GIT_TERMINAL_PROMPT", "0"), ("GIT_ASKPASS", "echo")];
        Ok(runner::run_command("git", args, dir, &envs, self.timeout)?)
    }
}

impl VersionControl for RepositoryManager {
    /// Check out a clean `base`, then force-create `branch` from it.
    fn create_branch(&mut self, branch: &str, base: &str) -> Result<(), GitError> {
        self.git(&["checkout", "-f", base])?;
        self.git(&["clean", "-fd"])?;
        self.git(&["checkout", "-B", branch])?;
        Ok(())
    }

    fn commit_and_push(&mut self, branch: &str, message: &str) -> Result<(), GitError> {
        self.git(&["add", "-A"])?;
        self.git(&["commit", "-m", message])?;
        self.git(&["push", "-u", "origin", branch, "--force"])?;
        Ok(())
    }

    fn checkout(&mut self, branch: &str) -> Result<(), GitError> {
        self.git(&["checkout", branch])?;
        Ok(())
    }

    /// Drop whatever a failed step left in the working copy, then check out `base`.
    fn return_to_base(&mut self, base: &str) -> BestEffort {
        let settled = self
            .git(&["reset", "--hard"])
            .and_then(|_| self.git(&["clean", "-fd"]))
            .and_then(|_| self.git(&["checkout", base]));
        match settled {
            Ok(_) => BestEffort::Settled,
            Err(e) => {
                tracing::warn!(base, error = %e, "could not return to base branch");
                BestEffort::Swallowed(e.to_string())
            }
        }
    }
}

/// Last path segment of a repository URL, without `.git`.
pub fn extract_repo_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let name = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    if name.is_empty() {
        "repository".to_string()
    } else {
        name.to_string()
    }
}
