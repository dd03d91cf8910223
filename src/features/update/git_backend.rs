use std::path::{Path, PathBuf};

use crate::utils;

/// Version-control operations the self-update needs, run inside one working tree.
#[async_trait::async_trait]
pub trait GitBackend: Send + Sync {
    fn is_available(&self) -> bool;
    async fn is_work_tree(&self) -> bool;
    /// Root directory of the working tree.
    async fn toplevel(&self) -> Option<PathBuf>;
    async fn fetch(&self, branch: &str);
    /// Resolved commit id, or `None` when the reference cannot be read.
    async fn rev_parse(&self, reference: &str) -> Option<String>;
    async fn checkout(&self, branch: &str);
    async fn pull(&self, branch: &str);
}

pub struct SystemGit {
    repo_dir: PathBuf,
}

impl SystemGit {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    async fn git(&self, args: &[&str]) -> String {
        utils::run_command("git", args, Some(&self.repo_dir)).await
    }
}

#[async_trait::async_trait]
impl GitBackend for SystemGit {
    fn is_available(&self) -> bool {
        utils::is_available("git")
    }

    async fn is_work_tree(&self) -> bool {
        self.git(&["rev-parse", "--is-inside-work-tree"]).await == "true"
    }

    async fn toplevel(&self) -> Option<PathBuf> {
        let out = self.git(&["rev-parse", "--show-toplevel"]).await;
        (!out.is_empty()).then(|| PathBuf::from(out))
    }

    async fn fetch(&self, branch: &str) {
        self.git(&["fetch", "--quiet", "origin", branch]).await;
    }

    async fn rev_parse(&self, reference: &str) -> Option<String> {
        let out = self.git(&["rev-parse", "--verify", "--quiet", reference]).await;
        (!out.is_empty()).then_some(out)
    }

    async fn checkout(&self, branch: &str) {
        self.git(&["checkout", "--quiet", branch]).await;
    }

    async fn pull(&self, branch: &str) {
        self.git(&["pull", "--force", "--quiet", "origin", branch]).await;
    }
}

/// Name lookup used to avoid hanging on update checks while offline.
#[async_trait::async_trait]
pub trait NameResolver: Send + Sync {
    async fn can_resolve(&self, host: &str) -> bool;
}

pub struct SystemResolver;

#[async_trait::async_trait]
impl NameResolver for SystemResolver {
    async fn can_resolve(&self, host: &str) -> bool {
        match tokio::net::lookup_host((host, 443)).await {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(e) => {
                log::debug!("Cannot resolve {}: {}", host, e);
                false
            }
        }
    }
}
