use std::path::{Path, PathBuf};

use crate::domain::config::{AgentConfig, Settings};
use crate::utils;

/// Produces the executable for the revision checked out in a working tree.
#[async_trait::async_trait]
pub trait ReleaseBuilder: Send + Sync {
    /// Path of the runnable artifact inside `repo_root`, or `None` when it
    /// could not be produced from the checked-out sources.
    async fn build(&self, repo_root: &Path) -> Option<PathBuf>;
}

/// Builds with `cargo build --release`, or, with `GIT_BUILD=NO`, uses an
/// artifact committed to the repository.
pub struct CargoRelease {
    compile: bool,
    artifact: PathBuf,
}

impl CargoRelease {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            compile: !settings
                .get("GIT_BUILD")
                .is_some_and(|v| v.eq_ignore_ascii_case("NO")),
            artifact: PathBuf::from(settings.get_or("GIT_RELAUNCH_BIN", AgentConfig::RELAUNCH_BIN)),
        }
    }

    fn locate(&self, repo_root: &Path) -> Option<(PathBuf, PathBuf)> {
        let root = repo_root.canonicalize().ok()?;
        let artifact = match root.join(&self.artifact).canonicalize() {
            Ok(path) => path,
            Err(e) => {
                log::warn!("Update artifact {} not found: {}", self.artifact.display(), e);
                return None;
            }
        };
        if !artifact.is_file() || !artifact.starts_with(&root) {
            log::warn!(
                "Update artifact {} is not a file inside {}",
                artifact.display(),
                root.display()
            );
            return None;
        }
        Some((root, artifact))
    }
}

#[async_trait::async_trait]
impl ReleaseBuilder for CargoRelease {
    async fn build(&self, repo_root: &Path) -> Option<PathBuf> {
        if self.compile {
            if !utils::is_available("cargo") {
                log::warn!("cargo not found, cannot build the new revision");
                return None;
            }
            log::info!("Building the new revision in {}", repo_root.display());
            if !utils::run_status("cargo", &["build", "--release", "--quiet"], Some(repo_root)).await {
                log::warn!("cargo build failed in {}", repo_root.display());
                return None;
            }
        }

        let (root, artifact) = self.locate(repo_root)?;
        if !self.compile {
            // Without a build the file is only current if the pull wrote it.
            let relative = artifact.strip_prefix(&root).ok()?.to_str()?;
            let tracked = utils::run_command(
                "git",
                &["ls-files", "--error-unmatch", "--", relative],
                Some(&root),
            )
            .await;
            if tracked.is_empty() {
                log::warn!("{} is not tracked by git, refusing to relaunch it", relative);
                return None;
            }
        }
        Some(artifact)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    pub(crate) fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(["-c", "user.name=log-my-ip", "-c", "user.email=log-my-ip@example.com"])
            .args(args)
            .current_dir(dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed in {}", dir.display());
    }

    pub(crate) fn init_repo(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        git(dir, &["init", "--quiet"]);
        git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    }

    pub(crate) fn commit_file(repo: &Path, relative: &str, contents: &str) {
        let path = repo.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        git(repo, &["add", "--", relative]);
        git(repo, &["commit", "--quiet", "-m", contents]);
    }

    fn prebuilt(artifact: &str) -> CargoRelease {
        let settings: Settings = [("GIT_BUILD", "NO"), ("GIT_RELAUNCH_BIN", artifact)]
            .into_iter()
            .collect();
        CargoRelease::from_settings(&settings)
    }

    #[test]
    fn test_defaults_build_the_release_binary() {
        let release = CargoRelease::from_settings(&Settings::default());
        assert!(release.compile);
        assert_eq!(release.artifact, PathBuf::from("target/release/log-my-ip"));
    }

    #[tokio::test]
    async fn test_prebuilt_artifact_must_be_tracked() {
        if !utils::is_available("git") {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        init_repo(&repo);
        std::fs::create_dir_all(repo.join("bin")).unwrap();
        std::fs::write(repo.join("bin/log-my-ip"), "untracked").unwrap();

        let release = prebuilt("bin/log-my-ip");
        assert_eq!(release.build(&repo).await, None);

        commit_file(&repo, "bin/log-my-ip", "tracked");
        let artifact = release.build(&repo).await.unwrap();
        assert_eq!(std::fs::read_to_string(artifact).unwrap(), "tracked");
    }

    #[tokio::test]
    async fn test_artifact_outside_the_tree_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        std::fs::write(dir.path().join("outside"), "x").unwrap();

        assert_eq!(prebuilt("../outside").build(&repo).await, None);
        assert_eq!(prebuilt("missing").build(&repo).await, None);
    }
}
