use std::ffi::OsString;
use std::path::PathBuf;

use crate::domain::config::{AgentConfig, Settings};
use crate::domain::models::update::short_ref;
use crate::domain::models::{
    RelaunchPlan, SkipReason, UpdateNotice, UpdateOutcome, UpdateState,
};

use super::git_backend::{GitBackend, NameResolver};
use super::release_builder::ReleaseBuilder;

/// Receives the notice once an update has been written to disk. Failures
/// are the announcer's to absorb.
#[async_trait::async_trait]
pub trait UpdateAnnouncer: Send {
    async fn announce(&mut self, notice: &UpdateNotice);
}

/// Per-run inputs to the self-update pass.
pub struct UpdateRequest<'a> {
    /// Set for reboot-triggered runs.
    pub suppressed: bool,
    pub hostname: &'a str,
    /// Arguments passed unchanged to the relaunched process.
    pub args: Vec<OsString>,
}

pub struct UpdateService<'a> {
    settings: &'a Settings,
    git: Box<dyn GitBackend>,
    resolver: Box<dyn NameResolver>,
    builder: Box<dyn ReleaseBuilder>,
}

impl<'a> UpdateService<'a> {
    pub fn new(
        settings: &'a Settings,
        git: Box<dyn GitBackend>,
        resolver: Box<dyn NameResolver>,
        builder: Box<dyn ReleaseBuilder>,
    ) -> Self {
        Self {
            settings,
            git,
            resolver,
            builder,
        }
    }

    /// Single pass: gates, fetch, compare, apply, build, announce. Returns
    /// `Relaunch` only once an executable for the new revision exists; the
    /// caller must replace the process with it and run nothing else.
    pub async fn run(
        &self,
        request: UpdateRequest<'_>,
        announcer: &mut dyn UpdateAnnouncer,
    ) -> UpdateOutcome {
        if let Some(reason) = self.skip_reason(request.suppressed).await {
            log::debug!("Self-update skipped: {:?}", reason);
            return UpdateOutcome::Skipped(reason);
        }

        let branch = self.branch();
        self.git.fetch(branch).await;

        let state = UpdateState {
            branch: branch.to_string(),
            local_ref: self.git.rev_parse("HEAD").await.unwrap_or_default(),
            remote_ref: self
                .git
                .rev_parse(&format!("origin/{branch}"))
                .await
                .unwrap_or_default(),
        };
        if !state.needs_update() {
            log::debug!("Already up to date with origin/{}", branch);
            return UpdateOutcome::UpToDate;
        }

        log::info!("Found a new version of me, updating myself...");
        self.git.checkout(branch).await;
        self.git.pull(branch).await;
        let new_ref = self
            .git
            .rev_parse("HEAD")
            .await
            .unwrap_or_else(|| "unknown".to_string());

        let Some(program) = self.release_for_checkout().await else {
            log::warn!(
                "Updated sources to {} but could not build them, continuing with the running version",
                short_ref(&new_ref)
            );
            return UpdateOutcome::BuildFailed;
        };

        announcer
            .announce(&UpdateNotice {
                hostname: request.hostname.to_string(),
                branch: state.branch,
                old_ref: state.local_ref,
                new_ref,
            })
            .await;

        log::info!("Running the new version...");
        UpdateOutcome::Relaunch(RelaunchPlan {
            program,
            args: request.args,
        })
    }

    async fn release_for_checkout(&self) -> Option<PathBuf> {
        let root = self.git.toplevel().await?;
        self.builder.build(&root).await
    }

    async fn skip_reason(&self, suppressed: bool) -> Option<SkipReason> {
        if suppressed {
            return Some(SkipReason::Suppressed);
        }
        if !self.settings.self_update_enabled() {
            return Some(SkipReason::Disabled);
        }
        if !self.git.is_available() {
            return Some(SkipReason::GitUnavailable);
        }
        if !self.resolver.can_resolve(self.remote_host()).await {
            return Some(SkipReason::RemoteUnresolvable);
        }
        if !self.git.is_work_tree().await {
            return Some(SkipReason::NotARepository);
        }
        None
    }

    fn branch(&self) -> &'a str {
        self.settings.get_or("GIT_BRANCH", AgentConfig::GIT_BRANCH)
    }

    fn remote_host(&self) -> &'a str {
        self.settings
            .get_or("GIT_REMOTE_HOST", AgentConfig::GIT_REMOTE_HOST)
    }
}

/// Replaces the current process image. Only returns on failure.
#[cfg(unix)]
pub fn exec_relaunch(plan: &RelaunchPlan) -> std::io::Error {
    use std::os::unix::process::CommandExt;

    std::process::Command::new(&plan.program)
        .args(&plan.args)
        .exec()
}

#[cfg(not(unix))]
pub fn exec_relaunch(plan: &RelaunchPlan) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("cannot replace the process with {}", plan.program.display()),
    )
}
