use std::ffi::OsString;
use std::path::PathBuf;

use crate::domain::config::AgentConfig;

/// Revisions compared by one self-update pass. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateState {
    pub branch: String,
    pub local_ref: String,
    pub remote_ref: String,
}

impl UpdateState {
    pub fn needs_update(&self) -> bool {
        !self.local_ref.is_empty() && !self.remote_ref.is_empty() && self.local_ref != self.remote_ref
    }
}

/// Announcement sent after an update has been applied to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotice {
    pub hostname: String,
    pub branch: String,
    pub old_ref: String,
    pub new_ref: String,
}

impl UpdateNotice {
    pub fn version_change(&self, arrow: &str) -> String {
        format!("{} {arrow} {}", short_ref(&self.old_ref), short_ref(&self.new_ref))
    }
}

pub fn short_ref(reference: &str) -> &str {
    match reference.char_indices().nth(AgentConfig::SHORT_REF_LEN) {
        Some((idx, _)) => &reference[..idx],
        None => reference,
    }
}

/// Process replacement the caller must perform. Nothing runs after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaunchPlan {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Suppressed,
    Disabled,
    GitUnavailable,
    RemoteUnresolvable,
    NotARepository,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Skipped(SkipReason),
    UpToDate,
    /// The new revision is on disk but no runnable artifact could be produced
    /// for it, so the current process keeps running.
    BuildFailed,
    Relaunch(RelaunchPlan),
}
