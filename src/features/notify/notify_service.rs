use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::domain::config::{AgentConfig, ChannelKind, EnabledChannels, Settings};
use crate::domain::error::NotifyError;
use crate::domain::models::{Report, UpdateNotice};
use crate::features::host::read_os_release;
use crate::features::update::UpdateAnnouncer;

const MAX_ERROR_BODY_CHARS: usize = 500;

/// Payload that dry-run mode built instead of sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DryRunRecord {
    pub channel: ChannelKind,
    pub target: String,
    pub body: String,
}

/// Sends reports and update notices to every enabled channel.
pub struct NotifyService<'a> {
    pub(super) settings: &'a Settings,
    pub(super) client: reqwest::Client,
    pub(super) telegram_api_base: String,
    pub(super) os_release: HashMap<String, String>,
    pub(super) dry_run: bool,
    dry_runs: Vec<DryRunRecord>,
}

impl<'a> NotifyService<'a> {
    pub fn new(settings: &'a Settings, dry_run: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(AgentConfig::SEND_TIMEOUT_SECS))
            .user_agent(AgentConfig::USER_AGENT)
            .build()?;
        Ok(Self {
            settings,
            client,
            telegram_api_base: AgentConfig::TELEGRAM_API_BASE.to_string(),
            os_release: read_os_release(Path::new("/etc/os-release")),
            dry_run,
            dry_runs: Vec::new(),
        })
    }

    #[cfg(test)]
    pub fn with_telegram_api_base(mut self, base: impl Into<String>) -> Self {
        self.telegram_api_base = base.into();
        self
    }

    #[cfg(test)]
    pub fn with_os_release(mut self, os_release: HashMap<String, String>) -> Self {
        self.os_release = os_release;
        self
    }

    pub fn dry_runs(&self) -> &[DryRunRecord] {
        &self.dry_runs
    }

    /// Sends `report` to each enabled channel. Every enabled channel is
    /// attempted; the result is true only if all of them delivered.
    pub async fn dispatch(&mut self, report: &Report, enabled: EnabledChannels) -> bool {
        if !enabled.any() {
            log::error!("No destination enabled, nothing to send");
            return false;
        }

        let mut ok = true;
        if enabled.discord {
            ok = self.send_discord(report).await && ok;
        }
        if enabled.telegram {
            ok = self.send_telegram(report).await && ok;
        }
        ok
    }

    pub(super) fn record_dry_run(&mut self, channel: ChannelKind, target: &str, body: String) {
        let record = DryRunRecord {
            channel,
            target: target.to_string(),
            body,
        };
        match record.channel {
            ChannelKind::Discord => println!("[DRY RUN] Discord payload: {}", record.body),
            ChannelKind::Telegram => {
                println!("[DRY RUN] Telegram sendMessage to {}: {}", record.target, record.body)
            }
        }
        self.dry_runs.push(record);
    }
}

#[async_trait::async_trait]
impl UpdateAnnouncer for NotifyService<'_> {
    async fn announce(&mut self, notice: &UpdateNotice) {
        let enabled = self.settings.enabled_channels();
        for kind in ChannelKind::ALL {
            if !enabled.is_enabled(kind) {
                continue;
            }
            let delivered = match kind {
                ChannelKind::Discord => self.announce_discord(notice).await,
                ChannelKind::Telegram => self.announce_telegram(notice).await,
            };
            if !delivered {
                log::debug!("Update announcement via {} was not delivered", kind.name());
            }
        }
    }
}

/// Maps a non-2xx response to `NotifyError::Status`, keeping a bounded body.
pub(super) async fn check_status(response: reqwest::Response) -> Result<(), NotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Status {
        status: status.as_u16(),
        body: body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}
