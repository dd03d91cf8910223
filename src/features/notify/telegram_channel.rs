use crate::domain::config::ChannelKind;
use crate::domain::error::NotifyError;
use crate::domain::models::update::short_ref;
use crate::domain::models::{Report, UpdateNotice};

use super::notify_service::{check_status, NotifyService};

impl NotifyService<'_> {
    /// Sends the short report to the group and the individual chat. Both are
    /// attempted; success requires every destination to accept the message.
    pub async fn send_telegram(&mut self, report: &Report) -> bool {
        let settings = self.settings;
        let token = settings.get("TGTOKEN");
        let group = settings.get("TGGRPID");
        let chat = settings.get("TGCHATID");

        let Some(token) = token.filter(|_| group.is_some() || chat.is_some()) else {
            log::error!(
                "Telegram send failed: {}",
                NotifyError::MissingConfig("TGTOKEN + TGGRPID/TGCHATID")
            );
            return false;
        };

        let text = report.short_text();
        let mut destinations: Vec<&str> = Vec::new();
        for id in [group, chat].into_iter().flatten() {
            if !destinations.contains(&id) {
                destinations.push(id);
            }
        }

        let mut ok = true;
        for chat_id in destinations {
            ok = self.deliver_telegram(token, chat_id, &text).await && ok;
        }
        ok
    }

    pub(super) async fn announce_telegram(&mut self, notice: &UpdateNotice) -> bool {
        let settings = self.settings;
        let (Some(token), Some(chat_id)) = (
            settings.get("TGTOKEN"),
            settings.get("TGGRPID").or_else(|| settings.get("TGCHATID")),
        ) else {
            return false;
        };
        let text = format!(
            "Self-update applied on {} (branch {}): {} -> {}",
            notice.hostname,
            notice.branch,
            short_ref(&notice.old_ref),
            short_ref(&notice.new_ref)
        );
        self.deliver_telegram(token, chat_id, &text).await
    }

    async fn deliver_telegram(&mut self, token: &str, chat_id: &str, text: &str) -> bool {
        if self.dry_run {
            self.record_dry_run(ChannelKind::Telegram, chat_id, text.to_string());
            return true;
        }
        match self.post_message(token, chat_id, text).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Telegram send failed for {}: {}", chat_id, e);
                false
            }
        }
    }

    async fn post_message(&self, token: &str, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.telegram_api_base, token);
        let response = self
            .client
            .post(&url)
            .form(&[("chat_id", chat_id), ("text", text)])
            .send()
            .await
            // The request URL embeds the bot token.
            .map_err(|e| NotifyError::Transport(e.without_url()))?;
        check_status(response).await
    }
}
