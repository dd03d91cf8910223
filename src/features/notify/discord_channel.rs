use chrono::{SecondsFormat, Utc};
use url::Url;

use crate::domain::config::{AgentConfig, ChannelKind};
use crate::domain::error::NotifyError;
use crate::domain::models::{
    Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedThumbnail, Report, UpdateNotice,
    WebhookMessage,
};
use crate::features::host::os_logo_url;

use super::notify_service::{check_status, NotifyService};

/// Adds `thread_id` and `wait=true` to a webhook URL, keeping any existing
/// query parameters. Unparsable URLs get the parameters appended verbatim.
pub fn augment_webhook_url(url: &str, thread_id: Option<&str>, wait: bool) -> String {
    let mut extra: Vec<(&str, &str)> = Vec::new();
    if let Some(id) = thread_id {
        extra.push(("thread_id", id));
    }
    if wait {
        extra.push(("wait", "true"));
    }
    if extra.is_empty() {
        return url.to_string();
    }

    match Url::parse(url) {
        Ok(mut parsed) => {
            let mut pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
            for (key, value) in extra {
                pairs.retain(|pair| pair.0 != key);
                pairs.push((key.to_string(), value.to_string()));
            }
            parsed.query_pairs_mut().clear().extend_pairs(&pairs);
            parsed.to_string()
        }
        Err(e) => {
            log::debug!("Could not parse webhook URL ({}), appending parameters", e);
            let mut naive = url.to_string();
            for (key, value) in extra {
                naive.push(if naive.contains('?') { '&' } else { '?' });
                naive.push_str(&format!("{key}={value}"));
            }
            naive
        }
    }
}

impl NotifyService<'_> {
    pub async fn send_discord(&mut self, report: &Report) -> bool {
        let Some(url) = self.webhook_url() else {
            log::error!(
                "Discord send failed: {}",
                NotifyError::MissingConfig("DISCORD_WEBHOOK_URL")
            );
            return false;
        };

        let use_embeds = !self
            .settings
            .get("DISCORD_USE_EMBEDS")
            .is_some_and(|v| v.eq_ignore_ascii_case("NO"));
        let message = if use_embeds {
            self.embed_message(report)
        } else {
            self.text_message(report)
        };

        if self.dry_run {
            return self.record_webhook_dry_run(&url, &message);
        }

        let err = match self.post_webhook(&url, &message).await {
            Ok(()) => return true,
            Err(err) => err,
        };
        if !(use_embeds && err.is_payload_rejection()) {
            log::error!("Discord send failed: {}", err);
            return false;
        }

        log::warn!("Discord rejected the embed payload ({}), retrying as plain text", err);
        match self.post_webhook(&url, &self.text_message(report)).await {
            Ok(()) => true,
            Err(fallback_err) => {
                log::error!("Discord send failed: {}", fallback_err);
                false
            }
        }
    }

    pub(super) async fn announce_discord(&mut self, notice: &UpdateNotice) -> bool {
        let Some(url) = self.webhook_url() else {
            return false;
        };
        let message = WebhookMessage {
            embeds: vec![Embed {
                title: "Self-update applied".to_string(),
                description: format!("Updated on {}", notice.hostname),
                color: AgentConfig::DISCORD_UPDATE_COLOR,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
                author: None,
                footer: None,
                thumbnail: None,
                fields: vec![
                    EmbedField::inline("Branch", &notice.branch),
                    EmbedField::inline("Version", &notice.version_change("→")),
                ],
            }],
            ..self.message_base()
        };

        if self.dry_run {
            return self.record_webhook_dry_run(&url, &message);
        }
        self.post_webhook(&url, &message).await.is_ok()
    }

    fn webhook_url(&self) -> Option<String> {
        let base = self.settings.get("DISCORD_WEBHOOK_URL")?;
        Some(augment_webhook_url(
            base,
            self.settings.get("DISCORD_THREAD_ID"),
            self.settings.is_yes("DISCORD_WAIT"),
        ))
    }

    fn message_base(&self) -> WebhookMessage {
        WebhookMessage {
            username: self
                .settings
                .get_or("DISCORD_USERNAME", AgentConfig::DISCORD_USERNAME)
                .to_string(),
            avatar_url: self.settings.get_or("DISCORD_AVATAR_URL", "").to_string(),
            content: None,
            embeds: Vec::new(),
        }
    }

    fn embed_message(&self, report: &Report) -> WebhookMessage {
        let color = self
            .settings
            .parse_or("DISCORD_EMBED_COLOR", AgentConfig::DISCORD_EMBED_COLOR);
        let thumbnail = os_logo_url(self.settings, &self.os_release, &report.os_name)
            .map(|url| EmbedThumbnail { url });

        WebhookMessage {
            embeds: vec![Embed {
                title: "System Update".to_string(),
                description: report.note.clone(),
                color,
                timestamp: report.iso_timestamp(),
                author: Some(EmbedAuthor {
                    name: report.hostname.clone(),
                }),
                footer: Some(EmbedFooter {
                    text: AgentConfig::DISCORD_FOOTER.to_string(),
                }),
                thumbnail,
                fields: report
                    .fields()
                    .iter()
                    .map(|(name, value)| EmbedField::inline(name, value))
                    .collect(),
            }],
            ..self.message_base()
        }
    }

    fn text_message(&self, report: &Report) -> WebhookMessage {
        WebhookMessage {
            content: Some(report.plain_text()),
            ..self.message_base()
        }
    }

    fn record_webhook_dry_run(&mut self, url: &str, message: &WebhookMessage) -> bool {
        match serde_json::to_string(message).map_err(NotifyError::from) {
            Ok(body) => {
                self.record_dry_run(ChannelKind::Discord, url, body);
                true
            }
            Err(e) => {
                log::error!("Discord send failed: {}", e);
                false
            }
        }
    }

    async fn post_webhook(&self, url: &str, message: &WebhookMessage) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(url)
            .json(message)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url()))?;
        check_status(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::Settings;
    use crate::domain::models::report::sample_report;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(settings: &Settings, dry_run: bool) -> NotifyService<'_> {
        NotifyService::new(settings, dry_run)
            .unwrap()
            .with_os_release(HashMap::new())
    }

    #[test]
    fn test_augment_adds_thread_and_wait() {
        let url = augment_webhook_url("https://discord.com/api/webhooks/1/abc", Some("99"), true);
        assert_eq!(url, "https://discord.com/api/webhooks/1/abc?thread_id=99&wait=true");
    }

    #[test]
    fn test_augment_merges_existing_query() {
        let url = augment_webhook_url("https://h/api/webhooks/1/abc?foo=bar&wait=false", None, true);
        assert_eq!(url, "https://h/api/webhooks/1/abc?foo=bar&wait=true");
    }

    #[test]
    fn test_augment_collapses_repeated_keys() {
        let url = augment_webhook_url(
            "https://h/api/webhooks/1/abc?thread_id=1&a=b&thread_id=2",
            Some("9"),
            false,
        );
        assert_eq!(url, "https://h/api/webhooks/1/abc?a=b&thread_id=9");
    }

    #[test]
    fn test_augment_without_options_is_untouched() {
        assert_eq!(augment_webhook_url("https://h/x?y=1", None, false), "https://h/x?y=1");
    }

    #[test]
    fn test_augment_unparsable_url_falls_back_to_concatenation() {
        assert_eq!(
            augment_webhook_url("not a url", Some("7"), true),
            "not a url?thread_id=7&wait=true"
        );
        assert_eq!(
            augment_webhook_url("relative/path?x=1", None, true),
            "relative/path?x=1&wait=true"
        );
    }

    #[tokio::test]
    async fn test_missing_webhook_url_fails_without_io() {
        let settings = Settings::default();
        assert!(!service(&settings, false).send_discord(&sample_report()).await);
    }

    #[tokio::test]
    async fn test_embed_payload_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook"))
            .and(body_partial_json(json!({
                "username": "Pi IP Logger",
                "embeds": [{
                    "title": "System Update",
                    "description": "REBOOT",
                    "color": 3066993,
                    "author": {"name": "pi4"},
                    "footer": {"text": "log-my-ip • Discord"},
                    "fields": [
                        {"name": "Hostname", "value": "pi4", "inline": true},
                        {"name": "Internal IP", "value": "192.168.1.20", "inline": true},
                        {"name": "External IP", "value": "203.0.113.9", "inline": true},
                        {"name": "OS", "value": "Debian GNU/Linux 12 (bookworm)", "inline": true},
                        {"name": "Kernel", "value": "6.1.0-rpi7", "inline": true},
                        {"name": "Uptime", "value": "up 5 minutes", "inline": true}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let webhook = format!("{}/webhook", server.uri());
        let settings: Settings = [("DISCORD_WEBHOOK_URL", webhook.as_str())].into_iter().collect();
        assert!(service(&settings, false).send_discord(&sample_report()).await);
    }

    #[tokio::test]
    async fn test_thread_and_wait_reach_the_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook"))
            .and(query_param("thread_id", "123"))
            .and(query_param("wait", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1"})))
            .expect(1)
            .mount(&server)
            .await;

        let webhook = format!("{}/webhook", server.uri());
        let settings: Settings = [
            ("DISCORD_WEBHOOK_URL", webhook.as_str()),
            ("DISCORD_THREAD_ID", "123"),
            ("DISCORD_WAIT", "YES"),
        ]
        .into_iter()
        .collect();
        assert!(service(&settings, false).send_discord(&sample_report()).await);
    }

    #[tokio::test]
    async fn test_rejected_embed_retries_once_as_plain_text() {
        for status in [400, 401, 403] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(body_string_contains("\"embeds\""))
                .respond_with(ResponseTemplate::new(status).set_body_string("invalid embed"))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(body_partial_json(json!({"content": sample_report().plain_text()})))
                .respond_with(ResponseTemplate::new(204))
                .expect(1)
                .mount(&server)
                .await;

            let webhook = format!("{}/webhook", server.uri());
            let settings: Settings = [("DISCORD_WEBHOOK_URL", webhook.as_str())].into_iter().collect();
            assert!(service(&settings, false).send_discord(&sample_report()).await);
        }
    }

    #[tokio::test]
    async fn test_other_failures_do_not_retry() {
        for status in [404, 429, 500, 503] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(status))
                .expect(1)
                .mount(&server)
                .await;

            let webhook = format!("{}/webhook", server.uri());
            let settings: Settings = [("DISCORD_WEBHOOK_URL", webhook.as_str())].into_iter().collect();
            assert!(!service(&settings, false).send_discord(&sample_report()).await);
        }
    }

    #[tokio::test]
    async fn test_plain_text_rejection_does_not_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let webhook = format!("{}/webhook", server.uri());
        let settings: Settings = [
            ("DISCORD_WEBHOOK_URL", webhook.as_str()),
            ("DISCORD_USE_EMBEDS", "NO"),
        ]
        .into_iter()
        .collect();
        assert!(!service(&settings, false).send_discord(&sample_report()).await);
    }

    #[tokio::test]
    async fn test_failed_fallback_reports_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .expect(2)
            .mount(&server)
            .await;

        let webhook = format!("{}/webhook", server.uri());
        let settings: Settings = [("DISCORD_WEBHOOK_URL", webhook.as_str())].into_iter().collect();
        assert!(!service(&settings, false).send_discord(&sample_report()).await);
    }

    #[tokio::test]
    async fn test_dry_run_builds_payload_without_io() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let webhook = format!("{}/webhook", server.uri());
        let settings: Settings = [
            ("DISCORD_WEBHOOK_URL", webhook.as_str()),
            ("DISCORD_OS_LOGO_CODE", "deb"),
            ("DISCORD_EMBED_COLOR", "255"),
        ]
        .into_iter()
        .collect();
        let report = sample_report();

        let mut first = service(&settings, true);
        assert!(first.send_discord(&report).await);
        let mut second = service(&settings, true);
        assert!(second.send_discord(&report).await);

        assert_eq!(first.dry_runs(), second.dry_runs());
        let record = &first.dry_runs()[0];
        assert_eq!(record.channel, ChannelKind::Discord);
        assert_eq!(record.target, webhook);

        let body: Value = serde_json::from_str(&record.body).unwrap();
        assert_eq!(body["embeds"][0]["color"], 255);
        assert_eq!(body["embeds"][0]["timestamp"], "2025-01-02T03:04:05.000000Z");
        assert!(body["embeds"][0]["thumbnail"]["url"]
            .as_str()
            .unwrap()
            .ends_with("/DEB.png"));
    }

    #[tokio::test]
    async fn test_dry_run_plain_text_payload() {
        let settings: Settings = [
            ("DISCORD_WEBHOOK_URL", "https://discord.invalid/hook"),
            ("DISCORD_USE_EMBEDS", "no"),
            ("DISCORD_USERNAME", "Rack 3"),
        ]
        .into_iter()
        .collect();
        let mut service = service(&settings, true);
        assert!(service.send_discord(&sample_report()).await);

        let body: Value = serde_json::from_str(&service.dry_runs()[0].body).unwrap();
        assert_eq!(
            body,
            json!({
                "username": "Rack 3",
                "avatar_url": "",
                "content": sample_report().plain_text()
            })
        );
    }
}
