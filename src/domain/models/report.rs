use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::config::AgentConfig;

/// Descriptive host strings, each already defaulted to `Unknown` on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFacts {
    pub hostname: String,
    pub os_name: String,
    pub kernel: String,
    pub uptime: String,
}

/// Everything sent in one status notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub note: String,
    pub hostname: String,
    pub internal_ip: String,
    pub external_ip: String,
    pub os_name: String,
    pub kernel: String,
    pub uptime: String,
    pub timestamp: DateTime<Utc>,
}

impl Report {
    pub fn new(note: &str, facts: HostFacts, internal_ip: &str, external_ip: &str) -> Self {
        Self {
            note: note.to_string(),
            hostname: facts.hostname,
            internal_ip: or_unknown(internal_ip),
            external_ip: or_unknown(external_ip),
            os_name: facts.os_name,
            kernel: facts.kernel,
            uptime: facts.uptime,
            timestamp: Utc::now(),
        }
    }

    /// Labeled values in display order.
    pub fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("Hostname", &self.hostname),
            ("Internal IP", &self.internal_ip),
            ("External IP", &self.external_ip),
            ("OS", &self.os_name),
            ("Kernel", &self.kernel),
            ("Uptime", &self.uptime),
        ]
    }

    pub fn plain_text(&self) -> String {
        let mut text = format!("System Update: {}", self.note);
        for (label, value) in self.fields() {
            text.push_str(&format!("\n{label}: {value}"));
        }
        text
    }

    pub fn short_text(&self) -> String {
        format!(
            "{}\nHostname: {}\nInternal IP: {}\nExternal IP: {}",
            self.note, self.hostname, self.internal_ip, self.external_ip
        )
    }

    pub fn iso_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

fn or_unknown(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        AgentConfig::UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
pub(crate) fn sample_report() -> Report {
    Report {
        note: "REBOOT".to_string(),
        hostname: "pi4".to_string(),
        internal_ip: "192.168.1.20".to_string(),
        external_ip: "203.0.113.9".to_string(),
        os_name: "Debian GNU/Linux 12 (bookworm)".to_string(),
        kernel: "6.1.0-rpi7".to_string(),
        uptime: "up 5 minutes".to_string(),
        timestamp: DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z")
            .map(|t| t.with_timezone(&Utc))
            .unwrap(),
    }
}
