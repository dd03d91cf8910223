use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::config::AgentConfig;

/// Flat key/value configuration read from the INI file.
///
/// Built once per run and passed by reference to every component.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    pub fn parse(text: &str) -> Self {
        let mut values = HashMap::new();
        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            values.insert(key.trim().to_string(), unquote(value.trim()).to_string());
        }
        Self { values }
    }

    /// Loads the file at `path`. A missing or unreadable file gives empty settings.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) => {
                log::debug!("Could not read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the trimmed value for `key`, treating empty values as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn is_yes(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v.eq_ignore_ascii_case("YES"))
    }

    pub fn parse_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    pub fn enabled_channels(&self) -> EnabledChannels {
        EnabledChannels {
            discord: ChannelKind::Discord.is_enabled(self),
            telegram: ChannelKind::Telegram.is_enabled(self),
        }
    }

    pub fn self_update_enabled(&self) -> bool {
        self.is_yes("USE_SELFUPATE") || self.is_yes("USE_SELFUPDATE")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Notification destination types known to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Discord,
    Telegram,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 2] = [ChannelKind::Discord, ChannelKind::Telegram];

    pub fn name(self) -> &'static str {
        match self {
            ChannelKind::Discord => "Discord",
            ChannelKind::Telegram => "Telegram",
        }
    }

    fn enable_key(self) -> &'static str {
        match self {
            ChannelKind::Discord => "ENABLE_DISCORD",
            ChannelKind::Telegram => "ENABLE_TELEGRAM",
        }
    }

    /// Keys that must all be set for the channel to be usable.
    fn required_keys(self) -> &'static [&'static str] {
        match self {
            ChannelKind::Discord => &["DISCORD_WEBHOOK_URL"],
            ChannelKind::Telegram => &["TGTOKEN"],
        }
    }

    /// Destination keys of which at least one must be set. Empty means none needed.
    fn destination_keys(self) -> &'static [&'static str] {
        match self {
            ChannelKind::Discord => &[],
            ChannelKind::Telegram => &["TGGRPID", "TGCHATID"],
        }
    }

    pub fn has_credentials(self, settings: &Settings) -> bool {
        let required = self.required_keys().iter().all(|k| settings.get(k).is_some());
        let destinations = self.destination_keys();
        required && (destinations.is_empty() || destinations.iter().any(|k| settings.get(k).is_some()))
    }

    /// An explicit enable flag wins; otherwise enablement follows the credentials.
    pub fn is_enabled(self, settings: &Settings) -> bool {
        if settings.contains(self.enable_key()) {
            settings.is_yes(self.enable_key())
        } else {
            self.has_credentials(settings)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnabledChannels {
    pub discord: bool,
    pub telegram: bool,
}

impl EnabledChannels {
    pub fn any(&self) -> bool {
        self.discord || self.telegram
    }

    pub fn is_enabled(&self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Discord => self.discord,
            ChannelKind::Telegram => self.telegram,
        }
    }
}

/// Picks the configuration file: the CLI override, else the first existing
/// well-known location, else the default write target.
pub fn resolve_ini_path(cli_path: Option<&str>) -> PathBuf {
    if let Some(path) = cli_path {
        return expand_home(path);
    }
    let mut candidates = vec![PathBuf::from(AgentConfig::SYSTEM_INI_PATH)];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(AgentConfig::USER_INI_NAME));
    }
    candidates.push(PathBuf::from(AgentConfig::DEFAULT_INI_PATH));

    candidates
        .into_iter()
        .find(|p| p.exists())
        .unwrap_or_else(|| PathBuf::from(AgentConfig::DEFAULT_INI_PATH))
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if path == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    }
}
