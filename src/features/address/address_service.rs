use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Result;
use regex::Regex;

use crate::domain::config::AgentConfig;
use crate::utils;

const PROBE_URLS: [&str; 5] = [
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
    "https://icanhazip.com",
    "https://checkip.amazonaws.com",
    "https://ipinfo.io/ip",
];

const GOOGLE_TXT_QUERY: [&str; 5] = ["+short", "-4", "TXT", "o-o.myaddr.l.google.com", "@ns1.google.com"];
const OPENDNS_QUERY: [&str; 3] = ["+short", "myip.opendns.com", "@resolver1.opendns.com"];

fn ipv4_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").expect("valid IPv4 pattern"))
}

pub fn is_dotted_quad(candidate: &str) -> bool {
    ipv4_pattern().is_match(candidate)
}

/// Source of the host's primary assigned address.
#[async_trait::async_trait]
pub trait AddressSource: Send + Sync {
    /// Current primary address, or an empty string when none is assigned yet.
    async fn primary_address(&self) -> String;
}

pub struct InterfaceAddressSource;

#[async_trait::async_trait]
impl AddressSource for InterfaceAddressSource {
    async fn primary_address(&self) -> String {
        utils::get_local_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_default()
    }
}

/// Polls `source` until it reports an address matching `pattern` (`ANY` or a
/// required substring). After `max_attempts` polls the last value is returned
/// as-is, possibly empty.
pub async fn wait_for_internal_ip(
    source: &dyn AddressSource,
    pattern: &str,
    max_attempts: u32,
    interval: Duration,
) -> String {
    let pattern = pattern.trim();
    let require_match = !(pattern.is_empty() || pattern.eq_ignore_ascii_case(AgentConfig::ANY_NETWORK));
    let mut attempts = 0;

    loop {
        let ip = source.primary_address().await.trim().to_string();
        if !ip.is_empty() && (!require_match || ip.contains(pattern)) {
            return ip;
        }
        attempts += 1;
        if attempts >= max_attempts {
            log::warn!(
                "No internal address matching {:?} after {} attempts",
                pattern,
                attempts
            );
            return ip;
        }
        log::debug!("Waiting for internal address (attempt {}/{})", attempts, max_attempts);
        tokio::time::sleep(interval).await;
    }
}

/// DNS query tool used for the cheap external address lookups.
#[async_trait::async_trait]
pub trait DnsTool: Send + Sync {
    async fn query(&self, args: &[&str]) -> String;
}

pub struct Dig;

#[async_trait::async_trait]
impl DnsTool for Dig {
    async fn query(&self, args: &[&str]) -> String {
        utils::run_command("dig", args, None).await
    }
}

/// Resolves the public address: DNS lookups first, then HTTP probes in order.
pub struct ExternalIpResolver {
    dns: Option<Box<dyn DnsTool>>,
    probe_urls: Vec<String>,
    client: reqwest::Client,
}

impl ExternalIpResolver {
    pub fn new() -> Result<Self> {
        let dns: Option<Box<dyn DnsTool>> = if utils::is_available("dig") {
            Some(Box::new(Dig))
        } else {
            log::debug!("dig not found, skipping DNS-based lookups");
            None
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(AgentConfig::PROBE_TIMEOUT_SECS))
            .user_agent(AgentConfig::USER_AGENT)
            .build()?;
        Ok(Self::with_parts(
            dns,
            PROBE_URLS.iter().map(|u| u.to_string()).collect(),
            client,
        ))
    }

    pub fn with_parts(
        dns: Option<Box<dyn DnsTool>>,
        probe_urls: Vec<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            dns,
            probe_urls,
            client,
        }
    }

    pub async fn resolve(&self) -> String {
        if let Some(ip) = self.resolve_via_dns().await {
            return ip;
        }
        for url in &self.probe_urls {
            if let Some(ip) = self.probe(url).await {
                return ip;
            }
        }
        log::warn!("Could not determine external IP");
        AgentConfig::UNKNOWN.to_string()
    }

    async fn resolve_via_dns(&self) -> Option<String> {
        let dns = self.dns.as_ref()?;

        let txt = dns.query(&GOOGLE_TXT_QUERY).await.replace('"', "");
        let candidate = txt.lines().next().unwrap_or_default().trim();
        if is_dotted_quad(candidate) {
            return Some(candidate.to_string());
        }

        let answer = dns.query(&OPENDNS_QUERY).await;
        let candidate = answer.lines().next().unwrap_or_default().trim();
        if is_dotted_quad(candidate) {
            return Some(candidate.to_string());
        }
        None
    }

    async fn probe(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                log::debug!("{} answered {}", url, response.status());
                return None;
            }
            Err(e) => {
                log::debug!("{} failed: {}", url, e);
                return None;
            }
        };
        let body = response.text().await.ok()?;
        let candidate: String = body.trim().chars().filter(|c| *c != '\r' && *c != '\n').collect();
        is_dotted_quad(&candidate).then_some(candidate)
    }
}
