use std::collections::HashMap;
use std::path::Path;

use crate::domain::config::AgentConfig;
use crate::domain::models::HostFacts;
use crate::utils;

const OS_RELEASE_PATH: &str = "/etc/os-release";
const PROC_UPTIME_PATH: &str = "/proc/uptime";

pub async fn gather_host_facts() -> HostFacts {
    let os_release = read_os_release(Path::new(OS_RELEASE_PATH));
    let kernel = utils::run_command("uname", &["-r"], None).await;
    let uptime = std::fs::read_to_string(PROC_UPTIME_PATH)
        .ok()
        .and_then(|text| parse_proc_uptime(&text))
        .map(format_uptime);

    HostFacts {
        hostname: utils::get_hostname(),
        os_name: os_release
            .get("PRETTY_NAME")
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| AgentConfig::UNKNOWN.to_string()),
        kernel: if kernel.is_empty() {
            AgentConfig::UNKNOWN.to_string()
        } else {
            kernel
        },
        uptime: uptime.unwrap_or_else(|| AgentConfig::UNKNOWN.to_string()),
    }
}

pub fn read_os_release(path: &Path) -> HashMap<String, String> {
    std::fs::read_to_string(path)
        .map(|text| parse_os_release(&text))
        .unwrap_or_default()
}

pub fn parse_os_release(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().trim_matches('"').to_string()))
        .collect()
}

/// Seconds since boot from the first field of `/proc/uptime`.
fn parse_proc_uptime(text: &str) -> Option<u64> {
    let seconds: f64 = text.split_whitespace().next()?.parse().ok()?;
    Some(seconds as u64)
}

/// Renders seconds the way `uptime -p` does.
pub fn format_uptime(total_seconds: u64) -> String {
    let minutes = total_seconds / 60;
    let units = [
        (minutes / (60 * 24 * 7), "week"),
        (minutes / (60 * 24) % 7, "day"),
        (minutes / 60 % 24, "hour"),
        (minutes % 60, "minute"),
    ];
    let parts: Vec<String> = units
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{} {}{}", n, unit, if *n == 1 { "" } else { "s" }))
        .collect();

    if parts.is_empty() {
        "up 0 minutes".to_string()
    } else {
        format!("up {}", parts.join(", "))
    }
}
