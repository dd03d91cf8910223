use std::net::IpAddr;
use std::path::Path;
use std::process::Stdio;

use if_addrs::get_if_addrs;
use tokio::process::Command;

use crate::domain::config::AgentConfig;

/// First non-loopback IPv4 address assigned to any interface.
pub fn get_local_ip() -> Option<IpAddr> {
    get_if_addrs()
        .ok()?
        .iter()
        .find(|iface| !iface.is_loopback() && iface.ip().is_ipv4())
        .map(|iface| iface.ip())
}

pub fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| AgentConfig::UNKNOWN.to_string())
}

pub fn is_available(tool: &str) -> bool {
    which::which(tool).is_ok()
}

fn command(program: &str, args: &[&str], cwd: Option<&Path>) -> Command {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    command
}

/// Runs `program` and returns its trimmed stdout, or an empty string when it
/// cannot be spawned or exits unsuccessfully.
pub async fn run_command(program: &str, args: &[&str], cwd: Option<&Path>) -> String {
    match command(program, args, cwd).output().await {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        Ok(output) => {
            log::debug!("{} {:?} exited with {}", program, args, output.status);
            String::new()
        }
        Err(e) => {
            log::debug!("Failed to run {}: {}", program, e);
            String::new()
        }
    }
}

/// Runs `program` to completion, discarding its output. True on a zero exit.
pub async fn run_status(program: &str, args: &[&str], cwd: Option<&Path>) -> bool {
    match command(program, args, cwd).stdout(Stdio::null()).status().await {
        Ok(status) if status.success() => true,
        Ok(status) => {
            log::debug!("{} {:?} exited with {}", program, args, status);
            false
        }
        Err(e) => {
            log::debug!("Failed to run {}: {}", program, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_never_empty() {
        assert!(!get_hostname().is_empty());
    }

    #[tokio::test]
    async fn test_run_command_missing_program_is_empty() {
        assert_eq!(run_command("definitely-not-a-real-tool", &[], None).await, "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_trims_output() {
        assert_eq!(run_command("echo", &["  hi  "], None).await, "hi");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_failure_is_empty() {
        assert_eq!(run_command("false", &[], None).await, "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_status_reports_exit_code() {
        assert!(run_status("true", &[], None).await);
        assert!(!run_status("false", &[], None).await);
        assert!(!run_status("definitely-not-a-real-tool", &[], None).await);
    }
}
