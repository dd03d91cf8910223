use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::config::Settings;

/// Keys the agent understands, with the value appended when missing.
/// `None` entries are added as commented placeholders.
const KNOWN_KEYS: &[(&str, Option<&str>)] = &[
    ("USE_SELFUPATE", Some("NO")),
    ("GIT_BRANCH", Some("\"main\"")),
    ("GIT_REPO_DIR", None),
    ("GIT_BUILD", None),
    ("GIT_RELAUNCH_BIN", None),
    ("_my_network_range", Some("\"ANY\"")),
    ("NETWORK_WAIT_MAX_ATTEMPTS", None),
    ("NETWORK_WAIT_INTERVAL", None),
    ("TGTOKEN", Some("\"\"")),
    ("TGCHATID", Some("\"\"")),
    ("TGGRPID", Some("\"\"")),
    ("ENABLE_TELEGRAM", None),
    ("DISCORD_WEBHOOK_URL", Some("\"\"")),
    ("DISCORD_USERNAME", Some("\"Pi IP Logger\"")),
    ("DISCORD_AVATAR_URL", Some("\"\"")),
    ("DISCORD_EMBED_COLOR", Some("3066993")),
    ("DISCORD_USE_EMBEDS", Some("YES")),
    ("DISCORD_OS_LOGO_CODE", None),
    ("DISCORD_THREAD_ID", None),
    ("DISCORD_WAIT", None),
    ("ENABLE_DISCORD", None),
];

pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Rewrites the file so self-update is on and tracks `main`.
pub fn enable_self_update(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path).unwrap_or_default();
    let updated = with_self_update_enabled(&text);
    write_config(path, &updated)?;
    log::info!("Enabled self-update in {}", path.display());
    Ok(())
}

fn with_self_update_enabled(text: &str) -> String {
    let mut had_use = false;
    let mut had_branch = false;
    let mut lines: Vec<String> = Vec::new();

    for line in text.lines() {
        if line.starts_with("USE_SELFUPDATE=") {
            continue;
        }
        if line.starts_with("USE_SELFUPATE=") {
            lines.push("USE_SELFUPATE=YES".to_string());
            had_use = true;
        } else if line.starts_with("GIT_BRANCH=") {
            lines.push("GIT_BRANCH=\"main\"".to_string());
            had_branch = true;
        } else {
            lines.push(line.to_string());
        }
    }
    if !had_use {
        lines.push("USE_SELFUPATE=YES".to_string());
    }
    if !had_branch {
        lines.push("GIT_BRANCH=\"main\"".to_string());
    }
    lines.join("\n") + "\n"
}

/// Lines for every known key the existing file does not mention,
/// counting commented placeholders (`#KEY=`) as mentioned.
pub fn missing_lines(text: &str) -> Vec<String> {
    let existing = Settings::parse(text);
    let commented = Settings::parse(
        &text
            .lines()
            .filter_map(|l| l.trim().strip_prefix('#'))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    KNOWN_KEYS
        .iter()
        .filter(|(key, _)| !existing.contains(key) && !commented.contains(key))
        .map(|(key, value)| match value {
            Some(value) => format!("{key}={value}"),
            None => format!("#{key}="),
        })
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
pub enum PatchOutcome {
    UpToDate,
    Preview(Vec<String>),
    Patched { added: Vec<String>, backup: Option<PathBuf> },
}

/// Appends missing keys under a dated banner, backing up the original first.
pub fn patch_config(path: &Path, dry_run: bool) -> Result<PatchOutcome> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("INI not found: {}", path.display()))?;
    let added = missing_lines(&text);
    if added.is_empty() {
        return Ok(PatchOutcome::UpToDate);
    }
    if dry_run {
        return Ok(PatchOutcome::Preview(added));
    }

    let now = chrono::Local::now();
    let backup_path = PathBuf::from(format!(
        "{}.bak-{}",
        path.display(),
        now.format("%Y%m%d%H%M%S")
    ));
    let backup = match std::fs::copy(path, &backup_path) {
        Ok(_) => Some(backup_path),
        Err(e) => {
            log::warn!("Failed to create backup: {}", e);
            None
        }
    };

    let mut patched = text.trim_end_matches('\n').to_string();
    patched.push('\n');
    patched.push_str(&format!(
        "\n## Added by log-my-ip --patch-ini on {}\n",
        now.format("%Y-%m-%dT%H:%M:%S")
    ));
    patched.push_str("# The following keys were missing and have been appended.\n");
    patched.push_str("# Note: commented entries are optional and safe to ignore.\n");
    patched.push_str(&added.join("\n"));
    patched.push('\n');
    write_config(path, &patched)?;

    Ok(PatchOutcome::Patched { added, backup })
}

fn write_config(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_replaces_existing_lines() {
        let text = "TGTOKEN=x\nUSE_SELFUPATE=NO\nUSE_SELFUPDATE=NO\nGIT_BRANCH=dev\n";
        let out = with_self_update_enabled(text);
        assert_eq!(out, "TGTOKEN=x\nUSE_SELFUPATE=YES\nGIT_BRANCH=\"main\"\n");
    }

    #[test]
    fn test_enable_appends_when_missing() {
        let out = with_self_update_enabled("TGTOKEN=x\n");
        assert_eq!(out, "TGTOKEN=x\nUSE_SELFUPATE=YES\nGIT_BRANCH=\"main\"\n");
    }

    #[test]
    fn test_enable_self_update_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc").join("log-my-ip.ini");
        enable_self_update(&path).unwrap();
        let settings = Settings::load(&path);
        assert!(settings.self_update_enabled());
        assert_eq!(settings.get("GIT_BRANCH"), Some("main"));
    }

    #[test]
    fn test_missing_lines_skips_present_keys() {
        let lines = missing_lines("TGTOKEN=abc\nDISCORD_WAIT=YES\n#ENABLE_DISCORD=\n");
        assert!(lines.contains(&"USE_SELFUPATE=NO".to_string()));
        assert!(lines.contains(&"#DISCORD_THREAD_ID=".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("TGTOKEN=")));
        assert!(!lines.iter().any(|l| l.contains("DISCORD_WAIT")));
        assert!(!lines.iter().any(|l| l.contains("ENABLE_DISCORD")));
    }

    #[test]
    fn test_patch_dry_run_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log-my-ip.ini");
        std::fs::write(&path, "TGTOKEN=abc\n").unwrap();

        let outcome = patch_config(&path, true).unwrap();
        assert!(matches!(outcome, PatchOutcome::Preview(ref lines) if !lines.is_empty()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "TGTOKEN=abc\n");
    }

    #[test]
    fn test_patch_appends_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log-my-ip.ini");
        std::fs::write(&path, "TGTOKEN=abc").unwrap();

        let PatchOutcome::Patched { added, backup } = patch_config(&path, false).unwrap() else {
            panic!("Expected Patched");
        };
        let backup = backup.expect("backup path");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "TGTOKEN=abc");

        let patched = Settings::load(&path);
        assert_eq!(patched.get("TGTOKEN"), Some("abc"));
        assert_eq!(patched.get("DISCORD_USERNAME"), Some("Pi IP Logger"));
        assert!(!added.is_empty());

        assert_eq!(patch_config(&path, false).unwrap(), PatchOutcome::UpToDate);
    }

    #[test]
    fn test_patch_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(patch_config(&dir.path().join("absent.ini"), false).is_err());
    }
}
