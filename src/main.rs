mod cli;
mod domain;
mod features;
mod utils;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;
use crate::domain::config::ini_admin::{self, PatchOutcome};
use crate::domain::config::{resolve_ini_path, AgentConfig, Settings};
use crate::domain::models::{Report, UpdateOutcome};
use crate::features::address::{wait_for_internal_ip, ExternalIpResolver, InterfaceAddressSource};
use crate::features::host::gather_host_facts;
use crate::features::notify::NotifyService;
use crate::features::update::{
    exec_relaunch, CargoRelease, SystemGit, SystemResolver, UpdateRequest, UpdateService,
};

/// How a reporting run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Delivered,
    NoChannel,
    DeliveryFailed,
}

impl RunOutcome {
    fn from_delivery(delivered: bool) -> Self {
        if delivered {
            RunOutcome::Delivered
        } else {
            RunOutcome::DeliveryFailed
        }
    }

    fn exit_code(self) -> u8 {
        match self {
            RunOutcome::Delivered => 0,
            RunOutcome::NoChannel => AgentConfig::EXIT_NO_CHANNEL,
            RunOutcome::DeliveryFailed => AgentConfig::EXIT_DELIVERY_FAILED,
        }
    }
}

impl From<RunOutcome> for ExitCode {
    fn from(outcome: RunOutcome) -> Self {
        ExitCode::from(outcome.exit_code())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let ini_path = resolve_ini_path(cli.ini.as_deref());

    if cli.enable_self_update {
        return enable_self_update(&ini_path);
    }
    if cli.patch_ini {
        return patch_ini(&ini_path, cli.dry_run);
    }

    let settings = Settings::load(&ini_path);
    let enabled = settings.enabled_channels();
    let hostname = utils::get_hostname();
    let mut notifier = match NotifyService::new(&settings, cli.dry_run) {
        Ok(notifier) => notifier,
        Err(e) => {
            log::error!("Failed to set up the notification client: {:#}", e);
            return RunOutcome::DeliveryFailed.into();
        }
    };

    if let UpdateOutcome::Relaunch(plan) = self_update(&settings, &cli, &hostname, &mut notifier).await {
        let err = exec_relaunch(&plan);
        log::error!("Failed to relaunch {}: {}", plan.program.display(), err);
    }

    if !enabled.any() {
        println!(
            "No destination enabled. Set ENABLE_DISCORD=YES and/or ENABLE_TELEGRAM=YES in {}",
            ini_path.display()
        );
        return RunOutcome::NoChannel.into();
    }

    let report = match build_report(&settings, &cli.resolved_note()).await {
        Ok(report) => report,
        Err(e) => {
            log::error!("Failed to build the report: {:#}", e);
            return RunOutcome::DeliveryFailed.into();
        }
    };
    let delivered = notifier.dispatch(&report, enabled).await;
    if cli.dry_run {
        log::info!("Dry run: {} payload(s) built, nothing sent", notifier.dry_runs().len());
    }
    RunOutcome::from_delivery(delivered).into()
}

async fn self_update(
    settings: &Settings,
    cli: &Cli,
    hostname: &str,
    notifier: &mut NotifyService<'_>,
) -> UpdateOutcome {
    let repo_dir = settings
        .get("GIT_REPO_DIR")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
        })
        .unwrap_or_else(|| PathBuf::from("."));

    let git = SystemGit::new(repo_dir);
    log::debug!("Checking for updates in {}", git.repo_dir().display());
    let service = UpdateService::new(
        settings,
        Box::new(git),
        Box::new(SystemResolver),
        Box::new(CargoRelease::from_settings(settings)),
    );
    let request = UpdateRequest {
        suppressed: cli.reboot,
        hostname,
        args: std::env::args_os().skip(1).collect(),
    };
    service.run(request, notifier).await
}

async fn build_report(settings: &Settings, note: &str) -> Result<Report> {
    let pattern = settings.get_or("_my_network_range", AgentConfig::ANY_NETWORK);
    let max_attempts = settings.parse_or(
        "NETWORK_WAIT_MAX_ATTEMPTS",
        AgentConfig::NETWORK_WAIT_MAX_ATTEMPTS,
    );
    let interval = Duration::from_secs(settings.parse_or(
        "NETWORK_WAIT_INTERVAL",
        AgentConfig::NETWORK_WAIT_INTERVAL_SECS,
    ));

    let internal_ip = wait_for_internal_ip(&InterfaceAddressSource, pattern, max_attempts, interval).await;
    let external_ip = ExternalIpResolver::new()?.resolve().await;
    let facts = gather_host_facts().await;

    Ok(Report::new(note, facts, &internal_ip, &external_ip))
}

fn enable_self_update(ini_path: &Path) -> ExitCode {
    if !ini_admin::is_root() {
        log::error!("Must be root to modify {}", ini_path.display());
        return ExitCode::FAILURE;
    }
    match ini_admin::enable_self_update(ini_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn patch_ini(ini_path: &Path, dry_run: bool) -> ExitCode {
    match ini_admin::patch_config(ini_path, dry_run) {
        Ok(PatchOutcome::UpToDate) => {
            println!("No changes needed, {} already contains all known keys.", ini_path.display());
        }
        Ok(PatchOutcome::Preview(lines)) => {
            println!("--- BEGIN NEW CONTENT (preview) ---");
            println!("{}", lines.join("\n"));
            println!("--- END NEW CONTENT (preview) ---");
        }
        Ok(PatchOutcome::Patched { added, backup }) => {
            if let Some(backup) = backup {
                println!("Backup written: {}", backup.display());
            }
            println!("Updated: {} ({} keys added)", ini_path.display(), added.len());
        }
        Err(e) => {
            log::error!("{:#}", e);
            return ExitCode::from(2);
        }
    }
    ExitCode::SUCCESS
}
