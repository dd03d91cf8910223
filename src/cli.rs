use clap::Parser;

/// Send IP info to Telegram and/or Discord.
#[derive(Parser, Debug)]
#[command(name = "log-my-ip", version, about)]
pub struct Cli {
    /// Message to send
    #[arg(short = 'm', long)]
    pub note: Option<String>,

    /// Use note REBOOT and skip self-update
    #[arg(long)]
    pub reboot: bool,

    /// Use note SCHEDULED
    #[arg(long)]
    pub scheduled: bool,

    /// Path to INI file (overrides search). Default search order:
    /// /etc/log-my-ip.ini, $HOME/.log-my-ip.ini, /usr/local/etc/log-my-ip.ini
    #[arg(long, value_name = "PATH")]
    pub ini: Option<String>,

    /// Print what would be sent without sending
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Write USE_SELFUPATE=YES and GIT_BRANCH="main" to the INI and exit
    #[arg(long)]
    pub enable_self_update: bool,

    /// Append newly introduced keys to the INI (with backup) and exit
    #[arg(long)]
    pub patch_ini: bool,

    /// Free-form note, used when no other note option is given
    #[arg(value_name = "WORDS")]
    pub words: Vec<String>,
}

impl Cli {
    pub fn resolved_note(&self) -> String {
        if self.reboot {
            "REBOOT".to_string()
        } else if self.scheduled {
            "SCHEDULED".to_string()
        } else if let Some(note) = self.note.as_ref().filter(|n| !n.is_empty()) {
            note.clone()
        } else if !self.words.is_empty() {
            self.words.join(" ")
        } else {
            "Manual Update".to_string()
        }
    }
}
