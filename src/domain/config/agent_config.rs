pub struct AgentConfig;

impl AgentConfig {
    pub const UNKNOWN: &'static str = "Unknown";
    pub const ANY_NETWORK: &'static str = "ANY";
    pub const USER_AGENT: &'static str = concat!("log-my-ip/", env!("CARGO_PKG_VERSION"));

    pub const DEFAULT_INI_PATH: &'static str = "/usr/local/etc/log-my-ip.ini";
    pub const SYSTEM_INI_PATH: &'static str = "/etc/log-my-ip.ini";
    pub const USER_INI_NAME: &'static str = ".log-my-ip.ini";

    // Network timing
    pub const NETWORK_WAIT_MAX_ATTEMPTS: u32 = 24;
    pub const NETWORK_WAIT_INTERVAL_SECS: u64 = 5;
    pub const PROBE_TIMEOUT_SECS: u64 = 3;
    pub const SEND_TIMEOUT_SECS: u64 = 5;

    // Discord defaults
    pub const DISCORD_USERNAME: &'static str = "Pi IP Logger";
    pub const DISCORD_EMBED_COLOR: u32 = 3066993;
    pub const DISCORD_UPDATE_COLOR: u32 = 3447003;
    pub const DISCORD_FOOTER: &'static str = "log-my-ip • Discord";

    pub const TELEGRAM_API_BASE: &'static str = "https://api.telegram.org";

    // Self-update defaults
    pub const GIT_BRANCH: &'static str = "main";
    pub const GIT_REMOTE_HOST: &'static str = "github.com";
    /// Artifact relaunched after an update, relative to the working tree root.
    pub const RELAUNCH_BIN: &'static str = concat!("target/release/", env!("CARGO_PKG_NAME"));
    pub const SHORT_REF_LEN: usize = 7;

    // Exit codes
    pub const EXIT_NO_CHANNEL: u8 = 1;
    pub const EXIT_DELIVERY_FAILED: u8 = 2;
}
