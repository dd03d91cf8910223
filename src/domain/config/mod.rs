pub mod agent_config;
pub mod ini_admin;
pub mod settings;

pub use agent_config::AgentConfig;
pub use settings::{resolve_ini_path, ChannelKind, EnabledChannels, Settings};
