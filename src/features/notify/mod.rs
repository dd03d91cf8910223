mod discord_channel;
pub mod notify_service;
mod telegram_channel;

pub use notify_service::NotifyService;
