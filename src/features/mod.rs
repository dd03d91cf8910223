pub mod address;
pub mod host;
pub mod notify;
pub mod update;
