pub mod host_service;
pub mod os_logo;

pub use host_service::{gather_host_facts, read_os_release};
pub use os_logo::os_logo_url;
