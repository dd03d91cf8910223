pub mod address_service;

pub use address_service::{wait_for_internal_ip, ExternalIpResolver, InterfaceAddressSource};
