pub mod git_backend;
pub mod release_builder;
pub mod update_service;

pub use git_backend::{SystemGit, SystemResolver};
pub use release_builder::CargoRelease;
pub use update_service::{exec_relaunch, UpdateAnnouncer, UpdateRequest, UpdateService};
