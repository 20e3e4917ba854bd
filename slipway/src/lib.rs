pub(crate) mod command;
pub(crate) mod config;
pub(crate) mod docker;
pub(crate) mod image_ref;
pub(crate) mod platform;
pub(crate) mod preflight;
pub(crate) mod process;
pub(crate) mod report;
pub(crate) mod retry;
pub(crate) mod temp_path;
pub(crate) mod validate;

pub mod cli;

pub(crate) type Result<T, E = Box<dyn std::error::Error + Send + Sync + 'static>> =
    std::result::Result<T, E>;
