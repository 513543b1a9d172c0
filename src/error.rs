//! Crate-level error type
//!
//! Startup failures (`Load`, `RuntimeInit`, `FinderCreate`, `NoChannels`,
//! `ZeroInterval`, `Config*`) mean the service cannot run. `Registry` errors
//! are operational and reported back to whoever issued the command.

use std::path::PathBuf;

use thiserror::Error;

use crate::ndi::LoadError;
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("NDIlib_initialize() failed. Is the NDI runtime installed and the CPU supported?")]
    RuntimeInit,

    #[error("NDIlib_find_create_v2() returned null")]
    FinderCreate,

    #[error("No channels defined in config")]
    NoChannels,

    #[error("Config value {0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("Failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type Result<T> = std::result::Result<T, Error>;
