//! NDI routing service
//!
//! This module provides:
//! - Router configuration, from code or a TOML file
//! - The service that owns discovery, channels and persistence
//! - Periodic discovery, receiver count and heartbeat tasks

pub mod config;
pub mod service;

pub use config::{ChannelConfig, RouterConfig};
pub use service::{ClearOutcome, RestoreReport, RouteOutcome, RouterService, ServiceHealth};
