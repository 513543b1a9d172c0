//! NDI virtual matrix router
//!
//! Advertises a fixed set of named NDI routing outputs ("channels") and lets
//! an operator point each one at any source discovered on the network.
//! Receivers subscribed to a channel follow it without reconnecting.
//!
//! The NDI runtime is located and loaded at startup; nothing links against it
//! at build time. Channel assignments survive restarts through a small JSON
//! snapshot.
//!
//! ```no_run
//! use ndi_router::{NdiRuntime, RouterConfig, RouterService};
//!
//! # async fn run() -> ndi_router::Result<()> {
//! let config = RouterConfig::load("config/channels.toml")?;
//! let service = RouterService::start(config, NdiRuntime::shared()?).await?;
//!
//! let mut events = service.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("{}", event.kind());
//!     }
//! });
//!
//! service
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
pub mod ndi;
pub mod persistence;
pub mod registry;
pub mod server;

pub use error::{Error, Result};
pub use events::{EventBus, RouterEvent};
pub use ndi::{NdiRuntime, RuntimeState};
pub use persistence::ChannelStore;
pub use registry::{ChannelSnapshot, ChannelStatus, DiscoveredSource, RegistryError};
pub use server::{ChannelConfig, RouterConfig, RouterService};
