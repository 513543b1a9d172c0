//! Channel registry and source cache
//!
//! The registry owns one native routing output per configured channel and
//! tracks what each channel is pointed at. The source cache holds the latest
//! discovery snapshot that route requests resolve names against.
//!
//! # Architecture
//!
//! ```text
//!        SourceFinder::poll()                 route_channel(id, name)
//!               │                                      │
//!               ▼                                      ▼
//!    ┌─────────────────────┐   get(name)   ┌──────────────────────────┐
//!    │ SourceCache         │◄──────────────│ ChannelRegistry          │
//!    │  name → Discovered  │               │  id → ChannelEntry {     │
//!    │  (replaced per poll)│               │    output: RoutingOutput,│
//!    └─────────────────────┘               │    current_source,       │
//!                                          │    status,               │
//!                                          │  }                       │
//!                                          └──────────────────────────┘
//! ```
//!
//! Both sit behind a single `RwLock` each; operations never hold one lock
//! while waiting on the other.

pub mod entry;
pub mod error;
pub mod source;
pub mod store;

pub use entry::{ChannelEntry, ChannelSnapshot, ChannelStatus, Transition};
pub use error::RegistryError;
pub use source::{DiscoveredSource, SourceCache};
pub use store::{Assignments, ChannelRegistry};
