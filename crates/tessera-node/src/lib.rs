//! # tessera-node — Node composition over the state-transition core.
//!
//! - [`node::Node`] — single writer, many readers, block-applied subscription
//! - [`api::DatabaseApi`] — read-locked queries returning owned snapshots
//! - [`config::NodeConfig`] — layered file and environment configuration
//! - [`logging`] — tracing subscriber setup

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod node;

pub use api::DatabaseApi;
pub use config::{LogFormat, NodeConfig};
pub use error::NodeError;
pub use logging::init_logging;
pub use node::{BlockAppliedCallback, CallbackError, Node};
