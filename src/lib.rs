//! Image Mirror Library
//!
//! Mirrors a configured list of container images into a target registry:
//! log in once, then pull, retag and push every image in order.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mirror;
pub mod registry;

pub use config::{AuthConfig, MirrorConfig};
pub use error::{MirrorError, Result};
pub use logging::Logger;
