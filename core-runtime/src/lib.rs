//! # Core Runtime Module
//!
//! Runtime plumbing shared by the offline cache crates:
//! - Logging and tracing setup ([`logging`])
//! - Fail-fast configuration with bridge injection ([`config`])

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, DatabaseLocation};
pub use error::{Error, Result};
