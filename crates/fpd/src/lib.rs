//! # Finality Provider Daemon
//!
//! Library half of the `fpd` binary, so the wiring can be exercised from
//! tests.
//!
//! - `config` - TOML configuration
//! - `app` - component construction, background tasks, shutdown

pub mod app;
pub mod config;

pub use app::{build_gadget, DaemonGadget, FpdApp};
pub use config::{FpdConfig, CONFIG_FILE_NAME};
