//! # Finality Provider Telemetry
//!
//! Logging setup shared by the daemon and the integration suite.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fp_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FP_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `FP_JSON_LOGS` | `false` (`true` in containers) | JSON formatted output |
//! | `FP_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `FP_SERVICE_NAME` | `fpd` | Service name attached to startup logs |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install subscriber: {0}")]
    Subscriber(String),
}

/// Creates an info span tagged with a component name.
///
/// ```rust,ignore
/// let _span = component_span!("activation_recorder", component = "fp-03").entered();
/// ```
#[macro_export]
macro_rules! component_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
