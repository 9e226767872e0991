//! `[finality_sdk]` section.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Agent serving `/v1/api/verify-block`. Falls back to the generic
    /// indexer address when blank.
    pub agent_url: String,
    pub timeout_secs: u64,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            agent_url: String::new(),
            timeout_secs: 10,
        }
    }
}

impl SdkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// The configured agent, or `fallback` when none is set.
    pub fn agent_url_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.agent_url.trim().is_empty() {
            fallback
        } else {
            &self.agent_url
        }
    }

    pub fn validate(&self, fallback: &str) -> Result<(), ConfigError> {
        ConfigError::require("finality_sdk", "agent_url", self.agent_url_or(fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_url_fallback() {
        let cfg = SdkConfig::default();
        assert_eq!(cfg.agent_url_or("http://indexer:8080"), "http://indexer:8080");
        assert!(cfg.validate("http://indexer:8080").is_ok());
        assert_eq!(
            cfg.validate(""),
            Err(ConfigError::MissingField { section: "finality_sdk", field: "agent_url" })
        );

        let explicit = SdkConfig {
            agent_url: "http://agent:9000".into(),
            ..cfg
        };
        assert_eq!(explicit.agent_url_or("http://indexer:8080"), "http://agent:9000");
    }
}
