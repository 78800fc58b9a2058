//! Run configuration.
//!
//! ```rust
//! use ocs_reencrypt::config::ProtocolConfig;
//!
//! let config = ProtocolConfig::new(4).expect("valid roster");
//! assert_eq!(config.threshold(), 3);
//! assert_eq!(config.fault_tolerance(), 1);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{byzantine_threshold, fault_tolerance, validate_threshold, Error};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Full tree size, coordinator included.
    pub roster_size: usize,
    /// Overrides the Byzantine threshold; may only raise it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<usize>,
    /// `tracing` filter directive, e.g. `"ocs_reencrypt=debug"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl ProtocolConfig {
    pub fn new(roster_size: usize) -> Result<Self, Error> {
        let config = Self {
            roster_size,
            threshold: None,
            log_filter: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
            .unwrap_or_else(|| byzantine_threshold(self.roster_size))
    }

    pub fn fault_tolerance(&self) -> usize {
        fault_tolerance(self.roster_size)
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_threshold(self.roster_size, self.threshold())?;
        let minimum = byzantine_threshold(self.roster_size);
        if self.threshold() < minimum {
            return Err(Error::Config(format!(
                "threshold {} below Byzantine minimum {minimum}",
                self.threshold()
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }
}
