//! Configuration types for Siteplace
//!
//! This module defines the selector configuration shared by the library
//! and the CLI.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Selector configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Copies requested when neither the caller nor the request says otherwise
    pub default_copies: usize,
    /// Weighting token that switches the selector into cost mode
    pub cost_token: String,
    /// Account attribute granting unlimited quota
    pub admin_attribute: String,
    /// Site attribute marking a test-only site
    pub mock_attribute: String,
    /// Name under which the space cap is reported in logs
    pub space_limit_name: String,
    /// Site attribute holding the availability score used in cost mode
    pub availability_attribute: String,
    /// Relative cost slack the cost heuristic may spend on availability
    /// (0 = never exceed the cheapest plan's total)
    pub cost_swap_tolerance: f64,
    /// Expected reads per unit time, multiplies the access price
    pub read_frequency: f64,
    /// RNG seed (None = seed from OS entropy)
    pub seed: Option<u64>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            default_copies: 1,
            cost_token: "cloud".to_string(),
            admin_attribute: "admin".to_string(),
            mock_attribute: "mock".to_string(),
            space_limit_name: "MaxSpaceAvailable".to_string(),
            availability_attribute: "availability".to_string(),
            cost_swap_tolerance: 0.0,
            read_frequency: 1.0,
            seed: None,
        }
    }
}

impl SelectorConfig {
    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.default_copies == 0 {
            return Err(Error::Configuration(
                "default_copies must be at least 1".to_string(),
            ));
        }
        if self.cost_token.is_empty() {
            return Err(Error::Configuration("cost_token must not be empty".to_string()));
        }
        if !self.cost_swap_tolerance.is_finite() || self.cost_swap_tolerance < 0.0 {
            return Err(Error::Configuration(format!(
                "cost_swap_tolerance must be a non-negative number, got {}",
                self.cost_swap_tolerance
            )));
        }
        if !self.read_frequency.is_finite() || self.read_frequency < 0.0 {
            return Err(Error::Configuration(format!(
                "read_frequency must be a non-negative number, got {}",
                self.read_frequency
            )));
        }
        Ok(())
    }

    /// Parse a JSON configuration document
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| Error::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
