//! Candidate site records

use serde::{Deserialize, Serialize};
use siteplace_common::SiteId;

/// How candidate weights are derived
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingMode {
    /// Every site weighs 1
    Uniform,
    /// Weight read from the named site attribute
    Attribute(String),
    /// Weight derived from the site's monetary cost
    Cost,
}

impl WeightingMode {
    /// Map a weighting token onto a mode.
    ///
    /// No token selects uniform weights, `cost_token` selects cost mode and
    /// any other token names the weight attribute.
    #[must_use]
    pub fn from_token(token: Option<&str>, cost_token: &str) -> Self {
        match token {
            None => Self::Uniform,
            Some(t) if t == cost_token => Self::Cost,
            Some(t) => Self::Attribute(t.to_string()),
        }
    }
}

/// Price coefficients of a cost-bearing site
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub storage_cost_per_gb: f64,
    pub data_transfer_cost_per_gb: f64,
    pub data_access_cost_per_gb: f64,
}

impl Pricing {
    /// Attribute keys the coefficients are read from
    pub const STORAGE_KEY: &'static str = "storage_cost_per_gb";
    pub const TRANSFER_KEY: &'static str = "data_transfer_cost_per_gb";
    pub const ACCESS_KEY: &'static str = "data_access_cost_per_gb";
}

/// A site admitted past attribute filtering
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateSite {
    /// Site identifier
    pub id: SiteId,
    /// Human-readable site name
    pub name: String,
    /// Selection weight (must be positive to be drawn)
    pub weight: f64,
    /// Test-only site, exempt from quota and space enforcement
    pub mock: bool,
    /// Site accepts writes
    pub availability_write: bool,
    /// Data lands in a staging area
    pub staging_area: bool,
    /// Price coefficients (cost mode only)
    pub pricing: Option<Pricing>,
    /// Availability score used by the cost heuristic
    pub availability: f64,
}

impl CandidateSite {
    /// The pick this candidate produces when committed
    #[must_use]
    pub fn pick(&self) -> SitePick {
        SitePick {
            site_id: self.id,
            staging_area: self.staging_area,
            availability_write: self.availability_write,
        }
    }
}

/// One granted copy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitePick {
    pub site_id: SiteId,
    pub staging_area: bool,
    pub availability_write: bool,
}
