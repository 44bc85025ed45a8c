//! Catalog query contract
//!
//! The selector never talks to a persistent store directly. Everything it
//! needs to know about sites, limits and usage comes through
//! [`SiteCatalog`], a set of narrow read-only queries.

use serde::{Deserialize, Serialize};
use siteplace_common::{AccountName, QuotaGroup, Result, SiteId};
use std::collections::HashMap;

/// Candidate site as produced by expression resolution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCandidate {
    /// Site identifier
    pub id: SiteId,
    /// Human-readable site name
    pub name: String,
    /// Write availability (None = unspecified, treated as writable)
    pub availability_write: Option<bool>,
    /// Data lands in a transit area rather than final storage
    pub staging_area: bool,
}

impl RawCandidate {
    /// Create a writable, non-staging candidate
    #[must_use]
    pub fn new(id: SiteId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            availability_write: None,
            staging_area: false,
        }
    }

    /// Effective write availability
    #[must_use]
    pub fn writable(&self) -> bool {
        self.availability_write.unwrap_or(true)
    }
}

/// Account limit shared by every site of a quota group
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalQuotaLimit {
    /// Byte limit (None = no limit configured, which admits nothing)
    pub limit: Option<i64>,
    /// Sites the group expression resolved to
    pub sites: Vec<SiteId>,
}

/// Read-only queries the selector issues against the environment
pub trait SiteCatalog {
    /// Resolve a site-selection expression into candidates
    fn resolve_expression(&self, expression: &str) -> Result<Vec<RawCandidate>>;

    /// All attributes of a site
    fn site_attributes(&self, site: SiteId) -> Result<HashMap<String, String>>;

    /// Whether a site carries an attribute
    fn site_has_attribute(&self, site: SiteId, key: &str) -> Result<bool>;

    /// Whether an account carries an attribute
    fn account_has_attribute(&self, account: &AccountName, key: &str) -> Result<bool>;

    /// Per-site account limit in bytes
    fn local_quota_limit(&self, account: &AccountName, site: SiteId) -> Result<Option<i64>>;

    /// Bytes the account currently stores on a site
    fn local_usage(&self, account: &AccountName, site: SiteId) -> Result<i64>;

    /// Account limits shared by groups of sites
    fn global_quota_limits(
        &self,
        account: &AccountName,
    ) -> Result<HashMap<QuotaGroup, GlobalQuotaLimit>>;

    /// Bytes the account stores on every site it uses
    fn usage_per_site(&self, account: &AccountName) -> Result<HashMap<SiteId, i64>>;

    /// Maximum space a site may fill, if capped
    fn space_cap(&self, site: SiteId) -> Result<Option<i64>>;

    /// Bytes currently occupied on a site
    fn occupied_space(&self, site: SiteId) -> Result<i64>;

    /// Whether the account is exempt from quota enforcement
    fn account_is_privileged(&self, account: &AccountName, admin_attribute: &str) -> Result<bool> {
        self.account_has_attribute(account, admin_attribute)
    }
}
